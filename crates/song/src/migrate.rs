//! Conversion of legacy events to the NoteOn/NoteOff + PatternOn format.
//!
//! `InstrumentOn` becomes a NoteOn at its beat plus a NoteOff after its
//! duration; `StartPattern` becomes `PatternOn`. No PatternOff is added since
//! a nested pattern plays for its own length. Migrating twice changes nothing.

use crate::{NoteEvent, Pattern, PatternEvent, Song};

/// Note length assumed for legacy notes without a (non-zero) duration.
pub const DEFAULT_LEGACY_DURATION: f64 = 0.25;

/// Velocity given to the NoteOff synthesised from a legacy note.
pub const DEFAULT_NOTE_OFF_VELOCITY: f64 = 0.5;

pub fn needs_migration(song: &Song) -> bool {
    song.patterns
        .iter()
        .flat_map(|p| &p.events)
        .any(PatternEvent::is_legacy)
}

pub fn migrate(song: &Song) -> Song {
    Song {
        patterns: song.patterns.iter().map(migrate_pattern).collect(),
        ..song.clone()
    }
}

/// Rewrites a pattern's events in the current format, stably sorted by beat.
pub fn migrate_pattern(pattern: &Pattern) -> Pattern {
    let mut events = Vec::with_capacity(pattern.events.len());

    for event in &pattern.events {
        match event {
            PatternEvent::InstrumentOn(legacy) => {
                let duration = match legacy.duration {
                    Some(d) if d != 0.0 && !d.is_nan() => d,
                    _ => DEFAULT_LEGACY_DURATION,
                };
                events.push(PatternEvent::NoteOn(NoteEvent {
                    beat: legacy.beat,
                    channel_id: legacy.channel_id.clone(),
                    instrument_id: legacy.instrument_id.clone(),
                    note: legacy.note.clone(),
                    velocity: legacy.velocity,
                }));
                events.push(PatternEvent::NoteOff(NoteEvent {
                    beat: legacy.beat + duration,
                    channel_id: legacy.channel_id.clone(),
                    instrument_id: legacy.instrument_id.clone(),
                    note: legacy.note.clone(),
                    velocity: DEFAULT_NOTE_OFF_VELOCITY,
                }));
            }
            PatternEvent::StartPattern(trigger) => {
                events.push(PatternEvent::PatternOn(trigger.clone()));
            }
            other => events.push(other.clone()),
        }
    }

    // `sort_by` is stable: events on the same beat keep their order.
    events.sort_by(|a, b| a.beat().total_cmp(&b.beat()));

    Pattern {
        id: pattern.id.clone(),
        bars: pattern.bars,
        events,
    }
}
