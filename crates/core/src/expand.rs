//! Flattening of the sequence and its nested patterns into notes on the
//! absolute song timeline.
//!
//! Traversal is depth-first: sequence order, then beat order within each
//! pattern (stable for equal beats), descending into a nested pattern at its `PatternOn`. Every event
//! beat is offset by the absolute start of the pattern containing it.

use seq_song::{
    DEFAULT_LEGACY_DURATION, Note, NoteEvent, PatternEvent, PatternTrigger, Song,
};

/// Length in beats given to a NoteOn that no NoteOff closes.
pub const FALLBACK_NOTE_DURATION: f64 = 0.125;

/// Deepest chain of nested patterns that is expanded. Triggers beyond it are
/// dropped with a warning.
pub const MAX_NESTING_DEPTH: usize = 64;

/// A note with absolute start and sounding duration, both in beats.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedNote {
    pub start: f64,
    pub duration: f64,
    pub channel_id: String,
    pub instrument_id: String,
    pub note: Note,
    pub velocity: f64,
    /// Pattern the note was written in
    pub pattern_id: String,
    /// 0 for patterns placed by the sequence, +1 per level of nesting
    pub depth: usize,
}

impl ExpandedNote {
    pub fn is_nested(&self) -> bool {
        self.depth > 0
    }

    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Where a `PatternOn` placed a nested pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternPlacement {
    pub pattern_id: String,
    pub start: f64,
    /// Length of the nested pattern in beats, or 1 when it does not exist
    pub length: f64,
    /// Depth of the nested pattern itself
    pub depth: usize,
    pub found: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Expansion {
    /// In traversal order, each note where its NoteOn appears
    pub notes: Vec<ExpandedNote>,
    pub placements: Vec<PatternPlacement>,
}

/// Expands every sequence entry of `song`.
pub fn expand_song(song: &Song) -> Expansion {
    let mut expander = Expander::new(song);
    for entry in &song.sequence {
        expander.expand(&entry.pattern_id, entry.beat);
    }
    expander.out
}

/// Expands a single pattern as if the sequence placed it at `start`.
pub fn expand_pattern(song: &Song, pattern_id: &str, start: f64) -> Expansion {
    let mut expander = Expander::new(song);
    expander.expand(pattern_id, start);
    expander.out
}

/// A NoteOn waiting for its NoteOff.
struct OpenNote<'a> {
    index: usize,
    event: &'a NoteEvent,
}

struct Expander<'a> {
    song: &'a Song,
    /// Patterns currently being expanded, outermost first
    path: Vec<&'a str>,
    out: Expansion,
}

impl<'a> Expander<'a> {
    fn new(song: &'a Song) -> Self {
        Self {
            song,
            path: Vec::new(),
            out: Expansion::default(),
        }
    }

    fn expand(&mut self, pattern_id: &str, start: f64) {
        let song = self.song;
        let Some(pattern) = song.pattern(pattern_id) else {
            tracing::warn!(pattern_id, "pattern not found");
            return;
        };
        if self.path.len() >= MAX_NESTING_DEPTH {
            tracing::warn!(
                pattern_id,
                depth = self.path.len(),
                "pattern nesting too deep, skipping"
            );
            return;
        }

        let depth = self.path.len();
        self.path.push(&pattern.id);
        let length = song.pattern_length(pattern);
        let in_pattern = |beat: f64| (0.0..length).contains(&beat);
        let mut open: Vec<OpenNote<'a>> = Vec::new();

        // files may list events in any order; pairing goes by beat
        let mut events: Vec<&'a PatternEvent> = pattern.events.iter().collect();
        events.sort_by(|a, b| a.beat().total_cmp(&b.beat()));

        for event in events {
            match event {
                PatternEvent::NoteOn(on) if in_pattern(on.beat) => {
                    let index = self.push_note(on, start, FALLBACK_NOTE_DURATION, &pattern.id, depth);
                    open.push(OpenNote { index, event: on });
                }
                PatternEvent::NoteOff(off) => {
                    // most recent unmatched NoteOn of the same voice at or before the NoteOff
                    let matched = open
                        .iter()
                        .enumerate()
                        .filter(|(_, o)| o.event.same_voice(off) && o.event.beat <= off.beat)
                        .max_by(|a, b| a.1.event.beat.total_cmp(&b.1.event.beat))
                        .map(|(pos, _)| pos);
                    if let Some(pos) = matched {
                        let on = open.remove(pos);
                        self.out.notes[on.index].duration = off.beat.min(length) - on.event.beat;
                    }
                }
                PatternEvent::InstrumentOn(legacy) if in_pattern(legacy.beat) => {
                    let duration = match legacy.duration {
                        Some(d) if d != 0.0 && !d.is_nan() => d,
                        _ => DEFAULT_LEGACY_DURATION,
                    };
                    let note = NoteEvent {
                        beat: legacy.beat,
                        channel_id: legacy.channel_id.clone(),
                        instrument_id: legacy.instrument_id.clone(),
                        note: legacy.note.clone(),
                        velocity: legacy.velocity,
                    };
                    let end = (legacy.beat + duration).min(length);
                    self.push_note(&note, start, end - legacy.beat, &pattern.id, depth);
                }
                PatternEvent::PatternOn(trigger) | PatternEvent::StartPattern(trigger)
                    if in_pattern(trigger.beat) =>
                {
                    self.trigger(trigger, start, depth);
                }
                _ => {}
            }
        }

        self.path.pop();
    }

    fn push_note(
        &mut self,
        event: &NoteEvent,
        start: f64,
        duration: f64,
        pattern_id: &str,
        depth: usize,
    ) -> usize {
        self.out.notes.push(ExpandedNote {
            start: start + event.beat,
            duration,
            channel_id: event.channel_id.clone(),
            instrument_id: event.instrument_id.clone(),
            note: event.note.clone(),
            velocity: event.velocity,
            pattern_id: pattern_id.to_string(),
            depth,
        });
        self.out.notes.len() - 1
    }

    fn trigger(&mut self, trigger: &PatternTrigger, start: f64, depth: usize) {
        if self.path.contains(&trigger.pattern_id.as_str()) {
            tracing::warn!(
                pattern_id = %trigger.pattern_id,
                path = %self.path.join(" -> "),
                "pattern triggers itself, skipping"
            );
            return;
        }

        let song = self.song;
        let nested_start = start + trigger.beat;
        let nested = song.pattern(&trigger.pattern_id);
        self.out.placements.push(PatternPlacement {
            pattern_id: trigger.pattern_id.clone(),
            start: nested_start,
            length: nested.map_or(1.0, |p| song.pattern_length(p)),
            depth: depth + 1,
            found: nested.is_some(),
        });

        self.expand(&trigger.pattern_id, nested_start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixture::*;
    use seq_song::{InstrumentOnEvent, PatternTrigger};

    #[test]
    fn test_single_note_pair() {
        let song = song(
            vec![pattern("p1", 1.0, vec![note_on(0.0, "C4"), note_off(0.5, "C4")])],
            vec![entry("p1", 0.0)],
        );
        let expansion = expand_song(&song);

        assert_eq!(expansion.notes.len(), 1);
        let note = &expansion.notes[0];
        assert_eq!(note.start, 0.0);
        assert_eq!(note.duration, 0.5);
        assert_eq!(note.note, Note::Name("C4".to_string()));
        assert!(!note.is_nested());
    }

    #[test]
    fn test_events_at_or_past_pattern_end_are_clipped() {
        let song = song(
            vec![pattern(
                "p",
                2.0,
                vec![note_on(7.5, "A"), note_on(8.0, "B"), note_on(9.0, "C")],
            )],
            vec![entry("p", 0.0)],
        );
        let notes: Vec<String> = expand_song(&song)
            .notes
            .iter()
            .map(|n| n.note.to_string())
            .collect();
        assert_eq!(notes, vec!["A"]);
    }

    #[test]
    fn test_nested_offsets_are_additive() {
        let song = song(
            vec![
                pattern("outer", 4.0, vec![pattern_on(4.0, "inner")]),
                pattern("inner", 1.0, vec![note_on(1.0, "E4"), note_off(2.0, "E4")]),
            ],
            vec![entry("outer", 8.0)],
        );
        let expansion = expand_song(&song);

        assert_eq!(expansion.notes.len(), 1);
        assert_eq!(expansion.notes[0].start, 13.0);
        assert_eq!(expansion.notes[0].depth, 1);
        assert_eq!(
            expansion.placements,
            vec![PatternPlacement {
                pattern_id: "inner".to_string(),
                start: 12.0,
                length: 4.0,
                depth: 1,
                found: true,
            }]
        );
    }

    #[test]
    fn test_note_off_matches_most_recent_note_on() {
        let song = song(
            vec![pattern(
                "p",
                1.0,
                vec![
                    note_on(0.0, "C4"),
                    note_on(1.0, "C4"),
                    note_off(1.5, "C4"),
                    note_off(3.0, "C4"),
                ],
            )],
            vec![entry("p", 0.0)],
        );
        let notes = expand_song(&song).notes;

        assert_eq!(notes.len(), 2);
        // the later NoteOn is closed first
        assert_eq!((notes[1].start, notes[1].duration), (1.0, 0.5));
        assert_eq!((notes[0].start, notes[0].duration), (0.0, 3.0));
    }

    #[test]
    fn test_note_off_listed_before_its_note_on_still_pairs() {
        let json = r#"{ "bpm": 120, "beatsPerBar": 4,
            "patterns": [{ "id": "p", "bars": 1, "events": [
                { "type": "NoteOff", "beat": 0.5, "channelId": "lead", "instrumentId": "synth", "note": "C4", "velocity": 0.5 },
                { "type": "NoteOn", "beat": 0, "channelId": "lead", "instrumentId": "synth", "note": "C4", "velocity": 0.8 }
            ]}],
            "sequence": [{ "patternId": "p", "beat": 0 }] }"#;
        let song = seq_song::parse_song(json).expect("parse");
        let notes = expand_song(&song).notes;

        assert_eq!(notes.len(), 1);
        assert_eq!((notes[0].start, notes[0].duration), (0.0, 0.5));
    }

    #[test]
    fn test_unsorted_events_play_in_beat_order() {
        let song = song(
            vec![pattern(
                "p",
                1.0,
                vec![note_off(3.0, "C4"), note_on(2.0, "C4"), note_on(0.0, "A")],
            )],
            vec![entry("p", 0.0)],
        );
        let summary: Vec<(String, f64, f64)> = expand_song(&song)
            .notes
            .iter()
            .map(|n| (n.note.to_string(), n.start, n.duration))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("A".to_string(), 0.0, FALLBACK_NOTE_DURATION),
                ("C4".to_string(), 2.0, 1.0)
            ]
        );
    }

    #[test]
    fn test_note_off_ignores_other_voices_and_earlier_beats() {
        let song = song(
            vec![pattern(
                "p",
                1.0,
                vec![note_on(1.0, "C4"), note_off(0.5, "C4"), note_off(2.0, "D4")],
            )],
            vec![entry("p", 0.0)],
        );
        let notes = expand_song(&song).notes;
        assert_eq!(notes[0].duration, FALLBACK_NOTE_DURATION);
    }

    #[test]
    fn test_unmatched_note_on_gets_fallback_duration() {
        let song = song(
            vec![pattern("p", 1.0, vec![note_on(2.0, "G4")])],
            vec![entry("p", 1.0)],
        );
        let notes = expand_song(&song).notes;
        assert_eq!(notes[0].start, 3.0);
        assert_eq!(notes[0].duration, 0.125);
    }

    #[test]
    fn test_duration_is_clamped_to_pattern_end() {
        let song = song(
            vec![pattern("p", 1.0, vec![note_on(3.0, "C4"), note_off(6.0, "C4")])],
            vec![entry("p", 0.0)],
        );
        assert_eq!(expand_song(&song).notes[0].duration, 1.0);
    }

    #[test]
    fn test_traversal_order_is_depth_first() {
        let song = song(
            vec![
                pattern(
                    "outer",
                    1.0,
                    vec![note_on(0.0, "A"), pattern_on(0.0, "inner"), note_on(3.0, "D")],
                ),
                pattern("inner", 1.0, vec![note_on(0.0, "B"), note_on(1.0, "C")]),
            ],
            vec![entry("outer", 0.0), entry("inner", 4.0)],
        );
        let names: Vec<String> = expand_song(&song)
            .notes
            .iter()
            .map(|n| format!("{}@{}", n.note, n.start))
            .collect();
        assert_eq!(names, vec!["A@0", "B@0", "C@1", "D@3", "B@4", "C@5"]);
    }

    #[test]
    fn test_overlapping_nested_patterns_play_independently() {
        let song = song(
            vec![
                pattern("outer", 1.0, vec![pattern_on(0.0, "riff"), pattern_on(1.0, "riff")]),
                pattern("riff", 1.0, vec![note_on(0.0, "C4"), note_off(2.0, "C4")]),
            ],
            vec![entry("outer", 0.0)],
        );
        let notes = expand_song(&song).notes;
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].start, 0.0);
        assert_eq!(notes[1].start, 1.0);
        assert!(notes.iter().all(|n| n.duration == 2.0));
    }

    #[test]
    fn test_missing_patterns_are_skipped() {
        let song = song(
            vec![pattern("p", 1.0, vec![pattern_on(1.0, "ghost"), note_on(2.0, "C4")])],
            vec![entry("missing", 0.0), entry("p", 0.0)],
        );
        let expansion = expand_song(&song);
        assert_eq!(expansion.notes.len(), 1);
        assert_eq!(expansion.placements.len(), 1);
        assert!(!expansion.placements[0].found);
        assert_eq!(expansion.placements[0].length, 1.0);
    }

    #[test]
    fn test_cycles_are_truncated() {
        let song = song(
            vec![
                pattern("a", 1.0, vec![note_on(0.0, "A"), pattern_on(1.0, "b")]),
                pattern("b", 1.0, vec![note_on(0.0, "B"), pattern_on(1.0, "a")]),
                pattern("self", 1.0, vec![note_on(0.0, "S"), pattern_on(2.0, "self")]),
            ],
            vec![entry("a", 0.0), entry("self", 8.0)],
        );
        let expansion = expand_song(&song);
        let names: Vec<String> = expansion.notes.iter().map(|n| n.note.to_string()).collect();
        assert_eq!(names, vec!["A", "B", "S"]);
        assert_eq!(expansion.placements.len(), 1);
    }

    #[test]
    fn test_deep_nesting_is_bounded() {
        let patterns = (0..100)
            .map(|i| {
                pattern(
                    &format!("p{i}"),
                    1.0,
                    vec![note_on(0.0, "C4"), pattern_on(0.0, &format!("p{}", i + 1))],
                )
            })
            .collect();
        let song = song(patterns, vec![entry("p0", 0.0)]);
        let expansion = expand_song(&song);
        assert_eq!(expansion.notes.len(), MAX_NESTING_DEPTH);
    }

    #[test]
    fn test_legacy_events_are_honoured() {
        let legacy_note = PatternEvent::InstrumentOn(InstrumentOnEvent {
            beat: 1.0,
            channel_id: "lead".to_string(),
            duration: None,
            instrument_id: "synth".to_string(),
            note: Note::Frequency(220.0),
            velocity: 1.0,
        });
        let legacy_trigger = PatternEvent::StartPattern(PatternTrigger {
            beat: 2.0,
            pattern_id: "inner".to_string(),
        });
        let song = song(
            vec![
                pattern("outer", 1.0, vec![legacy_note, legacy_trigger]),
                pattern("inner", 1.0, vec![note_on(0.0, "E4")]),
            ],
            vec![entry("outer", 0.0)],
        );
        let notes = expand_song(&song).notes;
        assert_eq!(notes.len(), 2);
        assert_eq!((notes[0].start, notes[0].duration), (1.0, DEFAULT_LEGACY_DURATION));
        assert_eq!(notes[1].start, 2.0);
    }

    #[test]
    fn test_expand_pattern_at_offset() {
        let song = song(
            vec![pattern("p", 1.0, vec![note_on(0.5, "C4")])],
            vec![],
        );
        let expansion = expand_pattern(&song, "p", 10.0);
        assert_eq!(expansion.notes[0].start, 10.5);
    }
}
