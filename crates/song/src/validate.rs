use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::{PatternEvent, Song};

/// A data problem that playback tolerates by skipping the offending part.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationIssue {
    DuplicateId { kind: &'static str, id: String },
    UnknownSequencePattern { pattern_id: String },
    UnknownNestedPattern { pattern_id: String, referenced_from: String },
    UnknownChannel { pattern_id: String, channel_id: String },
    UnknownInstrument { pattern_id: String, instrument_id: String },
    VelocityOutOfRange { pattern_id: String, beat: f64, velocity: f64 },
    PanOutOfRange { channel_id: String, pan: f64 },
    EventOutsidePattern { pattern_id: String, beat: f64 },
    /// Pattern ids along a reference loop; the first id repeats at the end.
    PatternCycle { path: Vec<String> },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::DuplicateId { kind, id } => write!(f, "duplicate {kind} id '{id}'"),
            ValidationIssue::UnknownSequencePattern { pattern_id } => {
                write!(f, "sequence references unknown pattern '{pattern_id}'")
            }
            ValidationIssue::UnknownNestedPattern {
                pattern_id,
                referenced_from,
            } => write!(
                f,
                "pattern '{referenced_from}' triggers unknown pattern '{pattern_id}'"
            ),
            ValidationIssue::UnknownChannel {
                pattern_id,
                channel_id,
            } => write!(f, "pattern '{pattern_id}' uses unknown channel '{channel_id}'"),
            ValidationIssue::UnknownInstrument {
                pattern_id,
                instrument_id,
            } => write!(
                f,
                "pattern '{pattern_id}' uses unknown instrument '{instrument_id}'"
            ),
            ValidationIssue::VelocityOutOfRange {
                pattern_id,
                beat,
                velocity,
            } => write!(
                f,
                "pattern '{pattern_id}' beat {beat}: velocity {velocity} outside 0..=1"
            ),
            ValidationIssue::PanOutOfRange { channel_id, pan } => {
                write!(f, "channel '{channel_id}' pan {pan} outside -1..=1")
            }
            ValidationIssue::EventOutsidePattern { pattern_id, beat } => write!(
                f,
                "pattern '{pattern_id}' has an event at beat {beat}, past its end; it will not play"
            ),
            ValidationIssue::PatternCycle { path } => {
                write!(f, "pattern reference cycle: {}", path.join(" -> "))
            }
        }
    }
}

impl Song {
    /// Reports dangling references, out-of-range values and pattern cycles.
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        duplicates("channel", self.channels.iter().map(|c| c.id.as_str()), &mut issues);
        duplicates("instrument", self.instruments.iter().map(|i| i.id.as_str()), &mut issues);
        duplicates("pattern", self.patterns.iter().map(|p| p.id.as_str()), &mut issues);

        for channel in &self.channels {
            if let Some(pan) = channel.settings.pan.filter(|p| !(-1.0..=1.0).contains(p)) {
                issues.push(ValidationIssue::PanOutOfRange {
                    channel_id: channel.id.clone(),
                    pan,
                });
            }
        }

        for entry in &self.sequence {
            if self.pattern(&entry.pattern_id).is_none() {
                issues.push(ValidationIssue::UnknownSequencePattern {
                    pattern_id: entry.pattern_id.clone(),
                });
            }
        }

        for pattern in &self.patterns {
            let length = self.pattern_length(pattern);
            for event in &pattern.events {
                // a late NoteOff is clamped to the pattern end
                let clamped = matches!(event, PatternEvent::NoteOff(_));
                if event.beat() >= length && !clamped {
                    issues.push(ValidationIssue::EventOutsidePattern {
                        pattern_id: pattern.id.clone(),
                        beat: event.beat(),
                    });
                }

                if let Some(target) = event.triggered_pattern() {
                    if self.pattern(target).is_none() {
                        issues.push(ValidationIssue::UnknownNestedPattern {
                            pattern_id: target.to_string(),
                            referenced_from: pattern.id.clone(),
                        });
                    }
                    continue;
                }

                let (channel_id, instrument_id, velocity) = match event {
                    PatternEvent::NoteOn(n) | PatternEvent::NoteOff(n) => {
                        (&n.channel_id, &n.instrument_id, n.velocity)
                    }
                    PatternEvent::InstrumentOn(n) => (&n.channel_id, &n.instrument_id, n.velocity),
                    _ => continue,
                };
                if self.channel(channel_id).is_none() {
                    issues.push(ValidationIssue::UnknownChannel {
                        pattern_id: pattern.id.clone(),
                        channel_id: channel_id.clone(),
                    });
                }
                if self.instrument(instrument_id).is_none() {
                    issues.push(ValidationIssue::UnknownInstrument {
                        pattern_id: pattern.id.clone(),
                        instrument_id: instrument_id.clone(),
                    });
                }
                if !(0.0..=1.0).contains(&velocity) {
                    issues.push(ValidationIssue::VelocityOutOfRange {
                        pattern_id: pattern.id.clone(),
                        beat: event.beat(),
                        velocity,
                    });
                }
            }
        }

        issues.extend(
            self.pattern_cycles()
                .into_iter()
                .map(|path| ValidationIssue::PatternCycle { path }),
        );
        issues
    }

    /// Every distinct loop in the pattern reference graph, found by
    /// depth-first search. Triggers outside `[0, length)` never fire and
    /// add no edge.
    pub fn pattern_cycles(&self) -> Vec<Vec<String>> {
        let edges: HashMap<&str, Vec<&str>> = self
            .patterns
            .iter()
            .map(|p| {
                let length = self.pattern_length(p);
                let targets = p
                    .events
                    .iter()
                    .filter(|e| (0.0..length).contains(&e.beat()))
                    .filter_map(PatternEvent::triggered_pattern)
                    .collect();
                (p.id.as_str(), targets)
            })
            .collect();

        let mut finished: HashSet<&str> = HashSet::new();
        let mut cycles = Vec::new();
        for pattern in &self.patterns {
            let mut path = Vec::new();
            visit(pattern.id.as_str(), &edges, &mut path, &mut finished, &mut cycles);
        }
        cycles
    }
}

fn visit<'a>(
    id: &'a str,
    edges: &HashMap<&'a str, Vec<&'a str>>,
    path: &mut Vec<&'a str>,
    finished: &mut HashSet<&'a str>,
    cycles: &mut Vec<Vec<String>>,
) {
    if finished.contains(id) {
        return;
    }
    if let Some(start) = path.iter().position(|p| *p == id) {
        let mut cycle: Vec<String> = path[start..].iter().map(|p| p.to_string()).collect();
        cycle.push(id.to_string());
        cycles.push(cycle);
        return;
    }

    path.push(id);
    for &target in edges.get(id).into_iter().flatten() {
        visit(target, edges, path, finished, cycles);
    }
    path.pop();
    finished.insert(id);
}

fn duplicates<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            issues.push(ValidationIssue::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
}
