use serde::{Deserialize, Serialize};
use std::fmt;

/// A pitch given either as a frequency in Hz or a note name such as `"C4"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Note {
    Frequency(f64),
    Name(String),
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Note::Frequency(hz) => write!(f, "{hz}"),
            Note::Name(name) => f.write_str(name),
        }
    }
}

/// An event inside a pattern. Every `beat` is relative to the start of the
/// containing pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PatternEvent {
    NoteOn(NoteEvent),
    NoteOff(NoteEvent),
    /// Starts a nested pattern at this beat. It plays for its own length.
    PatternOn(PatternTrigger),
    /// Reserved for explicit termination of a nested pattern; never emitted
    /// by the scheduler.
    PatternOff(PatternTrigger),
    /// Legacy note with an inline duration. Replaced by a NoteOn/NoteOff
    /// pair on migration.
    InstrumentOn(InstrumentOnEvent),
    /// Legacy spelling of [`PatternEvent::PatternOn`].
    StartPattern(PatternTrigger),
}

impl PatternEvent {
    pub fn beat(&self) -> f64 {
        match self {
            PatternEvent::NoteOn(e) | PatternEvent::NoteOff(e) => e.beat,
            PatternEvent::PatternOn(e)
            | PatternEvent::PatternOff(e)
            | PatternEvent::StartPattern(e) => e.beat,
            PatternEvent::InstrumentOn(e) => e.beat,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(
            self,
            PatternEvent::InstrumentOn(_) | PatternEvent::StartPattern(_)
        )
    }

    /// The pattern a trigger event starts, if this is one.
    pub fn triggered_pattern(&self) -> Option<&str> {
        match self {
            PatternEvent::PatternOn(e) | PatternEvent::StartPattern(e) => Some(&e.pattern_id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    pub beat: f64,
    pub channel_id: String,
    pub instrument_id: String,
    pub note: Note,
    /// 0 to 1
    pub velocity: f64,
}

impl NoteEvent {
    /// Whether `other` addresses the same voice: channel, instrument and note.
    pub fn same_voice(&self, other: &NoteEvent) -> bool {
        self.channel_id == other.channel_id
            && self.instrument_id == other.instrument_id
            && self.note == other.note
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternTrigger {
    pub beat: f64,
    pub pattern_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentOnEvent {
    pub beat: f64,
    pub channel_id: String,
    /// Note length in beats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub instrument_id: String,
    pub note: Note,
    pub velocity: f64,
}
