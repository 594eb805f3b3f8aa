mod effect;
mod event;
mod instrument;
mod load;
mod migrate;
mod save;
mod validate;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use effect::*;
pub use event::{InstrumentOnEvent, Note, NoteEvent, PatternEvent, PatternTrigger};
pub use instrument::{
    AdsrEnvelope, FilterOptions, Generator, Instrument, OscillatorGenerator, OscillatorOptions,
};
pub use load::{load_song, migrate_song_file, migrate_songs_dir, parse_song};
pub use migrate::{
    DEFAULT_LEGACY_DURATION, DEFAULT_NOTE_OFF_VELOCITY, migrate, migrate_pattern, needs_migration,
};
pub use save::{save_song, save_song_binary};
pub use validate::ValidationIssue;

/// A complete song: instruments and channels, the patterns that use them and
/// the sequence placing those patterns on the timeline.
///
/// Song data is never mutated during playback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Tempo in beats per minute.
    pub bpm: f64,
    /// Beats in each bar; 3 gives 3/4 time.
    pub beats_per_bar: u32,
    #[serde(default, rename = "loop")]
    pub looping: bool,
    #[serde(default)]
    pub master_channel: ChannelSettings,
    #[serde(default)]
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub patterns: Vec<Pattern>,
    #[serde(default)]
    pub sequence: Vec<SequenceEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Mixer settings shared by the master bus and regular channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSettings {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectConfig>,
    /// -1 (full left) to 1 (full right)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pan: Option<f64>,
    /// Decibels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(flatten)]
    pub settings: ChannelSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    /// Length in bars. Can be fractional.
    pub bars: f64,
    #[serde(default)]
    pub events: Vec<PatternEvent>,
}

impl Pattern {
    pub fn length_in_beats(&self, beats_per_bar: u32) -> f64 {
        self.bars * beats_per_bar as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceEntry {
    pub pattern_id: String,
    /// Song beat at which the pattern starts. Can be fractional.
    pub beat: f64,
}

impl Song {
    pub fn pattern(&self, id: &str) -> Option<&Pattern> {
        self.patterns.iter().find(|p| p.id == id)
    }

    pub fn instrument(&self, id: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }

    pub fn channel(&self, id: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.id == id)
    }

    /// Length of `pattern` in beats under this song's time signature.
    pub fn pattern_length(&self, pattern: &Pattern) -> f64 {
        pattern.length_in_beats(self.beats_per_bar)
    }

    /// The beat at which the last sequenced pattern ends; 0 for an empty
    /// sequence. Entries naming unknown patterns are skipped.
    pub fn length_in_beats(&self) -> f64 {
        let mut max_beat = 0.0f64;
        for entry in &self.sequence {
            let Some(pattern) = self.pattern(&entry.pattern_id) else {
                tracing::warn!(pattern_id = %entry.pattern_id, "pattern not found in song");
                continue;
            };
            max_beat = max_beat.max(entry.beat + self.pattern_length(pattern));
        }
        max_beat
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("Untitled")
    }

    /// Shape checks that make a song unplayable. Failing any of these aborts
    /// loading.
    pub fn check_preconditions(&self) -> Result<(), SongError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(SongError::InvalidTempo(self.bpm));
        }
        if self.beats_per_bar == 0 {
            return Err(SongError::InvalidBeatsPerBar);
        }
        for pattern in &self.patterns {
            if !(pattern.bars.is_finite() && pattern.bars > 0.0) {
                return Err(SongError::InvalidPatternLength {
                    pattern_id: pattern.id.clone(),
                    bars: pattern.bars,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SongError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] rmp_serde::encode::Error),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] rmp_serde::decode::Error),

    #[error("tempo must be a positive number of beats per minute, got {0}")]
    InvalidTempo(f64),

    #[error("beats per bar must be at least 1")]
    InvalidBeatsPerBar,

    #[error("pattern '{pattern_id}' has invalid length of {bars} bars")]
    InvalidPatternLength { pattern_id: String, bars: f64 },

    #[error("failed to migrate '{path}': {source}")]
    Migrate {
        path: PathBuf,
        source: Box<SongError>,
    },
}


#[cfg(test)]
mod tests {
    use super::test_fixture::*;
    use super::*;

    #[test]
    fn test_song_length_empty_sequence() {
        let song = song(vec![pattern("A", 2.0, vec![])], vec![]);
        assert_eq!(song.length_in_beats(), 0.0);
    }

    #[test]
    fn test_song_length_single_entry() {
        let song = song(vec![pattern("A", 2.0, vec![])], vec![entry("A", 2.0)]);
        assert_eq!(song.length_in_beats(), 10.0);
    }

    #[test]
    fn test_song_length_takes_latest_end() {
        let song = song(
            vec![pattern("A", 2.0, vec![]), pattern("B", 0.5, vec![])],
            vec![entry("A", 0.0), entry("B", 12.0), entry("A", 4.0)],
        );
        assert_eq!(song.length_in_beats(), 14.0);
    }

    #[test]
    fn test_song_length_skips_unknown_patterns() {
        let song = song(
            vec![pattern("A", 1.0, vec![])],
            vec![entry("A", 0.0), entry("missing", 100.0)],
        );
        assert_eq!(song.length_in_beats(), 4.0);
    }

    #[test]
    fn test_deserialize_song_document() {
        let json = r#"{
            "title": "Simple Melody",
            "bpm": 120,
            "beatsPerBar": 4,
            "loop": true,
            "masterChannel": { "volume": -6, "effects": [{ "name": "reverb", "decay": 2.5 }] },
            "channels": [{ "id": "lead", "pan": -0.5 }],
            "instruments": [{
                "id": "sine",
                "generators": [{
                    "type": "oscillator",
                    "oscillator": { "type": "sine" },
                    "envelope": { "a": 0.1, "r": 0.5 }
                }]
            }],
            "patterns": [{
                "id": "p1",
                "bars": 1,
                "events": [
                    { "type": "NoteOn", "beat": 0, "channelId": "lead", "instrumentId": "sine", "note": "C4", "velocity": 0.8 },
                    { "type": "NoteOff", "beat": 0.5, "channelId": "lead", "instrumentId": "sine", "note": 261.63, "velocity": 0.5 }
                ]
            }],
            "sequence": [{ "patternId": "p1", "beat": 0 }]
        }"#;

        let song: Song = serde_json::from_str(json).expect("deserialize");
        assert_eq!(song.display_title(), "Simple Melody");
        assert!(song.looping);
        assert_eq!(song.master_channel.volume, Some(-6.0));
        assert_eq!(song.master_channel.effects[0].name(), "reverb");
        assert_eq!(song.channels[0].settings.pan, Some(-0.5));
        assert_eq!(song.patterns[0].events.len(), 2);
        assert_eq!(song.length_in_beats(), 4.0);

        match &song.patterns[0].events[1] {
            PatternEvent::NoteOff(off) => assert_eq!(off.note, Note::Frequency(261.63)),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_unknown_effect_name_is_rejected() {
        let json = r#"{ "bpm": 100, "beatsPerBar": 4,
            "masterChannel": { "effects": [{ "name": "flanger" }] } }"#;
        let err = serde_json::from_str::<Song>(json).expect_err("unknown effect");
        assert!(err.to_string().contains("flanger"));
    }

    #[test]
    fn test_unknown_generator_type_is_rejected() {
        let json = r#"{ "bpm": 100, "beatsPerBar": 4,
            "instruments": [{ "id": "x", "generators": [{ "type": "sampler" }] }] }"#;
        assert!(serde_json::from_str::<Song>(json).is_err());
    }

    #[test]
    fn test_check_preconditions() {
        let mut s = song(vec![pattern("A", 1.0, vec![])], vec![]);
        assert!(s.check_preconditions().is_ok());

        s.bpm = 0.0;
        assert!(matches!(s.check_preconditions(), Err(SongError::InvalidTempo(_))));

        s.bpm = 90.0;
        s.beats_per_bar = 0;
        assert!(matches!(s.check_preconditions(), Err(SongError::InvalidBeatsPerBar)));

        s.beats_per_bar = 3;
        s.patterns[0].bars = -1.0;
        assert!(matches!(
            s.check_preconditions(),
            Err(SongError::InvalidPatternLength { .. })
        ));
    }

    #[test]
    fn test_untitled_song() {
        let mut s = song(vec![], vec![]);
        s.title = None;
        assert_eq!(s.display_title(), "Untitled");
    }
}
