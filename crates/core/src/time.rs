use seq_transport::DEFAULT_BEATS_PER_BAR;

/// Ticks per beat used for displaying sub-beat positions.
pub const PPQN: u32 = 960;

/// Tempo and meter of a song, for converting between beats, bars and
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeContext {
    pub bpm: f64,
    pub beats_per_bar: u32,
}

impl TimeContext {
    pub fn new(bpm: f64, beats_per_bar: u32) -> Self {
        Self { bpm, beats_per_bar }
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * 60.0 / self.bpm
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds * self.bpm / 60.0
    }

    pub fn beats_to_bars(&self, beats: f64) -> f64 {
        beats / self.beats_per_bar as f64
    }

    pub fn bars_to_beats(&self, bars: f64) -> f64 {
        bars * self.beats_per_bar as f64
    }

    /// One-based bar and beat of an absolute beat position.
    pub fn format_position(&self, beats: f64) -> MusicalPosition {
        let beats = beats.max(0.0);
        let beats_per_bar = self.beats_per_bar.max(1) as f64;

        let bar = (beats / beats_per_bar).floor() as u32 + 1;
        let beat_in_bar = (beats % beats_per_bar).floor() as u32 + 1;
        let tick_in_beat = (beats.fract() * PPQN as f64).round() as u32;

        MusicalPosition {
            bar,
            beat: beat_in_bar,
            tick: tick_in_beat.min(PPQN - 1),
        }
    }
}

impl Default for TimeContext {
    fn default() -> Self {
        Self::new(120.0, DEFAULT_BEATS_PER_BAR)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MusicalPosition {
    pub bar: u32,
    pub beat: u32,
    pub tick: u32,
}

impl std::fmt::Display for MusicalPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{:03}", self.bar, self.beat, self.tick)
    }
}
