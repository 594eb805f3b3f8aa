mod clock;
mod virtual_clock;

pub use clock::{Callback, Clock, EventId, Status};
pub use virtual_clock::{ClockState, VirtualClock};

/// Beats per bar assumed when a caller has no time signature at hand.
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Sixteenth notes per beat.
pub const SIXTEENTHS_PER_BEAT: f64 = 4.0;

/// A position or duration in the clock's own notation.
///
/// Zero is kept as a distinct sentinel rather than `0:0:0`, so a clock can
/// tell "no duration" apart from a formatted position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TransportTime {
    #[default]
    Zero,
    Position(BarsBeats),
}

/// `bars:beats:sixteenths` notation. Sixteenths may be fractional.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarsBeats {
    pub bars: u32,
    pub beats: u32,
    pub sixteenths: f64,
}

impl TransportTime {
    pub fn is_zero(&self) -> bool {
        matches!(self, TransportTime::Zero)
    }

    /// Total length in beats under the given time signature.
    pub fn to_beats(&self, beats_per_bar: u32) -> f64 {
        match self {
            TransportTime::Zero => 0.0,
            TransportTime::Position(bbs) => {
                bbs.bars as f64 * beats_per_bar as f64
                    + bbs.beats as f64
                    + bbs.sixteenths / SIXTEENTHS_PER_BEAT
            }
        }
    }

    pub fn to_seconds(&self, bpm: f64, beats_per_bar: u32) -> f64 {
        self.to_beats(beats_per_bar) * 60.0 / bpm
    }
}

impl std::fmt::Display for TransportTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportTime::Zero => write!(f, "0"),
            TransportTime::Position(bbs) => {
                write!(f, "{}:{}:{}", bbs.bars, bbs.beats, bbs.sixteenths)
            }
        }
    }
}

/// Converts a beat count into `bars:beats:sixteenths`.
///
/// A duration of exactly zero yields [`TransportTime::Zero`]. Negative or
/// non-finite input is treated as zero.
///
/// ```
/// use seq_transport::{beats_to_time, BarsBeats, TransportTime};
///
/// assert_eq!(
///     beats_to_time(3.5, 4),
///     TransportTime::Position(BarsBeats { bars: 0, beats: 3, sixteenths: 2.0 })
/// );
/// assert_eq!(beats_to_time(0.0, 4), TransportTime::Zero);
/// ```
pub fn beats_to_time(duration_in_beats: f64, beats_per_bar: u32) -> TransportTime {
    if duration_in_beats == 0.0 || !duration_in_beats.is_finite() || duration_in_beats < 0.0 {
        return TransportTime::Zero;
    }

    let beats_per_bar = beats_per_bar.max(1) as f64;
    let whole_bars = (duration_in_beats / beats_per_bar).floor();
    let remaining_beats = duration_in_beats % beats_per_bar;
    let whole_beats = remaining_beats.floor();
    let fractional_beat = remaining_beats - whole_beats;

    TransportTime::Position(BarsBeats {
        bars: whole_bars as u32,
        beats: whole_beats as u32,
        sixteenths: fractional_beat * SIXTEENTHS_PER_BEAT,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbs(bars: u32, beats: u32, sixteenths: f64) -> TransportTime {
        TransportTime::Position(BarsBeats {
            bars,
            beats,
            sixteenths,
        })
    }

    #[test]
    fn test_documented_examples() {
        assert_eq!(beats_to_time(1.0, 4), bbs(0, 1, 0.0));
        assert_eq!(beats_to_time(3.5, 4), bbs(0, 3, 2.0));
        assert_eq!(beats_to_time(0.25, 4), bbs(0, 0, 1.0));
    }

    #[test]
    fn test_zero_is_sentinel_for_any_signature() {
        for beats_per_bar in 1..=12 {
            assert_eq!(beats_to_time(0.0, beats_per_bar), TransportTime::Zero);
        }
        assert_eq!(TransportTime::Zero.to_string(), "0");
    }

    #[test]
    fn test_whole_bars_roll_over() {
        assert_eq!(beats_to_time(4.0, 4), bbs(1, 0, 0.0));
        assert_eq!(beats_to_time(10.0, 4), bbs(2, 2, 0.0));
        assert_eq!(beats_to_time(7.75, 3), bbs(2, 1, 3.0));
    }

    #[test]
    fn test_decomposition_identity() {
        let durations = [0.0, 0.125, 0.25, 0.5, 1.0, 2.75, 3.5, 4.0, 9.375, 17.5, 64.0];
        for beats_per_bar in [2u32, 3, 4, 5, 7] {
            for &d in &durations {
                let time = beats_to_time(d, beats_per_bar);
                assert_eq!(time.to_beats(beats_per_bar), d, "d={d} b={beats_per_bar}");
            }
        }
    }

    #[test]
    fn test_negative_and_nan_are_zero() {
        assert_eq!(beats_to_time(-1.0, 4), TransportTime::Zero);
        assert_eq!(beats_to_time(f64::NAN, 4), TransportTime::Zero);
    }

    #[test]
    fn test_display_matches_clock_notation() {
        assert_eq!(beats_to_time(3.5, 4).to_string(), "0:3:2");
        assert_eq!(beats_to_time(5.25, 4).to_string(), "1:1:1");
    }

    #[test]
    fn test_to_seconds() {
        // 120 bpm: half a second per beat
        let time = beats_to_time(6.0, 4);
        assert!((time.to_seconds(120.0, 4) - 3.0).abs() < 1e-12);
    }
}
