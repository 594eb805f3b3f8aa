//! A clock that only moves when told to.
//!
//! `VirtualClock` implements [`Clock`] without any audio device: time advances
//! through [`VirtualClock::advance`], which fires every callback whose position
//! is crossed. Used for tests and dry-run simulation.

use std::collections::BTreeMap;

use crate::{Callback, Clock, DEFAULT_BEATS_PER_BAR, EventId, TransportTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Started,
    Paused,
}

struct ScheduledCallback {
    beat: f64,
    callback: Callback,
}

pub struct VirtualClock {
    bpm: f64,
    beats_per_bar: u32,
    state: ClockState,
    /// Transport position in (fractional) beats
    position: f64,
    /// Monotonic context time in seconds
    context_time: f64,
    loop_end: Option<f64>,
    events: BTreeMap<EventId, ScheduledCallback>,
    next_id: u64,
}

impl VirtualClock {
    pub fn new(bpm: f64, beats_per_bar: u32) -> Self {
        Self {
            bpm,
            beats_per_bar,
            state: ClockState::Stopped,
            position: 0.0,
            context_time: 0.0,
            loop_end: None,
            events: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn position_beats(&self) -> f64 {
        self.position
    }

    pub fn loop_end_beats(&self) -> Option<f64> {
        self.loop_end
    }

    /// Number of callbacks still registered.
    pub fn scheduled_count(&self) -> usize {
        self.events.len()
    }

    /// Scheduled positions in beats, in firing order.
    pub fn scheduled_beats(&self) -> Vec<f64> {
        let mut beats: Vec<f64> = self.events.values().map(|e| e.beat).collect();
        beats.sort_by(f64::total_cmp);
        beats
    }

    /// Move time forward by `seconds` and fire everything crossed on the way.
    ///
    /// Events fire in the half-open window `[position, position + delta)`.
    /// Returns the number of callbacks invoked. While not started only the
    /// context time moves.
    pub fn advance(&mut self, seconds: f64) -> usize {
        if seconds <= 0.0 {
            return 0;
        }
        if self.state != ClockState::Started {
            self.context_time += seconds;
            return 0;
        }

        let seconds_per_beat = 60.0 / self.bpm;
        let mut remaining = seconds / seconds_per_beat;
        let mut fired = 0;

        loop {
            let loop_end = self.loop_end.filter(|&end| end > 0.0 && self.position < end);
            let window_end = match loop_end {
                Some(end) => (self.position + remaining).min(end),
                None => self.position + remaining,
            };

            fired += self.fire_between(self.position, window_end);

            let covered = window_end - self.position;
            remaining -= covered;
            self.context_time += covered * seconds_per_beat;
            self.position = window_end;

            match loop_end {
                Some(end) if self.position >= end => {
                    tracing::trace!(end, "virtual clock wrapped");
                    self.position = 0.0;
                    if remaining <= 0.0 {
                        break;
                    }
                }
                _ => break,
            }
        }

        fired
    }

    fn fire_between(&mut self, from: f64, to: f64) -> usize {
        let mut due: Vec<(f64, EventId)> = self
            .events
            .iter()
            .filter(|(_, e)| e.beat >= from && e.beat < to)
            .map(|(id, e)| (e.beat, *id))
            .collect();
        due.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        let seconds_per_beat = 60.0 / self.bpm;
        for (beat, id) in &due {
            let time = self.context_time + (beat - from) * seconds_per_beat;
            if let Some(event) = self.events.get_mut(id) {
                (event.callback)(time);
            }
        }
        due.len()
    }

    fn resolve(&self, time: TransportTime) -> f64 {
        time.to_beats(self.beats_per_bar)
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new(120.0, DEFAULT_BEATS_PER_BAR)
    }
}

impl std::fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualClock")
            .field("bpm", &self.bpm)
            .field("beats_per_bar", &self.beats_per_bar)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("loop_end", &self.loop_end)
            .field("scheduled", &self.events.len())
            .finish()
    }
}

impl Clock for VirtualClock {
    fn set_tempo(&mut self, bpm: f64, beats_per_bar: u32) {
        self.bpm = bpm;
        self.beats_per_bar = beats_per_bar;
    }

    fn schedule(&mut self, at: TransportTime, callback: Callback) -> EventId {
        let id = EventId(self.next_id);
        self.next_id += 1;
        let beat = self.resolve(at);
        self.events.insert(id, ScheduledCallback { beat, callback });
        id
    }

    fn cancel(&mut self, id: EventId) {
        self.events.remove(&id);
    }

    fn set_loop(&mut self, enabled: bool, end: TransportTime) {
        self.loop_end = enabled.then(|| self.resolve(end));
    }

    fn seek(&mut self, position: TransportTime) {
        self.position = self.resolve(position);
    }

    fn start(&mut self) {
        self.state = ClockState::Started;
    }

    fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.position = 0.0;
    }

    fn pause(&mut self) {
        if self.state == ClockState::Started {
            self.state = ClockState::Paused;
        }
    }

    fn elapsed_seconds(&self) -> f64 {
        self.position * 60.0 / self.bpm
    }

    fn now(&self) -> f64 {
        self.context_time
    }
}
