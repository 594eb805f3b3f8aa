//! The transport state machine.
//!
//! A [`Sequencer`] owns the clock, the audio backend and at most one
//! [`PlaybackSession`]. All transitions happen on the caller's thread; the
//! only thing crossing over from clock callbacks is the end-of-song
//! [`Status`], which travels through a ring buffer drained by
//! [`Sequencer::poll`].

use rtrb::{Consumer, RingBuffer};
use serde::Serialize;

use seq_engine::AudioBackend;
use seq_song::Song;
use seq_transport::{Clock, EventId, Status, TransportTime, beats_to_time};

use crate::expand::expand_song;
use crate::schedule::schedule_notes;
use crate::session::{PlaybackSession, PlaybackState};
use crate::time::{MusicalPosition, TimeContext};
use crate::SequencerError;

const STATUS_CAPACITY: usize = 8;

/// Read-only view of the transport for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SequencerState {
    pub state: PlaybackState,
    pub current_beat: f64,
    pub song_length: f64,
    pub is_looping: bool,
    /// Beat playback last started or resumed from
    pub position_at_start: f64,
    /// Clock context time when playback last started or resumed
    pub time_at_start: f64,
}

pub struct Sequencer<C: Clock, B: AudioBackend> {
    clock: C,
    backend: B,
    session: Option<PlaybackSession>,
    state: PlaybackState,
    is_looping: bool,
    current_beat: f64,
    position_at_start: f64,
    time_at_start: f64,
    status: Option<Consumer<Status>>,
    /// One-shot end-of-song callback of a non-looping run
    end_event: Option<EventId>,
}

impl<C: Clock, B: AudioBackend> Sequencer<C, B> {
    pub fn new(clock: C, backend: B) -> Self {
        Self {
            clock,
            backend,
            session: None,
            state: PlaybackState::Stopped,
            is_looping: false,
            current_beat: 0.0,
            position_at_start: 0.0,
            time_at_start: 0.0,
            status: None,
            end_event: None,
        }
    }

    /// Replaces the current song. The previous session is torn down first,
    /// even if `song` turns out to be invalid.
    pub fn load_song(&mut self, song: Song) -> Result<(), SequencerError> {
        self.cleanup();

        let session = PlaybackSession::open(song, &mut self.backend)?;
        let song = session.song();
        self.clock.set_tempo(song.bpm, song.beats_per_bar);
        self.is_looping = song.looping;
        self.session = Some(session);
        Ok(())
    }

    /// Plays from the top. Does nothing while already playing or before a
    /// song is loaded.
    pub fn start(&mut self) {
        if self.state.is_playing() {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            tracing::warn!("start requested with no song loaded");
            return;
        };

        let beats_per_bar = session.song().beats_per_bar;
        self.clock.stop();
        self.clock.seek(TransportTime::Zero);
        session.cancel_scheduled(&mut self.clock);
        self.end_event = None;

        self.arm_end();
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let notes = expand_song(session.song()).notes;
        let ids = schedule_notes(
            &notes,
            beats_per_bar,
            &mut self.clock,
            session.graph_mut(),
            &mut self.backend,
        );
        session.track(ids);

        self.state = PlaybackState::Playing;
        self.current_beat = 0.0;
        self.position_at_start = 0.0;
        self.time_at_start = self.clock.now();
        self.clock.start();

        tracing::info!(
            song_length = session.song_length(),
            looping = self.is_looping,
            "playback started"
        );
    }

    /// Arms the song-length bound for the current looping flag: the clock's
    /// loop when looping, otherwise a one-shot callback reporting
    /// [`Status::Ended`]. Replaces whatever was armed before.
    fn arm_end(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Some(id) = self.end_event.take() {
            self.clock.cancel(id);
        }
        self.status = None;

        let end = beats_to_time(session.song_length(), session.song().beats_per_bar);
        if self.is_looping {
            self.clock.set_loop(true, end);
            return;
        }

        self.clock.set_loop(false, end);
        let (mut producer, consumer) = RingBuffer::new(STATUS_CAPACITY);
        let id = self.clock.schedule(
            end,
            Box::new(move |time| {
                if producer.push(Status::Ended { time }).is_err() {
                    tracing::warn!("status ring full, dropping end of song");
                }
            }),
        );
        session.track([id]);
        self.end_event = Some(id);
        self.status = Some(consumer);
    }

    /// Halts, rewinds and cancels everything scheduled.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Stopped {
            return;
        }

        self.clock.stop();
        if let Some(session) = self.session.as_mut() {
            session.cancel_scheduled(&mut self.clock);
        }
        self.end_event = None;
        self.status = None;
        self.state = PlaybackState::Stopped;
        self.current_beat = 0.0;

        tracing::info!("playback stopped");
    }

    /// Halts without rewinding. Scheduled notes stay armed for [`resume`].
    ///
    /// [`resume`]: Sequencer::resume
    pub fn pause(&mut self) {
        if !self.state.is_playing() {
            return;
        }
        self.current_beat = self.current_position();
        self.clock.pause();
        self.state = PlaybackState::Paused;

        tracing::info!(beat = self.current_beat, "playback paused");
    }

    /// Continues a paused playback from where it halted.
    pub fn resume(&mut self) {
        if self.state != PlaybackState::Paused {
            return;
        }
        self.position_at_start = self.current_beat;
        self.time_at_start = self.clock.now();
        self.state = PlaybackState::Playing;
        self.clock.start();

        tracing::info!(beat = self.current_beat, "playback resumed");
    }

    /// Toggles looping. While playing, playback restarts to re-arm the loop
    /// bound; while paused, the bound is re-armed in place so [`resume`]
    /// continues under the new setting.
    ///
    /// [`resume`]: Sequencer::resume
    pub fn set_looping(&mut self, looping: bool) {
        self.is_looping = looping;
        match self.state {
            PlaybackState::Playing => {
                self.stop();
                self.start();
            }
            PlaybackState::Paused => self.arm_end(),
            PlaybackState::Stopped => {}
        }
    }

    /// Stops and releases the loaded song and all of its audio nodes. Safe to
    /// call any number of times.
    pub fn cleanup(&mut self) {
        self.stop();
        if let Some(session) = self.session.take() {
            session.close(&mut self.clock, &mut self.backend);
        }
        self.clock.set_loop(false, TransportTime::Zero);
        self.state = PlaybackState::Stopped;
        self.current_beat = 0.0;
        self.position_at_start = 0.0;
        self.time_at_start = 0.0;
        self.status = None;
        self.end_event = None;
    }

    /// Handles messages from clock callbacks, stopping at the end of the
    /// song. Returns the last status seen.
    pub fn poll(&mut self) -> Option<Status> {
        let consumer = self.status.as_mut()?;
        let mut last = None;
        while let Ok(status) = consumer.pop() {
            last = Some(status);
        }

        if let Some(Status::Ended { time }) = last {
            tracing::info!(time, "end of song reached");
            self.stop();
        } else if self.state.is_playing() {
            self.current_beat = self.current_position();
        }
        last
    }

    /// Transport position in beats, read from the clock.
    pub fn current_position(&self) -> f64 {
        match (&self.session, self.state) {
            (None, _) | (_, PlaybackState::Stopped) => 0.0,
            (Some(session), _) => {
                let song = session.song();
                TimeContext::new(song.bpm, song.beats_per_bar)
                    .seconds_to_beats(self.clock.elapsed_seconds())
            }
        }
    }

    pub fn musical_position(&self) -> MusicalPosition {
        self.time_context().format_position(self.current_position())
    }

    pub fn time_context(&self) -> TimeContext {
        self.session.as_ref().map_or_else(TimeContext::default, |s| {
            TimeContext::new(s.song().bpm, s.song().beats_per_bar)
        })
    }

    pub fn snapshot(&self) -> SequencerState {
        SequencerState {
            state: self.state,
            current_beat: self.current_position(),
            song_length: self.song_length(),
            is_looping: self.is_looping,
            position_at_start: self.position_at_start,
            time_at_start: self.time_at_start,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    /// Song length in beats, 0 with nothing loaded.
    pub fn song_length(&self) -> f64 {
        self.session.as_ref().map_or(0.0, |s| s.song_length())
    }

    pub fn song(&self) -> Option<&Song> {
        self.session.as_ref().map(|s| s.song())
    }

    pub fn session(&self) -> Option<&PlaybackSession> {
        self.session.as_ref()
    }

    /// Number of clock callbacks armed for the current run.
    pub fn scheduled_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.scheduled().len())
    }

    /// Left master level in decibels.
    pub fn left_level(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(f64::NEG_INFINITY, |s| s.graph().left_level())
    }

    pub fn right_level(&self) -> f64 {
        self.session
            .as_ref()
            .map_or(f64::NEG_INFINITY, |s| s.graph().right_level())
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

impl<C: Clock, B: AudioBackend> Drop for Sequencer<C, B> {
    fn drop(&mut self) {
        self.cleanup();
    }
}
