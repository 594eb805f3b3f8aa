use serde::Serialize;

use seq_engine::{AudioBackend, RoutingGraph};
use seq_song::Song;
use seq_transport::{Clock, EventId};

use crate::SequencerError;
use crate::schedule::cancel_all;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
    Paused,
}

impl PlaybackState {
    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

/// Everything owned on behalf of one loaded song: the song itself, its
/// routing graph and the clock callbacks scheduled for it.
///
/// Created by [`PlaybackSession::open`] and torn down by
/// [`PlaybackSession::close`]; nothing outlives it.
pub struct PlaybackSession {
    song: Song,
    graph: RoutingGraph,
    song_length: f64,
    scheduled: Vec<EventId>,
}

impl PlaybackSession {
    /// Checks `song` and builds its routing graph on `backend`.
    pub fn open<B: AudioBackend + ?Sized>(song: Song, backend: &mut B) -> Result<Self, SequencerError> {
        song.check_preconditions()?;
        let graph = RoutingGraph::build(&song, backend)?;
        let song_length = song.length_in_beats();

        tracing::info!(
            title = song.display_title(),
            bpm = song.bpm,
            beats_per_bar = song.beats_per_bar,
            song_length,
            "song loaded"
        );

        Ok(Self {
            song,
            graph,
            song_length,
            scheduled: Vec::new(),
        })
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    /// Song length in beats.
    pub fn song_length(&self) -> f64 {
        self.song_length
    }

    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut RoutingGraph {
        &mut self.graph
    }

    pub fn scheduled(&self) -> &[EventId] {
        &self.scheduled
    }

    /// Records handles to cancel when playback stops.
    pub fn track(&mut self, ids: impl IntoIterator<Item = EventId>) {
        self.scheduled.extend(ids);
    }

    pub fn cancel_scheduled<C: Clock + ?Sized>(&mut self, clock: &mut C) {
        cancel_all(clock, &mut self.scheduled);
    }

    /// Cancels pending callbacks and releases every audio node.
    pub fn close<C, B>(mut self, clock: &mut C, backend: &mut B)
    where
        C: Clock + ?Sized,
        B: AudioBackend + ?Sized,
    {
        self.cancel_scheduled(clock);
        self.graph.dispose(backend);
        tracing::debug!(title = self.song.display_title(), "session closed");
    }
}
