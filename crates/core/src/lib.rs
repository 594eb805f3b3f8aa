//! Playback of declarative songs: pattern expansion, scheduling against a
//! clock, and the transport state machine driving both.

pub mod expand;
pub mod schedule;
pub mod sequencer;
pub mod session;
pub mod time;
pub mod timeline;

pub use expand::{
    ExpandedNote, Expansion, FALLBACK_NOTE_DURATION, MAX_NESTING_DEPTH, PatternPlacement,
    expand_pattern, expand_song,
};
pub use schedule::{cancel_all, schedule_notes};
pub use sequencer::{Sequencer, SequencerState};
pub use session::{PlaybackSession, PlaybackState};
pub use time::{MusicalPosition, PPQN, TimeContext};
pub use timeline::{
    ChannelLane, MASTER_LANE, TimelineEvent, TimelineEventKind, flatten_timeline,
    group_by_channel,
};

pub use seq_engine::{AudioBackend, EngineError, RecordingBackend};
pub use seq_song::{Song, SongError};
pub use seq_transport::{Clock, Status, VirtualClock};

#[derive(Debug, thiserror::Error)]
pub enum SequencerError {
    #[error(transparent)]
    Song(#[from] SongError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
