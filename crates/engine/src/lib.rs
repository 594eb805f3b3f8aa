//! Audio routing for a loaded song.
//!
//! Synthesis itself lives behind [`AudioBackend`]: this crate decides which
//! nodes exist and how they are wired (generators through their effects into
//! an instrument output, instruments into channels, channels through their
//! effects into the master bus) and makes sure each node is released once.

mod backend;
mod graph;
mod instrument;
pub mod recording;

pub use backend::{
    AudioBackend, ChannelOptions, EnvelopeCurve, EnvelopeSettings, GeneratorNode,
    GeneratorParams, LevelMeter, MeterNode, Voice,
};
pub use graph::{MASTER_CHANNEL_ID, RoutingGraph};
pub use instrument::{InstrumentHandle, InstrumentNode, build_instrument, convert_envelope};
pub use recording::RecordingBackend;

/// Identifies a node created by an [`AudioBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("backend cannot build effect '{0}'")]
    UnsupportedEffect(&'static str),

    #[error("backend cannot build generator of type '{0}'")]
    UnsupportedGenerator(&'static str),

    #[error("master channel must be created before channels")]
    NoMasterChannel,

    #[error("node {0} has already been disposed")]
    Disposed(NodeId),
}
