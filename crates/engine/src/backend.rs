use std::sync::Arc;

use seq_song::{ChannelSettings, EffectConfig, Generator, Note, OscillatorGenerator};
use seq_transport::TransportTime;

use crate::instrument::convert_envelope;
use crate::{EngineError, NodeId};

/// Something that can play notes. Triggers come from clock callbacks, which
/// may run on the clock's own thread.
pub trait Voice: Send + Sync {
    fn trigger_attack_release(&self, note: &Note, duration: TransportTime, time: f64, velocity: f64);

    fn trigger_attack(&self, note: &Note, time: f64, velocity: f64);

    fn trigger_release(&self, note: &Note, time: f64);
}

/// Reads the signal level at a metering tap.
pub trait LevelMeter: Send + Sync {
    /// Current level in decibels, `f64::NEG_INFINITY` for silence.
    fn level(&self) -> f64;
}

#[derive(Clone)]
pub struct GeneratorNode {
    pub id: NodeId,
    pub voice: Arc<dyn Voice>,
}

impl std::fmt::Debug for GeneratorNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorNode").field("id", &self.id).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct MeterNode {
    pub id: NodeId,
    pub meter: Arc<dyn LevelMeter>,
}

/// Creates, connects and releases audio nodes.
///
/// Every method runs on the control thread. Nodes handed out stay valid until
/// passed to [`AudioBackend::dispose`].
pub trait AudioBackend {
    /// The device output. Never disposed.
    fn destination(&self) -> NodeId;

    fn create_channel(&mut self, options: &ChannelOptions) -> Result<NodeId, EngineError>;

    fn create_gain(&mut self, gain: f64) -> Result<NodeId, EngineError>;

    fn create_generator(&mut self, params: &GeneratorParams) -> Result<GeneratorNode, EngineError>;

    fn create_effect(&mut self, config: &EffectConfig) -> Result<NodeId, EngineError>;

    /// A node splitting a stereo signal into two mono outputs, left on
    /// output 0 and right on output 1.
    fn create_splitter(&mut self) -> Result<NodeId, EngineError>;

    fn create_meter(&mut self) -> Result<MeterNode, EngineError>;

    /// Connect output `output` of `from` to the input of `to`.
    fn connect(&mut self, from: NodeId, to: NodeId, output: usize) -> Result<(), EngineError>;

    fn dispose(&mut self, node: NodeId);
}

/// Mixer strip settings for a channel node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelOptions {
    pub channel_count: u32,
    pub pan: f64,
    /// Decibels
    pub volume: f64,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            channel_count: 2,
            pan: 0.0,
            volume: 0.0,
        }
    }
}

impl From<&ChannelSettings> for ChannelOptions {
    fn from(settings: &ChannelSettings) -> Self {
        let defaults = Self::default();
        Self {
            pan: settings.pan.unwrap_or(defaults.pan),
            volume: settings.volume.unwrap_or(defaults.volume),
            ..defaults
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnvelopeCurve {
    #[default]
    Linear,
}

/// An ADSR envelope in clock time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnvelopeSettings {
    pub attack: TransportTime,
    pub attack_curve: EnvelopeCurve,
    pub decay: TransportTime,
    pub decay_curve: EnvelopeCurve,
    /// 0 to 1
    pub sustain: f64,
    pub release: TransportTime,
    pub release_curve: EnvelopeCurve,
}

/// What a backend needs to build one generator. Envelopes are already
/// converted from beats; the embedded settings carry no envelopes or
/// effects.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorParams {
    Oscillator {
        settings: OscillatorGenerator,
        envelope: Option<EnvelopeSettings>,
        filter_envelope: Option<EnvelopeSettings>,
    },
}

impl GeneratorParams {
    pub fn from_generator(generator: &Generator, beats_per_bar: u32) -> Self {
        match generator {
            Generator::Oscillator(osc) => GeneratorParams::Oscillator {
                settings: OscillatorGenerator {
                    envelope: None,
                    filter_envelope: None,
                    effects: Vec::new(),
                    ..osc.clone()
                },
                envelope: osc.envelope.map(|e| convert_envelope(&e, beats_per_bar)),
                filter_envelope: osc
                    .filter_envelope
                    .map(|e| convert_envelope(&e, beats_per_bar)),
            },
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            GeneratorParams::Oscillator { .. } => "oscillator",
        }
    }
}
