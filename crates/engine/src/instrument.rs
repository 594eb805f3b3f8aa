use std::sync::Arc;

use seq_song::{AdsrEnvelope, Instrument, Note};
use seq_transport::{TransportTime, beats_to_time};

use crate::{
    AudioBackend, EngineError, EnvelopeCurve, EnvelopeSettings, GeneratorParams, NodeId, Voice,
};

/// Converts a beat-based envelope to clock time. Every stage is linear.
pub fn convert_envelope(envelope: &AdsrEnvelope, beats_per_bar: u32) -> EnvelopeSettings {
    let to_time = |beats: Option<f64>| {
        beats.map_or(TransportTime::Zero, |b| beats_to_time(b, beats_per_bar))
    };
    EnvelopeSettings {
        attack: to_time(envelope.a),
        attack_curve: EnvelopeCurve::Linear,
        decay: to_time(envelope.d),
        decay_curve: EnvelopeCurve::Linear,
        sustain: envelope.sustain_level(),
        release: to_time(envelope.r),
        release_curve: EnvelopeCurve::Linear,
    }
}

/// Cheap, thread-safe trigger handle for an instrument. Each trigger goes to
/// every generator of the instrument.
#[derive(Clone)]
pub struct InstrumentHandle {
    voices: Arc<[Arc<dyn Voice>]>,
}

impl InstrumentHandle {
    pub fn trigger(&self, note: &Note, duration: TransportTime, time: f64, velocity: f64) {
        for voice in self.voices.iter() {
            voice.trigger_attack_release(note, duration, time, velocity);
        }
    }

    pub fn trigger_attack(&self, note: &Note, time: f64, velocity: f64) {
        for voice in self.voices.iter() {
            voice.trigger_attack(note, time, velocity);
        }
    }

    /// Release velocity is accepted for symmetry with attack; voices ignore it.
    pub fn trigger_release(&self, note: &Note, time: f64, _velocity: f64) {
        for voice in self.voices.iter() {
            voice.trigger_release(note, time);
        }
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }
}

impl std::fmt::Debug for InstrumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentHandle")
            .field("voices", &self.voices.len())
            .finish()
    }
}

/// The nodes making up one instance of an instrument: its generators, the
/// effects behind each generator, and the gain node summing them.
#[derive(Debug)]
pub struct InstrumentNode {
    pub instrument_id: String,
    pub generators: Vec<NodeId>,
    pub effects: Vec<NodeId>,
    pub output: NodeId,
    handle: InstrumentHandle,
}

impl InstrumentNode {
    pub fn handle(&self) -> InstrumentHandle {
        self.handle.clone()
    }

    /// Releases generators, then effects, then the output.
    pub fn dispose<B: AudioBackend + ?Sized>(&self, backend: &mut B) {
        for &id in self.generators.iter().chain(&self.effects) {
            backend.dispose(id);
        }
        backend.dispose(self.output);
    }
}

/// Builds an instrument instance. The caller connects `output` onward.
///
/// If any node cannot be built, everything created so far is released before
/// the error is returned.
pub fn build_instrument<B: AudioBackend + ?Sized>(
    backend: &mut B,
    instrument: &Instrument,
    beats_per_bar: u32,
) -> Result<InstrumentNode, EngineError> {
    let output = backend.create_gain(1.0)?;
    let mut node = InstrumentNode {
        instrument_id: instrument.id.clone(),
        generators: Vec::new(),
        effects: Vec::new(),
        output,
        handle: InstrumentHandle {
            voices: Arc::from(Vec::new()),
        },
    };

    let mut voices = Vec::with_capacity(instrument.generators.len());
    if let Err(err) = wire_generators(backend, instrument, beats_per_bar, &mut node, &mut voices) {
        node.dispose(backend);
        return Err(err);
    }

    node.handle = InstrumentHandle {
        voices: Arc::from(voices),
    };
    Ok(node)
}

fn wire_generators<B: AudioBackend + ?Sized>(
    backend: &mut B,
    instrument: &Instrument,
    beats_per_bar: u32,
    node: &mut InstrumentNode,
    voices: &mut Vec<Arc<dyn Voice>>,
) -> Result<(), EngineError> {
    for generator in &instrument.generators {
        let params = GeneratorParams::from_generator(generator, beats_per_bar);
        let built = backend.create_generator(&params)?;
        node.generators.push(built.id);
        voices.push(built.voice);

        let mut current = built.id;
        for config in generator.effects() {
            let effect = backend.create_effect(config)?;
            node.effects.push(effect);
            backend.connect(current, effect, 0)?;
            current = effect;
        }
        backend.connect(current, node.output, 0)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecordingBackend;
    use crate::recording::{NodeKind, TriggerKind};
    use seq_song::{EffectConfig, Generator, OscillatorGenerator};

    fn two_generator_instrument() -> Instrument {
        Instrument {
            id: "pad".to_string(),
            generators: vec![
                Generator::Oscillator(OscillatorGenerator {
                    effects: vec![
                        EffectConfig::Chorus(Default::default()),
                        EffectConfig::Reverb(Default::default()),
                    ],
                    ..Default::default()
                }),
                Generator::Oscillator(OscillatorGenerator::default()),
            ],
        }
    }

    #[test]
    fn test_convert_envelope_uses_time_signature() {
        let envelope = AdsrEnvelope {
            a: Some(1.5),
            d: None,
            s: Some(0.3),
            r: Some(4.0),
        };
        let converted = convert_envelope(&envelope, 3);
        assert_eq!(converted.attack, beats_to_time(1.5, 3));
        assert_eq!(converted.decay, TransportTime::Zero);
        assert_eq!(converted.sustain, 0.3);
        assert_eq!(converted.release.to_string(), "1:1:0");
        assert_eq!(converted.release_curve, EnvelopeCurve::Linear);
    }

    #[test]
    fn test_convert_envelope_sustain_falls_back_to_attack() {
        let envelope = AdsrEnvelope {
            a: Some(0.1),
            ..Default::default()
        };
        assert_eq!(convert_envelope(&envelope, 4).sustain, 0.1);
        assert_eq!(convert_envelope(&AdsrEnvelope::default(), 4).sustain, 1.0);
    }

    #[test]
    fn test_generators_chain_through_effects_into_output() {
        let mut backend = RecordingBackend::new();
        let node = build_instrument(&mut backend, &two_generator_instrument(), 4).expect("build");

        assert_eq!(node.generators.len(), 2);
        assert_eq!(node.effects.len(), 2);
        assert_eq!(backend.kind(node.output), Some(NodeKind::Gain(1.0)));

        let (chorus, reverb) = (node.effects[0], node.effects[1]);
        assert!(backend.is_connected(node.generators[0], chorus));
        assert!(backend.is_connected(chorus, reverb));
        assert!(backend.is_connected(reverb, node.output));
        assert!(backend.is_connected(node.generators[1], node.output));
        assert!(!backend.is_connected(node.generators[0], node.output));
    }

    #[test]
    fn test_trigger_fans_out_to_every_generator() {
        let mut backend = RecordingBackend::new();
        let node = build_instrument(&mut backend, &two_generator_instrument(), 4).expect("build");
        let handle = node.handle();
        let note = Note::Name("C4".to_string());

        handle.trigger(&note, beats_to_time(0.5, 4), 1.25, 0.8);
        handle.trigger_attack(&note, 2.0, 0.6);
        handle.trigger_release(&note, 3.0, 0.5);

        let triggers = backend.triggers();
        assert_eq!(triggers.len(), 6);
        assert_eq!(handle.voice_count(), 2);
        let attack_release: Vec<_> = triggers
            .iter()
            .filter(|t| t.kind == TriggerKind::AttackRelease)
            .map(|t| t.generator)
            .collect();
        assert_eq!(attack_release, node.generators);
        assert!(triggers.iter().all(|t| t.note == note));
    }

    #[test]
    fn test_dispose_releases_every_node_once() {
        let mut backend = RecordingBackend::new();
        let node = build_instrument(&mut backend, &two_generator_instrument(), 4).expect("build");
        node.dispose(&mut backend);

        for id in node.generators.iter().chain(&node.effects) {
            assert_eq!(backend.dispose_count(*id), 1);
        }
        assert_eq!(backend.dispose_count(node.output), 1);
        assert!(backend.live_nodes().is_empty());
    }

    #[test]
    fn test_failed_build_releases_partial_instrument() {
        let mut backend = RecordingBackend::new().refusing_effect("reverb");
        let err = build_instrument(&mut backend, &two_generator_instrument(), 4)
            .expect_err("reverb refused");

        assert!(matches!(err, EngineError::UnsupportedEffect("reverb")));
        assert!(backend.live_nodes().is_empty());
        assert!(backend.over_disposed().is_empty());
    }
}
