use serde::{Deserialize, Serialize};

use crate::EffectConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub generators: Vec<Generator>,
}

/// One sound-producing unit of an instrument, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Generator {
    Oscillator(OscillatorGenerator),
}

impl Generator {
    pub fn kind(&self) -> &'static str {
        match self {
            Generator::Oscillator(_) => "oscillator",
        }
    }

    pub fn effects(&self) -> &[EffectConfig] {
        match self {
            Generator::Oscillator(osc) => &osc.effects,
        }
    }
}

/// Mono synth voice settings. Envelopes are expressed in beats.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OscillatorGenerator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oscillator: Option<OscillatorOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterOptions>,
    /// Cents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detune: Option<f64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portamento: Option<f64>,
    /// Decibels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<AdsrEnvelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_envelope: Option<AdsrEnvelope>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<EffectConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OscillatorOptions {
    /// Waveform name, e.g. `sine`, `square`, `fatsawtooth`
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(default, rename = "Q", skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolloff: Option<i32>,
}

/// ADSR envelope with attack, decay and release in beats and sustain as a
/// 0-1 level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsrEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
}

impl AdsrEnvelope {
    /// Sustain level. Without an explicit `s`, existing song files expect the
    /// attack value to be reused, then full level.
    pub fn sustain_level(&self) -> f64 {
        self.s.or(self.a).unwrap_or(1.0)
    }
}
