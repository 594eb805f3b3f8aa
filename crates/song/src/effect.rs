//! Effect configurations, one variant per effect, selected by `name`.
//!
//! Each parameter set only carries what the effect itself understands; every
//! parameter is optional and left to the backend's default when absent.

use serde::{Deserialize, Serialize};

/// A time or rate given in seconds / hertz, or in musical notation such as
/// `"8n"` or `"4n."`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeValue {
    Seconds(f64),
    Notation(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "camelCase")]
pub enum EffectConfig {
    AutoFilter(AutoFilterParams),
    AutoPanner(AutoPannerParams),
    AutoWah(AutoWahParams),
    BitCrusher(BitCrusherParams),
    Chebyshev(ChebyshevParams),
    Chorus(ChorusParams),
    Delay(DelayParams),
    Distortion(DistortionParams),
    FeedbackDelay(FeedbackDelayParams),
    Filter(FilterParams),
    FrequencyShifter(FrequencyShifterParams),
    Freeverb(FreeverbParams),
    #[serde(rename = "jcReverb")]
    JcReverb(JcReverbParams),
    Phaser(PhaserParams),
    PingPongDelay(PingPongDelayParams),
    PitchShift(PitchShiftParams),
    Reverb(ReverbParams),
    StereoWidener(StereoWidenerParams),
    Tremolo(TremoloParams),
    Vibrato(VibratoParams),
}

impl EffectConfig {
    /// The tag this effect is stored under.
    pub fn name(&self) -> &'static str {
        match self {
            EffectConfig::AutoFilter(_) => "autoFilter",
            EffectConfig::AutoPanner(_) => "autoPanner",
            EffectConfig::AutoWah(_) => "autoWah",
            EffectConfig::BitCrusher(_) => "bitCrusher",
            EffectConfig::Chebyshev(_) => "chebyshev",
            EffectConfig::Chorus(_) => "chorus",
            EffectConfig::Delay(_) => "delay",
            EffectConfig::Distortion(_) => "distortion",
            EffectConfig::FeedbackDelay(_) => "feedbackDelay",
            EffectConfig::Filter(_) => "filter",
            EffectConfig::FrequencyShifter(_) => "frequencyShifter",
            EffectConfig::Freeverb(_) => "freeverb",
            EffectConfig::JcReverb(_) => "jcReverb",
            EffectConfig::Phaser(_) => "phaser",
            EffectConfig::PingPongDelay(_) => "pingPongDelay",
            EffectConfig::PitchShift(_) => "pitchShift",
            EffectConfig::Reverb(_) => "reverb",
            EffectConfig::StereoWidener(_) => "stereoWidener",
            EffectConfig::Tremolo(_) => "tremolo",
            EffectConfig::Vibrato(_) => "vibrato",
        }
    }

    /// Dry/wet mix, for effects that have one.
    pub fn wet(&self) -> Option<f64> {
        match self {
            EffectConfig::AutoFilter(p) => p.wet,
            EffectConfig::AutoPanner(p) => p.wet,
            EffectConfig::AutoWah(p) => p.wet,
            EffectConfig::BitCrusher(p) => p.wet,
            EffectConfig::Chebyshev(p) => p.wet,
            EffectConfig::Chorus(p) => p.wet,
            EffectConfig::Delay(_) => None,
            EffectConfig::Distortion(p) => p.wet,
            EffectConfig::FeedbackDelay(p) => p.wet,
            EffectConfig::Filter(_) => None,
            EffectConfig::FrequencyShifter(p) => p.wet,
            EffectConfig::Freeverb(p) => p.wet,
            EffectConfig::JcReverb(p) => p.wet,
            EffectConfig::Phaser(p) => p.wet,
            EffectConfig::PingPongDelay(p) => p.wet,
            EffectConfig::PitchShift(p) => p.wet,
            EffectConfig::Reverb(p) => p.wet,
            EffectConfig::StereoWidener(p) => p.wet,
            EffectConfig::Tremolo(p) => p.wet,
            EffectConfig::Vibrato(p) => p.wet,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoFilterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub octaves: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoPannerParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoWahParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub octaves: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitivity: Option<f64>,
    #[serde(rename = "Q", skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follower: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BitCrusherParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bits: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChebyshevParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// `none`, `2x` or `4x`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oversample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChorusParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DelayParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<TimeValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DistortionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distortion: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oversample: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedbackDelayParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterParams {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(rename = "Q", skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rolloff: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FrequencyShifterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FreeverbParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dampening: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct JcReverbParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhaserParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub octaves: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages: Option<u32>,
    #[serde(rename = "Q", skip_serializing_if = "Option::is_none")]
    pub q: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_frequency: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PingPongDelayParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PitchShiftParams {
    /// Semitones
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ReverbParams {
    /// Seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StereoWidenerParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TremoloParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spread: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VibratoParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<TimeValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depth: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_delay: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub waveform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wet: Option<f64>,
}
