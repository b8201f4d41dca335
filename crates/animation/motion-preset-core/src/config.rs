//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::spring::SpringParams;

/// Top-level configuration shared by the merger, operators, playback and preset cache.
/// Every section falls back to its defaults when omitted from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub merge: MergeConfig,
    /// Spring used by `PresetTransforms` when smoothing is requested without parameters.
    pub spring: SpringParams,
    pub transition: TransitionConfig,
    pub playback: PlaybackConfig,
    /// Time-to-live of the fetched preset list.
    pub preset_cache_ttl_ms: u64,
}

/// Sample cadence for non-linear timelines in the keyframe merger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    pub sample_step_ms: u32,
    /// Upper bound on emitted frames; the step widens on long timelines.
    pub max_frames: usize,
}

/// Frame budget for spring pose-to-pose transitions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub frame_step_ms: u32,
    pub min_frames: u32,
    pub default_max_frames: u32,
    /// Hard cap, also applied to explicit frame counts.
    pub max_frames: u32,
    /// Value of ωt reached on the last frame of a spring transition.
    pub settle: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Prefix for generated keyframe rule names.
    pub rule_prefix: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            merge: MergeConfig::default(),
            spring: SpringParams::default(),
            transition: TransitionConfig::default(),
            playback: PlaybackConfig::default(),
            preset_cache_ttl_ms: 5_000,
        }
    }
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            sample_step_ms: 16,
            max_frames: 320,
        }
    }
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            frame_step_ms: 16,
            min_frames: 8,
            default_max_frames: 60,
            max_frames: 90,
            settle: 8.0,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            rule_prefix: "motion-preset".to_string(),
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}
