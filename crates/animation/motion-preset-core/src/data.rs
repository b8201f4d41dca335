//! Canonical preset data model.
//!
//! A [`RawPreset`] is whatever the preset store handed us; a [`NormalizedTimeline`]
//! is the validated form every other module works on.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::interp::functions;

/// Timing curve applied between consecutive keys of a track.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphType {
    #[default]
    Linear,
    Ease,
    EaseIn,
    EaseOut,
    EaseInOut,
    StepStart,
    StepEnd,
}

impl From<&str> for GraphType {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "linear" => Self::Linear,
            "ease" => Self::Ease,
            "ease-in" => Self::EaseIn,
            "ease-out" => Self::EaseOut,
            "ease-in-out" => Self::EaseInOut,
            "step-start" => Self::StepStart,
            "step-end" => Self::StepEnd,
            _ => Self::Linear, // unknown curves degrade to linear
        }
    }
}

impl GraphType {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Ease => "ease",
            Self::EaseIn => "ease-in",
            Self::EaseOut => "ease-out",
            Self::EaseInOut => "ease-in-out",
            Self::StepStart => "step-start",
            Self::StepEnd => "step-end",
        }
    }

    #[inline]
    pub fn is_linear(&self) -> bool {
        matches!(self, Self::Linear)
    }

    /// Cubic-bezier control points `(x1, y1, x2, y2)` for the bezier presets.
    #[inline]
    pub fn bezier_points(&self) -> Option<[f64; 4]> {
        match self {
            Self::Ease => Some(functions::EASE),
            Self::EaseIn => Some(functions::EASE_IN),
            Self::EaseOut => Some(functions::EASE_OUT),
            Self::EaseInOut => Some(functions::EASE_IN_OUT),
            _ => None,
        }
    }

    /// Map a raw segment progress in [0,1] to an eased ratio.
    #[inline]
    pub fn ease(&self, raw: f64) -> f64 {
        let raw = raw.clamp(0.0, 1.0);
        match self {
            Self::Linear => raw,
            Self::StepStart => functions::step_start(raw),
            Self::StepEnd => functions::step_end(raw),
            curve => match curve.bezier_points() {
                Some(ctrl) => functions::bezier_ease(raw, ctrl),
                None => raw,
            },
        }
    }
}

/// 2D offset in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One key of a track: integer millisecond time plus the track's value.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Key<V> {
    pub t: u32,
    pub value: V,
}

impl<V> Key<V> {
    pub fn new(t: u32, value: V) -> Self {
        Self { t, value }
    }
}

/// Identity values each track falls back to.
pub const DEFAULT_SCALE: f64 = 1.0;
pub const DEFAULT_ROTATION: f64 = 0.0;
pub const DEFAULT_OPACITY: f64 = 1.0;

/// Canonical, validated timeline.
///
/// Invariants: `duration_ms >= 1`; every track is sorted by `t` with unique times
/// inside `[0, duration_ms]`; scale is non-negative and opacity lies in [0,1].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTimeline {
    pub duration_ms: u32,
    #[serde(rename = "loop")]
    pub looping: bool,
    pub graph_type: GraphType,
    pub position_keys: Vec<Key<Offset>>,
    pub scale_keys: Vec<Key<f64>>,
    pub rotation_keys: Vec<Key<f64>>,
    pub opacity_keys: Vec<Key<f64>>,
}

impl NormalizedTimeline {
    /// A timeline with no keys at all (every track holds its identity).
    pub fn empty(duration_ms: u32) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
            looping: false,
            graph_type: GraphType::Linear,
            position_keys: Vec::new(),
            scale_keys: Vec::new(),
            rotation_keys: Vec::new(),
            opacity_keys: Vec::new(),
        }
    }

    pub fn has_keys(&self) -> bool {
        !(self.position_keys.is_empty()
            && self.scale_keys.is_empty()
            && self.rotation_keys.is_empty()
            && self.opacity_keys.is_empty())
    }

    /// Export in the canonical dict shape understood by the normalizer.
    /// Normalizing the result yields an equal timeline.
    pub fn to_json(&self) -> JsonValue {
        let position: Vec<JsonValue> = self
            .position_keys
            .iter()
            .map(|k| json!({ "t_ms": k.t, "x": k.value.x, "y": k.value.y }))
            .collect();
        let scale: Vec<JsonValue> = self
            .scale_keys
            .iter()
            .map(|k| json!({ "t_ms": k.t, "s": k.value }))
            .collect();
        let rotation: Vec<JsonValue> = self
            .rotation_keys
            .iter()
            .map(|k| json!({ "t_ms": k.t, "r": k.value }))
            .collect();
        let opacity: Vec<JsonValue> = self
            .opacity_keys
            .iter()
            .map(|k| json!({ "t_ms": k.t, "o": k.value }))
            .collect();
        json!({
            "duration_ms": self.duration_ms,
            "loop": self.looping,
            "graph_type": self.graph_type.name(),
            "tracks": {
                "position": position,
                "scale": scale,
                "rotation": rotation,
                "opacity": opacity,
            }
        })
    }
}

/// Flat snapshot of all four properties at one instant.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    pub s: f64,
    pub r: f64,
    pub o: f64,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        x: 0.0,
        y: 0.0,
        s: DEFAULT_SCALE,
        r: DEFAULT_ROTATION,
        o: DEFAULT_OPACITY,
    };

    pub fn is_finite(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.s.is_finite()
            && self.r.is_finite()
            && self.o.is_finite()
    }

    /// Replace non-finite components by identity and clamp scale/opacity.
    pub fn sanitized(self) -> Self {
        fn or(v: f64, fallback: f64) -> f64 {
            if v.is_finite() {
                v
            } else {
                fallback
            }
        }
        Self {
            x: or(self.x, 0.0),
            y: or(self.y, 0.0),
            s: or(self.s, DEFAULT_SCALE).max(0.0),
            r: or(self.r, DEFAULT_ROTATION),
            o: or(self.o, DEFAULT_OPACITY).clamp(0.0, 1.0),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Preset as delivered by the preset store. Never mutated by the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPreset {
    #[serde(default)]
    pub key: String,
    #[serde(default, alias = "graphType", skip_serializing_if = "Option::is_none")]
    pub graph_type: Option<String>,
    #[serde(default)]
    pub timeline: JsonValue,
}

impl RawPreset {
    /// Lenient conversion used for store payloads: any object with a string `key`
    /// is accepted, a non-string graph type is ignored.
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        let obj = value.as_object()?;
        let key = obj.get("key")?.as_str()?.to_string();
        let graph_type = obj
            .get("graph_type")
            .or_else(|| obj.get("graphType"))
            .and_then(|g| g.as_str())
            .map(str::to_string);
        Some(Self {
            key,
            graph_type,
            timeline: obj.get("timeline").cloned().unwrap_or(JsonValue::Null),
        })
    }
}

/// A normalized preset ready to be applied.
#[derive(Clone, Debug, PartialEq)]
pub struct Preset {
    pub key: String,
    pub timeline: NormalizedTimeline,
}
