//! Motion Preset Core (host-agnostic)
//!
//! Normalizes loosely-shaped keyframe presets into four typed tracks (offset, scale,
//! rotation, opacity), samples them with CSS-style easing, merges them into one
//! linearly-timed keyframe list, and keeps per-target playback state so a new preset
//! can take over a running one without a visual jump.
//!
//! Everything here is synchronous. The two host seams are [`KeyframeSink`] (where
//! merged keyframe rules are written) and [`Clock`] (where "now" comes from); the
//! remote preset list is reached through [`PresetSource`].

pub mod config;
pub mod data;
pub mod error;
pub mod host;
pub mod ids;
pub mod interp;
pub mod merge;
pub mod normalize;
pub mod playback;
pub mod presets;
pub mod render;
pub mod sampling;
pub mod spring;
pub mod transforms;

// Re-exports for hosts
pub use config::Config;
pub use data::{GraphType, Key, NormalizedTimeline, Offset, Pose, Preset, RawPreset};
pub use error::{MotionError, Outcome};
pub use host::{Clock, InlineStyle, KeyframeSink, ManualClock, MemorySink, SystemClock};
pub use ids::{AnimationId, TargetId};
pub use merge::{merge_timeline, Frame, MergedKeyframeSet};
pub use normalize::{normalize_preset, normalize_timeline};
pub use playback::{ApplyOptions, ApplyReport, PlaybackManager, PlaybackState};
pub use presets::{parse_preset_list, PresetCache, PresetSource};
pub use render::{AnimationBinding, Iterations, KeyframeRule};
pub use sampling::{sample_keys, sample_pose};
pub use spring::{with_spring_smoothing, SpringParams};
pub use transforms::{
    build_spring_transition, build_transition, remap_t, with_intensity, with_lag,
    with_smooth_return_to_default, PresetTransforms,
};

/// Result type used by fallible engine internals.
pub type Result<T> = core::result::Result<T, MotionError>;
