//! Pure timeline operators: intensity, lag, smooth return to default, and
//! pose-to-pose transition synthesis.
//!
//! Operators that take an existing timeline return an [`Outcome`]; `Unchanged`
//! carries the input untouched when the parameters make the operator a no-op or
//! when it fails internally.

use serde::{Deserialize, Serialize};

use crate::config::{Config, MergeConfig, TransitionConfig};
use crate::data::{
    GraphType, Key, NormalizedTimeline, Offset, Pose, DEFAULT_OPACITY, DEFAULT_ROTATION,
    DEFAULT_SCALE,
};
use crate::error::{fail_soft, MotionError, Outcome};
use crate::interp::lerp;
use crate::merge::sample_times;
use crate::sampling::{dedupe_last_wins, ensure_endpoints, sample_keys, Lerp};
use crate::spring::{with_spring_smoothing, SpringParams};

/// Key prefix of linear pose-to-pose transitions built by the engine.
pub const TRANSITION_KEY_PREFIX: &str = "__transition__";
/// Key prefix of spring pose-to-pose transitions built by the engine.
pub const SPRING_TRANSITION_KEY_PREFIX: &str = "__spring_transition__";

/// Whether a preset key belongs to an engine-synthesized transition.
pub fn is_synthesized_key(key: &str) -> bool {
    key.starts_with(TRANSITION_KEY_PREFIX) || key.starts_with(SPRING_TRANSITION_KEY_PREFIX)
}

/// Reserved key for the `serial`-th synthesized transition.
pub fn transition_key(spring: bool, serial: u32) -> String {
    let prefix = if spring {
        SPRING_TRANSITION_KEY_PREFIX
    } else {
        TRANSITION_KEY_PREFIX
    };
    format!("{prefix}{serial}")
}

// ----- intensity -----

#[inline]
fn scale_deviation(v: f64, identity: f64, amt: f64) -> f64 {
    identity + (v - identity) * amt
}

/// Scale every track's deviation from identity by `amt`.
///
/// Offsets scale toward 0, scale toward 1, rotation passes through. With
/// `affect_opacity = false` the opacity track is replaced by a flat 1 over
/// `[0, duration]`. `amt = 1` is an exact no-op.
pub fn with_intensity(
    timeline: &NormalizedTimeline,
    amt: f64,
    affect_opacity: bool,
) -> Outcome<NormalizedTimeline> {
    fail_soft("intensity", timeline, || {
        if !amt.is_finite() || amt < 0.0 {
            return Err(MotionError::invalid(
                "intensity",
                format!("amount must be finite and >= 0, got {amt}"),
            ));
        }
        if amt == 1.0 {
            return Ok(None);
        }
        let mut out = timeline.clone();
        for k in &mut out.position_keys {
            k.value = Offset::new(k.value.x * amt, k.value.y * amt);
        }
        for k in &mut out.scale_keys {
            k.value = scale_deviation(k.value, DEFAULT_SCALE, amt).max(0.0);
        }
        if affect_opacity {
            for k in &mut out.opacity_keys {
                k.value = scale_deviation(k.value, DEFAULT_OPACITY, amt).clamp(0.0, 1.0);
            }
        } else {
            out.opacity_keys = dedupe_last_wins(vec![
                Key::new(0, DEFAULT_OPACITY),
                Key::new(out.duration_ms, DEFAULT_OPACITY),
            ]);
        }
        Ok(Some(out))
    })
}

// ----- lag -----

/// Map original time `t` into the lagged window `[lag, duration]`.
#[inline]
pub fn remap_t(t: f64, duration_ms: f64, lag_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return t;
    }
    (lag_ms + t * (duration_ms - lag_ms) / duration_ms).clamp(0.0, duration_ms)
}

fn lag_track<V: Lerp>(keys: &[Key<V>], duration_ms: u32, lag_ms: f64, identity: V) -> Vec<Key<V>> {
    if keys.is_empty() {
        return Vec::new();
    }
    let full = ensure_endpoints(keys, duration_ms, identity);
    let d = duration_ms as f64;
    let mut out = Vec::with_capacity(full.len() + 1);
    out.push(Key::new(0, full[0].value));
    out.extend(
        full.iter()
            .map(|k| Key::new(remap_t(k.t as f64, d, lag_ms).round() as u32, k.value)),
    );
    dedupe_last_wins(out)
}

/// Delay the motion by `lag_ms`, holding the start value and compressing the rest
/// into `[lag, duration]`. A lag outside `(0, duration)` is a no-op.
pub fn with_lag(timeline: &NormalizedTimeline, lag_ms: f64) -> Outcome<NormalizedTimeline> {
    fail_soft("lag", timeline, || {
        if !lag_ms.is_finite() {
            return Err(MotionError::non_finite("lag", "lag_ms"));
        }
        let d = timeline.duration_ms;
        if lag_ms <= 0.0 || lag_ms >= d as f64 {
            return Ok(None);
        }
        let mut out = timeline.clone();
        out.position_keys = lag_track(&timeline.position_keys, d, lag_ms, Offset::ZERO);
        out.scale_keys = lag_track(&timeline.scale_keys, d, lag_ms, DEFAULT_SCALE);
        out.rotation_keys = lag_track(&timeline.rotation_keys, d, lag_ms, DEFAULT_ROTATION);
        out.opacity_keys = lag_track(&timeline.opacity_keys, d, lag_ms, DEFAULT_OPACITY);
        Ok(Some(out))
    })
}

// ----- smooth return to default -----

/// Track re-keyed at `times` with its values sampled under `graph`.
fn bake_track<V: Lerp>(
    keys: &[Key<V>],
    duration_ms: u32,
    times: &[u32],
    graph: GraphType,
    identity: V,
) -> Vec<Key<V>> {
    if keys.is_empty() {
        return Vec::new();
    }
    let full = ensure_endpoints(keys, duration_ms, identity);
    times
        .iter()
        .map(|&t| Key::new(t, sample_keys(&full, t as f64, graph).unwrap_or(identity)))
        .collect()
}

fn return_track<V: Lerp>(
    keys: &[Key<V>],
    base_ms: u32,
    total_ms: u32,
    baked: Option<(&[u32], GraphType)>,
    identity: V,
) -> Vec<Key<V>> {
    let source = match baked {
        Some((times, graph)) => bake_track(keys, base_ms, times, graph, identity),
        None => keys.to_vec(),
    };
    let mut out = ensure_endpoints(&source, base_ms, identity);
    out.push(Key::new(total_ms, identity));
    dedupe_last_wins(out)
}

/// Extend the timeline by `extra_ms`, during which every track returns linearly
/// to its identity value.
///
/// The result is tagged linear. A non-linear curve is first baked into dense
/// keys over the original span, so the original motion keeps its easing.
pub fn with_smooth_return_to_default(
    timeline: &NormalizedTimeline,
    extra_ms: f64,
) -> Outcome<NormalizedTimeline> {
    fail_soft("smooth return", timeline, || {
        if !extra_ms.is_finite() {
            return Err(MotionError::non_finite("smooth return", "extra_ms"));
        }
        let extra = extra_ms.round();
        if extra <= 0.0 {
            return Ok(None);
        }
        let base = timeline.duration_ms.max(1);
        let total = base.saturating_add(extra.min(u32::MAX as f64) as u32);
        let graph = timeline.graph_type;
        let times = if graph.is_linear() {
            Vec::new()
        } else {
            sample_times(timeline, &MergeConfig::default())
        };
        let baked = (!graph.is_linear()).then_some((times.as_slice(), graph));

        let mut out = timeline.clone();
        out.duration_ms = total;
        out.graph_type = GraphType::Linear;
        out.position_keys = return_track(&timeline.position_keys, base, total, baked, Offset::ZERO);
        out.scale_keys = return_track(&timeline.scale_keys, base, total, baked, DEFAULT_SCALE);
        out.rotation_keys =
            return_track(&timeline.rotation_keys, base, total, baked, DEFAULT_ROTATION);
        out.opacity_keys =
            return_track(&timeline.opacity_keys, base, total, baked, DEFAULT_OPACITY);
        Ok(Some(out))
    })
}

// ----- pose-to-pose transitions -----

fn pose_keys(frames: &[(u32, Pose)]) -> NormalizedTimeline {
    let d = frames.last().map(|(t, _)| *t).unwrap_or(1).max(1);
    NormalizedTimeline {
        duration_ms: d,
        looping: false,
        graph_type: GraphType::Linear,
        position_keys: dedupe_last_wins(
            frames
                .iter()
                .map(|(t, p)| Key::new(*t, Offset::new(p.x, p.y)))
                .collect(),
        ),
        scale_keys: dedupe_last_wins(frames.iter().map(|(t, p)| Key::new(*t, p.s)).collect()),
        rotation_keys: dedupe_last_wins(frames.iter().map(|(t, p)| Key::new(*t, p.r)).collect()),
        opacity_keys: dedupe_last_wins(frames.iter().map(|(t, p)| Key::new(*t, p.o)).collect()),
    }
}

fn blend_pose(from: &Pose, to: &Pose, k: f64) -> Pose {
    Pose {
        x: lerp(from.x, to.x, k),
        y: lerp(from.y, to.y, k),
        s: lerp(from.s, to.s, k).max(0.0),
        r: lerp(from.r, to.r, k),
        o: lerp(from.o, to.o, k).clamp(0.0, 1.0),
    }
}

/// Two-key linear transition from `from` to `to`.
pub fn build_transition(from: Pose, to: Pose, duration_ms: u32) -> NormalizedTimeline {
    let d = duration_ms.max(1);
    pose_keys(&[(0, from.sanitized()), (d, to.sanitized())])
}

/// Unit step response of a critically damped spring at `u = ωt`.
#[inline]
pub fn critically_damped_step(u: f64) -> f64 {
    1.0 - (1.0 + u) * (-u).exp()
}

/// N-key transition following a critically damped step response.
///
/// Without an explicit `frames`, the count is `round(duration / frame_step)`
/// clamped to `[min_frames, default_max_frames]`. Explicit counts are clamped to
/// `[2, max_frames]`. The last key lands exactly on `to`.
pub fn build_spring_transition(
    from: Pose,
    to: Pose,
    duration_ms: u32,
    frames: Option<u32>,
    cfg: &TransitionConfig,
) -> NormalizedTimeline {
    let (from, to) = (from.sanitized(), to.sanitized());
    let d = duration_ms.max(1);
    let n = match frames {
        Some(f) => f.clamp(2, cfg.max_frames.max(2)),
        None => {
            let step = cfg.frame_step_ms.max(1) as f64;
            ((d as f64 / step).round() as u32)
                .clamp(cfg.min_frames.max(2), cfg.default_max_frames.max(2))
                .min(cfg.max_frames.max(2))
        }
    };
    let last = (n - 1) as f64;
    let keys: Vec<(u32, Pose)> = (0..n)
        .map(|i| {
            let p = i as f64 / last;
            let k = if i + 1 == n {
                1.0
            } else {
                critically_damped_step(cfg.settle * p)
            };
            ((d as f64 * p).round() as u32, blend_pose(&from, &to, k))
        })
        .collect();
    pose_keys(&keys)
}

// ----- operator chain -----

/// Operators applied to a preset before it is merged, in the order
/// intensity → lag → smooth return → spring smoothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresetTransforms {
    pub intensity: Option<f64>,
    pub affect_opacity: bool,
    pub lag_ms: Option<f64>,
    pub smooth_return_ms: Option<f64>,
    pub spring: bool,
    /// Overrides `Config::spring` when set.
    pub spring_params: Option<SpringParams>,
}

impl Default for PresetTransforms {
    fn default() -> Self {
        Self {
            intensity: None,
            affect_opacity: true,
            lag_ms: None,
            smooth_return_ms: None,
            spring: false,
            spring_params: None,
        }
    }
}

impl PresetTransforms {
    pub fn is_identity(&self) -> bool {
        self.intensity.is_none()
            && self.lag_ms.is_none()
            && self.smooth_return_ms.is_none()
            && !self.spring
    }

    /// Run the chain. Each step that declines simply passes its input on.
    pub fn apply(&self, key: &str, timeline: &NormalizedTimeline, cfg: &Config) -> NormalizedTimeline {
        let mut current = timeline.clone();
        if let Some(amt) = self.intensity {
            current = with_intensity(&current, amt, self.affect_opacity).into_inner();
        }
        if let Some(lag) = self.lag_ms {
            current = with_lag(&current, lag).into_inner();
        }
        if let Some(extra) = self.smooth_return_ms {
            current = with_smooth_return_to_default(&current, extra).into_inner();
        }
        if self.spring {
            let params = self.spring_params.unwrap_or(cfg.spring);
            current = with_spring_smoothing(key, &current, &params).into_inner();
        }
        current
    }
}
