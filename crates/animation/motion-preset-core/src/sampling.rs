//! Per-track sampling for normalized timelines.
//!
//! Model:
//! - A track is a sorted list of `Key<V>` with unique integer-ms times.
//! - Outside the key range the nearest boundary key is held (no extrapolation).
//! - Inside a segment [a, b] the raw progress `(t - a.t) / max(1, b.t - a.t)` is
//!   passed through the timeline's [`GraphType`] before blending values linearly.
//!
//! [`ensure_endpoints`] adds explicit keys at 0 and at the duration so every track
//! covers the full timeline before it is sampled or merged.

use crate::data::{
    GraphType, Key, NormalizedTimeline, Offset, Pose, DEFAULT_OPACITY, DEFAULT_ROTATION,
    DEFAULT_SCALE,
};
use crate::interp::functions::lerp;

/// Values that can be blended between two keys.
pub trait Lerp: Copy {
    fn lerp(a: Self, b: Self, t: f64) -> Self;
}

impl Lerp for f64 {
    #[inline]
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        lerp(a, b, t)
    }
}

impl Lerp for Offset {
    #[inline]
    fn lerp(a: Self, b: Self, t: f64) -> Self {
        Offset {
            x: lerp(a.x, b.x, t),
            y: lerp(a.y, b.y, t),
        }
    }
}

/// Sample one track at time `t` (ms). Returns `None` for an empty track; the caller
/// substitutes the track's identity.
pub fn sample_keys<V: Lerp>(keys: &[Key<V>], t: f64, graph: GraphType) -> Option<V> {
    let first = keys.first()?;
    let last = keys.last()?;
    if t <= first.t as f64 {
        return Some(first.value);
    }
    if t >= last.t as f64 {
        return Some(last.value);
    }
    // First key strictly after t; t is inside (first.t, last.t) so 1 <= idx < len.
    let idx = keys.partition_point(|k| (k.t as f64) <= t);
    let a = &keys[idx - 1];
    let b = &keys[idx];
    let span = (b.t as f64 - a.t as f64).max(1.0);
    let raw = ((t - a.t as f64) / span).clamp(0.0, 1.0);
    Some(V::lerp(a.value, b.value, graph.ease(raw)))
}

/// Stable-sort by time and collapse duplicate times, keeping the later entry.
pub(crate) fn dedupe_last_wins<V>(mut keys: Vec<Key<V>>) -> Vec<Key<V>> {
    keys.sort_by_key(|k| k.t);
    let mut out: Vec<Key<V>> = Vec::with_capacity(keys.len());
    for key in keys {
        match out.last_mut() {
            Some(prev) if prev.t == key.t => *prev = key,
            _ => out.push(key),
        }
    }
    out
}

/// Guarantee explicit keys at `t = 0` and `t = duration_ms`.
///
/// A missing start key copies the first real key's value (boundary hold), a missing
/// end key copies the last one. An empty track becomes `identity` at both ends.
pub fn ensure_endpoints<V: Lerp>(keys: &[Key<V>], duration_ms: u32, identity: V) -> Vec<Key<V>> {
    let (Some(first), Some(last)) = (keys.first(), keys.last()) else {
        return dedupe_last_wins(vec![
            Key::new(0, identity),
            Key::new(duration_ms, identity),
        ]);
    };
    let mut out = Vec::with_capacity(keys.len() + 2);
    if first.t != 0 {
        out.push(Key::new(0, first.value));
    }
    out.extend_from_slice(keys);
    if last.t != duration_ms {
        out.push(Key::new(duration_ms, last.value));
    }
    dedupe_last_wins(out)
}

/// All four tracks of a timeline with endpoints synthesized, ready for repeated sampling.
#[derive(Clone, Debug)]
pub struct PreparedTracks {
    pub graph: GraphType,
    pub position: Vec<Key<Offset>>,
    pub scale: Vec<Key<f64>>,
    pub rotation: Vec<Key<f64>>,
    pub opacity: Vec<Key<f64>>,
}

impl PreparedTracks {
    pub fn new(timeline: &NormalizedTimeline) -> Self {
        Self::with_graph(timeline, timeline.graph_type)
    }

    /// Same as [`PreparedTracks::new`] but sampling with an explicit curve.
    pub fn with_graph(timeline: &NormalizedTimeline, graph: GraphType) -> Self {
        let d = timeline.duration_ms;
        Self {
            graph,
            position: ensure_endpoints(&timeline.position_keys, d, Offset::ZERO),
            scale: ensure_endpoints(&timeline.scale_keys, d, DEFAULT_SCALE),
            rotation: ensure_endpoints(&timeline.rotation_keys, d, DEFAULT_ROTATION),
            opacity: ensure_endpoints(&timeline.opacity_keys, d, DEFAULT_OPACITY),
        }
    }

    /// Sample every track at `t` ms. Values are returned as stored (no clamping).
    pub fn sample(&self, t: f64) -> Pose {
        let g = self.graph;
        let pos = sample_keys(&self.position, t, g).unwrap_or(Offset::ZERO);
        Pose {
            x: pos.x,
            y: pos.y,
            s: sample_keys(&self.scale, t, g).unwrap_or(DEFAULT_SCALE),
            r: sample_keys(&self.rotation, t, g).unwrap_or(DEFAULT_ROTATION),
            o: sample_keys(&self.opacity, t, g).unwrap_or(DEFAULT_OPACITY),
        }
    }
}

/// Sample a whole timeline at `t` ms with its own easing.
pub fn sample_pose(timeline: &NormalizedTimeline, t: f64) -> Pose {
    PreparedTracks::new(timeline).sample(t)
}
