//! Keyframe merger: four independently timed tracks → one linearly timed frame list.
//!
//! The consumer plays the merged frames with linear timing. For non-linear graph
//! types the eased values are baked in by sampling on a dense grid; applying the
//! curve once over the merged list would tie the tracks' velocities together at
//! every union boundary.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::config::MergeConfig;
use crate::data::NormalizedTimeline;
use crate::sampling::PreparedTracks;

/// One merged output frame. `time_fraction` is a percentage in [0, 100].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub time_fraction: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub rotation_deg: f64,
    pub scale: f64,
    pub opacity: f64,
}

/// Output of [`merge_timeline`]: frames sorted by `time_fraction`, always starting
/// at 0 and ending with exactly one frame at 100.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergedKeyframeSet {
    pub duration_ms: u32,
    /// Transform prefixed to every frame (empty for identity).
    pub base_transform: String,
    pub frames: Vec<Frame>,
}

/// Sample times (integer ms) the merger evaluates for a timeline.
///
/// Always the union of every track's key times with `{0, duration}`. Non-linear
/// timelines add a dense grid whose step widens so the total stays within
/// `cfg.max_frames` (unless the key union alone is already larger).
pub fn sample_times(timeline: &NormalizedTimeline, cfg: &MergeConfig) -> Vec<u32> {
    let d = timeline.duration_ms.max(1);
    let mut times: BTreeSet<u32> = BTreeSet::new();
    times.insert(0);
    times.insert(d);
    times.extend(timeline.position_keys.iter().map(|k| k.t));
    times.extend(timeline.scale_keys.iter().map(|k| k.t));
    times.extend(timeline.rotation_keys.iter().map(|k| k.t));
    times.extend(timeline.opacity_keys.iter().map(|k| k.t));
    times.retain(|&t| t <= d);

    if !timeline.graph_type.is_linear() {
        let budget = cfg.max_frames.saturating_sub(times.len()).max(2);
        let base_step = cfg.sample_step_ms.max(1) as f64;
        let step = base_step.max(d as f64 / (budget - 1) as f64);
        let mut k = 0usize;
        loop {
            let t = k as f64 * step;
            if t >= d as f64 {
                break;
            }
            times.insert(t.round() as u32);
            k += 1;
        }
    }
    times.into_iter().collect()
}

/// Merge a timeline into a single frame list.
///
/// `base_transform` is carried verbatim into the output and later prefixed to every
/// frame's transform; `None` means identity.
pub fn merge_timeline(
    timeline: &NormalizedTimeline,
    base_transform: Option<&str>,
    cfg: &MergeConfig,
) -> MergedKeyframeSet {
    let d = timeline.duration_ms.max(1);
    let tracks = PreparedTracks::new(timeline);
    let times = sample_times(timeline, cfg);
    let frames: Vec<Frame> = times
        .iter()
        .map(|&t| {
            let pose = tracks.sample(t as f64).sanitized();
            Frame {
                time_fraction: if t >= d {
                    100.0
                } else {
                    100.0 * t as f64 / d as f64
                },
                offset_x: pose.x,
                offset_y: pose.y,
                rotation_deg: pose.r,
                scale: pose.s,
                opacity: pose.o,
            }
        })
        .collect();
    log::trace!(
        "merged {}ms timeline ({}) into {} frames",
        d,
        timeline.graph_type.name(),
        frames.len()
    );
    MergedKeyframeSet {
        duration_ms: d,
        base_transform: base_transform.map(str::trim).unwrap_or_default().to_string(),
        frames,
    }
}
