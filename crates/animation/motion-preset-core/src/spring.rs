//! Spring smoothing: resample a timeline at a fixed step and let a damped spring
//! chase it.
//!
//! Each channel integrates `x'' + 2ζωx' + ω²x = ω²·target` with semi-implicit Euler,
//! where `target` is the original timeline sampled at each sub-step. Keys are
//! emitted at most [`MAX_FRAMES`] times, but the integration step never exceeds
//! the clamped `step_ms`. Opacity is copied through unsprung. The result is
//! already eased, so it is tagged linear.

use serde::{Deserialize, Serialize};

use crate::data::{GraphType, Key, NormalizedTimeline, Offset};
use crate::error::{fail_soft, MotionError, Outcome};
use crate::sampling::{dedupe_last_wins, PreparedTracks};
use crate::transforms::is_synthesized_key;

pub const MIN_STEP_MS: u32 = 8;
pub const MAX_STEP_MS: u32 = 33;
pub const MAX_FRAMES: u32 = 180;

/// Second-order spring parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringParams {
    /// Natural angular frequency in rad/s.
    pub omega: f64,
    /// Damping ratio; 1.0 is critical damping.
    pub zeta: f64,
    /// Integration step, clamped to [8, 33] ms.
    pub step_ms: u32,
}

impl Default for SpringParams {
    fn default() -> Self {
        Self {
            omega: 20.0,
            zeta: 1.0,
            step_ms: 16,
        }
    }
}

impl SpringParams {
    fn validate(&self) -> crate::Result<()> {
        if !self.omega.is_finite() || self.omega <= 0.0 {
            return Err(MotionError::invalid(
                "spring smoothing",
                format!("omega must be positive, got {}", self.omega),
            ));
        }
        if !self.zeta.is_finite() || self.zeta < 0.0 {
            return Err(MotionError::invalid(
                "spring smoothing",
                format!("zeta must be non-negative, got {}", self.zeta),
            ));
        }
        Ok(())
    }
}

/// Shortest signed path from `prev` to `next` in degrees, expressed as an absolute angle
/// near `prev`.
#[inline]
pub fn unwrap_angle(prev: f64, next: f64) -> f64 {
    prev + ((next - prev + 180.0).rem_euclid(360.0) - 180.0)
}

/// Position/velocity pair of one sprung channel.
#[derive(Clone, Copy, Debug)]
struct SpringAxis {
    x: f64,
    v: f64,
}

impl SpringAxis {
    fn at_rest(x: f64) -> Self {
        Self { x, v: 0.0 }
    }

    /// One semi-implicit Euler step toward `target`.
    #[inline]
    fn step(&mut self, target: f64, omega: f64, zeta: f64, dt: f64) {
        let accel = omega * omega * (target - self.x) - 2.0 * zeta * omega * self.v;
        self.v += accel * dt;
        self.x += self.v * dt;
    }
}

/// Replace a timeline by a spring-damped approach to the same curve.
///
/// Declines (returns `Unchanged`) for synthesized transition presets, identified by
/// their reserved key prefix, so they are never smoothed twice.
pub fn with_spring_smoothing(
    key: &str,
    timeline: &NormalizedTimeline,
    params: &SpringParams,
) -> Outcome<NormalizedTimeline> {
    fail_soft("spring smoothing", timeline, || {
        if is_synthesized_key(key) {
            log::debug!("spring smoothing skipped for synthesized preset '{key}'");
            return Ok(None);
        }
        params.validate()?;
        smooth(timeline, params).map(Some)
    })
}

fn smooth(timeline: &NormalizedTimeline, params: &SpringParams) -> crate::Result<NormalizedTimeline> {
    let d = timeline.duration_ms.max(1);
    let step = params.step_ms.clamp(MIN_STEP_MS, MAX_STEP_MS);
    let frames = d.div_ceil(step).clamp(2, MAX_FRAMES);
    let key_spacing = d as f64 / (frames - 1) as f64;
    // Keys may be spaced wider than `step` once the frame cap applies; the
    // integrator still advances by at most `step` per sub-step.
    let substeps = (key_spacing / step as f64).ceil().max(1.0) as usize;
    let sub_ms = key_spacing / substeps as f64;
    let dt = sub_ms / 1000.0;
    let (omega, zeta) = (params.omega, params.zeta);

    let tracks = PreparedTracks::new(timeline);
    let start = tracks.sample(0.0);
    let mut x = SpringAxis::at_rest(start.x);
    let mut y = SpringAxis::at_rest(start.y);
    let mut s = SpringAxis::at_rest(start.s);
    let mut r = SpringAxis::at_rest(start.r);
    let mut prev_target_r = start.r;

    let n = frames as usize;
    let mut position_keys = Vec::with_capacity(n);
    let mut scale_keys = Vec::with_capacity(n);
    let mut rotation_keys = Vec::with_capacity(n);
    let mut opacity_keys = Vec::with_capacity(n);

    for i in 0..n {
        let t_ms = if i + 1 == n { d as f64 } else { i as f64 * key_spacing };
        if i > 0 {
            let prev_ms = (i - 1) as f64 * key_spacing;
            for j in 1..=substeps {
                let ts = if j == substeps { t_ms } else { prev_ms + j as f64 * sub_ms };
                let target = tracks.sample(ts);
                let tr = unwrap_angle(prev_target_r, target.r);
                prev_target_r = tr;
                x.step(target.x, omega, zeta, dt);
                y.step(target.y, omega, zeta, dt);
                s.step(target.s, omega, zeta, dt);
                s.x = s.x.max(0.0);
                r.step(tr, omega, zeta, dt);
            }
        }
        for (field, v) in [("x", x.x), ("y", y.x), ("scale", s.x), ("rotation", r.x)] {
            if !v.is_finite() {
                return Err(MotionError::non_finite("spring smoothing", field));
            }
        }
        let t = t_ms.round() as u32;
        position_keys.push(Key::new(t, Offset::new(x.x, y.x)));
        scale_keys.push(Key::new(t, s.x));
        rotation_keys.push(Key::new(t, r.x));
        opacity_keys.push(Key::new(t, tracks.sample(t_ms).o.clamp(0.0, 1.0)));
    }

    log::trace!(
        "spring smoothing: {d}ms resampled into {n} frames, {substeps} sub-steps each (ω={omega}, ζ={zeta})"
    );
    Ok(NormalizedTimeline {
        duration_ms: d,
        looping: timeline.looping,
        graph_type: GraphType::Linear,
        position_keys: dedupe_last_wins(position_keys),
        scale_keys: dedupe_last_wins(scale_keys),
        rotation_keys: dedupe_last_wins(rotation_keys),
        opacity_keys: dedupe_last_wins(opacity_keys),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transforms::TRANSITION_KEY_PREFIX;

    fn ramp(duration_ms: u32) -> NormalizedTimeline {
        let mut t = NormalizedTimeline::empty(duration_ms);
        t.graph_type = GraphType::Ease;
        t.looping = true;
        t.position_keys = vec![
            Key::new(0, Offset::new(0.0, 0.0)),
            Key::new(duration_ms, Offset::new(100.0, -40.0)),
        ];
        t.opacity_keys = vec![Key::new(0, 0.2), Key::new(duration_ms, 0.8)];
        t
    }

    #[test]
    fn unwrap_takes_shortest_path() {
        assert_eq!(unwrap_angle(350.0, 10.0), 370.0);
        assert_eq!(unwrap_angle(10.0, 350.0), -10.0);
        assert_eq!(unwrap_angle(90.0, 100.0), 100.0);
    }

    #[test]
    fn output_is_linear_and_keeps_loop_flag() {
        let out = with_spring_smoothing("pulse", &ramp(1000), &SpringParams::default());
        assert!(out.is_applied());
        let t = out.into_inner();
        assert_eq!(t.graph_type, GraphType::Linear);
        assert!(t.looping);
        assert_eq!(t.duration_ms, 1000);
        assert!(t.position_keys.len() <= MAX_FRAMES as usize);
        assert_eq!(t.position_keys.first().unwrap().t, 0);
        assert_eq!(t.position_keys.last().unwrap().t, 1000);
        // Starts exactly on the original curve, lags behind it afterwards.
        assert_eq!(t.position_keys[0].value, Offset::new(0.0, 0.0));
        let end = t.position_keys.last().unwrap().value;
        assert!(end.x > 0.0 && end.x <= 100.0);
    }

    #[test]
    fn opacity_is_sampled_not_sprung() {
        let t = with_spring_smoothing("pulse", &ramp(1000), &SpringParams::default()).into_inner();
        assert_eq!(t.opacity_keys.first().unwrap().value, 0.2);
        assert_eq!(t.opacity_keys.last().unwrap().value, 0.8);
    }

    #[test]
    fn frame_count_is_capped() {
        let t = with_spring_smoothing(
            "long",
            &ramp(60_000),
            &SpringParams {
                step_ms: 1,
                ..SpringParams::default()
            },
        )
        .into_inner();
        assert_eq!(t.position_keys.len(), MAX_FRAMES as usize);
    }

    #[test]
    fn long_timelines_stay_within_target_range() {
        for duration_ms in [10_000, 60_000] {
            let out = with_spring_smoothing("long", &ramp(duration_ms), &SpringParams::default());
            assert!(out.is_applied(), "{duration_ms}ms ramp was declined");
            let t = out.into_inner();
            assert_eq!(t.position_keys.len(), MAX_FRAMES as usize);
            for k in &t.position_keys {
                assert!(
                    (-1e-6..=100.0 + 1e-6).contains(&k.value.x),
                    "x = {} at {}ms",
                    k.value.x,
                    k.t
                );
                assert!((-40.0 - 1e-6..=1e-6).contains(&k.value.y), "y = {}", k.value.y);
            }
            // The ramp ends long before the spring has any reason to lag.
            assert!(t.position_keys.last().unwrap().value.x > 99.0);
        }
    }

    #[test]
    fn synthesized_presets_and_bad_params_are_declined() {
        let input = ramp(500);
        let key = format!("{TRANSITION_KEY_PREFIX}7");
        let out = with_spring_smoothing(&key, &input, &SpringParams::default());
        assert_eq!(out, Outcome::Unchanged(input.clone()));

        let bad = SpringParams {
            omega: f64::NAN,
            ..SpringParams::default()
        };
        assert_eq!(
            with_spring_smoothing("pulse", &input, &bad),
            Outcome::Unchanged(input)
        );
    }

    #[test]
    fn rotation_crossing_zero_does_not_spin_around() {
        let mut t = NormalizedTimeline::empty(400);
        t.rotation_keys = vec![Key::new(0, 350.0), Key::new(200, 359.0), Key::new(201, 1.0)];
        let out = with_spring_smoothing("spin", &t, &SpringParams::default()).into_inner();
        for k in &out.rotation_keys {
            assert!(k.value > 300.0 && k.value < 400.0, "rotation {} jumped", k.value);
        }
    }
}
