//! Playback state manager: one live [`PlaybackState`] per registered target.
//!
//! Lifecycle per target: registered with no state (idle) → `apply` (playing) →
//! `stop`/`apply` teardown → idle. Teardown removes the target's keyframe rule and
//! restores the inline style captured before the first write.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::data::{NormalizedTimeline, Pose, Preset};
use crate::error::MotionError;
use crate::host::{Clock, InlineStyle, KeyframeSink, SystemClock};
use crate::ids::{AnimationId, IdAllocator, TargetId};
use crate::merge::merge_timeline;
use crate::render::{AnimationBinding, Iterations, KeyframeRule};
use crate::sampling::sample_pose;
use crate::transforms::{
    build_spring_transition, build_transition, transition_key, PresetTransforms,
};

/// Live playback of one preset on one target.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackState {
    pub animation_id: AnimationId,
    pub rule_name: String,
    pub preset_key: String,
    /// Timeline actually playing (after transforms).
    pub timeline: NormalizedTimeline,
    pub base_transform: String,
    pub raw_duration_ms: u32,
    /// `round(raw_duration_ms / speed)`, at least 1.
    pub applied_duration_ms: u32,
    pub speed: f64,
    pub looping: bool,
    /// Clock time at which phase 0 was (or would have been) played.
    pub start_time: f64,
    pub saved_inline: InlineStyle,
}

impl PlaybackState {
    /// Phase in applied (speed-scaled) ms. Wraps when looping, freezes at the end otherwise.
    pub fn phase_at(&self, now_ms: f64) -> f64 {
        let elapsed = (now_ms - self.start_time).max(0.0);
        let d = self.applied_duration_ms.max(1) as f64;
        if self.looping {
            elapsed % d
        } else {
            elapsed.min(d)
        }
    }

    /// Phase mapped back onto the raw timeline, in whole ms.
    pub fn raw_time_at(&self, now_ms: f64) -> u32 {
        let raw = (self.phase_at(now_ms) * self.speed).round();
        raw.clamp(0.0, self.raw_duration_ms as f64) as u32
    }
}

/// Options for [`PlaybackManager::apply`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyOptions {
    /// Overrides the timeline's own loop flag.
    pub looping: Option<bool>,
    /// Carry the previous animation's phase into the new one.
    pub seamless: bool,
    /// Extra phase in raw timeline ms, added to any carried phase.
    pub phase_shift_ms: f64,
    pub speed: f64,
    pub base_transform: Option<String>,
    pub transforms: PresetTransforms,
}

impl Default for ApplyOptions {
    fn default() -> Self {
        Self {
            looping: None,
            seamless: false,
            phase_shift_ms: 0.0,
            speed: 1.0,
            base_transform: None,
            transforms: PresetTransforms::default(),
        }
    }
}

/// What [`PlaybackManager::apply`] did.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub animation_id: AnimationId,
    pub rule_name: String,
    pub applied_duration_ms: u32,
    /// Zero or negative; the negated starting phase.
    pub delay_ms: f64,
    /// Raw timeline time sampled from the previous animation on a seamless retarget.
    pub sample_ms: Option<u32>,
    /// Pose of the previous animation at `sample_ms`.
    pub carried_pose: Option<Pose>,
}

/// Owns per-target playback state and drives a [`KeyframeSink`].
pub struct PlaybackManager<S: KeyframeSink, C: Clock = SystemClock> {
    cfg: Config,
    sink: S,
    clock: C,
    ids: IdAllocator,
    targets: HashMap<TargetId, Option<PlaybackState>>,
    transition_serial: u32,
}

impl<S: KeyframeSink> PlaybackManager<S, SystemClock> {
    pub fn with_system_clock(cfg: Config, sink: S) -> Self {
        Self::new(cfg, sink, SystemClock::new())
    }
}

impl<S: KeyframeSink, C: Clock> PlaybackManager<S, C> {
    pub fn new(cfg: Config, sink: S, clock: C) -> Self {
        Self {
            cfg,
            sink,
            clock,
            ids: IdAllocator::new(),
            targets: HashMap::new(),
            transition_serial: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Issue a handle for a new animatable target.
    pub fn register(&mut self) -> TargetId {
        let id = self.ids.alloc_target();
        self.targets.insert(id, None);
        id
    }

    /// Stop anything playing on `target` and forget the handle.
    pub fn unregister(&mut self, target: TargetId) -> crate::Result<()> {
        let slot = self
            .targets
            .remove(&target)
            .ok_or(MotionError::UnknownTarget { target: target.0 })?;
        if let Some(state) = slot {
            teardown(&mut self.sink, target, &state);
        }
        Ok(())
    }

    /// Apply `preset` to `target`, replacing whatever was playing.
    pub fn apply(
        &mut self,
        target: TargetId,
        preset: &Preset,
        opts: &ApplyOptions,
    ) -> crate::Result<ApplyReport> {
        let now = self.clock.now_ms();
        let slot = self
            .targets
            .get_mut(&target)
            .ok_or(MotionError::UnknownTarget { target: target.0 })?;

        let speed = if opts.speed.is_finite() && opts.speed > 0.0 {
            opts.speed
        } else {
            log::warn!("apply '{}': speed {} replaced by 1", preset.key, opts.speed);
            1.0
        };

        // Phase must be read before the previous state is torn down.
        let carried = match (opts.seamless, slot.as_ref()) {
            (true, Some(prev)) => {
                let sample_ms = prev.raw_time_at(now);
                Some((sample_ms, settled_pose(&prev.timeline, sample_ms)))
            }
            _ => None,
        };
        if let Some(prev) = slot.take() {
            teardown(&mut self.sink, target, &prev);
        }

        let timeline = if opts.transforms.is_identity() {
            preset.timeline.clone()
        } else {
            opts.transforms.apply(&preset.key, &preset.timeline, &self.cfg)
        };
        let looping = opts.looping.unwrap_or(timeline.looping);
        let raw_duration_ms = timeline.duration_ms.max(1);
        let applied_duration_ms = ((raw_duration_ms as f64 / speed).round() as u32).max(1);

        let shift = if opts.phase_shift_ms.is_finite() {
            opts.phase_shift_ms
        } else {
            0.0
        };
        let raw_phase = carried.map_or(0.0, |(ms, _)| ms as f64) + shift;
        let applied = applied_duration_ms as f64;
        let phase = if looping {
            (raw_phase / speed).rem_euclid(applied)
        } else {
            (raw_phase / speed).clamp(0.0, applied)
        };

        let saved_inline = self.sink.read_inline(target);
        let base_transform = opts
            .base_transform
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        let merged = merge_timeline(&timeline, Some(&base_transform), &self.cfg.merge);
        let animation_id = self.ids.alloc_animation();
        let rule_name = format!("{}-{}", self.cfg.playback.rule_prefix, animation_id.0);
        self.sink
            .insert_rule(&KeyframeRule::from_merged(rule_name.clone(), &merged));
        let binding = AnimationBinding {
            name: rule_name.clone(),
            duration_ms: applied_duration_ms,
            delay_ms: -phase,
            iterations: Iterations::from_looping(looping),
        };
        self.sink.bind_animation(target, &binding);

        log::debug!(
            "apply '{}' on target {}: rule {} ({} frames, {}ms, speed {}, phase {:.1}ms)",
            preset.key,
            target.0,
            rule_name,
            merged.frames.len(),
            applied_duration_ms,
            speed,
            phase
        );

        *slot = Some(PlaybackState {
            animation_id,
            rule_name: rule_name.clone(),
            preset_key: preset.key.clone(),
            timeline,
            base_transform,
            raw_duration_ms,
            applied_duration_ms,
            speed,
            looping,
            start_time: now - phase,
            saved_inline,
        });

        Ok(ApplyReport {
            animation_id,
            rule_name,
            applied_duration_ms,
            delay_ms: -phase,
            sample_ms: carried.map(|(ms, _)| ms),
            carried_pose: carried.map(|(_, pose)| pose),
        })
    }

    /// Tear down playback on `target`. Returns whether anything was playing.
    pub fn stop(&mut self, target: TargetId) -> crate::Result<bool> {
        let slot = self
            .targets
            .get_mut(&target)
            .ok_or(MotionError::UnknownTarget { target: target.0 })?;
        match slot.take() {
            Some(state) => {
                teardown(&mut self.sink, target, &state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn is_playing(&self, target: TargetId) -> bool {
        self.state(target).is_some()
    }

    pub fn state(&self, target: TargetId) -> Option<&PlaybackState> {
        self.targets.get(&target).and_then(Option::as_ref)
    }

    /// Current phase in applied ms, if playing.
    pub fn current_phase(&self, target: TargetId) -> Option<f64> {
        let now = self.clock.now_ms();
        self.state(target).map(|s| s.phase_at(now))
    }

    /// Pose currently shown on `target`; identity when idle or unknown.
    pub fn current_pose(&self, target: TargetId) -> Pose {
        let now = self.clock.now_ms();
        match self.state(target) {
            Some(state) => settled_pose(&state.timeline, state.raw_time_at(now)),
            None => Pose::IDENTITY,
        }
    }

    /// Re-apply the playing timeline at a new speed without a visual jump.
    pub fn set_speed(&mut self, target: TargetId, speed: f64) -> crate::Result<ApplyReport> {
        let state = self.playing(target)?;
        let preset = Preset {
            key: state.preset_key.clone(),
            timeline: state.timeline.clone(),
        };
        let opts = ApplyOptions {
            looping: Some(state.looping),
            seamless: true,
            speed,
            base_transform: Some(state.base_transform.clone()),
            ..ApplyOptions::default()
        };
        self.apply(target, &preset, &opts)
    }

    /// Animate from the current pose to `to` over `duration_ms`, once.
    pub fn transition_to(
        &mut self,
        target: TargetId,
        to: Pose,
        duration_ms: u32,
        spring: bool,
    ) -> crate::Result<ApplyReport> {
        if !self.targets.contains_key(&target) {
            return Err(MotionError::UnknownTarget { target: target.0 });
        }
        let from = self.current_pose(target);
        let base_transform = self.state(target).map(|s| s.base_transform.clone());
        let timeline = if spring {
            build_spring_transition(from, to, duration_ms, None, &self.cfg.transition)
        } else {
            build_transition(from, to, duration_ms)
        };
        let preset = Preset {
            key: transition_key(spring, self.transition_serial),
            timeline,
        };
        self.transition_serial = self.transition_serial.wrapping_add(1);
        let opts = ApplyOptions {
            looping: Some(false),
            base_transform,
            ..ApplyOptions::default()
        };
        self.apply(target, &preset, &opts)
    }

    fn playing(&self, target: TargetId) -> crate::Result<&PlaybackState> {
        match self.targets.get(&target) {
            None => Err(MotionError::UnknownTarget { target: target.0 }),
            Some(None) => Err(MotionError::NotPlaying { target: target.0 }),
            Some(Some(state)) => Ok(state),
        }
    }
}

/// Pose at `raw_ms`, or identity when sampling produced NaN or infinity.
fn settled_pose(timeline: &NormalizedTimeline, raw_ms: u32) -> Pose {
    let pose = sample_pose(timeline, raw_ms as f64);
    if pose.is_finite() {
        pose.sanitized()
    } else {
        log::warn!("non-finite pose at {raw_ms}ms; falling back to identity");
        Pose::IDENTITY
    }
}

fn teardown<S: KeyframeSink>(sink: &mut S, target: TargetId, state: &PlaybackState) {
    sink.remove_rule(&state.rule_name);
    sink.restore_inline(target, &state.saved_inline);
    log::debug!(
        "teardown '{}' on target {}: removed rule {}",
        state.preset_key,
        target.0,
        state.rule_name
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Key, Offset};
    use crate::host::{ManualClock, MemorySink};

    fn manager() -> PlaybackManager<MemorySink, ManualClock> {
        PlaybackManager::new(Config::default(), MemorySink::new(), ManualClock::new(0.0))
    }

    fn slide(looping: bool) -> Preset {
        let mut timeline = NormalizedTimeline::empty(1000);
        timeline.looping = looping;
        timeline.position_keys = vec![
            Key::new(0, Offset::new(0.0, 0.0)),
            Key::new(1000, Offset::new(100.0, 50.0)),
        ];
        Preset {
            key: "slide".into(),
            timeline,
        }
    }

    #[test]
    fn seamless_retarget_carries_phase_after_two_loops() {
        let mut mgr = manager();
        let target = mgr.register();
        mgr.apply(target, &slide(true), &ApplyOptions::default()).unwrap();
        mgr.clock().advance(2400.0);

        let opts = ApplyOptions {
            seamless: true,
            ..ApplyOptions::default()
        };
        let report = mgr.apply(target, &slide(true), &opts).unwrap();
        assert_eq!(report.sample_ms, Some(400));
        let pose = report.carried_pose.unwrap();
        assert_eq!((pose.x, pose.y), (40.0, 20.0));
        assert_eq!(report.delay_ms, -400.0);
        assert_eq!(mgr.current_phase(target), Some(400.0));
    }

    #[test]
    fn non_looping_phase_freezes_at_end() {
        let mut mgr = manager();
        let target = mgr.register();
        mgr.apply(target, &slide(false), &ApplyOptions::default()).unwrap();
        mgr.clock().advance(5000.0);
        assert_eq!(mgr.current_phase(target), Some(1000.0));
        assert_eq!(mgr.current_pose(target).x, 100.0);
    }

    #[test]
    fn speed_scales_applied_duration_and_maps_phase_back() {
        let mut mgr = manager();
        let target = mgr.register();
        let opts = ApplyOptions {
            speed: 2.0,
            ..ApplyOptions::default()
        };
        let report = mgr.apply(target, &slide(true), &opts).unwrap();
        assert_eq!(report.applied_duration_ms, 500);
        mgr.clock().advance(200.0);
        assert_eq!(mgr.state(target).unwrap().raw_time_at(200.0), 400);

        let report = mgr.set_speed(target, 1.0).unwrap();
        assert_eq!(report.sample_ms, Some(400));
        assert_eq!(report.applied_duration_ms, 1000);
        assert_eq!(mgr.current_phase(target), Some(400.0));
    }

    #[test]
    fn teardown_restores_inline_and_removes_rule() {
        let mut mgr = manager();
        let target = mgr.register();
        mgr.sink_mut().set_inline(target, "transform", "translateX(-50%)");
        let first = mgr.apply(target, &slide(false), &ApplyOptions::default()).unwrap();
        assert!(mgr.sink().rules.contains_key(&first.rule_name));

        let second = mgr.apply(target, &slide(false), &ApplyOptions::default()).unwrap();
        assert!(!mgr.sink().rules.contains_key(&first.rule_name));
        assert!(mgr.sink().rules.contains_key(&second.rule_name));

        assert!(mgr.stop(target).unwrap());
        assert!(!mgr.stop(target).unwrap());
        assert!(mgr.sink().rules.is_empty());
        let inline = mgr.sink().inline_of(target);
        assert_eq!(inline.len(), 1);
        assert_eq!(inline["transform"], "translateX(-50%)");
    }

    #[test]
    fn unknown_targets_are_errors_but_poses_fail_soft() {
        let mut mgr = manager();
        let target = mgr.register();
        mgr.unregister(target).unwrap();
        assert_eq!(
            mgr.apply(target, &slide(false), &ApplyOptions::default()),
            Err(MotionError::UnknownTarget { target: target.0 })
        );
        assert_eq!(mgr.current_pose(target), Pose::IDENTITY);
        assert!(mgr.stop(target).is_err());

        let idle = mgr.register();
        assert_eq!(
            mgr.set_speed(idle, 2.0),
            Err(MotionError::NotPlaying { target: idle.0 })
        );
    }

    #[test]
    fn non_finite_pose_reads_as_identity() {
        let mut mgr = manager();
        let target = mgr.register();
        let mut preset = slide(false);
        preset.timeline.position_keys = vec![Key::new(0, Offset::new(f64::NAN, 0.0))];
        preset.timeline.scale_keys = vec![Key::new(0, 2.0)];
        mgr.apply(target, &preset, &ApplyOptions::default()).unwrap();
        mgr.clock().advance(100.0);
        assert_eq!(mgr.current_pose(target), Pose::IDENTITY);
    }

    #[test]
    fn transition_starts_from_current_pose() {
        let mut mgr = manager();
        let target = mgr.register();
        mgr.apply(target, &slide(false), &ApplyOptions::default()).unwrap();
        mgr.clock().advance(500.0);

        let to = Pose {
            x: 0.0,
            y: 0.0,
            ..Pose::IDENTITY
        };
        let report = mgr.transition_to(target, to, 300, true).unwrap();
        assert_eq!(report.applied_duration_ms, 300);
        let state = mgr.state(target).unwrap();
        assert!(state.preset_key.starts_with("__spring_transition__"));
        assert!(!state.looping);
        assert_eq!(state.timeline.position_keys[0].value, Offset::new(50.0, 25.0));
        assert_eq!(mgr.current_pose(target).x, 50.0);
    }
}
