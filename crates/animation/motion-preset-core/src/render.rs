//! Rendering of merged keyframe sets into CSS keyframe rules and animation bindings.
//!
//! Number formatting is fixed (translate/rotate 3 decimals, scale/opacity/stops 4)
//! so identical timelines always produce byte-identical rules.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::merge::{Frame, MergedKeyframeSet};

/// Format `v` with `digits` decimals. Non-finite values render as zero and a
/// negative zero loses its sign.
pub fn fixed(v: f64, digits: usize) -> String {
    let v = if v.is_finite() { v } else { 0.0 };
    let s = format!("{v:.digits$}");
    match s.strip_prefix('-') {
        Some(rest) if rest.bytes().all(|b| b == b'0' || b == b'.') => rest.to_string(),
        _ => s,
    }
}

/// Transform string of one frame, prefixed by `base` when it is non-empty.
pub fn frame_transform(base: &str, frame: &Frame) -> String {
    let mut out = String::new();
    if !base.is_empty() {
        out.push_str(base);
        out.push(' ');
    }
    let _ = write!(
        out,
        "translate({}px, {}px) rotate({}deg) scale({})",
        fixed(frame.offset_x, 3),
        fixed(frame.offset_y, 3),
        fixed(frame.rotation_deg, 3),
        fixed(frame.scale, 4),
    );
    out
}

/// Body of one keyframe stop, e.g. `50.0000% { transform: ...; opacity: 0.5000; }`.
pub fn frame_css(base: &str, frame: &Frame) -> String {
    format!(
        "{}% {{ transform: {}; opacity: {}; }}",
        fixed(frame.time_fraction, 4),
        frame_transform(base, frame),
        fixed(frame.opacity, 4),
    )
}

/// A named `@keyframes` rule ready to hand to a [`crate::KeyframeSink`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyframeRule {
    pub name: String,
    pub css: String,
}

impl KeyframeRule {
    pub fn from_merged(name: impl Into<String>, set: &MergedKeyframeSet) -> Self {
        let name = name.into();
        let mut css = format!("@keyframes {name} {{\n");
        for frame in &set.frames {
            let _ = writeln!(css, "  {}", frame_css(&set.base_transform, frame));
        }
        css.push('}');
        Self { name, css }
    }
}

/// `animation-iteration-count`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Iterations {
    Infinite,
    Once,
}

impl Iterations {
    pub fn from_looping(looping: bool) -> Self {
        if looping {
            Self::Infinite
        } else {
            Self::Once
        }
    }

    pub fn as_css(&self) -> &'static str {
        match self {
            Self::Infinite => "infinite",
            Self::Once => "1",
        }
    }
}

/// Timing parameters bound on a target for one applied rule.
///
/// `delay_ms` is zero or negative; a negative delay starts the animation
/// part-way through its cycle. Timing is always linear since easing is baked
/// into the frames.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimationBinding {
    pub name: String,
    pub duration_ms: u32,
    pub delay_ms: f64,
    pub iterations: Iterations,
}

impl AnimationBinding {
    pub const FILL_MODE: &'static str = "both";
    pub const TIMING_FUNCTION: &'static str = "linear";

    /// CSS property/value pairs, in declaration order.
    pub fn declarations(&self) -> Vec<(&'static str, String)> {
        vec![
            ("animation-name", self.name.clone()),
            ("animation-duration", format!("{}ms", self.duration_ms)),
            ("animation-delay", format!("{}ms", fixed(self.delay_ms, 3))),
            ("animation-iteration-count", self.iterations.as_css().to_string()),
            ("animation-fill-mode", Self::FILL_MODE.to_string()),
            ("animation-timing-function", Self::TIMING_FUNCTION.to_string()),
        ]
    }
}
