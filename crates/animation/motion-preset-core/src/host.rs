//! Host seams: where keyframe rules go and where time comes from.

use std::cell::Cell;
use std::collections::BTreeMap;

use hashbrown::HashMap;

use crate::ids::TargetId;
use crate::render::{AnimationBinding, KeyframeRule};

/// Inline style properties of a target (`property -> value`).
pub type InlineStyle = BTreeMap<String, String>;

/// Declarative keyframe-animation consumer.
///
/// Writes are fire-and-forget: the engine never waits on or reads back a rule.
pub trait KeyframeSink {
    fn insert_rule(&mut self, rule: &KeyframeRule);
    fn remove_rule(&mut self, name: &str);
    /// Snapshot of the target's inline style before the engine writes to it.
    fn read_inline(&self, target: TargetId) -> InlineStyle;
    fn bind_animation(&mut self, target: TargetId, binding: &AnimationBinding);
    fn restore_inline(&mut self, target: TargetId, style: &InlineStyle);
}

/// In-memory sink for headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rules: BTreeMap<String, KeyframeRule>,
    pub inline: HashMap<TargetId, InlineStyle>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a host-provided inline property on `target`.
    pub fn set_inline(&mut self, target: TargetId, property: &str, value: &str) {
        self.inline
            .entry(target)
            .or_default()
            .insert(property.to_string(), value.to_string());
    }

    pub fn inline_of(&self, target: TargetId) -> InlineStyle {
        self.inline.get(&target).cloned().unwrap_or_default()
    }
}

impl KeyframeSink for MemorySink {
    fn insert_rule(&mut self, rule: &KeyframeRule) {
        self.rules.insert(rule.name.clone(), rule.clone());
    }

    fn remove_rule(&mut self, name: &str) {
        self.rules.remove(name);
    }

    fn read_inline(&self, target: TargetId) -> InlineStyle {
        self.inline_of(target)
    }

    fn bind_animation(&mut self, target: TargetId, binding: &AnimationBinding) {
        let style = self.inline.entry(target).or_default();
        for (property, value) in binding.declarations() {
            style.insert(property.to_string(), value);
        }
    }

    fn restore_inline(&mut self, target: TargetId, style: &InlineStyle) {
        if style.is_empty() {
            self.inline.remove(&target);
        } else {
            self.inline.insert(target, style.clone());
        }
    }
}

/// Monotonic time source in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: instant::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: instant::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock advanced explicitly by the host.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn set(&self, ms: f64) {
        self.now.set(ms);
    }

    pub fn advance(&self, ms: f64) {
        self.now.set(self.now.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> f64 {
        (**self).now_ms()
    }
}
