//! Remote preset store access: list parsing and a TTL cache with key lookup.
//!
//! Fetch failures never reach the caller. They are logged, yield an empty list,
//! and are not cached, so the next call retries.

use serde_json::Value as JsonValue;

use crate::data::{Preset, RawPreset};
use crate::error::MotionError;
use crate::host::{Clock, SystemClock};
use crate::normalize::normalize_preset;

/// Where the preset list comes from (typically `GET /animation/presets`).
pub trait PresetSource {
    fn fetch_presets(&mut self) -> crate::Result<Vec<RawPreset>>;
}

impl<F> PresetSource for F
where
    F: FnMut() -> crate::Result<Vec<RawPreset>>,
{
    fn fetch_presets(&mut self) -> crate::Result<Vec<RawPreset>> {
        self()
    }
}

/// Parse a preset list body: a bare array or `{ "presets": [...] }`.
/// Entries without a string `key` are skipped.
pub fn parse_preset_list(body: &str) -> crate::Result<Vec<RawPreset>> {
    let value: JsonValue = serde_json::from_str(body)?;
    let entries = match &value {
        JsonValue::Array(items) => items,
        JsonValue::Object(obj) => obj
            .get("presets")
            .and_then(JsonValue::as_array)
            .ok_or_else(|| MotionError::Source {
                reason: "object body without a `presets` array".to_string(),
            })?,
        _ => {
            return Err(MotionError::Source {
                reason: "preset list must be an array or an object".to_string(),
            })
        }
    };
    Ok(entries.iter().filter_map(RawPreset::from_json).collect())
}

struct CachedList {
    fetched_at: f64,
    presets: Vec<RawPreset>,
}

/// Preset list cache with a time-to-live.
///
/// Access is through `&mut self`, so one cache never runs two fetches at once.
/// Hosts sharing a cache across threads wrap it in a mutex, which serializes
/// cold-cache fetches as well.
pub struct PresetCache<S: PresetSource, C: Clock = SystemClock> {
    source: S,
    clock: C,
    ttl_ms: f64,
    cached: Option<CachedList>,
}

impl<S: PresetSource> PresetCache<S, SystemClock> {
    pub fn with_system_clock(source: S, ttl_ms: u64) -> Self {
        Self::new(source, SystemClock::new(), ttl_ms)
    }
}

impl<S: PresetSource, C: Clock> PresetCache<S, C> {
    pub fn new(source: S, clock: C, ttl_ms: u64) -> Self {
        Self {
            source,
            clock,
            ttl_ms: ttl_ms as f64,
            cached: None,
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    fn is_fresh(&self, now: f64) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|c| now - c.fetched_at < self.ttl_ms)
    }

    /// Current preset list, refetched when older than the TTL.
    pub fn list(&mut self) -> &[RawPreset] {
        let now = self.clock.now_ms();
        if !self.is_fresh(now) {
            match self.source.fetch_presets() {
                Ok(presets) => {
                    log::debug!("preset cache refreshed: {} presets", presets.len());
                    self.cached = Some(CachedList {
                        fetched_at: now,
                        presets,
                    });
                }
                Err(err) => {
                    log::warn!("preset fetch failed ({}): {err}", err.category());
                    self.cached = None;
                }
            }
        }
        self.cached
            .as_ref()
            .map(|c| c.presets.as_slice())
            .unwrap_or_default()
    }

    /// Raw preset by key: exact match first, then whitespace-trimmed match.
    pub fn find(&mut self, key: &str) -> Option<RawPreset> {
        let presets = self.list();
        presets
            .iter()
            .find(|p| p.key == key)
            .or_else(|| {
                let wanted = key.trim();
                presets.iter().find(|p| p.key.trim() == wanted)
            })
            .cloned()
    }

    /// Normalized preset by key, or `None` when the store has no match.
    pub fn load(&mut self, key: &str, graph_override: Option<&str>) -> Option<Preset> {
        let raw = self.find(key)?;
        Some(normalize_preset(&raw, graph_override))
    }

    /// Drop the cached list; the next call fetches.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ManualClock;
    use std::cell::Cell;
    use std::rc::Rc;

    fn body() -> &'static str {
        r#"[{"key":" wave ","graphType":"ease","timeline":{"duration_ms":200}},{"nokey":1}]"#
    }

    #[test]
    fn parses_array_and_wrapped_bodies() {
        let list = parse_preset_list(body()).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].graph_type.as_deref(), Some("ease"));

        let wrapped = parse_preset_list(r#"{"presets":[{"key":"a","timeline":{}}]}"#).unwrap();
        assert_eq!(wrapped[0].key, "a");

        assert!(parse_preset_list("42").is_err());
        assert!(parse_preset_list("{").is_err());
    }

    #[test]
    fn ttl_controls_refetch() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let source = move || {
            counter.set(counter.get() + 1);
            parse_preset_list(body())
        };
        let mut cache = PresetCache::new(source, ManualClock::new(0.0), 5_000);

        assert_eq!(cache.list().len(), 1);
        cache.clock().advance(4_999.0);
        assert_eq!(cache.list().len(), 1);
        assert_eq!(calls.get(), 1);

        cache.clock().advance(1.0);
        cache.list();
        assert_eq!(calls.get(), 2);

        cache.invalidate();
        cache.list();
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn failures_yield_empty_list_and_are_not_cached() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let source = move || {
            counter.set(counter.get() + 1);
            if counter.get() == 1 {
                Err(MotionError::Source {
                    reason: "offline".into(),
                })
            } else {
                parse_preset_list(body())
            }
        };
        let mut cache = PresetCache::new(source, ManualClock::new(0.0), 5_000);
        assert!(cache.list().is_empty());
        assert_eq!(cache.list().len(), 1);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn lookup_is_exact_then_trimmed() {
        let mut cache = PresetCache::new(
            || parse_preset_list(body()),
            ManualClock::new(0.0),
            5_000,
        );
        assert_eq!(cache.find(" wave ").unwrap().key, " wave ");
        assert_eq!(cache.find("wave").unwrap().key, " wave ");
        assert!(cache.find("missing").is_none());

        let preset = cache.load("wave", None).unwrap();
        assert_eq!(preset.key, "wave");
        assert_eq!(preset.timeline.duration_ms, 200);
        assert_eq!(preset.timeline.graph_type, crate::data::GraphType::Ease);
    }
}
