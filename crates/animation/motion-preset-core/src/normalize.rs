//! Raw preset → [`NormalizedTimeline`].
//!
//! Preset timelines have drifted over time: durations, loop flags, track names and
//! key fields all appear under several spellings. Each field's spellings live in one
//! alias table below and are resolved in table order (first hit wins).
//!
//! The normalizer never fails. Garbage fields fall back to defaults and keys
//! without a usable time are dropped.

use serde_json::{Map, Value as JsonValue};

use crate::data::{
    GraphType, Key, NormalizedTimeline, Offset, Preset, RawPreset, DEFAULT_OPACITY,
    DEFAULT_ROTATION, DEFAULT_SCALE,
};
use crate::sampling::dedupe_last_wins;

pub const DEFAULT_DURATION_MS: u32 = 1000;

const DURATION_FIELDS: &[&str] = &["duration_ms", "durationMs", "duration"];
const LOOP_FIELDS: &[&str] = &["loop", "looping", "seamless_loop"];
const GRAPH_TYPE_FIELDS: &[&str] = &["graph_type", "graphType"];
const TIME_FIELDS: &[&str] = &["t_ms", "tMs", "t", "time_ms", "timeMs", "time"];

/// Suffixes tried after each track name, in order.
const TRACK_SUFFIXES: &[&str] = &["", "_track", "Track", "_keys", "Keys"];

const POSITION_TRACK: &[&str] = &["position", "translate", "offset"];
const SCALE_TRACK: &[&str] = &["scale"];
const ROTATION_TRACK: &[&str] = &["rotation", "rotate"];
const OPACITY_TRACK: &[&str] = &["opacity", "alpha"];

const X_FIELDS: &[&str] = &["x_px", "xPx", "x", "dx"];
const Y_FIELDS: &[&str] = &["y_px", "yPx", "y", "dy"];
const SCALE_FIELDS: &[&str] = &["s", "scale", "value"];
const ROTATION_FIELDS: &[&str] = &[
    "r_deg",
    "rDeg",
    "r",
    "rotation_deg",
    "rotationDeg",
    "rotation",
    "deg",
    "value",
];
const OPACITY_FIELDS: &[&str] = &["v", "o", "opacity", "value"];

/// Number or numeric string; non-finite values count as absent.
fn coerce_number(value: &JsonValue) -> Option<f64> {
    let n = match value {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coerce_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) if s.trim().eq_ignore_ascii_case("true") => Some(true),
        JsonValue::String(s) if s.trim().eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn first_number(obj: &Map<String, JsonValue>, fields: &[&str]) -> Option<f64> {
    fields
        .iter()
        .filter_map(|f| obj.get(*f))
        .find_map(coerce_number)
}

fn first_bool(obj: &Map<String, JsonValue>, fields: &[&str]) -> Option<bool> {
    fields.iter().filter_map(|f| obj.get(*f)).find_map(coerce_bool)
}

fn first_str<'a>(obj: &'a Map<String, JsonValue>, fields: &[&str]) -> Option<&'a str> {
    fields
        .iter()
        .filter_map(|f| obj.get(*f))
        .find_map(|v| v.as_str())
}

fn track_entries<'a>(
    container: &'a Map<String, JsonValue>,
    names: &[&str],
) -> Option<&'a Vec<JsonValue>> {
    names.iter().find_map(|name| {
        TRACK_SUFFIXES
            .iter()
            .find_map(|suffix| container.get(&format!("{name}{suffix}"))?.as_array())
    })
}

/// Time of one raw entry: a bare number, or an object carrying a time alias.
fn entry_time(entry: &JsonValue) -> Option<f64> {
    match entry {
        JsonValue::Object(obj) => first_number(obj, TIME_FIELDS),
        other => coerce_number(other),
    }
}

fn read_track<V>(
    container: &Map<String, JsonValue>,
    names: &[&str],
    duration_ms: u32,
    read_value: impl Fn(Option<&Map<String, JsonValue>>) -> V,
) -> Vec<Key<V>> {
    let Some(entries) = track_entries(container, names) else {
        return Vec::new();
    };
    let keys = entries
        .iter()
        .filter_map(|entry| {
            let t = entry_time(entry)?;
            let t = t.round().clamp(0.0, duration_ms as f64) as u32;
            Some(Key::new(t, read_value(entry.as_object())))
        })
        .collect();
    dedupe_last_wins(keys)
}

fn read_position(obj: Option<&Map<String, JsonValue>>) -> Offset {
    let Some(obj) = obj else {
        return Offset::ZERO;
    };
    Offset {
        x: first_number(obj, X_FIELDS).unwrap_or(0.0),
        y: first_number(obj, Y_FIELDS).unwrap_or(0.0),
    }
}

fn read_scale(obj: Option<&Map<String, JsonValue>>) -> f64 {
    obj.and_then(|o| first_number(o, SCALE_FIELDS))
        .unwrap_or(DEFAULT_SCALE)
        .max(0.0)
}

fn read_rotation(obj: Option<&Map<String, JsonValue>>) -> f64 {
    obj.and_then(|o| first_number(o, ROTATION_FIELDS))
        .unwrap_or(DEFAULT_ROTATION)
}

fn read_opacity(obj: Option<&Map<String, JsonValue>>) -> f64 {
    obj.and_then(|o| first_number(o, OPACITY_FIELDS))
        .unwrap_or(DEFAULT_OPACITY)
        .clamp(0.0, 1.0)
}

/// Normalize a raw `timeline` value.
///
/// `graph_type` takes precedence over a `graph_type`/`graphType` field inside the
/// timeline dict; unknown curve names resolve to linear.
pub fn normalize_timeline(raw: &JsonValue, graph_type: Option<&str>) -> NormalizedTimeline {
    let override_graph = graph_type.map(GraphType::from);
    let Some(obj) = raw.as_object() else {
        // Legacy array (or anything else): duration fallback only.
        let mut timeline = NormalizedTimeline::empty(DEFAULT_DURATION_MS);
        timeline.graph_type = override_graph.unwrap_or_default();
        return timeline;
    };

    let duration_ms = first_number(obj, DURATION_FIELDS)
        .map(|d| d.round().clamp(1.0, u32::MAX as f64) as u32)
        .unwrap_or(DEFAULT_DURATION_MS);
    let looping = first_bool(obj, LOOP_FIELDS).unwrap_or(false);
    let graph_type = override_graph
        .or_else(|| first_str(obj, GRAPH_TYPE_FIELDS).map(GraphType::from))
        .unwrap_or_default();

    // Tracks live under `tracks`, or directly on the timeline dict.
    let container = obj
        .get("tracks")
        .and_then(|t| t.as_object())
        .unwrap_or(obj);

    let timeline = NormalizedTimeline {
        duration_ms,
        looping,
        graph_type,
        position_keys: read_track(container, POSITION_TRACK, duration_ms, read_position),
        scale_keys: read_track(container, SCALE_TRACK, duration_ms, read_scale),
        rotation_keys: read_track(container, ROTATION_TRACK, duration_ms, read_rotation),
        opacity_keys: read_track(container, OPACITY_TRACK, duration_ms, read_opacity),
    };
    log::trace!(
        "normalized timeline: {}ms loop={} graph={} keys p/s/r/o={}/{}/{}/{}",
        timeline.duration_ms,
        timeline.looping,
        timeline.graph_type.name(),
        timeline.position_keys.len(),
        timeline.scale_keys.len(),
        timeline.rotation_keys.len(),
        timeline.opacity_keys.len()
    );
    timeline
}

/// Normalize a whole preset. Graph type precedence: `graph_override`, then the
/// preset's own `graph_type`, then the timeline's.
pub fn normalize_preset(raw: &RawPreset, graph_override: Option<&str>) -> Preset {
    let graph = graph_override.or(raw.graph_type.as_deref());
    Preset {
        key: raw.key.trim().to_string(),
        timeline: normalize_timeline(&raw.timeline, graph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_array_yields_default_duration_and_no_keys() {
        let t = normalize_timeline(&json!([0, 100, 200]), None);
        assert_eq!(t.duration_ms, 1000);
        assert!(!t.looping);
        assert!(!t.has_keys());
    }

    #[test]
    fn duration_aliases_resolve_in_order() {
        let t = normalize_timeline(&json!({ "durationMs": 300, "duration": 900 }), None);
        assert_eq!(t.duration_ms, 300);
        let t = normalize_timeline(&json!({ "duration": "450.4" }), None);
        assert_eq!(t.duration_ms, 450);
        let t = normalize_timeline(&json!({ "duration_ms": 0 }), None);
        assert_eq!(t.duration_ms, 1);
        let t = normalize_timeline(&json!({ "duration_ms": "soon" }), None);
        assert_eq!(t.duration_ms, 1000);
    }

    #[test]
    fn loop_flag_accepts_strings() {
        assert!(normalize_timeline(&json!({ "loop": "TRUE" }), None).looping);
        assert!(!normalize_timeline(&json!({ "looping": "false" }), None).looping);
        assert!(normalize_timeline(&json!({ "seamless_loop": true }), None).looping);
        assert!(!normalize_timeline(&json!({ "loop": "maybe" }), None).looping);
    }

    #[test]
    fn track_name_suffixes_and_field_aliases() {
        let t = normalize_timeline(
            &json!({
                "duration_ms": 500,
                "tracks": {
                    "positionKeys": [{ "timeMs": 250, "dx": 3, "yPx": 4 }],
                    "rotate_track": [{ "t": 100, "rotationDeg": 45 }],
                    "opacity": [{ "time_ms": 0, "value": 0.5 }]
                }
            }),
            None,
        );
        assert_eq!(t.position_keys, vec![Key::new(250, Offset::new(3.0, 4.0))]);
        assert_eq!(t.rotation_keys, vec![Key::new(100, 45.0)]);
        assert_eq!(t.opacity_keys, vec![Key::new(0, 0.5)]);
    }

    #[test]
    fn bad_entries_are_dropped_and_values_clamped() {
        let t = normalize_timeline(
            &json!({
                "duration_ms": 100,
                "opacity": [{ "t": "x", "o": 0.3 }, { "t": 10, "o": 4 }, { "t": 20, "o": -1 }],
                "scale": [{ "t": 500, "s": -2 }, null, { "s": 3 }]
            }),
            None,
        );
        assert_eq!(t.opacity_keys, vec![Key::new(10, 1.0), Key::new(20, 0.0)]);
        assert_eq!(t.scale_keys, vec![Key::new(100, 0.0)]);
    }

    #[test]
    fn graph_type_override_wins() {
        let raw = json!({ "graph_type": "ease-in" });
        assert_eq!(normalize_timeline(&raw, None).graph_type, GraphType::EaseIn);
        assert_eq!(
            normalize_timeline(&raw, Some("step-start")).graph_type,
            GraphType::StepStart
        );
        assert_eq!(
            normalize_timeline(&raw, Some("springy")).graph_type,
            GraphType::Linear
        );
    }
}
