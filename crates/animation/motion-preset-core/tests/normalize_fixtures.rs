use motion_preset_core::{
    normalize_preset, normalize_timeline, GraphType, Key, NormalizedTimeline, Offset, RawPreset,
};

fn raw(name: &str) -> RawPreset {
    motion_preset_fixtures::presets::load(name).expect("load preset fixture")
}

fn normalized(name: &str) -> NormalizedTimeline {
    normalize_preset(&raw(name), None).timeline
}

#[test]
fn aliased_fields_and_string_values_are_resolved() {
    let preset = normalize_preset(&raw("pulse-aliases"), None);
    assert_eq!(preset.key, "pulse");

    let t = preset.timeline;
    assert_eq!(t.duration_ms, 800);
    assert!(t.looping);
    assert_eq!(t.graph_type, GraphType::EaseInOut);
    assert_eq!(
        t.scale_keys,
        vec![Key::new(0, 1.0), Key::new(400, 1.25), Key::new(800, 1.0)]
    );
    // Opacity is clamped into [0, 1].
    assert_eq!(
        t.opacity_keys,
        vec![Key::new(0, 1.0), Key::new(400, 1.0), Key::new(800, 0.0)]
    );
    // Duplicate times keep the later entry.
    assert_eq!(
        t.position_keys,
        vec![
            Key::new(0, Offset::ZERO),
            Key::new(400, Offset::new(8.0, -12.0)),
            Key::new(800, Offset::ZERO),
        ]
    );
    assert!(t.rotation_keys.is_empty());
}

#[test]
fn tracks_may_live_on_the_timeline_itself() {
    let t = normalized("flat-wobble");
    assert_eq!(t.duration_ms, 600);
    assert!(t.looping);
    assert_eq!(t.graph_type, GraphType::Ease);
    let rotations: Vec<f64> = t.rotation_keys.iter().map(|k| k.value).collect();
    assert_eq!(rotations, vec![0.0, -8.0, 8.0, 0.0]);
    // Bare-number entries carry only a time.
    assert_eq!(
        t.scale_keys,
        vec![Key::new(0, 1.0), Key::new(300, 1.0), Key::new(600, 1.0)]
    );
}

#[test]
fn malformed_input_degrades_to_defaults() {
    let t = normalized("malformed");
    assert_eq!(t.duration_ms, 1);
    assert!(!t.looping);
    assert_eq!(t.graph_type, GraphType::Linear);
    assert_eq!(
        t.position_keys,
        vec![Key::new(0, Offset::new(0.0, 2.0)), Key::new(1, Offset::ZERO)]
    );
    assert_eq!(t.scale_keys, vec![Key::new(0, 0.0)]);
    assert!(t.opacity_keys.is_empty());
}

#[test]
fn legacy_array_timeline_has_default_duration() {
    let preset = normalize_preset(&raw("legacy-array"), Some("ease"));
    assert_eq!(preset.key, "legacy-bounce");
    assert_eq!(preset.timeline.duration_ms, 1000);
    assert_eq!(preset.timeline.graph_type, GraphType::Ease);
    assert!(!preset.timeline.has_keys());
}

#[test]
fn graph_override_beats_preset_graph_type() {
    let preset = normalize_preset(&raw("slide-right"), Some("step_end"));
    assert_eq!(preset.timeline.graph_type, GraphType::StepEnd);
}

#[test]
fn normalization_is_idempotent_for_every_fixture() {
    for name in motion_preset_fixtures::presets::keys() {
        let preset = raw(&name);
        let a = serde_json::to_string(&normalize_preset(&preset, None).timeline).unwrap();
        let b = serde_json::to_string(&normalize_preset(&preset, None).timeline).unwrap();
        assert_eq!(a, b, "fixture {name}");
    }
}

#[test]
fn canonical_export_normalizes_back_to_itself() {
    for name in motion_preset_fixtures::presets::keys() {
        let t = normalized(&name);
        let again = normalize_timeline(&t.to_json(), None);
        assert_eq!(again, t, "fixture {name}");
    }
}
