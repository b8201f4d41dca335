use motion_preset_core::{
    parse_preset_list, GraphType, Key, ManualClock, MotionError, PresetCache, RawPreset,
};

fn store(name: &str) -> impl FnMut() -> motion_preset_core::Result<Vec<RawPreset>> {
    let body = motion_preset_fixtures::preset_lists::json(name).expect("load preset list");
    move || parse_preset_list(&body)
}

#[test]
fn bare_array_body_lists_every_entry() {
    let mut cache = PresetCache::new(store("store-basic"), ManualClock::new(0.0), 5_000);
    let keys: Vec<&str> = cache.list().iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["slide-right", " fade-out ", "legacy-bounce"]);
}

#[test]
fn padded_keys_match_after_trimming() {
    let mut cache = PresetCache::new(store("store-basic"), ManualClock::new(0.0), 5_000);
    let preset = cache.load("fade-out", None).expect("fade-out preset");
    assert_eq!(preset.key, "fade-out");
    assert_eq!(preset.timeline.graph_type, GraphType::EaseOut);
    assert_eq!(preset.timeline.duration_ms, 500);
    assert_eq!(
        preset.timeline.opacity_keys,
        vec![Key::new(0, 1.0), Key::new(500, 0.0)]
    );

    let legacy = cache.load("legacy-bounce", None).expect("legacy preset");
    assert_eq!(legacy.timeline.duration_ms, 1000);
    assert!(!legacy.timeline.has_keys());

    assert!(cache.load("nope", None).is_none());
}

#[test]
fn wrapped_body_is_accepted() {
    let mut cache = PresetCache::new(store("store-wrapped"), ManualClock::new(0.0), 5_000);
    let nod = cache.load("nod", None).expect("nod preset");
    assert_eq!(nod.timeline.graph_type, GraphType::StepEnd);
    assert!(nod.timeline.looping);
    assert_eq!(
        nod.timeline.rotation_keys,
        vec![Key::new(0, 0.0), Key::new(300, 12.0)]
    );

    let overridden = cache.load("nod", Some("linear")).expect("nod preset");
    assert_eq!(overridden.timeline.graph_type, GraphType::Linear);
}

#[test]
fn unreachable_store_yields_nothing() {
    let offline = || -> motion_preset_core::Result<Vec<RawPreset>> {
        Err(MotionError::Source {
            reason: "connection refused".into(),
        })
    };
    let mut cache = PresetCache::new(offline, ManualClock::new(0.0), 5_000);
    assert!(cache.list().is_empty());
    assert!(cache.find("slide-right").is_none());
}
