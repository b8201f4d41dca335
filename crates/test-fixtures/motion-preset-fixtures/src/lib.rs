use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Deserialize;

static MANIFEST: Lazy<Manifest> = Lazy::new(|| {
    let raw = include_str!("../../../../fixtures/manifest.json");
    serde_json::from_str(raw).expect("fixtures manifest should parse")
});

#[derive(Debug, Deserialize)]
struct Manifest {
    presets: HashMap<String, String>,
    #[serde(rename = "preset-lists")]
    preset_lists: HashMap<String, ListEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEntry {
    Path(String),
    Detailed { path: String },
}

impl ListEntry {
    fn as_path(&self) -> &str {
        match self {
            ListEntry::Path(path) => path,
            ListEntry::Detailed { path } => path,
        }
    }
}

fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../fixtures")
}

fn resolve_path(rel: &str) -> PathBuf {
    fixtures_root().join(rel)
}

fn read_to_string(rel: &str) -> Result<String> {
    let path = resolve_path(rel);
    fs::read_to_string(&path)
        .with_context(|| format!("failed to read fixture at {}", path.display()))
}

fn load_json<T: DeserializeOwned>(rel: &str) -> Result<T> {
    let text = read_to_string(rel)?;
    serde_json::from_str(&text).with_context(|| format!("failed to parse JSON fixture {rel}"))
}

fn lookup<'a, T>(map: &'a HashMap<String, T>, kind: &str, name: &str) -> Result<&'a T> {
    map.get(name)
        .ok_or_else(|| anyhow!("unknown {kind} fixture '{name}'"))
}

/// Single raw presets (`{ key, graph_type?, timeline }`).
pub mod presets {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.presets.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.presets, "preset", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.presets, "preset", name)?;
        super::load_json(rel)
    }
}

/// Preset-store response bodies (`GET /animation/presets`).
pub mod preset_lists {
    use super::*;

    pub fn keys() -> Vec<String> {
        MANIFEST.preset_lists.keys().cloned().collect()
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.preset_lists, "preset list", name)?;
        read_to_string(entry.as_path())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.preset_lists, "preset list", name)?;
        super::load_json(entry.as_path())
    }
}
