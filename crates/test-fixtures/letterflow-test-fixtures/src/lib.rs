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
    bundles: HashMap<String, BundleEntry>,
    configs: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BundleEntry {
    Path(String),
    Detailed {
        path: String,
        #[serde(default = "default_valid")]
        valid: bool,
    },
}

fn default_valid() -> bool {
    true
}

impl BundleEntry {
    fn as_path(&self) -> &str {
        match self {
            BundleEntry::Path(path) => path,
            BundleEntry::Detailed { path, .. } => path,
        }
    }

    fn is_valid(&self) -> bool {
        match self {
            BundleEntry::Path(_) => true,
            BundleEntry::Detailed { valid, .. } => *valid,
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

/// Preset bundles. Entries marked `"valid": false` are expected to be rejected.
pub mod bundles {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.bundles.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Names of bundles that should parse.
    pub fn valid_keys() -> Vec<String> {
        keys()
            .into_iter()
            .filter(|k| MANIFEST.bundles[k].is_valid())
            .collect()
    }

    pub fn expected_valid(name: &str) -> Result<bool> {
        Ok(lookup(&MANIFEST.bundles, "bundle", name)?.is_valid())
    }

    pub fn json(name: &str) -> Result<String> {
        let entry = lookup(&MANIFEST.bundles, "bundle", name)?;
        read_to_string(entry.as_path())
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let entry = lookup(&MANIFEST.bundles, "bundle", name)?;
        super::load_json(entry.as_path())
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let entry = lookup(&MANIFEST.bundles, "bundle", name)?;
        Ok(resolve_path(entry.as_path()))
    }
}

/// Session configurations.
pub mod configs {
    use super::*;

    pub fn keys() -> Vec<String> {
        let mut keys: Vec<String> = MANIFEST.configs.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn json(name: &str) -> Result<String> {
        let rel = lookup(&MANIFEST.configs, "config", name)?;
        read_to_string(rel)
    }

    pub fn load<T: DeserializeOwned>(name: &str) -> Result<T> {
        let rel = lookup(&MANIFEST.configs, "config", name)?;
        super::load_json(rel)
    }

    pub fn path(name: &str) -> Result<PathBuf> {
        let rel = lookup(&MANIFEST.configs, "config", name)?;
        Ok(resolve_path(rel))
    }
}
