//! Preset bundles: timing and curve presets shared as JSON files.
//!
//! ```json
//! { "schema_version": 1,
//!   "timing": { "start_frame": 1, "end_frame": 100, "duration": 50, "overlap": 5 },
//!   "curves": { "entry": [[0, 0], [1, 1]], "hold": [[0, 0], [1, 1]], "exit": [[0, 0], [1, 1]] },
//!   "style": {}, "material": {} }
//! ```
//!
//! Older files wrap the sections in `"components"` and key curves as
//! `in`/`mid`/`out`; both layouts are read. Structural problems are issues and
//! reject the bundle. Everything else (version mismatch, missing timing
//! fields, short curves) is a warning.

use std::collections::BTreeMap;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::curve::{ControlPoint, PhaseCurve};
use crate::error::AnimError;
use crate::phase::Phase;
use crate::store::CurveStore;
use crate::timing::{Direction, TimingConfig};
use crate::Result;

pub const BUNDLE_SCHEMA_VERSION: i64 = 1;

/// Used when a bundle has no `timing.duration`.
pub const DEFAULT_BUNDLE_DURATION: u32 = 50;
/// Used when a bundle has no `timing.overlap`.
pub const DEFAULT_BUNDLE_OVERLAP: f32 = 5.0;

const SECTIONS: [&str; 4] = ["timing", "curves", "style", "material"];

/// Timing section; every field optional.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleTiming {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_frame: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_frame: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loop_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ping_pong: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<Direction>,
}

/// A curve point as `[x, y]` or as a full control point object.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BundlePoint {
    Pair([f32; 2]),
    Point(ControlPoint),
}

impl From<BundlePoint> for ControlPoint {
    fn from(p: BundlePoint) -> Self {
        match p {
            BundlePoint::Pair([x, y]) => ControlPoint::new(x, y),
            BundlePoint::Point(cp) => cp,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PresetBundle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<i64>,
    #[serde(default)]
    pub timing: BundleTiming,
    #[serde(default)]
    pub curves: BTreeMap<Phase, Vec<BundlePoint>>,
    /// Passed through untouched.
    #[serde(default)]
    pub style: Map<String, Value>,
    /// Passed through untouched.
    #[serde(default)]
    pub material: Map<String, Value>,
}

/// Outcome of structural validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleValidation {
    /// Hard errors.
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
}

impl BundleValidation {
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }
}

/// The object holding the sections: `components` when present, else the root.
fn sections(root: &Value) -> Option<&Map<String, Value>> {
    let obj = root.as_object()?;
    match obj.get("components") {
        Some(Value::Object(components)) => Some(components),
        _ => Some(obj),
    }
}

fn phase_key(key: &str) -> Option<Phase> {
    key.parse::<Phase>().ok()
}

impl PresetBundle {
    /// Validate raw JSON without deserializing it.
    pub fn validate_value(root: &Value) -> BundleValidation {
        let mut v = BundleValidation::default();
        let Some(obj) = root.as_object() else {
            v.issues.push("bundle is not a JSON object".into());
            return v;
        };

        match obj.get("schema_version").and_then(Value::as_i64) {
            None => v.warnings.push("no schema version".into()),
            Some(ver) if ver < BUNDLE_SCHEMA_VERSION => {
                v.warnings.push(format!("old schema version {ver}"))
            }
            Some(ver) if ver > BUNDLE_SCHEMA_VERSION => {
                v.warnings.push(format!("newer schema version {ver}"))
            }
            Some(_) => {}
        }

        let Some(sec) = sections(root) else {
            v.issues.push("no components".into());
            return v;
        };
        if !SECTIONS.iter().any(|s| sec.contains_key(*s)) {
            v.issues.push("no components".into());
        }

        if let Some(timing) = sec.get("timing") {
            match timing.as_object() {
                None => v.issues.push("timing is not an object".into()),
                Some(t) => {
                    for req in ["start_frame", "duration", "overlap"] {
                        if !t.contains_key(req) {
                            v.warnings.push(format!("timing missing {req}"));
                        }
                    }
                }
            }
        }

        if let Some(curves) = sec.get("curves") {
            match curves.as_object() {
                None => v.issues.push("curves is not an object".into()),
                Some(c) => {
                    for (key, data) in c {
                        if phase_key(key).is_none() {
                            v.warnings.push(format!("unknown curve '{key}' ignored"));
                            continue;
                        }
                        match data.as_array() {
                            None => v.issues.push(format!("curve {key} is not a list")),
                            Some(points) => {
                                if points.len() < 2 {
                                    v.warnings.push(format!("curve {key} has fewer than 2 points"));
                                }
                                let malformed = points.iter().any(|p| {
                                    serde_json::from_value::<BundlePoint>(p.clone()).is_err()
                                });
                                if malformed {
                                    v.issues.push(format!("curve {key} has malformed points"));
                                }
                            }
                        }
                    }
                }
            }
        }

        for section in ["style", "material"] {
            if let Some(value) = sec.get(section) {
                if !value.is_object() {
                    v.issues.push(format!("{section} is not an object"));
                }
            }
        }
        v
    }

    /// Validate and deserialize. Fails when validation finds issues.
    pub fn from_value(root: &Value) -> Result<(Self, BundleValidation)> {
        let validation = Self::validate_value(root);
        if !validation.is_valid() {
            return Err(AnimError::Bundle {
                reason: validation.issues.join("; "),
            });
        }
        for w in &validation.warnings {
            warn!("Bundle: {w}");
        }

        let mut flat = sections(root).cloned().unwrap_or_default();
        if let Some(version) = root.get("schema_version") {
            flat.insert("schema_version".into(), version.clone());
        }
        if let Some(Value::Object(curves)) = flat.get_mut("curves") {
            curves.retain(|k, _| phase_key(k).is_some());
        }
        let bundle: PresetBundle = serde_json::from_value(Value::Object(flat))?;
        Ok((bundle, validation))
    }

    pub fn parse(json: &str) -> Result<(Self, BundleValidation)> {
        let root: Value = serde_json::from_str(json)?;
        Self::from_value(&root)
    }

    /// Bundle describing `timing` and the curves stored for `base_name`.
    pub fn capture(timing: &TimingConfig, store: &CurveStore, base_name: &str) -> Self {
        let curves = Phase::ALL
            .into_iter()
            .filter_map(|phase| {
                store.curve(base_name, phase).map(|c| {
                    let points = c.points().iter().copied().map(BundlePoint::Point).collect();
                    (phase, points)
                })
            })
            .collect();
        Self {
            schema_version: Some(BUNDLE_SCHEMA_VERSION),
            timing: BundleTiming {
                start_frame: Some(timing.start_frame),
                end_frame: Some(timing.end_frame),
                duration: Some(timing.duration),
                overlap: Some(timing.overlap),
                loop_count: Some(timing.loop_count),
                ping_pong: Some(timing.ping_pong),
                direction: Some(timing.direction),
            },
            curves,
            style: Map::new(),
            material: Map::new(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Overwrite `timing` with the bundle's values. Missing duration and
    /// overlap fall back to 50 and 5; other missing fields keep their value.
    pub fn apply_timing(&self, timing: &mut TimingConfig) {
        let t = &self.timing;
        if let Some(v) = t.start_frame {
            timing.start_frame = v;
        }
        if let Some(v) = t.end_frame {
            timing.end_frame = v;
        }
        timing.duration = t.duration.unwrap_or_else(|| {
            info!("Bundle timing has no duration, using {DEFAULT_BUNDLE_DURATION}");
            DEFAULT_BUNDLE_DURATION
        });
        timing.overlap = t.overlap.unwrap_or_else(|| {
            info!("Bundle timing has no overlap, using {DEFAULT_BUNDLE_OVERLAP}");
            DEFAULT_BUNDLE_OVERLAP
        });
        if let Some(v) = t.loop_count {
            timing.loop_count = v;
        }
        if let Some(v) = t.ping_pong {
            timing.ping_pong = v;
        }
        if let Some(v) = t.direction {
            timing.direction = v;
        }
        for fix in timing.normalize() {
            warn!("Bundle timing: {fix}");
        }
    }

    /// Store the bundle's curves for `base_name`. Curves failing validation
    /// are skipped with a warning. Returns the number of curves stored.
    pub fn apply_curves(&self, store: &mut CurveStore, base_name: &str) -> usize {
        let mut applied = 0;
        for (&phase, points) in &self.curves {
            let curve = PhaseCurve::new(points.iter().copied().map(ControlPoint::from));
            let issues = curve.issues(store.y_limit());
            if let Some(issue) = issues.first() {
                warn!("Skipping bundle curve {phase} for {base_name}: {issue}");
                continue;
            }
            store.insert(base_name, phase, curve);
            applied += 1;
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flat_bundle_parses() {
        let (bundle, v) = PresetBundle::parse(
            r#"{"schema_version": 1,
                "timing": {"start_frame": 10, "duration": 20, "overlap": 2},
                "curves": {"entry": [[0, 0], [1, 1]]},
                "style": {"opacity": 1.0}}"#,
        )
        .unwrap();
        assert!(v.warnings.is_empty(), "{:?}", v.warnings);
        assert_eq!(bundle.timing.duration, Some(20));
        assert_eq!(bundle.curves[&Phase::Entry].len(), 2);
        assert_eq!(bundle.style["opacity"], json!(1.0));
    }

    #[test]
    fn legacy_components_layout_parses() {
        let (bundle, v) = PresetBundle::parse(
            r#"{"schema_version": 0,
                "components": {
                    "timing": {"start_frame": 1},
                    "curves": {
                        "in": [[0, 0], [1, 1]],
                        "out": [[0, 0], [0.5, 0.9], [1, 1]],
                        "glow": []
                    }
                }}"#,
        )
        .unwrap();
        assert!(v.warnings.iter().any(|w| w.contains("old schema")));
        assert!(v.warnings.iter().any(|w| w.contains("duration")));
        assert!(v.warnings.iter().any(|w| w.contains("glow")));
        assert_eq!(bundle.schema_version, Some(0));
        assert!(bundle.curves.contains_key(&Phase::Exit));
        assert_eq!(bundle.curves.len(), 2);
    }

    #[test]
    fn structural_problems_are_issues() {
        let v = PresetBundle::validate_value(&json!({"schema_version": 1}));
        assert_eq!(v.issues, vec!["no components".to_string()]);

        let v = PresetBundle::validate_value(&json!({"curves": {"hold": 3}}));
        assert!(!v.is_valid());

        let v = PresetBundle::validate_value(&json!({"curves": {"hold": [["a", 1]]}}));
        assert!(!v.is_valid());

        let err = PresetBundle::parse("[1, 2]").unwrap_err();
        assert!(matches!(err, AnimError::Bundle { .. }));
    }

    #[test]
    fn short_curves_warn_and_are_not_applied() {
        let (bundle, v) =
            PresetBundle::parse(r#"{"curves": {"hold": [[0.5, 0.5]]}}"#).unwrap();
        assert!(v.warnings.iter().any(|w| w.contains("fewer than 2")));
        let mut store = CurveStore::default();
        assert_eq!(bundle.apply_curves(&mut store, "T"), 0);
        assert!(store.curve("T", Phase::Hold).is_none());
    }

    #[test]
    fn missing_timing_fields_use_defaults() {
        let (bundle, _) = PresetBundle::parse(r#"{"timing": {"start_frame": 7}}"#).unwrap();
        let mut timing = TimingConfig {
            duration: 99,
            overlap: 42.0,
            ..TimingConfig::default()
        };
        bundle.apply_timing(&mut timing);
        assert_eq!(timing.start_frame, 7);
        assert_eq!(timing.duration, 50);
        assert_eq!(timing.overlap, 5.0);
    }

    #[test]
    fn capture_and_reapply() {
        let mut store = CurveStore::default();
        store.insert("T", Phase::Entry, PhaseCurve::from_xy(&[(0.0, 0.0), (0.3, 1.2), (1.0, 1.0)]));
        store.ensure_all("T");
        let timing = TimingConfig {
            overlap: 12.5,
            ..TimingConfig::default()
        };
        let json = PresetBundle::capture(&timing, &store, "T").to_json().unwrap();

        let (bundle, v) = PresetBundle::parse(&json).unwrap();
        assert!(v.warnings.is_empty());
        let mut other = CurveStore::default();
        assert_eq!(bundle.apply_curves(&mut other, "U"), 3);
        assert_eq!(other.curve("U", Phase::Entry), store.curve("T", Phase::Entry));

        let mut restored = TimingConfig::default();
        bundle.apply_timing(&mut restored);
        assert_eq!(restored, timing);
    }
}
