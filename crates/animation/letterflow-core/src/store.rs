//! Keyed curve storage: one [`PhaseCurve`] per (base name, phase).
//!
//! Identities are host object names. They are cleaned into a base name so that
//! duplicated objects (`Title.001`, `Title_copy`) share curves with the source.
//! Curves are created lazily from the default presets on first request.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::curve::{ControlPoint, CurveIssue, PhaseCurve};
use crate::error::AnimError;
use crate::phase::Phase;
use crate::scene::Scene;
use crate::stage::OvershootConfig;
use crate::Result;

/// Suffixes stripped (in this order) when deriving a base name.
pub const BASE_NAME_SUFFIXES: [&str; 4] = ["_Root", "_copy", ".001", ".002"];

/// Test points used by [`CurveStore::debug_evaluate`] when none are given.
pub const DEFAULT_DEBUG_POINTS: [f32; 3] = [0.0, 0.5, 1.0];

/// Strip volatile suffixes from an object name.
pub fn clean_base_name(name: &str) -> String {
    let mut base = name;
    for suffix in BASE_NAME_SUFFIXES {
        if let Some(stripped) = base.strip_suffix(suffix) {
            base = stripped;
        }
    }
    if base.is_empty() {
        "default".to_string()
    } else {
        base.to_string()
    }
}

/// Stable node key `<clean>_curve_<phase>`; characters other than
/// alphanumerics, `_` and `-` are dropped.
pub fn curve_node_name(base_name: &str, phase: Phase) -> String {
    let clean: String = base_name
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    format!("{clean}_curve_{}", phase.name())
}

/// Audit behaviour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Replace invalid curves with presets instead of only reporting them.
    pub auto_repair: bool,
    pub log_details: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            auto_repair: true,
            log_details: true,
        }
    }
}

/// Which curves an audit visits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuditScope {
    /// Every base name the store knows about.
    All,
    /// One host object, resolved through the scene.
    Object(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditFinding {
    pub base_name: String,
    pub phase: Phase,
    pub issue: CurveIssue,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    /// Identities visited.
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// Curves (not identities) replaced with presets.
    pub repaired: usize,
    pub findings: Vec<AuditFinding>,
}

/// One exported phase curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SerializedCurve {
    pub points: Vec<ControlPoint>,
    #[serde(default)]
    pub node_name: String,
}

/// Persistence format for the three curves of one object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurveExport {
    pub object_name: String,
    pub base_name: String,
    pub curves: BTreeMap<Phase, SerializedCurve>,
    /// Host frame at export time.
    #[serde(default)]
    pub export_time: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugSample {
    pub t: f32,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebugReport {
    pub object_name: String,
    pub base_name: String,
    pub test_points: Vec<f32>,
    pub results: BTreeMap<Phase, Vec<DebugSample>>,
}

type PhaseSlots = [Option<PhaseCurve>; 3];

/// Curve storage owned by a session.
#[derive(Debug)]
pub struct CurveStore {
    curves: HashMap<String, PhaseSlots>,
    y_limit: f32,
}

impl Default for CurveStore {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl CurveStore {
    /// `y_limit` bounds control point values for audit and import.
    pub fn new(y_limit: f32) -> Self {
        Self {
            curves: HashMap::new(),
            y_limit: y_limit.abs(),
        }
    }

    #[inline]
    pub fn y_limit(&self) -> f32 {
        self.y_limit
    }

    pub fn set_y_limit(&mut self, limit: f32) {
        self.y_limit = limit.abs();
    }

    /// Base names with at least one stored curve, sorted.
    pub fn base_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.curves.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    // ---- base-name level ----

    /// Stored curve, without creating it.
    #[inline]
    pub fn curve(&self, base_name: &str, phase: Phase) -> Option<&PhaseCurve> {
        self.curves
            .get(base_name)
            .and_then(|slots| slots[phase.index()].as_ref())
    }

    /// Stored curve, created from the phase preset when missing.
    pub fn ensure(&mut self, base_name: &str, phase: Phase) -> &PhaseCurve {
        let slots = self
            .curves
            .entry_ref(base_name)
            .or_insert_with(Default::default);
        slots[phase.index()].get_or_insert_with(|| {
            debug!("Created curve {}", curve_node_name(base_name, phase));
            PhaseCurve::preset(phase)
        })
    }

    /// Create every missing phase curve for `base_name`.
    pub fn ensure_all(&mut self, base_name: &str) {
        for phase in Phase::ALL {
            self.ensure(base_name, phase);
        }
    }

    /// Store a curve as given. No validation; see [`CurveStore::audit`].
    pub fn insert(&mut self, base_name: &str, phase: Phase, curve: PhaseCurve) {
        let slots = self
            .curves
            .entry_ref(base_name)
            .or_insert_with(Default::default);
        slots[phase.index()] = Some(curve);
    }

    pub fn remove(&mut self, base_name: &str) -> bool {
        self.curves.remove(base_name).is_some()
    }

    pub fn clear(&mut self) {
        self.curves.clear();
    }

    // ---- identity level ----

    fn resolve(&self, scene: &dyn Scene, identity: &str) -> Result<(String, String)> {
        let id = scene.find(identity).ok_or_else(|| AnimError::EntityNotFound {
            name: identity.to_string(),
        })?;
        let object_name = scene.name(id).unwrap_or(identity).to_string();
        let base = clean_base_name(&object_name);
        Ok((object_name, base))
    }

    /// Curve for a live host object, created lazily. `None` when the identity
    /// does not resolve.
    pub fn get_or_create(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        phase: Phase,
    ) -> Option<&PhaseCurve> {
        let (_, base) = self.resolve(scene, identity).ok()?;
        Some(self.ensure(&base, phase))
    }

    /// Replace the points of one phase curve. Points are sorted by x.
    pub fn set_points(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        phase: Phase,
        points: Vec<ControlPoint>,
    ) -> Result<()> {
        let (_, base) = self.resolve(scene, identity)?;
        self.insert(&base, phase, PhaseCurve::new(points));
        Ok(())
    }

    /// Duplicate points and handle types from one phase to another.
    pub fn copy(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        from: Phase,
        to: Phase,
    ) -> Result<()> {
        let (_, base) = self.resolve(scene, identity)?;
        let source = self.ensure(&base, from).clone();
        self.insert(&base, to, source);
        debug!("Copied {from} curve to {to} for {base}");
        Ok(())
    }

    /// Put all three phases back to their presets.
    pub fn reset_all(&mut self, scene: &dyn Scene, identity: &str) -> Result<()> {
        let (_, base) = self.resolve(scene, identity)?;
        for phase in Phase::ALL {
            self.insert(&base, phase, PhaseCurve::preset(phase));
        }
        info!("Reset curves for {base}");
        Ok(())
    }

    /// Replace invalid phase curves with presets. Returns how many were replaced.
    pub fn repair(&mut self, scene: &dyn Scene, identity: &str) -> Result<usize> {
        let (_, base) = self.resolve(scene, identity)?;
        Ok(self.repair_base(&base))
    }

    fn repair_base(&mut self, base_name: &str) -> usize {
        let limit = self.y_limit;
        let mut repaired = 0;
        for phase in Phase::ALL {
            if !self.ensure(base_name, phase).is_valid(limit) {
                self.insert(base_name, phase, PhaseCurve::preset(phase));
                repaired += 1;
            }
        }
        repaired
    }

    /// Check curves for structure and range problems, repairing them when
    /// `config.auto_repair` is set.
    pub fn audit(
        &mut self,
        scene: &dyn Scene,
        scope: &AuditScope,
        config: &AuditConfig,
    ) -> AuditReport {
        let bases: Vec<String> = match scope {
            AuditScope::All => self.base_names().into_iter().map(str::to_string).collect(),
            AuditScope::Object(identity) => match self.resolve(scene, identity) {
                Ok((_, base)) => vec![base],
                Err(err) => {
                    warn!("Audit skipped: {err}");
                    Vec::new()
                }
            },
        };

        let limit = self.y_limit;
        let mut report = AuditReport::default();
        for base in bases {
            report.total += 1;
            let mut clean = true;
            for phase in Phase::ALL {
                let issues = self.ensure(&base, phase).issues(limit);
                if issues.is_empty() {
                    continue;
                }
                clean = false;
                for issue in issues {
                    if config.log_details {
                        warn!("{}: {issue}", curve_node_name(&base, phase));
                    }
                    report.findings.push(AuditFinding {
                        base_name: base.clone(),
                        phase,
                        issue,
                    });
                }
            }
            if clean {
                report.valid += 1;
            } else {
                report.invalid += 1;
                if config.auto_repair {
                    report.repaired += self.repair_base(&base);
                }
            }
        }

        if config.log_details {
            info!(
                "Curve audit completed: {}/{} valid, {} repaired",
                report.valid, report.total, report.repaired
            );
        }
        report
    }

    /// Evaluate every phase at the given points (default `[0, 0.5, 1]`) with
    /// the same overshoot clamp the frame path applies.
    pub fn debug_evaluate(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        test_points: Option<&[f32]>,
        overshoot: &OvershootConfig,
    ) -> Result<DebugReport> {
        let (object_name, base) = self.resolve(scene, identity)?;
        let test_points = test_points.unwrap_or(&DEFAULT_DEBUG_POINTS).to_vec();
        let mut results = BTreeMap::new();
        for phase in Phase::ALL {
            let curve = self.ensure(&base, phase);
            let samples = test_points
                .iter()
                .map(|&t| DebugSample {
                    t,
                    value: overshoot.apply(curve.evaluate(t)),
                })
                .collect();
            results.insert(phase, samples);
        }
        Ok(DebugReport {
            object_name,
            base_name: base,
            test_points,
            results,
        })
    }

    /// Serialize the three curves of an object.
    pub fn export(&mut self, scene: &dyn Scene, identity: &str, frame: i64) -> Result<CurveExport> {
        let (object_name, base) = self.resolve(scene, identity)?;
        let mut curves = BTreeMap::new();
        for phase in Phase::ALL {
            let points = self.ensure(&base, phase).points().to_vec();
            curves.insert(
                phase,
                SerializedCurve {
                    points,
                    node_name: curve_node_name(&base, phase),
                },
            );
        }
        Ok(CurveExport {
            object_name,
            base_name: base,
            curves,
            export_time: frame,
        })
    }

    /// Load curves from an export. Phases absent from `data` are left alone.
    /// Nothing is written unless every provided curve is valid. Returns the
    /// number of phases imported.
    pub fn import(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        data: &CurveExport,
    ) -> Result<usize> {
        let (object_name, base) = self.resolve(scene, identity)?;

        let mut staged = Vec::with_capacity(data.curves.len());
        for (&phase, serialized) in &data.curves {
            let curve = PhaseCurve::new(serialized.points.iter().copied());
            if let Some(issue) = curve.issues(self.y_limit).into_iter().next() {
                return Err(AnimError::InvalidCurve {
                    base_name: base,
                    phase: phase.to_string(),
                    reason: issue.to_string(),
                });
            }
            staged.push((phase, curve));
        }

        let count = staged.len();
        for (phase, curve) in staged {
            self.insert(&base, phase, curve);
        }
        info!("Imported {count} curves for {object_name}");
        Ok(count)
    }

    pub fn import_json(&mut self, scene: &dyn Scene, identity: &str, json: &str) -> Result<usize> {
        let data: CurveExport = serde_json::from_str(json)?;
        self.import(scene, identity, &data)
    }
}
