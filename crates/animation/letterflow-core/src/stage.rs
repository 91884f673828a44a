//! Stage evaluation: phase curve lookup, overshoot policy and cross-phase
//! blending.
//!
//! Two strategies exist and they disagree near phase boundaries:
//! - [`EvaluationStrategy::HardSwitch`] picks exactly one phase per local time
//!   and is what the per-frame applier uses. It jumps at `in_end` whenever the
//!   entry curve does not end where the hold curve starts.
//! - [`EvaluationStrategy::Blended`] evaluates all three phases and
//!   cross-fades them inside a zone around each boundary. It is continuous and
//!   equals the hard switch away from the boundaries.

use serde::{Deserialize, Serialize};

use crate::curve::PhaseCurve;
use crate::easing::ease_in_out_sine;
use crate::error::AnimError;
use crate::phase::{Phase, PhaseThresholds};
use crate::store::CurveStore;
use crate::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationStrategy {
    #[default]
    HardSwitch,
    Blended,
}

/// Output clamping.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OvershootConfig {
    /// When false values are clamped to [0, 1].
    pub enabled: bool,
    pub limit: f32,
}

impl Default for OvershootConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 2.0,
        }
    }
}

impl OvershootConfig {
    #[inline]
    pub fn apply(&self, value: f32) -> f32 {
        if self.enabled {
            let limit = self.limit.abs();
            value.clamp(-limit, limit)
        } else {
            value.clamp(0.0, 1.0)
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    #[default]
    Smooth,
    Linear,
    EaseInOut,
}

impl BlendMode {
    /// Cross-fade shape on [0, 1].
    #[inline]
    pub fn shape(self, x: f32) -> f32 {
        let x = x.clamp(0.0, 1.0);
        match self {
            BlendMode::Smooth => smooth_step(x),
            BlendMode::Linear => x,
            BlendMode::EaseInOut => ease_in_out_sine(x),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    /// Blend zone as a fraction of the phase band width.
    pub width: f32,
    pub mode: BlendMode,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            width: 0.1,
            mode: BlendMode::Smooth,
        }
    }
}

/// `0` below 0, `1` above 1, `x²(3 − 2x)` between.
#[inline]
pub fn smooth_step(x: f32) -> f32 {
    if x <= 0.0 {
        0.0
    } else if x >= 1.0 {
        1.0
    } else {
        x * x * (3.0 - 2.0 * x)
    }
}

/// Weight of a phase at `t`: `smooth_step(1 - d / blend_width)` where `d` is
/// the distance to the nearer band edge, so 1 at the edge itself and falling to
/// 0 as `d` approaches `blend_width`. Outside that zone the weight is 1.
pub fn blend_factor(t: f32, phase_start: f32, phase_end: f32, blend_width: f32) -> f32 {
    if blend_width <= 0.0 {
        return 1.0;
    }
    let to_start = (t - phase_start).abs();
    let to_end = (t - phase_end).abs();
    if to_start < blend_width {
        smooth_step(1.0 - to_start / blend_width)
    } else if to_end < blend_width {
        smooth_step(1.0 - to_end / blend_width)
    } else {
        1.0
    }
}

/// Result of the hard-switch strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseSample {
    pub phase: Phase,
    /// Time renormalized into the phase band.
    pub local_t: f32,
    pub value: f32,
}

/// One phase's share of a blended evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseContribution {
    pub phase: Phase,
    pub local_t: f32,
    /// Curve value after the overshoot policy.
    pub raw: f32,
    pub weight: f32,
    /// `raw * weight`.
    pub value: f32,
}

/// Result of the blended strategy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlendedSample {
    /// Indexed by [`Phase::index`].
    pub contributions: [PhaseContribution; 3],
    /// Boundary cross-fade of the three raw values.
    pub value: f32,
}

impl BlendedSample {
    #[inline]
    pub fn contribution(&self, phase: Phase) -> &PhaseContribution {
        &self.contributions[phase.index()]
    }
}

/// Evaluates the curves of one store under shared thresholds and policies.
#[derive(Clone, Copy, Debug)]
pub struct StageEvaluator<'a> {
    store: &'a CurveStore,
    pub thresholds: PhaseThresholds,
    pub blend: BlendConfig,
    pub overshoot: OvershootConfig,
}

impl<'a> StageEvaluator<'a> {
    pub fn new(store: &'a CurveStore) -> Self {
        Self {
            store,
            thresholds: PhaseThresholds::default(),
            blend: BlendConfig::default(),
            overshoot: OvershootConfig::default(),
        }
    }

    pub fn with_thresholds(mut self, thresholds: PhaseThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_blend(mut self, blend: BlendConfig) -> Self {
        self.blend = blend;
        self
    }

    pub fn with_overshoot(mut self, overshoot: OvershootConfig) -> Self {
        self.overshoot = overshoot;
        self
    }

    /// Evaluate one phase curve at phase-local time. Missing curves act as the
    /// identity.
    pub fn evaluate_phase(&self, base_name: &str, phase: Phase, local_t: f32) -> Result<f32> {
        let raw = match self.store.curve(base_name, phase) {
            Some(curve) => curve.evaluate(local_t),
            None => local_t,
        };
        self.finish(base_name, phase, raw)
    }

    /// Same as [`StageEvaluator::evaluate_phase`] against an explicit curve.
    pub fn evaluate_curve(&self, curve: &PhaseCurve, local_t: f32) -> f32 {
        self.overshoot.apply(curve.evaluate(local_t))
    }

    fn finish(&self, base_name: &str, phase: Phase, raw: f32) -> Result<f32> {
        if !raw.is_finite() {
            return Err(AnimError::Evaluation {
                reason: format!("{base_name}/{phase} produced {raw}"),
            });
        }
        Ok(self.overshoot.apply(raw))
    }

    pub fn hard_switch(&self, base_name: &str, t: f32) -> Result<PhaseSample> {
        let (phase, local_t) = self.thresholds.select(t);
        let value = self.evaluate_phase(base_name, phase, local_t)?;
        Ok(PhaseSample {
            phase,
            local_t,
            value,
        })
    }

    pub fn blended(&self, base_name: &str, t: f32) -> Result<BlendedSample> {
        let th = &self.thresholds;
        let width = self.blend.width.max(0.0);

        let mut contributions = [PhaseContribution {
            phase: Phase::Entry,
            local_t: 0.0,
            raw: 0.0,
            weight: 0.0,
            value: 0.0,
        }; 3];
        for phase in Phase::ALL {
            let (start, end) = th.band(phase);
            let local_t = th.phase_time(phase, t);
            let raw = self.evaluate_phase(base_name, phase, local_t)?;
            let weight = blend_factor(t, start, end, width * (end - start));
            contributions[phase.index()] = PhaseContribution {
                phase,
                local_t,
                raw,
                weight,
                value: raw * weight,
            };
        }

        let entry = contributions[Phase::Entry.index()].raw;
        let hold = contributions[Phase::Hold.index()].raw;
        let exit = contributions[Phase::Exit.index()].raw;

        let a_in = self.crossfade(t, th.in_end, Phase::Entry, Phase::Hold, |t, b| t >= b);
        let a_out = self.crossfade(t, th.out_start, Phase::Hold, Phase::Exit, |t, b| t > b);
        let value = lerp(lerp(entry, hold, a_in), exit, a_out);

        Ok(BlendedSample {
            contributions,
            value,
        })
    }

    /// Weight of the later phase around boundary `b`. The zone is
    /// `blend.width` (at most half) of the narrower neighbouring band on each
    /// side; a zero-width zone degenerates to the hard switch rule.
    fn crossfade(
        &self,
        t: f32,
        b: f32,
        before: Phase,
        after: Phase,
        past: impl Fn(f32, f32) -> bool,
    ) -> f32 {
        let (s0, e0) = self.thresholds.band(before);
        let (s1, e1) = self.thresholds.band(after);
        let narrow = (e0 - s0).min(e1 - s1).max(0.0);
        let w = self.blend.width.clamp(0.0, 0.5) * narrow;
        if w <= 0.0 {
            return if past(t, b) { 1.0 } else { 0.0 };
        }
        self.blend.mode.shape((t - (b - w)) / (2.0 * w))
    }

    /// Combined value under `strategy`.
    pub fn evaluate(&self, strategy: EvaluationStrategy, base_name: &str, t: f32) -> Result<f32> {
        match strategy {
            EvaluationStrategy::HardSwitch => self.hard_switch(base_name, t).map(|s| s.value),
            EvaluationStrategy::Blended => self.blended(base_name, t).map(|s| s.value),
        }
    }
}

#[inline]
fn lerp(a: f32, b: f32, alpha: f32) -> f32 {
    a + (b - a) * alpha
}
