//! Closed-form easing functions `f(t) -> value` for `t` in [0, 1].
//!
//! These are stateless and independent of the curve store. They serve either
//! as templates for generating control points (`PhaseCurve::from_easing`) or
//! as direct evaluators.
//!
//! Back and elastic variants overshoot [0, 1]. Elastic and
//! exponential variants special-case the endpoints so that `f(0) == 0` and
//! `f(1) == 1` hold exactly.

use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimError;

/// Overshoot constant shared by the back family.
pub const BACK_OVERSHOOT: f32 = 1.70158;
/// Scale applied to [`BACK_OVERSHOOT`] by `ease_in_out_back`.
pub const BACK_IN_OUT_SCALE: f32 = 1.525;

pub const ELASTIC_AMPLITUDE: f32 = 1.0;
pub const ELASTIC_PERIOD: f32 = 0.3;
pub const ELASTIC_IN_OUT_PERIOD: f32 = 0.45;

const BOUNCE_N1: f32 = 7.5625;
const BOUNCE_D1: f32 = 2.75;

#[inline]
pub fn linear(t: f32) -> f32 {
    t
}

// --- sine ---

#[inline]
pub fn ease_in_sine(t: f32) -> f32 {
    1.0 - (t * PI / 2.0).cos()
}

#[inline]
pub fn ease_out_sine(t: f32) -> f32 {
    (t * PI / 2.0).sin()
}

#[inline]
pub fn ease_in_out_sine(t: f32) -> f32 {
    -((PI * t).cos() - 1.0) / 2.0
}

// --- polynomial families ---
//
// in:     t^n
// out:    1 - (1 - t)^n
// in-out: 2^(n-1) t^n below 0.5, mirrored above.

#[inline]
fn poly_in(t: f32, n: i32) -> f32 {
    t.powi(n)
}

#[inline]
fn poly_out(t: f32, n: i32) -> f32 {
    1.0 - (1.0 - t).powi(n)
}

#[inline]
fn poly_in_out(t: f32, n: i32) -> f32 {
    if t < 0.5 {
        2f32.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
    }
}

pub fn ease_in_quad(t: f32) -> f32 {
    poly_in(t, 2)
}
pub fn ease_out_quad(t: f32) -> f32 {
    poly_out(t, 2)
}
pub fn ease_in_out_quad(t: f32) -> f32 {
    poly_in_out(t, 2)
}
pub fn ease_in_cubic(t: f32) -> f32 {
    poly_in(t, 3)
}
pub fn ease_out_cubic(t: f32) -> f32 {
    poly_out(t, 3)
}
pub fn ease_in_out_cubic(t: f32) -> f32 {
    poly_in_out(t, 3)
}
pub fn ease_in_quart(t: f32) -> f32 {
    poly_in(t, 4)
}
pub fn ease_out_quart(t: f32) -> f32 {
    poly_out(t, 4)
}
pub fn ease_in_out_quart(t: f32) -> f32 {
    poly_in_out(t, 4)
}
pub fn ease_in_quint(t: f32) -> f32 {
    poly_in(t, 5)
}
pub fn ease_out_quint(t: f32) -> f32 {
    poly_out(t, 5)
}
pub fn ease_in_out_quint(t: f32) -> f32 {
    poly_in_out(t, 5)
}
pub fn ease_in_sextic(t: f32) -> f32 {
    poly_in(t, 6)
}
pub fn ease_out_sextic(t: f32) -> f32 {
    poly_out(t, 6)
}
pub fn ease_in_out_sextic(t: f32) -> f32 {
    poly_in_out(t, 6)
}
pub fn ease_in_septic(t: f32) -> f32 {
    poly_in(t, 7)
}
pub fn ease_out_septic(t: f32) -> f32 {
    poly_out(t, 7)
}
pub fn ease_in_out_septic(t: f32) -> f32 {
    poly_in_out(t, 7)
}
pub fn ease_in_octic(t: f32) -> f32 {
    poly_in(t, 8)
}
pub fn ease_out_octic(t: f32) -> f32 {
    poly_out(t, 8)
}
pub fn ease_in_out_octic(t: f32) -> f32 {
    poly_in_out(t, 8)
}

// --- exponential ---

pub fn ease_in_expo(t: f32) -> f32 {
    if t == 0.0 {
        0.0
    } else {
        2f32.powf(10.0 * t - 10.0)
    }
}

pub fn ease_out_expo(t: f32) -> f32 {
    if t == 1.0 {
        1.0
    } else {
        1.0 - 2f32.powf(-10.0 * t)
    }
}

pub fn ease_in_out_expo(t: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    if t < 0.5 {
        2f32.powf(20.0 * t - 10.0) / 2.0
    } else {
        (2.0 - 2f32.powf(-20.0 * t + 10.0)) / 2.0
    }
}

// --- circular ---

pub fn ease_in_circ(t: f32) -> f32 {
    1.0 - (1.0 - t * t).max(0.0).sqrt()
}

pub fn ease_out_circ(t: f32) -> f32 {
    (1.0 - (t - 1.0).powi(2)).max(0.0).sqrt()
}

pub fn ease_in_out_circ(t: f32) -> f32 {
    if t < 0.5 {
        (1.0 - (1.0 - 4.0 * t * t).max(0.0).sqrt()) / 2.0
    } else {
        ((1.0 - (-2.0 * t + 2.0).powi(2)).max(0.0).sqrt() + 1.0) / 2.0
    }
}

// --- back ---

pub fn ease_in_back_with(t: f32, s: f32) -> f32 {
    t * t * ((s + 1.0) * t - s)
}

pub fn ease_out_back_with(t: f32, s: f32) -> f32 {
    let u = t - 1.0;
    1.0 + (s + 1.0) * u.powi(3) + s * u.powi(2)
}

pub fn ease_in_out_back_with(t: f32, s: f32) -> f32 {
    let s = s * BACK_IN_OUT_SCALE;
    if t < 0.5 {
        ((2.0 * t).powi(2) * ((s + 1.0) * 2.0 * t - s)) / 2.0
    } else {
        ((2.0 * t - 2.0).powi(2) * ((s + 1.0) * (t * 2.0 - 2.0) + s) + 2.0) / 2.0
    }
}

pub fn ease_in_back(t: f32) -> f32 {
    ease_in_back_with(t, BACK_OVERSHOOT)
}
pub fn ease_out_back(t: f32) -> f32 {
    ease_out_back_with(t, BACK_OVERSHOOT)
}
pub fn ease_in_out_back(t: f32) -> f32 {
    ease_in_out_back_with(t, BACK_OVERSHOOT)
}

// --- elastic ---

/// Phase offset for the elastic family.
#[inline]
fn elastic_offset(amplitude: f32, period: f32) -> f32 {
    if amplitude >= 1.0 {
        period / (2.0 * PI) * (1.0 / amplitude).asin()
    } else {
        period / 4.0
    }
}

#[inline]
fn sane_period(period: f32) -> f32 {
    if period.is_finite() && period > 0.0 {
        period
    } else {
        ELASTIC_PERIOD
    }
}

pub fn ease_in_elastic_with(t: f32, amplitude: f32, period: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let p = sane_period(period);
    let s = elastic_offset(amplitude, p);
    let u = t - 1.0;
    -(amplitude * 2f32.powf(10.0 * u) * ((u - s) * (2.0 * PI) / p).sin())
}

pub fn ease_out_elastic_with(t: f32, amplitude: f32, period: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let p = sane_period(period);
    let s = elastic_offset(amplitude, p);
    amplitude * 2f32.powf(-10.0 * t) * ((t - s) * (2.0 * PI) / p).sin() + 1.0
}

pub fn ease_in_out_elastic_with(t: f32, amplitude: f32, period: f32) -> f32 {
    if t == 0.0 || t == 1.0 {
        return t;
    }
    let p = sane_period(period);
    let s = elastic_offset(amplitude, p);
    let u = 2.0 * t - 1.0;
    let wave = ((u - s) * (2.0 * PI) / p).sin();
    if u < 0.0 {
        -0.5 * amplitude * 2f32.powf(10.0 * u) * wave
    } else {
        0.5 * amplitude * 2f32.powf(-10.0 * u) * wave + 1.0
    }
}

pub fn ease_in_elastic(t: f32) -> f32 {
    ease_in_elastic_with(t, ELASTIC_AMPLITUDE, ELASTIC_PERIOD)
}
pub fn ease_out_elastic(t: f32) -> f32 {
    ease_out_elastic_with(t, ELASTIC_AMPLITUDE, ELASTIC_PERIOD)
}
pub fn ease_in_out_elastic(t: f32) -> f32 {
    ease_in_out_elastic_with(t, ELASTIC_AMPLITUDE, ELASTIC_IN_OUT_PERIOD)
}

// --- bounce ---

/// Four-segment piecewise quadratic.
pub fn ease_out_bounce(t: f32) -> f32 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    if t < 1.0 / BOUNCE_D1 {
        BOUNCE_N1 * t * t
    } else if t < 2.0 / BOUNCE_D1 {
        let t = t - 1.5 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.75
    } else if t < 2.5 / BOUNCE_D1 {
        let t = t - 2.25 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / BOUNCE_D1;
        BOUNCE_N1 * t * t + 0.984375
    }
}

pub fn ease_in_bounce(t: f32) -> f32 {
    1.0 - ease_out_bounce(1.0 - t)
}

pub fn ease_in_out_bounce(t: f32) -> f32 {
    if t < 0.5 {
        (1.0 - ease_out_bounce(1.0 - 2.0 * t)) / 2.0
    } else {
        (1.0 + ease_out_bounce(2.0 * t - 1.0)) / 2.0
    }
}

/// Named easing function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Easing {
    #[default]
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInSextic,
    EaseOutSextic,
    EaseInOutSextic,
    EaseInSeptic,
    EaseOutSeptic,
    EaseInOutSeptic,
    EaseInOctic,
    EaseOutOctic,
    EaseInOutOctic,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
}

impl Easing {
    pub const ALL: [Easing; 40] = [
        Easing::Linear,
        Easing::EaseInSine,
        Easing::EaseOutSine,
        Easing::EaseInOutSine,
        Easing::EaseInQuad,
        Easing::EaseOutQuad,
        Easing::EaseInOutQuad,
        Easing::EaseInCubic,
        Easing::EaseOutCubic,
        Easing::EaseInOutCubic,
        Easing::EaseInQuart,
        Easing::EaseOutQuart,
        Easing::EaseInOutQuart,
        Easing::EaseInQuint,
        Easing::EaseOutQuint,
        Easing::EaseInOutQuint,
        Easing::EaseInSextic,
        Easing::EaseOutSextic,
        Easing::EaseInOutSextic,
        Easing::EaseInSeptic,
        Easing::EaseOutSeptic,
        Easing::EaseInOutSeptic,
        Easing::EaseInOctic,
        Easing::EaseOutOctic,
        Easing::EaseInOutOctic,
        Easing::EaseInExpo,
        Easing::EaseOutExpo,
        Easing::EaseInOutExpo,
        Easing::EaseInCirc,
        Easing::EaseOutCirc,
        Easing::EaseInOutCirc,
        Easing::EaseInBack,
        Easing::EaseOutBack,
        Easing::EaseInOutBack,
        Easing::EaseInElastic,
        Easing::EaseOutElastic,
        Easing::EaseInOutElastic,
        Easing::EaseInBounce,
        Easing::EaseOutBounce,
        Easing::EaseInOutBounce,
    ];

    /// Evaluate at `t`. Input is not clamped.
    pub fn apply(self, t: f32) -> f32 {
        self.function()(t)
    }

    pub fn function(self) -> fn(f32) -> f32 {
        match self {
            Easing::Linear => linear,
            Easing::EaseInSine => ease_in_sine,
            Easing::EaseOutSine => ease_out_sine,
            Easing::EaseInOutSine => ease_in_out_sine,
            Easing::EaseInQuad => ease_in_quad,
            Easing::EaseOutQuad => ease_out_quad,
            Easing::EaseInOutQuad => ease_in_out_quad,
            Easing::EaseInCubic => ease_in_cubic,
            Easing::EaseOutCubic => ease_out_cubic,
            Easing::EaseInOutCubic => ease_in_out_cubic,
            Easing::EaseInQuart => ease_in_quart,
            Easing::EaseOutQuart => ease_out_quart,
            Easing::EaseInOutQuart => ease_in_out_quart,
            Easing::EaseInQuint => ease_in_quint,
            Easing::EaseOutQuint => ease_out_quint,
            Easing::EaseInOutQuint => ease_in_out_quint,
            Easing::EaseInSextic => ease_in_sextic,
            Easing::EaseOutSextic => ease_out_sextic,
            Easing::EaseInOutSextic => ease_in_out_sextic,
            Easing::EaseInSeptic => ease_in_septic,
            Easing::EaseOutSeptic => ease_out_septic,
            Easing::EaseInOutSeptic => ease_in_out_septic,
            Easing::EaseInOctic => ease_in_octic,
            Easing::EaseOutOctic => ease_out_octic,
            Easing::EaseInOutOctic => ease_in_out_octic,
            Easing::EaseInExpo => ease_in_expo,
            Easing::EaseOutExpo => ease_out_expo,
            Easing::EaseInOutExpo => ease_in_out_expo,
            Easing::EaseInCirc => ease_in_circ,
            Easing::EaseOutCirc => ease_out_circ,
            Easing::EaseInOutCirc => ease_in_out_circ,
            Easing::EaseInBack => ease_in_back,
            Easing::EaseOutBack => ease_out_back,
            Easing::EaseInOutBack => ease_in_out_back,
            Easing::EaseInElastic => ease_in_elastic,
            Easing::EaseOutElastic => ease_out_elastic,
            Easing::EaseInOutElastic => ease_in_out_elastic,
            Easing::EaseInBounce => ease_in_bounce,
            Easing::EaseOutBounce => ease_out_bounce,
            Easing::EaseInOutBounce => ease_in_out_bounce,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Easing::Linear => "linear",
            Easing::EaseInSine => "ease_in_sine",
            Easing::EaseOutSine => "ease_out_sine",
            Easing::EaseInOutSine => "ease_in_out_sine",
            Easing::EaseInQuad => "ease_in_quad",
            Easing::EaseOutQuad => "ease_out_quad",
            Easing::EaseInOutQuad => "ease_in_out_quad",
            Easing::EaseInCubic => "ease_in_cubic",
            Easing::EaseOutCubic => "ease_out_cubic",
            Easing::EaseInOutCubic => "ease_in_out_cubic",
            Easing::EaseInQuart => "ease_in_quart",
            Easing::EaseOutQuart => "ease_out_quart",
            Easing::EaseInOutQuart => "ease_in_out_quart",
            Easing::EaseInQuint => "ease_in_quint",
            Easing::EaseOutQuint => "ease_out_quint",
            Easing::EaseInOutQuint => "ease_in_out_quint",
            Easing::EaseInSextic => "ease_in_sextic",
            Easing::EaseOutSextic => "ease_out_sextic",
            Easing::EaseInOutSextic => "ease_in_out_sextic",
            Easing::EaseInSeptic => "ease_in_septic",
            Easing::EaseOutSeptic => "ease_out_septic",
            Easing::EaseInOutSeptic => "ease_in_out_septic",
            Easing::EaseInOctic => "ease_in_octic",
            Easing::EaseOutOctic => "ease_out_octic",
            Easing::EaseInOutOctic => "ease_in_out_octic",
            Easing::EaseInExpo => "ease_in_expo",
            Easing::EaseOutExpo => "ease_out_expo",
            Easing::EaseInOutExpo => "ease_in_out_expo",
            Easing::EaseInCirc => "ease_in_circ",
            Easing::EaseOutCirc => "ease_out_circ",
            Easing::EaseInOutCirc => "ease_in_out_circ",
            Easing::EaseInBack => "ease_in_back",
            Easing::EaseOutBack => "ease_out_back",
            Easing::EaseInOutBack => "ease_in_out_back",
            Easing::EaseInElastic => "ease_in_elastic",
            Easing::EaseOutElastic => "ease_out_elastic",
            Easing::EaseInOutElastic => "ease_in_out_elastic",
            Easing::EaseInBounce => "ease_in_bounce",
            Easing::EaseOutBounce => "ease_out_bounce",
            Easing::EaseInOutBounce => "ease_in_out_bounce",
        }
    }

    /// Whether the function leaves [0, 1] for some `t` in [0, 1].
    pub fn overshoots(self) -> bool {
        matches!(
            self,
            Easing::EaseInBack
                | Easing::EaseOutBack
                | Easing::EaseInOutBack
                | Easing::EaseInElastic
                | Easing::EaseOutElastic
                | Easing::EaseInOutElastic
        )
    }
}

impl fmt::Display for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Easing {
    type Err = AnimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Easing::ALL
            .iter()
            .copied()
            .find(|e| e.name() == wanted)
            .ok_or(AnimError::UnknownEasing {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    #[test]
    fn endpoints_hold_for_every_function() {
        for e in Easing::ALL {
            assert!((e.apply(0.0)).abs() < EPS, "{e} at 0 = {}", e.apply(0.0));
            assert!((e.apply(1.0) - 1.0).abs() < EPS, "{e} at 1 = {}", e.apply(1.0));
        }
    }

    #[test]
    fn in_out_variants_pass_through_midpoint() {
        for e in Easing::ALL.iter().filter(|e| e.name().contains("in_out")) {
            assert!((e.apply(0.5) - 0.5).abs() < 1e-4, "{e} at 0.5 = {}", e.apply(0.5));
        }
    }

    #[test]
    fn bounce_exact_values() {
        assert_eq!(ease_out_bounce(1.0), 1.0);
        assert_eq!(ease_out_bounce(0.0), 0.0);
        assert_eq!(ease_in_out_bounce(0.5), (1.0 + ease_out_bounce(0.0)) / 2.0);
        assert_eq!(ease_in_out_bounce(0.5), 0.5);
    }

    #[test]
    fn elastic_endpoints_are_exact_for_any_parameters() {
        for &(a, p) in &[(1.0, 0.3), (0.5, 0.3), (2.0, 0.45), (1.0, 0.0), (3.0, 1.2)] {
            assert_eq!(ease_in_elastic_with(0.0, a, p), 0.0);
            assert_eq!(ease_in_elastic_with(1.0, a, p), 1.0);
            assert_eq!(ease_out_elastic_with(0.0, a, p), 0.0);
            assert_eq!(ease_out_elastic_with(1.0, a, p), 1.0);
            assert_eq!(ease_in_out_elastic_with(0.0, a, p), 0.0);
            assert_eq!(ease_in_out_elastic_with(1.0, a, p), 1.0);
        }
    }

    #[test]
    fn back_overshoots_below_zero() {
        assert!(ease_in_back(0.2) < 0.0);
        assert!(ease_out_back(0.8) > 1.0);
        assert!(Easing::EaseInBack.overshoots());
        assert!(!Easing::EaseOutBounce.overshoots());
    }

    #[test]
    fn names_round_trip() {
        for e in Easing::ALL {
            assert_eq!(e.name().parse::<Easing>().unwrap(), e);
        }
        assert_eq!("Ease-In-Out-Cubic".parse::<Easing>().unwrap(), Easing::EaseInOutCubic);
        assert!("wobble".parse::<Easing>().is_err());
        let json = serde_json::to_string(&Easing::EaseOutBounce).unwrap();
        assert_eq!(json, "\"ease_out_bounce\"");
    }

    #[test]
    fn polynomial_ordering() {
        // Higher orders start slower.
        let t = 0.3;
        assert!(ease_in_quad(t) > ease_in_cubic(t));
        assert!(ease_in_cubic(t) > ease_in_octic(t));
        assert!(ease_out_quad(t) < ease_out_octic(t));
    }
}
