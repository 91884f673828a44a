//! Piecewise phase curves.
//!
//! A curve is an x-sorted list of control points. Evaluation is cubic Hermite
//! between neighbouring points with tangents derived from each point's handle
//! type:
//! - `Auto`: centred difference of the neighbours (one-sided at the ends).
//! - `AutoClamped`: like `Auto` but flattened at local extrema and limited so a
//!   monotone run of points never overshoots.
//! - `Vector`: each side uses the secant towards its neighbour, so a segment
//!   between two vector points is a straight line.
//!
//! Outside the first/last point the curve holds the end value.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::easing::Easing;
use crate::phase::Phase;

/// Handle classification for a control point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HandleType {
    #[default]
    #[serde(alias = "auto")]
    Auto,
    #[serde(alias = "auto_clamped")]
    AutoClamped,
    #[serde(alias = "vector")]
    Vector,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub handle_type: HandleType,
}

impl ControlPoint {
    #[inline]
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            handle_type: HandleType::Auto,
        }
    }

    #[inline]
    pub fn with_handle(mut self, handle_type: HandleType) -> Self {
        self.handle_type = handle_type;
        self
    }
}

impl From<(f32, f32)> for ControlPoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// A problem found while validating a curve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CurveIssue {
    TooFewPoints { count: usize },
    NonFinite { index: usize },
    XOutOfRange { index: usize, x: f32 },
    YOutOfRange { index: usize, y: f32, limit: f32 },
}

impl fmt::Display for CurveIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveIssue::TooFewPoints { count } => {
                write!(f, "insufficient points ({count}, need at least 2)")
            }
            CurveIssue::NonFinite { index } => write!(f, "point {index} is not finite"),
            CurveIssue::XOutOfRange { index, x } => {
                write!(f, "point {index} x={x} outside [0, 1]")
            }
            CurveIssue::YOutOfRange { index, y, limit } => {
                write!(f, "point {index} y={y} outside [-{limit}, {limit}]")
            }
        }
    }
}

/// Ordered control points for one (identity, phase) pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhaseCurve {
    points: Vec<ControlPoint>,
}

impl PhaseCurve {
    /// Build a curve, sorting points by x. No range checks; see [`PhaseCurve::issues`].
    pub fn new(points: impl IntoIterator<Item = ControlPoint>) -> Self {
        let mut points: Vec<ControlPoint> = points.into_iter().collect();
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        Self { points }
    }

    pub fn from_xy(points: &[(f32, f32)]) -> Self {
        Self::new(points.iter().copied().map(ControlPoint::from))
    }

    /// Default shape for a phase.
    pub fn preset(phase: Phase) -> Self {
        match phase {
            Phase::Entry => Self::from_xy(&[(0.0, 0.0), (0.5, 0.25), (1.0, 1.0)]),
            Phase::Hold => Self::from_xy(&[(0.0, 0.0), (1.0, 1.0)]),
            Phase::Exit => Self::from_xy(&[(0.0, 0.0), (0.5, 0.75), (1.0, 1.0)]),
        }
    }

    /// Sample an easing function into `samples` evenly spaced auto points.
    pub fn from_easing(easing: Easing, samples: usize) -> Self {
        let n = samples.max(2);
        let last = (n - 1) as f32;
        Self::new((0..n).map(|i| {
            let x = i as f32 / last;
            ControlPoint::new(x, easing.apply(x))
        }))
    }

    #[inline]
    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Validation against `x ∈ [0,1]`, `y ∈ [-limit, limit]`, at least two points.
    pub fn issues(&self, limit: f32) -> Vec<CurveIssue> {
        let mut out = Vec::new();
        if self.points.len() < 2 {
            out.push(CurveIssue::TooFewPoints {
                count: self.points.len(),
            });
        }
        for (index, p) in self.points.iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() {
                out.push(CurveIssue::NonFinite { index });
                continue;
            }
            if !(0.0..=1.0).contains(&p.x) {
                out.push(CurveIssue::XOutOfRange { index, x: p.x });
            }
            if p.y < -limit || p.y > limit {
                out.push(CurveIssue::YOutOfRange {
                    index,
                    y: p.y,
                    limit,
                });
            }
        }
        out
    }

    #[inline]
    pub fn is_valid(&self, limit: f32) -> bool {
        self.issues(limit).is_empty()
    }

    /// Evaluate the curve at `t`.
    /// An empty curve is the identity; a single point is a constant.
    pub fn evaluate(&self, t: f32) -> f32 {
        let pts = &self.points;
        let t = if t.is_nan() { 0.0 } else { t };
        match pts.len() {
            0 => return t,
            1 => return pts[0].y,
            _ => {}
        }
        let n = pts.len();
        if t <= pts[0].x {
            return pts[0].y;
        }
        if t >= pts[n - 1].x {
            return pts[n - 1].y;
        }
        // First point strictly right of t; guaranteed in 1..n by the checks above.
        let hi = pts.partition_point(|p| p.x <= t).clamp(1, n - 1);
        let lo = hi - 1;
        let (p0, p1) = (pts[lo], pts[hi]);
        let h = p1.x - p0.x;
        if h <= f32::EPSILON {
            return p1.y;
        }
        let secant = (p1.y - p0.y) / h;
        let m0 = self.tangent(lo, Side::Out);
        let m1 = self.tangent(hi, Side::In);
        let s = ((t - p0.x) / h).clamp(0.0, 1.0);
        if m0 == secant && m1 == secant {
            return p0.y + (p1.y - p0.y) * s;
        }
        hermite(p0.y, p1.y, m0 * h, m1 * h, s)
    }

    fn secant(&self, a: usize, b: usize) -> f32 {
        let (pa, pb) = (self.points[a], self.points[b]);
        let dx = (pb.x - pa.x).max(f32::EPSILON);
        (pb.y - pa.y) / dx
    }

    fn tangent(&self, i: usize, side: Side) -> f32 {
        let n = self.points.len();
        let prev = (i > 0).then(|| self.secant(i - 1, i));
        let next = (i + 1 < n).then(|| self.secant(i, i + 1));
        match self.points[i].handle_type {
            HandleType::Vector => match side {
                Side::In => prev.or(next).unwrap_or(0.0),
                Side::Out => next.or(prev).unwrap_or(0.0),
            },
            HandleType::Auto => match (prev, next) {
                (Some(_), Some(_)) => self.centred(i),
                (Some(d), None) | (None, Some(d)) => d,
                (None, None) => 0.0,
            },
            HandleType::AutoClamped => match (prev, next) {
                (Some(a), Some(b)) => {
                    if a * b <= 0.0 {
                        0.0
                    } else {
                        let m = self.centred(i);
                        let cap = 3.0 * a.abs().min(b.abs());
                        m.clamp(-cap, cap)
                    }
                }
                (Some(d), None) | (None, Some(d)) => d,
                (None, None) => 0.0,
            },
        }
    }

    fn centred(&self, i: usize) -> f32 {
        let (pa, pb) = (self.points[i - 1], self.points[i + 1]);
        let dx = (pb.x - pa.x).max(f32::EPSILON);
        (pb.y - pa.y) / dx
    }
}

#[derive(Clone, Copy)]
enum Side {
    In,
    Out,
}

/// Cubic Hermite on the unit interval; tangents already scaled by segment width.
#[inline]
fn hermite(y0: f32, y1: f32, m0: f32, m1: f32, s: f32) -> f32 {
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;
    h00 * y0 + h10 * m0 + h01 * y1 + h11 * m1
}
