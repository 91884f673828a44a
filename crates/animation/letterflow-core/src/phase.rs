//! Animation phases (entry, hold, exit) and the thresholds that split a
//! fragment's local time into phase bands.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimError;

/// One of the three sub-animations a fragment passes through.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[serde(alias = "in")]
    Entry,
    #[serde(alias = "mid")]
    Hold,
    #[serde(alias = "out")]
    Exit,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Entry, Phase::Hold, Phase::Exit];

    #[inline]
    pub fn name(self) -> &'static str {
        match self {
            Phase::Entry => "entry",
            Phase::Hold => "hold",
            Phase::Exit => "exit",
        }
    }

    /// Dense index, used for per-phase arrays.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Phase::Entry => 0,
            Phase::Hold => 1,
            Phase::Exit => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Phase {
    type Err = AnimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "entry" | "in" => Ok(Phase::Entry),
            "hold" | "mid" | "middle" => Ok(Phase::Hold),
            "exit" | "out" | "end" => Ok(Phase::Exit),
            other => Err(AnimError::UnknownPhase {
                name: other.to_string(),
            }),
        }
    }
}

/// Phase band boundaries in fragment-local time.
///
/// `t < in_end` is entry, `t > out_start` is exit, anything else is hold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseThresholds {
    pub in_end: f32,
    pub out_start: f32,
}

impl Default for PhaseThresholds {
    fn default() -> Self {
        Self {
            in_end: 0.2,
            out_start: 0.8,
        }
    }
}

impl PhaseThresholds {
    /// `[start, end]` of a phase band in local time.
    #[inline]
    pub fn band(&self, phase: Phase) -> (f32, f32) {
        match phase {
            Phase::Entry => (0.0, self.in_end),
            Phase::Hold => (self.in_end, self.out_start),
            Phase::Exit => (self.out_start, 1.0),
        }
    }

    /// Select the phase for local time `t` and renormalize `t` into it.
    pub fn select(&self, t: f32) -> (Phase, f32) {
        let phase = if t < self.in_end {
            Phase::Entry
        } else if t > self.out_start {
            Phase::Exit
        } else {
            Phase::Hold
        };
        (phase, self.phase_time(phase, t))
    }

    /// Renormalize `t` into `phase`'s band, clamped to [0, 1].
    /// A zero-width band maps everything to 0.
    #[inline]
    pub fn phase_time(&self, phase: Phase, t: f32) -> f32 {
        let (start, end) = self.band(phase);
        let width = end - start;
        if width <= 0.0 {
            return 0.0;
        }
        ((t - start) / width).clamp(0.0, 1.0)
    }

    /// Clamp both thresholds into [0, 1] and order them.
    /// Returns true when anything had to change.
    pub fn normalize(&mut self) -> bool {
        let before = *self;
        self.in_end = finite_or(self.in_end, 0.2).clamp(0.0, 1.0);
        self.out_start = finite_or(self.out_start, 0.8).clamp(0.0, 1.0);
        if self.out_start < self.in_end {
            std::mem::swap(&mut self.in_end, &mut self.out_start);
        }
        before != *self
    }
}

#[inline]
fn finite_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        fallback
    }
}
