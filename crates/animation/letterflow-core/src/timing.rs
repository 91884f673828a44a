//! Timeline to fragment-local time mapping.
//!
//! `t_global` is the normalized position of the frame inside the animation
//! window. Each fragment trails the previous one by `overlap / count`, so its
//! local time is `clamp(t_global - rank * delay, 0, 1)`.

use serde::{Deserialize, Serialize};

use crate::error::AnimError;
use crate::phase::{Phase, PhaseThresholds};
use crate::Result;

/// Stagger order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// First fragment leads.
    #[default]
    Forward,
    /// Last fragment leads.
    Reverse,
    /// Middle fragment leads, outer fragments trail by distance.
    CenterOut,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub start_frame: i64,
    /// Last frame of the preview range.
    pub end_frame: i64,
    /// Frames per cycle, at least 1.
    pub duration: u32,
    /// Total stagger spread, 0 to 100.
    pub overlap: f32,
    /// Values above 1 loop indefinitely.
    pub loop_count: u32,
    pub ping_pong: bool,
    pub direction: Direction,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            start_frame: 1,
            end_frame: 100,
            duration: 50,
            overlap: 5.0,
            loop_count: 1,
            ping_pong: false,
            direction: Direction::Forward,
        }
    }
}

impl TimingConfig {
    /// Strict check, without modifying anything.
    pub fn check(&self) -> Result<()> {
        if self.duration == 0 {
            return Err(AnimError::InvalidTiming {
                reason: "duration must be at least 1 frame".into(),
            });
        }
        if !self.overlap.is_finite() || !(0.0..=100.0).contains(&self.overlap) {
            return Err(AnimError::InvalidTiming {
                reason: format!("overlap {} outside 0..=100", self.overlap),
            });
        }
        if self.loop_count == 0 {
            return Err(AnimError::InvalidTiming {
                reason: "loop_count must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Pull every field into range. Returns one message per adjustment.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();
        if self.duration == 0 {
            self.duration = 1;
            fixes.push("duration raised to 1".to_string());
        }
        if !self.overlap.is_finite() {
            self.overlap = 5.0;
            fixes.push("overlap was not finite, reset to 5".to_string());
        } else if !(0.0..=100.0).contains(&self.overlap) {
            let clamped = self.overlap.clamp(0.0, 100.0);
            fixes.push(format!("overlap {} clamped to {clamped}", self.overlap));
            self.overlap = clamped;
        }
        if self.loop_count == 0 {
            self.loop_count = 1;
            fixes.push("loop_count raised to 1".to_string());
        }
        if self.end_frame < self.start_frame {
            self.end_frame = self.start_frame + i64::from(self.duration);
            fixes.push(format!("end_frame moved to {}", self.end_frame));
        }
        fixes
    }

    #[inline]
    pub fn end_of_cycle(&self) -> i64 {
        self.start_frame + i64::from(self.duration.max(1))
    }
}

/// Times for one fragment at one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragmentTime {
    pub global: f32,
    pub local: f32,
    pub phase: Phase,
    /// `local` renormalized into the phase band.
    pub phase_t: f32,
}

/// Maps frames to per-fragment times.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeMapper {
    pub timing: TimingConfig,
    pub thresholds: PhaseThresholds,
}

impl TimeMapper {
    pub fn new(timing: TimingConfig, thresholds: PhaseThresholds) -> Self {
        Self { timing, thresholds }
    }

    /// Normalized window position of `frame`.
    pub fn global_time(&self, frame: i64) -> f32 {
        let duration = i64::from(self.timing.duration.max(1));
        let elapsed = frame - self.timing.start_frame;
        if self.timing.loop_count > 1 {
            let cycle = elapsed.div_euclid(duration);
            let t = elapsed.rem_euclid(duration) as f32 / duration as f32;
            if self.timing.ping_pong && cycle.rem_euclid(2) == 1 {
                1.0 - t
            } else {
                t
            }
        } else {
            (elapsed as f32 / duration as f32).clamp(0.0, 1.0)
        }
    }

    #[inline]
    pub fn per_fragment_delay(&self, count: usize) -> f32 {
        self.timing.overlap / count.max(1) as f32
    }

    /// Stagger position of a fragment under the configured direction.
    pub fn rank(&self, ordinal: usize, count: usize) -> f32 {
        match self.timing.direction {
            Direction::Forward => ordinal as f32,
            Direction::Reverse => count.saturating_sub(1).saturating_sub(ordinal) as f32,
            Direction::CenterOut => {
                let middle = count.saturating_sub(1) as f32 / 2.0;
                (ordinal as f32 - middle).abs()
            }
        }
    }

    #[inline]
    pub fn local_time(&self, t_global: f32, ordinal: usize, count: usize) -> f32 {
        let offset = self.rank(ordinal, count) * self.per_fragment_delay(count);
        (t_global - offset).clamp(0.0, 1.0)
    }

    pub fn fragment_time(&self, frame: i64, ordinal: usize, count: usize) -> FragmentTime {
        let global = self.global_time(frame);
        let local = self.local_time(global, ordinal, count);
        let (phase, phase_t) = self.thresholds.select(local);
        FragmentTime {
            global,
            local,
            phase,
            phase_t,
        }
    }
}
