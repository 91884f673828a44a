//! Session configuration.

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::fragment::ChannelSettings;
use crate::handler::HandlerConfig;
use crate::phase::PhaseThresholds;
use crate::stage::{BlendConfig, EvaluationStrategy, OvershootConfig};
use crate::store::AuditConfig;
use crate::timing::TimingConfig;
use crate::Result;

/// Everything an [`crate::AnimationSession`] needs. Missing JSON fields take
/// their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timing: TimingConfig,
    pub phases: PhaseThresholds,
    pub strategy: EvaluationStrategy,
    pub blend: BlendConfig,
    /// Also the y range curves are validated against.
    pub overshoot: OvershootConfig,
    /// Channels given to newly registered fragments.
    pub channels: ChannelSettings,
    pub audit: AuditConfig,
    pub handler: HandlerConfig,
    pub cache: CacheConfig,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Curve y limit used for validation.
    #[inline]
    pub fn y_limit(&self) -> f32 {
        self.overshoot.limit.abs()
    }

    /// Pull every value into range. Returns one message per adjustment.
    pub fn validate(&mut self) -> Vec<String> {
        let mut fixes = self.timing.normalize();

        if self.phases.normalize() {
            fixes.push(format!(
                "phase thresholds moved to {}..{}",
                self.phases.in_end, self.phases.out_start
            ));
        }

        if !self.blend.width.is_finite() || self.blend.width < 0.0 {
            fixes.push(format!("blend width {} reset to 0.1", self.blend.width));
            self.blend.width = 0.1;
        } else if self.blend.width > 0.5 {
            fixes.push(format!("blend width {} clamped to 0.5", self.blend.width));
            self.blend.width = 0.5;
        }

        if !self.overshoot.limit.is_finite() || self.overshoot.limit <= 0.0 {
            fixes.push(format!("overshoot limit {} reset to 2", self.overshoot.limit));
            self.overshoot.limit = 2.0;
        }

        if self.handler.min_frame_delta < 0 {
            self.handler.min_frame_delta = 0;
            fixes.push("handler min_frame_delta raised to 0".to_string());
        }
        if self.handler.refresh_interval < 1 {
            self.handler.refresh_interval = 1;
            fixes.push("handler refresh_interval raised to 1".to_string());
        }

        fixes.extend(self.cache.normalize());
        fixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::EvictionPolicy;
    use crate::timing::Direction;

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = Config::from_json(
            r#"{"timing": {"duration": 24, "direction": "center_out"},
                "strategy": "blended",
                "cache": {"policy": "lru"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.timing.duration, 24);
        assert_eq!(cfg.timing.overlap, 5.0);
        assert_eq!(cfg.timing.direction, Direction::CenterOut);
        assert_eq!(cfg.strategy, EvaluationStrategy::Blended);
        assert_eq!(cfg.cache.policy, EvictionPolicy::Lru);
        assert_eq!(cfg.cache.max_size, 100);
        assert_eq!(cfg.phases, PhaseThresholds::default());
    }

    #[test]
    fn round_trips_through_json() {
        let cfg = Config::default();
        assert_eq!(Config::from_json(&cfg.to_json().unwrap()).unwrap(), cfg);
    }

    #[test]
    fn validate_reports_and_fixes() {
        let mut cfg = Config::default();
        assert!(cfg.validate().is_empty());

        cfg.timing.duration = 0;
        cfg.timing.overlap = 140.0;
        cfg.phases = PhaseThresholds {
            in_end: 0.9,
            out_start: 0.1,
        };
        cfg.blend.width = 3.0;
        cfg.cache.cleanup_threshold = 500;
        let fixes = cfg.validate();
        assert_eq!(fixes.len(), 5, "{fixes:?}");
        assert_eq!(cfg.timing.duration, 1);
        assert_eq!(cfg.timing.overlap, 100.0);
        assert!(cfg.phases.in_end <= cfg.phases.out_start);
        assert_eq!(cfg.blend.width, 0.5);
        assert_eq!(cfg.cache.cleanup_threshold, 100);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn small_overshoot_limits_are_kept() {
        let mut cfg = Config::default();
        cfg.overshoot.limit = 0.5;
        assert!(cfg.validate().is_empty());
        assert_eq!(cfg.overshoot.limit, 0.5);
        assert_eq!(cfg.y_limit(), 0.5);

        for bad in [0.0, -1.0, f32::NAN] {
            cfg.overshoot.limit = bad;
            assert_eq!(cfg.validate().len(), 1);
            assert_eq!(cfg.overshoot.limit, 2.0);
        }
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = Config::from_json("{ timing: ").unwrap_err();
        assert_eq!(err.category(), "serialization");
    }
}
