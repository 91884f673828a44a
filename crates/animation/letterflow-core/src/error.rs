//! Error types for the letter animation core

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// Error type for curve, timing, cache and bundle operations.
///
/// The per-frame evaluation path never surfaces these to the host: failures are
/// logged and replaced with a fallback value. They are returned from the
/// explicit editing APIs (import, bundle parsing, scene writes).
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimError {
    /// Identity does not resolve to any scene object
    #[error("Entity not found: {name}")]
    EntityNotFound { name: String },

    /// Entity id was valid once but the host has deleted the object
    #[error("Entity is no longer alive: {id:?}")]
    EntityDead { id: EntityId },

    /// Curve failed structural or range validation
    #[error("Invalid curve {base_name}/{phase}: {reason}")]
    InvalidCurve {
        base_name: String,
        phase: String,
        reason: String,
    },

    /// Timing configuration cannot be normalized
    #[error("Invalid timing: {reason}")]
    InvalidTiming { reason: String },

    /// Phase name not recognised
    #[error("Unknown phase: {name}")]
    UnknownPhase { name: String },

    /// Easing function name not recognised
    #[error("Unknown easing function: {name}")]
    UnknownEasing { name: String },

    /// Numeric evaluation produced a non-finite value
    #[error("Evaluation error: {reason}")]
    Evaluation { reason: String },

    /// Cache fingerprint could not be derived
    #[error("Cache key generation failed: {reason}")]
    CacheKey { reason: String },

    /// Preset bundle is structurally invalid
    #[error("Bundle error: {reason}")]
    Bundle { reason: String },

    /// Fragment separation routine failed
    #[error("Separation failed: {reason}")]
    Separation { reason: String },

    /// Serialization error
    #[error("Serialization error: {reason}")]
    Serialization { reason: String },

    /// Generic animation error
    #[error("Animation error: {message}")]
    Generic { message: String },
}

impl AnimError {
    /// Create a new generic error
    pub fn new(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Errors the evaluation path can absorb by substituting a fallback.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::EntityDead { .. }
                | Self::Evaluation { .. }
                | Self::CacheKey { .. }
                | Self::InvalidCurve { .. }
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::EntityNotFound { .. } | Self::EntityDead { .. } => "scene",
            Self::InvalidCurve { .. } | Self::UnknownPhase { .. } => "curve",
            Self::InvalidTiming { .. } => "validation",
            Self::UnknownEasing { .. } | Self::Evaluation { .. } => "evaluation",
            Self::CacheKey { .. } | Self::Separation { .. } => "cache",
            Self::Bundle { .. } | Self::Serialization { .. } => "serialization",
            Self::Generic { .. } => "generic",
        }
    }
}

impl From<serde_json::Error> for AnimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let error = AnimError::new("test error");
        assert!(matches!(error, AnimError::Generic { .. }));
        assert_eq!(error.to_string(), "Animation error: test error");
    }

    #[test]
    fn test_error_recoverability() {
        let recoverable = AnimError::Evaluation {
            reason: "NaN".to_string(),
        };
        assert!(recoverable.is_recoverable());

        let non_recoverable = AnimError::EntityNotFound {
            name: "Text".to_string(),
        };
        assert!(!non_recoverable.is_recoverable());
    }

    #[test]
    fn test_error_categories() {
        let scene_error = AnimError::EntityDead { id: EntityId(3) };
        assert_eq!(scene_error.category(), "scene");

        let cache_error = AnimError::CacheKey {
            reason: "nan tolerance".to_string(),
        };
        assert_eq!(cache_error.category(), "cache");
    }

    #[test]
    fn test_serialization() {
        let error = AnimError::new("test");
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: AnimError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }

    #[test]
    fn json_errors_convert() {
        let err = serde_json::from_str::<u32>("nope").unwrap_err();
        let converted: AnimError = err.into();
        assert_eq!(converted.category(), "serialization");
    }
}
