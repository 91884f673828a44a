//! Letterflow Core (host-agnostic)
//!
//! Per-letter text animation: every fragment of a text object (a letter, word
//! or syllable) runs the same three-phase animation (entry, hold, exit),
//! staggered in time. Phase shapes are editable curves kept in a
//! [`CurveStore`]; each frame a [`FrameApplier`] maps the frame to fragment
//! local time, evaluates the curves and produces [`ChannelWrite`]s for the
//! host [`Scene`]. An [`AnimationSession`] ties this together with the
//! frame handler and a [`SeparationCache`] for text separation results.

pub mod apply;
pub mod bundle;
pub mod cache;
pub mod config;
pub mod curve;
pub mod easing;
pub mod error;
pub mod fragment;
pub mod handler;
pub mod ids;
pub mod phase;
pub mod scan;
pub mod scene;
pub mod session;
pub mod stage;
pub mod store;
pub mod timing;

// Re-exports for hosts and adapters
pub use apply::{apply_writes, restore, ApplyReport, ChannelWrite, FragmentSample, FrameApplier};
pub use bundle::{BundleValidation, PresetBundle, BUNDLE_SCHEMA_VERSION};
pub use cache::{
    CacheConfig, CacheStats, CachedSeparation, EvictionPolicy, Fingerprint, FragmentMode,
    SeparationCache, Separator,
};
pub use config::Config;
pub use curve::{ControlPoint, CurveIssue, HandleType, PhaseCurve};
pub use easing::Easing;
pub use error::AnimError;
pub use fragment::{
    AnimatedFragment, Channel, ChannelSetting, ChannelSettings, ChannelValue, FragmentTable,
    Transform,
};
pub use handler::{AnimationHandler, FrameOutcome, HandlerConfig, PreviewPlayer, TimerAction};
pub use ids::EntityId;
pub use phase::{Phase, PhaseThresholds};
pub use scan::{ContinuityScan, ScanReport};
pub use scene::{Scene, SceneGraph};
pub use session::AnimationSession;
pub use stage::{
    blend_factor, smooth_step, BlendConfig, BlendMode, EvaluationStrategy, OvershootConfig,
    StageEvaluator,
};
pub use store::{AuditConfig, AuditReport, AuditScope, CurveExport, CurveStore};
pub use timing::{Direction, TimeMapper, TimingConfig};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, AnimError>;
