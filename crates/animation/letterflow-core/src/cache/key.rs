//! Content fingerprints for separation cache entries.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AnimError;
use crate::fragment::Transform;
use crate::ids::EntityId;
use crate::scene::Scene;
use crate::Result;

/// Characters of text content that take part in the fingerprint.
pub const TEXT_PREFIX_CHARS: usize = 100;

/// How a text object is split into fragments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentMode {
    #[default]
    Letters,
    Words,
    Syllables,
}

impl FragmentMode {
    pub fn name(self) -> &'static str {
        match self {
            FragmentMode::Letters => "letters",
            FragmentMode::Words => "words",
            FragmentMode::Syllables => "syllables",
        }
    }
}

impl fmt::Display for FragmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FragmentMode {
    type Err = AnimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "letters" | "letter" => Ok(FragmentMode::Letters),
            "words" | "word" => Ok(FragmentMode::Words),
            "syllables" | "syllable" => Ok(FragmentMode::Syllables),
            other => Err(AnimError::Generic {
                message: format!("unknown fragment mode '{other}'"),
            }),
        }
    }
}

/// 64-bit cache key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Fingerprint of `identity` as it currently stands in the scene.
    ///
    /// Fails when the identity does not resolve or the tolerance is not a
    /// finite number; callers treat that as a miss.
    pub fn derive(
        scene: &dyn Scene,
        identity: &str,
        mode: FragmentMode,
        tolerance: f32,
    ) -> Result<(EntityId, Fingerprint)> {
        let root = scene.find(identity).ok_or_else(|| AnimError::CacheKey {
            reason: format!("'{identity}' is not in the scene"),
        })?;
        if !tolerance.is_finite() {
            return Err(AnimError::CacheKey {
                reason: format!("tolerance {tolerance} is not finite"),
            });
        }
        let transform = scene.transform(root).ok_or_else(|| AnimError::CacheKey {
            reason: format!("'{identity}' has no transform"),
        })?;
        let text = scene.text(root).unwrap_or_default();
        let prefix: String = text.chars().take(TEXT_PREFIX_CHARS).collect();

        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        prefix.hash(&mut hasher);
        mode.hash(&mut hasher);
        tolerance.to_bits().hash(&mut hasher);
        transform_hash(&transform).hash(&mut hasher);
        Ok((root, Fingerprint(hasher.finish())))
    }
}

/// Hash of location, rotation and scale bit patterns.
pub fn transform_hash(transform: &Transform) -> u64 {
    let mut hasher = DefaultHasher::new();
    for v in transform
        .location
        .iter()
        .chain(&transform.rotation)
        .chain(&transform.scale)
    {
        v.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}
