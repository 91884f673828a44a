//! Memoized text separation.
//!
//! Separating a text object into fragment objects is expensive and done by the
//! host. [`SeparationCache`] remembers the result per content fingerprint so
//! repeated requests for an unchanged object skip the work.
//!
//! Eviction runs after an insert once the size reaches `cleanup_threshold`
//! and removes entries from the old end until `size <= max_size`. Under
//! [`EvictionPolicy::Fifo`] the old end is insertion order and lookups do not
//! reorder anything. [`EvictionPolicy::Lru`] promotes entries on lookup and on
//! overwrite.

mod key;
mod stats;

pub use key::{transform_hash, FragmentMode, Fingerprint, TEXT_PREFIX_CHARS};
pub use stats::{CacheStatistics, CacheStats};

use instant::Instant;
use log::{debug, info, warn};
use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::error::AnimError;
use crate::ids::EntityId;
use crate::scene::Scene;
use crate::Result;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Oldest inserted goes first; lookups do not count as use.
    #[default]
    Fifo,
    /// Least recently read or written goes first.
    Lru,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_size: usize,
    /// Size at which an insert triggers eviction.
    pub cleanup_threshold: usize,
    pub policy: EvictionPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 100,
            cleanup_threshold: 80,
            policy: EvictionPolicy::Fifo,
        }
    }
}

impl CacheConfig {
    /// Keep `1 <= cleanup_threshold <= max_size`. Returns the adjustments made.
    pub fn normalize(&mut self) -> Vec<String> {
        let mut fixes = Vec::new();
        if self.max_size == 0 {
            self.max_size = 1;
            fixes.push("cache max_size raised to 1".to_string());
        }
        if self.cleanup_threshold == 0 || self.cleanup_threshold > self.max_size {
            let fixed = self.cleanup_threshold.clamp(1, self.max_size);
            fixes.push(format!(
                "cache cleanup_threshold {} moved to {fixed}",
                self.cleanup_threshold
            ));
            self.cleanup_threshold = fixed;
        }
        fixes
    }
}

/// Result of separating one text object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedSeparation {
    pub root: EntityId,
    /// Fragment entities in reading order.
    pub fragments: Vec<EntityId>,
}

impl CachedSeparation {
    /// Root and every fragment still exist in the scene.
    pub fn is_valid(&self, scene: &dyn Scene) -> bool {
        scene.is_alive(self.root) && self.fragments.iter().all(|&id| scene.is_alive(id))
    }
}

/// Host routine that splits a text object into fragment objects.
pub trait Separator {
    fn separate(
        &mut self,
        scene: &mut dyn Scene,
        root: EntityId,
        mode: FragmentMode,
        tolerance: f32,
    ) -> Result<Vec<EntityId>>;
}

impl<F> Separator for F
where
    F: FnMut(&mut dyn Scene, EntityId, FragmentMode, f32) -> Result<Vec<EntityId>>,
{
    fn separate(
        &mut self,
        scene: &mut dyn Scene,
        root: EntityId,
        mode: FragmentMode,
        tolerance: f32,
    ) -> Result<Vec<EntityId>> {
        self(scene, root, mode, tolerance)
    }
}

/// Fingerprint-keyed store of separation results.
pub struct SeparationCache {
    entries: LruCache<Fingerprint, CachedSeparation>,
    config: CacheConfig,
    stats: CacheStatistics,
}

impl std::fmt::Debug for SeparationCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeparationCache")
            .field("len", &self.entries.len())
            .field("config", &self.config)
            .field("stats", &self.stats)
            .finish()
    }
}

impl Default for SeparationCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl SeparationCache {
    pub fn new(mut config: CacheConfig) -> Self {
        for fix in config.normalize() {
            warn!("{fix}");
        }
        Self {
            // Capacity is enforced by `evict`, not by the LruCache itself.
            entries: LruCache::unbounded(),
            config,
            stats: CacheStatistics::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Swap in new settings, keeping entries. Evicts down to the new
    /// `max_size` and returns the number of entries removed.
    pub fn set_config(&mut self, mut config: CacheConfig) -> usize {
        for fix in config.normalize() {
            warn!("{fix}");
        }
        self.config = config;
        self.evict()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn statistics(&self) -> &CacheStatistics {
        &self.stats
    }

    /// Fingerprints from the oldest end to the newest.
    pub fn keys_oldest_first(&self) -> Vec<Fingerprint> {
        self.entries.iter().rev().map(|(k, _)| *k).collect()
    }

    /// Look up a separation. Key derivation failures count as a miss.
    pub fn get(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        mode: FragmentMode,
        tolerance: f32,
    ) -> Option<CachedSeparation> {
        if !self.config.enabled {
            return None;
        }
        let started = Instant::now();
        let key = match Fingerprint::derive(scene, identity, mode, tolerance) {
            Ok((_, key)) => key,
            Err(e) => {
                warn!("Error generating cache key: {e}");
                self.stats.record_untimed_miss();
                return None;
            }
        };
        let found = match self.config.policy {
            EvictionPolicy::Fifo => self.entries.peek(&key).cloned(),
            EvictionPolicy::Lru => self.entries.get(&key).cloned(),
        };
        self.stats
            .record_get(started.elapsed().as_secs_f64(), found.is_some());
        if found.is_some() {
            debug!("Cache hit for {identity}");
        }
        found
    }

    /// Store a separation. Returns false when no key can be derived.
    pub fn set(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        mode: FragmentMode,
        tolerance: f32,
        value: CachedSeparation,
    ) -> bool {
        if !self.config.enabled {
            return false;
        }
        let started = Instant::now();
        let key = match Fingerprint::derive(scene, identity, mode, tolerance) {
            Ok((_, key)) => key,
            Err(e) => {
                warn!("Error generating cache key: {e}");
                return false;
            }
        };
        let pending = match self.config.policy {
            EvictionPolicy::Fifo => match self.entries.peek_mut(&key) {
                Some(slot) => {
                    *slot = value;
                    None
                }
                None => Some(value),
            },
            EvictionPolicy::Lru => Some(value),
        };
        if let Some(value) = pending {
            self.entries.put(key, value);
        }
        if self.entries.len() >= self.config.cleanup_threshold {
            self.evict();
        }
        self.stats.record_set(started.elapsed().as_secs_f64());
        true
    }

    /// Drop entries from the old end until `len <= max_size`.
    fn evict(&mut self) -> usize {
        let mut removed = 0;
        while self.entries.len() > self.config.max_size {
            if self.entries.pop_lru().is_none() {
                break;
            }
            removed += 1;
        }
        if removed > 0 {
            self.stats.record_removed(removed);
            debug!("Cache cleanup: removed {removed} entries");
        }
        removed
    }

    /// Remove everything. Returns the number of entries dropped.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.record_removed(removed);
        info!("Cache cleared ({removed} entries)");
        removed
    }

    /// Drop entries whose root or fragments are gone, then evict if still at or
    /// over the threshold. Returns the number of invalid entries dropped.
    pub fn optimize(&mut self, scene: &dyn Scene) -> usize {
        let invalid: Vec<Fingerprint> = self
            .entries
            .iter()
            .filter(|(_, v)| !v.is_valid(scene))
            .map(|(k, _)| *k)
            .collect();
        for key in &invalid {
            self.entries.pop(key);
        }
        if !invalid.is_empty() {
            self.stats.record_removed(invalid.len());
        }
        if self.entries.len() >= self.config.cleanup_threshold {
            self.evict();
        }
        info!("Cache optimized: removed {} invalid entries", invalid.len());
        invalid.len()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            max_size: self.config.max_size,
            hit_rate: self.stats.hit_rate(),
            hits: self.stats.hits,
            misses: self.stats.misses,
            sets: self.stats.sets,
            clears: self.stats.clears,
            avg_get_time: self.stats.avg_get_time,
            avg_set_time: self.stats.avg_set_time,
            total_operations: self.stats.total_operations(),
            last_cleanup: self.stats.last_cleanup,
        }
    }

    /// Cache-through separation: return a live cached result, otherwise run
    /// `separator` and remember a non-empty result.
    pub fn separate_text(
        &mut self,
        scene: &mut dyn Scene,
        identity: &str,
        mode: FragmentMode,
        tolerance: f32,
        separator: &mut dyn Separator,
    ) -> Result<CachedSeparation> {
        if let Some(hit) = self.get(&*scene, identity, mode, tolerance) {
            if hit.is_valid(&*scene) {
                return Ok(hit);
            }
            debug!("Cached separation of {identity} refers to deleted objects");
        }

        let root = scene.find(identity).ok_or_else(|| AnimError::EntityNotFound {
            name: identity.to_string(),
        })?;
        let started = Instant::now();
        let fragments = separator
            .separate(scene, root, mode, tolerance)
            .map_err(|e| match e {
                AnimError::Separation { .. } => e,
                other => AnimError::Separation {
                    reason: other.to_string(),
                },
            })?;
        let result = CachedSeparation { root, fragments };
        if !result.fragments.is_empty() {
            self.set(&*scene, identity, mode, tolerance, result.clone());
        }
        debug!(
            "Text separation of {identity} completed in {:.3}s",
            started.elapsed().as_secs_f64()
        );
        Ok(result)
    }
}
