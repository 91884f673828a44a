/// Counters and latency means for a [`super::SeparationCache`].
#[derive(Debug, Clone, Default)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    /// Entries removed by `clear`, eviction or `optimize`.
    pub clears: u64,
    get_samples: u64,
    set_samples: u64,
    /// Running mean of timed get calls, in seconds.
    pub avg_get_time: f64,
    /// Running mean of timed set calls, in seconds.
    pub avg_set_time: f64,
    /// Seconds since the Unix epoch of the last eviction or clear.
    pub last_cleanup: f64,
}

impl CacheStatistics {
    pub fn new() -> Self {
        Self {
            last_cleanup: unix_seconds(),
            ..Self::default()
        }
    }

    /// `new = (old * (n - 1) + sample) / n`
    #[inline]
    fn running_mean(old: f64, n: u64, sample: f64) -> f64 {
        let n = n as f64;
        (old * (n - 1.0) + sample) / n
    }

    pub fn record_get(&mut self, seconds: f64, hit: bool) {
        if hit {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        self.get_samples += 1;
        self.avg_get_time = Self::running_mean(self.avg_get_time, self.get_samples, seconds);
    }

    /// Miss without a timing sample (key could not be derived).
    pub fn record_untimed_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_set(&mut self, seconds: f64) {
        self.sets += 1;
        self.set_samples += 1;
        self.avg_set_time = Self::running_mean(self.avg_set_time, self.set_samples, seconds);
    }

    pub fn record_removed(&mut self, count: usize) {
        self.clears += count as u64;
        self.last_cleanup = unix_seconds();
    }

    #[inline]
    pub fn total_operations(&self) -> u64 {
        self.get_samples + self.set_samples
    }

    /// Hits as a percentage of lookups.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64 * 100.0
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

pub(crate) fn unix_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Serializable cache introspection snapshot.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    /// Percentage, 0 to 100.
    pub hit_rate: f64,
    pub hits: u64,
    pub misses: u64,
    pub sets: u64,
    pub clears: u64,
    pub avg_get_time: f64,
    pub avg_set_time: f64,
    pub total_operations: u64,
    pub last_cleanup: f64,
}
