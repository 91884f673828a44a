//! Frame-driven controller and the standalone preview timer.

use std::time::Duration;

use instant::Instant;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::apply::{apply_writes, ApplyReport, FrameApplier};
use crate::fragment::{AnimatedFragment, FragmentTable};
use crate::ids::EntityId;
use crate::scene::Scene;
use crate::store::CurveStore;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Frame changes smaller than this are ignored.
    pub min_frame_delta: i64,
    /// Frames between refreshes of the active fragment list.
    pub refresh_interval: i64,
    /// Frames slower than this (seconds) are counted and logged.
    pub slow_frame_seconds: f64,
    /// Timer period of the preview player, in milliseconds.
    pub preview_interval_ms: u64,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            min_frame_delta: 2,
            refresh_interval: 10,
            slow_frame_seconds: 0.016,
            preview_interval_ms: 100,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_frames: u64,
    /// Running mean, seconds.
    pub avg_frame_time: f64,
    pub slow_frames: u64,
    pub last_slow_frame: Option<i64>,
}

impl PerformanceStats {
    fn record(&mut self, seconds: f64) {
        self.total_frames += 1;
        let n = self.total_frames as f64;
        self.avg_frame_time = (self.avg_frame_time * (n - 1.0) + seconds) / n;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    Inactive,
    /// Within `min_frame_delta` of the last evaluated frame.
    FrameTooClose,
    NoFragments,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOutcome {
    Skipped(SkipReason),
    Applied {
        fragments: usize,
        report: ApplyReport,
    },
}

/// Gates per-frame evaluation and keeps the active fragment list.
#[derive(Debug, Default)]
pub struct AnimationHandler {
    config: HandlerConfig,
    active: bool,
    last_frame: Option<i64>,
    last_refresh: Option<i64>,
    fragments: Vec<EntityId>,
    stats: PerformanceStats,
}

impl AnimationHandler {
    pub fn new(config: HandlerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    #[inline]
    pub fn config(&self) -> &HandlerConfig {
        &self.config
    }

    /// Replace gating and refresh settings. Frame history and stats are kept;
    /// the fragment list is refreshed on the next evaluated frame.
    pub fn set_config(&mut self, config: HandlerConfig) {
        self.config = config;
        self.invalidate();
    }

    pub fn start(&mut self) {
        self.active = true;
        info!("Animation handler started");
    }

    pub fn stop(&mut self) {
        self.active = false;
        info!("Animation handler stopped");
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn last_frame(&self) -> Option<i64> {
        self.last_frame
    }

    #[inline]
    pub fn stats(&self) -> &PerformanceStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PerformanceStats::default();
    }

    /// Force a fragment list refresh on the next evaluated frame.
    pub fn invalidate(&mut self) {
        self.last_refresh = None;
    }

    /// Active fragment ids as of the last refresh.
    pub fn active_fragments(&self) -> &[EntityId] {
        &self.fragments
    }

    pub fn should_evaluate(&self, frame: i64) -> bool {
        match self.last_frame {
            Some(last) => (frame - last).abs() >= self.config.min_frame_delta,
            None => true,
        }
    }

    pub fn needs_refresh(&self, frame: i64) -> bool {
        match self.last_refresh {
            Some(last) => (frame - last).abs() >= self.config.refresh_interval,
            None => true,
        }
    }

    fn refresh(&mut self, frame: i64, scene: &dyn Scene, table: &mut FragmentTable) {
        let dropped = table.retain_alive(scene);
        if dropped > 0 {
            debug!("Dropped {dropped} deleted fragments");
        }
        self.fragments = table.ordered().iter().map(|f| f.entity).collect();
        self.last_refresh = Some(frame);
    }

    /// Evaluate and write one frame.
    pub fn on_frame_changed(
        &mut self,
        frame: i64,
        scene: &mut dyn Scene,
        table: &mut FragmentTable,
        store: &CurveStore,
        applier: &FrameApplier,
    ) -> FrameOutcome {
        if !self.active {
            return FrameOutcome::Skipped(SkipReason::Inactive);
        }
        if !self.should_evaluate(frame) {
            return FrameOutcome::Skipped(SkipReason::FrameTooClose);
        }
        let started = Instant::now();

        if self.needs_refresh(frame) {
            self.refresh(frame, &*scene, table);
        }
        let fragments: Vec<&AnimatedFragment> =
            self.fragments.iter().filter_map(|&id| table.get(id)).collect();
        if fragments.is_empty() {
            return FrameOutcome::Skipped(SkipReason::NoFragments);
        }

        let writes = applier.tick(frame, &fragments, store);
        let report = apply_writes(scene, &writes);

        let elapsed = started.elapsed().as_secs_f64();
        self.stats.record(elapsed);
        if elapsed > self.config.slow_frame_seconds {
            self.stats.slow_frames += 1;
            self.stats.last_slow_frame = Some(frame);
            warn!("Slow frame detected: {elapsed:.3}s at frame {frame}");
        }
        self.last_frame = Some(frame);

        FrameOutcome::Applied {
            fragments: fragments.len(),
            report,
        }
    }
}

/// What the host timer should do after a preview tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerAction {
    /// Show `frame`, call again after `delay`.
    Continue { frame: i64, delay: Duration },
    Stop,
}

/// Auto-advancing frame source for previewing without host playback.
#[derive(Clone, Debug, PartialEq)]
pub struct PreviewPlayer {
    playing: bool,
    frame: i64,
    start: i64,
    end: i64,
    pub looping: bool,
    pub interval: Duration,
}

impl PreviewPlayer {
    pub fn new(start: i64, end: i64, interval: Duration) -> Self {
        let (start, end) = if end < start { (end, start) } else { (start, end) };
        Self {
            playing: false,
            frame: start,
            start,
            end,
            looping: true,
            interval,
        }
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[inline]
    pub fn frame(&self) -> i64 {
        self.frame
    }

    pub fn seek(&mut self, frame: i64) {
        self.frame = frame.clamp(self.start, self.end);
    }

    /// Advance one frame. Past the end it wraps when looping, else stops.
    pub fn tick(&mut self) -> TimerAction {
        if !self.playing {
            return TimerAction::Stop;
        }
        let next = self.frame + 1;
        if next > self.end {
            if !self.looping {
                self.playing = false;
                return TimerAction::Stop;
            }
            self.frame = self.start;
        } else {
            self.frame = next;
        }
        TimerAction::Continue {
            frame: self.frame,
            delay: self.interval,
        }
    }
}
