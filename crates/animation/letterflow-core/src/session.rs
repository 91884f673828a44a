//! [`AnimationSession`]: owns curves, cache, fragments and the frame handler
//! for one host scene.

use std::time::Duration;

use log::{info, warn};

use crate::apply::{restore, ApplyReport, ChannelWrite, FrameApplier};
use crate::bundle::PresetBundle;
use crate::cache::{CacheStats, CachedSeparation, FragmentMode, SeparationCache, Separator};
use crate::config::Config;
use crate::error::AnimError;
use crate::fragment::{AnimatedFragment, FragmentTable};
use crate::handler::{AnimationHandler, FrameOutcome, PreviewPlayer, TimerAction};
use crate::ids::EntityId;
use crate::scan::{ContinuityScan, ScanReport};
use crate::scene::Scene;
use crate::stage::EvaluationStrategy;
use crate::store::{clean_base_name, AuditReport, AuditScope, CurveStore, DebugReport};
use crate::timing::TimeMapper;
use crate::Result;

#[derive(Debug)]
pub struct AnimationSession {
    config: Config,
    store: CurveStore,
    cache: SeparationCache,
    fragments: FragmentTable,
    handler: AnimationHandler,
    applier: FrameApplier,
    preview: Option<PreviewPlayer>,
}

impl Default for AnimationSession {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

fn applier_for(config: &Config) -> FrameApplier {
    FrameApplier {
        mapper: TimeMapper::new(config.timing.clone(), config.phases),
        blend: config.blend,
        overshoot: config.overshoot,
        strategy: config.strategy,
    }
}

impl AnimationSession {
    /// Build a session. Out-of-range config values are fixed and logged.
    pub fn new(mut config: Config) -> Self {
        for fix in config.validate() {
            warn!("Config: {fix}");
        }
        Self {
            store: CurveStore::new(config.y_limit()),
            cache: SeparationCache::new(config.cache.clone()),
            fragments: FragmentTable::new(),
            handler: AnimationHandler::new(config.handler.clone()),
            applier: applier_for(&config),
            preview: None,
            config,
        }
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Replace every setting. Curves and registered fragments are kept; cache
    /// entries are kept up to the new `max_size`.
    pub fn reconfigure(&mut self, mut config: Config) {
        for fix in config.validate() {
            warn!("Config: {fix}");
        }
        self.store.set_y_limit(config.y_limit());
        self.applier = applier_for(&config);
        self.handler.set_config(config.handler.clone());
        let evicted = self.cache.set_config(config.cache.clone());
        if evicted > 0 {
            info!("Reconfigure evicted {evicted} cache entries");
        }
        self.config = config;
    }

    pub fn set_strategy(&mut self, strategy: EvaluationStrategy) {
        self.config.strategy = strategy;
        self.applier.strategy = strategy;
    }

    #[inline]
    pub fn store(&self) -> &CurveStore {
        &self.store
    }

    #[inline]
    pub fn store_mut(&mut self) -> &mut CurveStore {
        &mut self.store
    }

    #[inline]
    pub fn cache(&self) -> &SeparationCache {
        &self.cache
    }

    #[inline]
    pub fn fragments(&self) -> &FragmentTable {
        &self.fragments
    }

    #[inline]
    pub fn handler(&self) -> &AnimationHandler {
        &self.handler
    }

    #[inline]
    pub fn applier(&self) -> &FrameApplier {
        &self.applier
    }

    pub fn start(&mut self) {
        self.handler.start();
    }

    pub fn stop(&mut self) {
        self.handler.stop();
    }

    // ---- fragments ----

    /// Register `entities` as the fragments of text object `identity`, in
    /// stagger order. Base transforms are captured from the scene on first
    /// registration. Entities missing from the scene are skipped.
    pub fn register_fragments(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        entities: &[EntityId],
    ) -> usize {
        let base_name = clean_base_name(identity);
        self.store.ensure_all(&base_name);
        let mut registered = 0;
        for (ordinal, &entity) in entities.iter().enumerate() {
            let Some(base) = scene.transform(entity) else {
                warn!("Fragment {entity:?} of {identity} is not in the scene");
                continue;
            };
            let mut fragment = AnimatedFragment::new(entity, base_name.as_str(), ordinal, base);
            fragment.channels = self.config.channels.clone();
            self.fragments.register(fragment);
            registered += 1;
        }
        self.handler.invalidate();
        info!("Registered {registered} fragments for {base_name}");
        registered
    }

    /// Separate `identity` through the cache and register the fragments.
    pub fn separate_text(
        &mut self,
        scene: &mut dyn Scene,
        identity: &str,
        mode: FragmentMode,
        tolerance: f32,
        separator: &mut dyn Separator,
    ) -> Result<CachedSeparation> {
        if !self.config.cache.enabled {
            warn!("Separation cache disabled; separating {identity} directly");
        }
        let result = self
            .cache
            .separate_text(scene, identity, mode, tolerance, separator)?;
        let object_name = scene
            .name(result.root)
            .map(str::to_string)
            .unwrap_or_else(|| identity.to_string());
        self.register_fragments(&*scene, &object_name, &result.fragments);
        Ok(result)
    }

    /// Write base transforms back and forget every fragment.
    pub fn restore(&mut self, scene: &mut dyn Scene) -> ApplyReport {
        let report = restore(scene, self.fragments.iter());
        self.fragments.clear();
        self.handler.invalidate();
        report
    }

    // ---- per frame ----

    /// Host frame-change entry point.
    pub fn on_frame_changed(&mut self, scene: &mut dyn Scene, frame: i64) -> FrameOutcome {
        self.handler.on_frame_changed(
            frame,
            scene,
            &mut self.fragments,
            &self.store,
            &self.applier,
        )
    }

    /// Writes for every registered fragment at `frame`, without touching a scene
    /// and without frame gating.
    pub fn tick(&self, frame: i64) -> Vec<ChannelWrite> {
        let fragments = self.fragments.ordered();
        self.applier.tick(frame, &fragments, &self.store)
    }

    // ---- preview ----

    /// Start the preview timer over the configured frame range.
    pub fn preview_start(&mut self) {
        let timing = &self.config.timing;
        let mut player = PreviewPlayer::new(
            timing.start_frame,
            timing.end_frame,
            Duration::from_millis(self.config.handler.preview_interval_ms),
        );
        player.play();
        self.preview = Some(player);
        self.handler.start();
    }

    pub fn preview_stop(&mut self) {
        if let Some(player) = self.preview.as_mut() {
            player.stop();
        }
    }

    #[inline]
    pub fn preview_frame(&self) -> Option<i64> {
        self.preview.as_ref().map(PreviewPlayer::frame)
    }

    /// One preview timer callback: advance and evaluate the next frame.
    pub fn preview_tick(&mut self, scene: &mut dyn Scene) -> TimerAction {
        let Some(player) = self.preview.as_mut() else {
            return TimerAction::Stop;
        };
        let action = player.tick();
        if let TimerAction::Continue { frame, .. } = action {
            self.on_frame_changed(scene, frame);
        }
        action
    }

    // ---- curves ----

    pub fn audit(&mut self, scene: &dyn Scene, scope: &AuditScope) -> AuditReport {
        self.store.audit(scene, scope, &self.config.audit)
    }

    /// Sample every phase curve of `identity` under the session's overshoot
    /// policy.
    pub fn debug_evaluate(
        &mut self,
        scene: &dyn Scene,
        identity: &str,
        test_points: Option<&[f32]>,
    ) -> Result<DebugReport> {
        self.store
            .debug_evaluate(scene, identity, test_points, &self.config.overshoot)
    }

    /// Apply a preset bundle's timing to the config and its curves to
    /// `identity`. Returns how many curves were stored.
    pub fn apply_bundle(&mut self, bundle: &PresetBundle, identity: &str) -> usize {
        let mut config = self.config.clone();
        bundle.apply_timing(&mut config.timing);
        self.reconfigure(config);
        bundle.apply_curves(&mut self.store, &clean_base_name(identity))
    }

    pub fn load_bundle(&mut self, json: &str, identity: &str) -> Result<usize> {
        let (bundle, _) = PresetBundle::parse(json)?;
        Ok(self.apply_bundle(&bundle, identity))
    }

    pub fn export_bundle(&self, identity: &str) -> Result<PresetBundle> {
        let base_name = clean_base_name(identity);
        if !self.store.base_names().contains(&base_name.as_str()) {
            return Err(AnimError::EntityNotFound { name: base_name });
        }
        Ok(PresetBundle::capture(&self.config.timing, &self.store, &base_name))
    }

    // ---- cache ----

    #[inline]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&mut self) -> usize {
        self.cache.clear()
    }

    pub fn optimize_cache(&mut self, scene: &dyn Scene) -> usize {
        self.cache.optimize(scene)
    }

    // ---- scans ----

    /// Start a chunked continuity scan over `from..=to`.
    pub fn scan(&self, from: i64, to: i64, strategy: EvaluationStrategy) -> ContinuityScan {
        ContinuityScan::new(from, to, strategy)
    }

    /// Advance `scan` by up to `max_frames`. Returns true when it is done.
    pub fn scan_step(&self, scan: &mut ContinuityScan, max_frames: usize) -> bool {
        let fragments = self.fragments.ordered();
        scan.step(max_frames, &self.applier, &fragments, &self.store)
    }

    /// Scan the configured cycle in one go.
    pub fn scan_cycle(&self, strategy: EvaluationStrategy) -> ScanReport {
        let timing = &self.config.timing;
        let fragments = self.fragments.ordered();
        ContinuityScan::new(timing.start_frame, timing.end_of_cycle(), strategy).run(
            &self.applier,
            &fragments,
            &self.store,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::{Channel, ChannelValue, Transform};
    use crate::scene::SceneGraph;
    use crate::timing::TimingConfig;

    fn letters(scene: &mut SceneGraph, n: usize) -> Vec<EntityId> {
        (0..n)
            .map(|i| scene.spawn(format!("Title_{i}"), Transform::at([i as f32, 0.0, 0.0])))
            .collect()
    }

    fn session() -> AnimationSession {
        AnimationSession::new(Config {
            timing: TimingConfig {
                start_frame: 0,
                duration: 10,
                overlap: 0.0,
                ..TimingConfig::default()
            },
            handler: crate::handler::HandlerConfig {
                min_frame_delta: 1,
                ..Default::default()
            },
            ..Config::default()
        })
    }

    #[test]
    fn register_captures_base_and_creates_curves() {
        let mut scene = SceneGraph::new();
        let ids = letters(&mut scene, 3);
        let mut s = session();
        assert_eq!(s.register_fragments(&scene, "Title_Root", &ids), 3);
        assert_eq!(s.fragments().len(), 3);
        assert_eq!(s.store().base_names(), vec!["Title"]);
        let f = s.fragments().get(ids[2]).unwrap();
        assert_eq!(f.ordinal, 2);
        assert_eq!(f.base().location[0], 2.0);
    }

    #[test]
    fn frames_write_to_scene_and_restore_puts_back() {
        let mut scene = SceneGraph::new();
        let ids = letters(&mut scene, 2);
        let mut s = session();
        s.register_fragments(&scene, "Title", &ids);
        s.start();

        let out = s.on_frame_changed(&mut scene, 10);
        assert!(matches!(out, FrameOutcome::Applied { fragments: 2, .. }));
        // End of cycle: exit curve at 1, added to base x.
        assert_eq!(scene.transform(ids[1]).unwrap().location[0], 2.0);

        let report = s.restore(&mut scene);
        assert_eq!(report.entities_written, 2);
        assert_eq!(scene.transform(ids[1]).unwrap().location[0], 1.0);
        assert!(s.fragments().is_empty());
    }

    #[test]
    fn tick_is_pure() {
        let mut scene = SceneGraph::new();
        let ids = letters(&mut scene, 1);
        let mut s = session();
        s.register_fragments(&scene, "Title", &ids);
        let writes = s.tick(0);
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].channel, Channel::LocationX);
        assert_eq!(writes[0].value, ChannelValue::Scalar(0.0));
        assert_eq!(scene.transform(ids[0]).unwrap().location[0], 0.0);
    }

    #[test]
    fn separate_text_registers_fragments_once() {
        let mut scene = SceneGraph::new();
        scene.spawn_text("Title", "Hi", Transform::default());
        let mut s = session();
        let mut calls = 0;
        let mut separator =
            |_: &mut dyn Scene, root: EntityId, _: FragmentMode, _: f32| -> Result<Vec<EntityId>> {
                calls += 1;
                Ok(vec![root])
            };
        let first = s
            .separate_text(&mut scene, "Title", FragmentMode::Letters, 0.0, &mut separator)
            .unwrap();
        let second = s
            .separate_text(&mut scene, "Title", FragmentMode::Letters, 0.0, &mut separator)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(calls, 1);
        assert_eq!(s.fragments().len(), 1);
        assert_eq!(s.cache_stats().hits, 1);
    }

    #[test]
    fn preview_advances_and_evaluates() {
        let mut scene = SceneGraph::new();
        let ids = letters(&mut scene, 1);
        let mut s = session();
        s.register_fragments(&scene, "Title", &ids);
        assert_eq!(s.preview_tick(&mut scene), TimerAction::Stop);

        s.preview_start();
        let action = s.preview_tick(&mut scene);
        assert_eq!(
            action,
            TimerAction::Continue {
                frame: 1,
                delay: Duration::from_millis(100)
            }
        );
        assert_eq!(s.handler().last_frame(), Some(1));
        s.preview_stop();
        assert_eq!(s.preview_tick(&mut scene), TimerAction::Stop);
    }

    #[test]
    fn bundle_applies_timing_and_curves() {
        let mut scene = SceneGraph::new();
        let ids = letters(&mut scene, 1);
        let mut s = session();
        s.register_fragments(&scene, "Title", &ids);
        let applied = s
            .load_bundle(
                r#"{"schema_version": 1,
                    "timing": {"start_frame": 0, "duration": 20, "overlap": 0},
                    "curves": {"hold": [[0, 0.5], [1, 0.5]]}}"#,
                "Title",
            )
            .unwrap();
        assert_eq!(applied, 1);
        assert_eq!(s.config().timing.duration, 20);
        let writes = s.tick(10);
        assert_eq!(writes[0].value, ChannelValue::Scalar(0.5));

        let exported = s.export_bundle("Title").unwrap();
        assert_eq!(exported.curves.len(), 3);
        assert!(s.export_bundle("Nothing").is_err());
    }
}
