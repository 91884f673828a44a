//! Per-frame evaluation into channel writes, and writing them to a scene.
//!
//! [`FrameApplier::tick`] is pure: it reads fragments and curves and returns the
//! writes for one frame. [`apply_writes`] hands them to the host.

use hashbrown::HashMap;
use log::error;
use serde::{Deserialize, Serialize};

use crate::fragment::{AnimatedFragment, Channel, ChannelValue};
use crate::ids::EntityId;
use crate::phase::Phase;
use crate::scene::Scene;
use crate::stage::{BlendConfig, EvaluationStrategy, OvershootConfig, StageEvaluator};
use crate::store::CurveStore;
use crate::timing::TimeMapper;

/// One value for one channel of one fragment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelWrite {
    pub entity: EntityId,
    pub channel: Channel,
    pub value: ChannelValue,
}

/// Evaluation detail for one fragment at one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FragmentSample {
    pub entity: EntityId,
    pub local_t: f32,
    pub phase: Phase,
    pub value: f32,
    /// True when evaluation failed and `value` is the identity fallback.
    pub fallback: bool,
}

/// Turns frames into channel writes.
#[derive(Clone, Debug, Default)]
pub struct FrameApplier {
    pub mapper: TimeMapper,
    pub blend: BlendConfig,
    pub overshoot: OvershootConfig,
    pub strategy: EvaluationStrategy,
}

impl FrameApplier {
    pub fn new(mapper: TimeMapper) -> Self {
        Self {
            mapper,
            ..Self::default()
        }
    }

    pub fn evaluator<'a>(&self, store: &'a CurveStore) -> StageEvaluator<'a> {
        StageEvaluator::new(store)
            .with_thresholds(self.mapper.thresholds)
            .with_blend(self.blend)
            .with_overshoot(self.overshoot)
    }

    /// Evaluate one fragment. `count` is the size of its stagger group.
    /// Failures are logged and replaced with the clamped local time.
    pub fn sample(
        &self,
        evaluator: &StageEvaluator<'_>,
        frame: i64,
        fragment: &AnimatedFragment,
        count: usize,
    ) -> FragmentSample {
        let time = self.mapper.fragment_time(frame, fragment.ordinal, count);
        let evaluated = evaluator.evaluate(self.strategy, &fragment.base_name, time.local);
        let (value, fallback) = match evaluated {
            Ok(v) => (v, false),
            Err(e) => {
                error!(
                    "Fragment {:?} ({}) failed at frame {frame}: {e}",
                    fragment.entity, fragment.base_name
                );
                (self.overshoot.apply(time.local), true)
            }
        };
        FragmentSample {
            entity: fragment.entity,
            local_t: time.local,
            phase: time.phase,
            value,
            fallback,
        }
    }

    /// Channel writes for every enabled channel of every fragment.
    ///
    /// Fragments are staggered within their base name group, so two text
    /// objects animated together each get the full overlap spread.
    pub fn tick(
        &self,
        frame: i64,
        fragments: &[&AnimatedFragment],
        store: &CurveStore,
    ) -> Vec<ChannelWrite> {
        let evaluator = self.evaluator(store);
        let counts = group_sizes(fragments);
        let mut writes = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let count = counts.get(fragment.base_name.as_str()).copied().unwrap_or(1);
            let sample = self.sample(&evaluator, frame, fragment, count);
            writes.extend(fragment.channels.enabled().map(|(channel, _)| ChannelWrite {
                entity: fragment.entity,
                channel,
                value: fragment.channel_value(channel, sample.value),
            }));
        }
        writes
    }
}

pub(crate) fn group_sizes<'a>(fragments: &[&'a AnimatedFragment]) -> HashMap<&'a str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &f in fragments {
        *counts.entry(f.base_name.as_str()).or_insert(0) += 1;
    }
    counts
}

/// Outcome of writing to the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub entities_written: usize,
    pub failed: usize,
}

/// Write channel values into the scene, one transform update per entity.
/// Entities that cannot be read or written are logged and skipped.
pub fn apply_writes(scene: &mut dyn Scene, writes: &[ChannelWrite]) -> ApplyReport {
    let mut report = ApplyReport::default();
    let mut start = 0;
    while start < writes.len() {
        let entity = writes[start].entity;
        let end = writes[start..]
            .iter()
            .position(|w| w.entity != entity)
            .map_or(writes.len(), |n| start + n);

        match scene.transform(entity) {
            Some(mut transform) => {
                for w in &writes[start..end] {
                    transform.set(w.channel, w.value);
                }
                match scene.set_transform(entity, transform) {
                    Ok(()) => report.entities_written += 1,
                    Err(e) => {
                        error!("Could not write transform of {entity:?}: {e}");
                        report.failed += 1;
                    }
                }
            }
            None => {
                error!("Skipping writes for missing entity {entity:?}");
                report.failed += 1;
            }
        }
        start = end;
    }
    report
}

/// Put every fragment back to its captured base transform.
pub fn restore<'a>(
    scene: &mut dyn Scene,
    fragments: impl IntoIterator<Item = &'a AnimatedFragment>,
) -> ApplyReport {
    let mut report = ApplyReport::default();
    for fragment in fragments {
        match scene.set_transform(fragment.entity, *fragment.base()) {
            Ok(()) => report.entities_written += 1,
            Err(e) => {
                error!("Could not restore {:?}: {e}", fragment.entity);
                report.failed += 1;
            }
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::PhaseCurve;
    use crate::fragment::Transform;
    use crate::phase::PhaseThresholds;
    use crate::scene::SceneGraph;
    use crate::timing::TimingConfig;
    use approx::assert_abs_diff_eq;

    fn applier() -> FrameApplier {
        FrameApplier::new(TimeMapper::new(
            TimingConfig {
                start_frame: 0,
                duration: 100,
                overlap: 0.0,
                ..TimingConfig::default()
            },
            PhaseThresholds::default(),
        ))
    }

    #[test]
    fn tick_writes_enabled_channels_only() {
        let mut store = CurveStore::default();
        store.ensure_all("T");
        let mut frag = AnimatedFragment::new(EntityId(1), "T", 0, Transform::at([3.0, 0.0, 0.0]));
        frag.channels.enable(Channel::ScaleX, 2.0);

        let writes = applier().tick(50, &[&frag], &store);
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0].channel, Channel::LocationX);
        match writes[0].value {
            ChannelValue::Scalar(v) => assert_abs_diff_eq!(v, 3.5, epsilon = 1e-5),
            other => panic!("unexpected {other:?}"),
        }
        match writes[1].value {
            ChannelValue::Scalar(v) => assert_abs_diff_eq!(v, 2.0, epsilon = 1e-5),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn broken_fragment_does_not_stop_the_frame() {
        let mut store = CurveStore::default();
        store.insert("Bad", Phase::Hold, PhaseCurve::from_xy(&[(0.0, f32::NAN), (1.0, 0.0)]));
        let bad = AnimatedFragment::new(EntityId(1), "Bad", 0, Transform::default());
        let good = AnimatedFragment::new(EntityId(2), "Good", 0, Transform::default());

        let app = applier();
        let evaluator = app.evaluator(&store);
        let sample = app.sample(&evaluator, 50, &bad, 1);
        assert!(sample.fallback);
        assert_abs_diff_eq!(sample.value, 0.5);

        let writes = app.tick(50, &[&bad, &good], &store);
        assert_eq!(writes.len(), 2);
    }

    #[test]
    fn apply_and_restore_round_trip() {
        let mut scene = SceneGraph::new();
        let base = Transform::at([1.0, 2.0, 0.0]);
        let id = scene.spawn("L0", base);
        let frag = AnimatedFragment::new(id, "T", 0, base);
        let store = CurveStore::default();

        let writes = applier().tick(50, &[&frag], &store);
        let report = apply_writes(&mut scene, &writes);
        assert_eq!(report.entities_written, 1);
        assert!(scene.transform(id).unwrap().location[0] > 1.0);

        restore(&mut scene, [&frag]);
        assert_eq!(scene.transform(id), Some(base));
    }

    #[test]
    fn writes_to_missing_entities_are_counted() {
        let mut scene = SceneGraph::new();
        let writes = [ChannelWrite {
            entity: EntityId(42),
            channel: Channel::LocationX,
            value: ChannelValue::Scalar(1.0),
        }];
        let report = apply_writes(&mut scene, &writes);
        assert_eq!(report.failed, 1);
        assert_eq!(report.entities_written, 0);
    }
}
