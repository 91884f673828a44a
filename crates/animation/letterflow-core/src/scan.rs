//! Frame range continuity check, runnable in chunks.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::apply::{group_sizes, FrameApplier};
use crate::fragment::AnimatedFragment;
use crate::ids::EntityId;
use crate::stage::EvaluationStrategy;
use crate::store::CurveStore;

/// Largest frame-to-frame value change seen so far.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Jump {
    pub entity: EntityId,
    /// Frame where the value landed after the jump.
    pub frame: i64,
    pub size: f32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanReport {
    pub frames_scanned: u64,
    /// Samples that fell back to identity time.
    pub fallbacks: u64,
    pub max_jump: Option<Jump>,
}

impl ScanReport {
    #[inline]
    pub fn max_jump_size(&self) -> f32 {
        self.max_jump.map_or(0.0, |j| j.size)
    }
}

/// Walks `from..=to`, sampling every fragment at each frame.
#[derive(Clone, Debug)]
pub struct ContinuityScan {
    next: i64,
    to: i64,
    strategy: EvaluationStrategy,
    previous: HashMap<EntityId, f32>,
    report: ScanReport,
}

impl ContinuityScan {
    pub fn new(from: i64, to: i64, strategy: EvaluationStrategy) -> Self {
        let (from, to) = if to < from { (to, from) } else { (from, to) };
        Self {
            next: from,
            to,
            strategy,
            previous: HashMap::new(),
            report: ScanReport::default(),
        }
    }

    #[inline]
    pub fn is_done(&self) -> bool {
        self.next > self.to
    }

    #[inline]
    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    /// Scan up to `max_frames` further frames. Returns true once the range is done.
    pub fn step(
        &mut self,
        max_frames: usize,
        applier: &FrameApplier,
        fragments: &[&AnimatedFragment],
        store: &CurveStore,
    ) -> bool {
        let applier = FrameApplier {
            strategy: self.strategy,
            ..applier.clone()
        };
        let evaluator = applier.evaluator(store);
        let counts = group_sizes(fragments);

        for _ in 0..max_frames {
            if self.is_done() {
                break;
            }
            let frame = self.next;
            for fragment in fragments {
                let count = counts.get(fragment.base_name.as_str()).copied().unwrap_or(1);
                let sample = applier.sample(&evaluator, frame, fragment, count);
                if sample.fallback {
                    self.report.fallbacks += 1;
                }
                if let Some(prev) = self.previous.insert(fragment.entity, sample.value) {
                    let size = (sample.value - prev).abs();
                    if size > self.report.max_jump_size() {
                        self.report.max_jump = Some(Jump {
                            entity: fragment.entity,
                            frame,
                            size,
                        });
                    }
                }
            }
            self.report.frames_scanned += 1;
            self.next += 1;
        }
        self.is_done()
    }

    /// Scan the whole remaining range at once.
    pub fn run(
        mut self,
        applier: &FrameApplier,
        fragments: &[&AnimatedFragment],
        store: &CurveStore,
    ) -> ScanReport {
        while !self.step(usize::MAX, applier, fragments, store) {}
        self.report
    }
}
