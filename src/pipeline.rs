//! Frame update pipeline.
//!
//! Each tick the active working set (a prefix of the current source ids)
//! ramps toward `min(len, instance_cap)`, a rotating tenth of it is
//! re-propagated, newly added slots and pinned objects (hovered, selected,
//! focused) are refreshed unconditionally, and a hit-test is run if the
//! throttle allows it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nalgebra::{Vector2, Vector3};

use crate::cache::CacheSnapshot;
use crate::config::PipelineConfig;
use crate::propagation::Propagator;
use crate::scheduler::RankedSubset;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityClass {
    Focused,
    Selected,
    Hovered,
    /// In the current ranked subset.
    Near,
    Normal,
}

/// Receives per-slot placements; owns all geometry.
pub trait RenderSink {
    fn place(&mut self, slot: usize, id: u32, position: Vector3<f64>, class: PriorityClass);

    /// The object has no valid position this frame.
    fn hide(&mut self, slot: usize, id: u32);

    fn set_active_len(&mut self, len: usize);
}

/// Resolves the object under a screen point among the active ids.
pub trait Picker {
    fn pick(&mut self, pointer: Vector2<f64>, active: &[u32]) -> Option<u32>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Viewpoint {
    pub position: Vector3<f64>,
    /// Drag/rotate in progress.
    pub manipulating: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameInput {
    pub at: DateTime<Utc>,
    pub clock: Duration,
    pub viewpoint: Viewpoint,
    pub pointer: Option<Vector2<f64>>,
    pub hovered: Option<u32>,
    pub selected: Option<u32>,
    pub focused: Option<u32>,
    pub force_hit_test: bool,
}

impl FrameInput {
    pub fn new(at: DateTime<Utc>, clock: Duration) -> Self {
        Self {
            at,
            clock,
            viewpoint: Viewpoint::default(),
            pointer: None,
            hovered: None,
            selected: None,
            focused: None,
            force_hit_test: false,
        }
    }

    fn class_of(&self, id: u32, near: &HashSet<u32>) -> PriorityClass {
        if self.focused == Some(id) {
            PriorityClass::Focused
        } else if self.selected == Some(id) {
            PriorityClass::Selected
        } else if self.hovered == Some(id) {
            PriorityClass::Hovered
        } else if near.contains(&id) {
            PriorityClass::Near
        } else {
            PriorityClass::Normal
        }
    }

    fn pinned(&self) -> impl Iterator<Item = u32> {
        [self.focused, self.selected, self.hovered].into_iter().flatten()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTestSkip {
    NoPointer,
    Manipulating,
    FastPointer,
    RateLimited,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTest {
    Skipped(HitTestSkip),
    Evaluated(Option<u32>),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    pub active: usize,
    pub added: usize,
    pub refreshed: usize,
    pub hidden: usize,
    pub hit_test: HitTest,
}

pub struct FrameUpdatePipeline {
    config: PipelineConfig,
    source: Arc<[u32]>,
    slots: HashMap<u32, usize>,
    active: usize,
    tick: u64,
    last_hit_test: Option<Duration>,
    last_pointer: Option<Vector2<f64>>,
    force_pending: bool,
}

impl FrameUpdatePipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            source: Arc::from(Vec::new()),
            slots: HashMap::new(),
            active: 0,
            tick: 0,
            last_hit_test: None,
            last_pointer: None,
            force_pending: false,
        }
    }

    /// Replaces the source sequence. Active slots whose id is unchanged stay
    /// active; the rest ramp back in as new slots.
    pub fn set_source(&mut self, ids: Arc<[u32]>) {
        let kept = self
            .source
            .iter()
            .zip(ids.iter())
            .take(self.active)
            .take_while(|(old, new)| old == new)
            .count();
        let cap = ids.len().min(self.config.instance_cap);
        self.slots = ids[..cap].iter().enumerate().map(|(slot, &id)| (id, slot)).collect();
        self.source = ids;
        self.active = kept.min(self.target());
    }

    pub fn reset(&mut self) {
        self.set_source(Arc::from(Vec::new()));
    }

    /// Arms one hit-test that bypasses the throttle on the next tick.
    pub fn request_hit_test(&mut self) {
        self.force_pending = true;
    }

    pub fn target(&self) -> usize {
        self.source.len().min(self.config.instance_cap)
    }

    pub fn active_len(&self) -> usize {
        self.active
    }

    pub fn active_ids(&self) -> &[u32] {
        &self.source[..self.active]
    }

    pub fn tick<P, S, K>(
        &mut self,
        propagator: &P,
        cache: &CacheSnapshot<P::Handle>,
        ranked: &RankedSubset,
        input: &FrameInput,
        sink: &mut S,
        picker: &mut K,
    ) -> FrameReport
    where
        P: Propagator,
        S: RenderSink + ?Sized,
        K: Picker + ?Sized,
    {
        let previous = self.active.min(self.target());
        self.active = (previous + self.config.ramp_step).min(self.target());
        sink.set_active_len(self.active);

        let near: HashSet<u32> = ranked.ids().collect();
        let period = self.config.refresh_period.max(1);
        let phase = (self.tick % period) as usize;
        let mut report = FrameReport {
            active: self.active,
            added: self.active - previous,
            refreshed: 0,
            hidden: 0,
            hit_test: HitTest::Skipped(HitTestSkip::NoPointer),
        };

        let rotation = (phase..previous).step_by(period as usize);
        let added = previous..self.active;
        let mut refreshed_pinned = Vec::new();
        for slot in rotation.chain(added) {
            let id = self.source[slot];
            self.refresh(propagator, cache, input, &near, slot, id, sink, &mut report);
            if input.pinned().any(|p| p == id) {
                refreshed_pinned.push(id);
            }
        }
        for id in input.pinned() {
            if refreshed_pinned.contains(&id) {
                continue;
            }
            let Some(&slot) = self.slots.get(&id) else { continue };
            if slot >= self.active {
                continue;
            }
            refreshed_pinned.push(id);
            self.refresh(propagator, cache, input, &near, slot, id, sink, &mut report);
        }

        report.hit_test = self.hit_test(input, picker);
        self.tick += 1;
        report
    }

    #[allow(clippy::too_many_arguments)]
    fn refresh<P, S>(
        &self,
        propagator: &P,
        cache: &CacheSnapshot<P::Handle>,
        input: &FrameInput,
        near: &HashSet<u32>,
        slot: usize,
        id: u32,
        sink: &mut S,
        report: &mut FrameReport,
    ) where
        P: Propagator,
        S: RenderSink + ?Sized,
    {
        report.refreshed += 1;
        let state = cache
            .get(id)
            .and_then(|handle| propagator.propagate(handle, input.at).ok());
        match state {
            Some(state) => sink.place(slot, id, state.position, input.class_of(id, near)),
            None => {
                report.hidden += 1;
                sink.hide(slot, id);
            }
        }
    }

    fn hit_test<K: Picker + ?Sized>(&mut self, input: &FrameInput, picker: &mut K) -> HitTest {
        let Some(pointer) = input.pointer else {
            return HitTest::Skipped(HitTestSkip::NoPointer);
        };
        let pending = std::mem::take(&mut self.force_pending);
        let forced = input.force_hit_test || pending;
        let moved = self.last_pointer.map_or(0.0, |last| (pointer - last).norm());
        self.last_pointer = Some(pointer);

        if !forced {
            if input.viewpoint.manipulating {
                return HitTest::Skipped(HitTestSkip::Manipulating);
            }
            if moved > self.config.fast_pointer_px {
                return HitTest::Skipped(HitTestSkip::FastPointer);
            }
            if let Some(last) = self.last_hit_test {
                if input.clock.saturating_sub(last) < self.config.min_hit_test_interval() {
                    return HitTest::Skipped(HitTestSkip::RateLimited);
                }
            }
        }

        self.last_hit_test = Some(input.clock);
        HitTest::Evaluated(picker.pick(pointer, &self.source[..self.active]))
    }
}
