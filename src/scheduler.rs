//! Proximity scheduler.
//!
//! Keeps the `max_visible` candidates nearest to the viewpoint. Small
//! candidate sets are re-ranked whole, at most once per re-sort interval.
//! Larger sets are scanned `sort_batch_size` candidates per tick; when the
//! cursor wraps, the accumulated scores are sorted and the head published.
//! A new ranking only replaces the published one when its membership or
//! nearest entry changed, or the publish interval has elapsed.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use nalgebra::Vector3;

use crate::cache::CacheSnapshot;
use crate::config::ProximityConfig;
use crate::propagation::Propagator;
use crate::query::QueryResult;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ranked {
    pub id: u32,
    pub distance_sq: f64,
    pub position: Vector3<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct RankedSubset {
    entries: Vec<Ranked>,
    cycle: u64,
}

impl RankedSubset {
    pub fn from_entries(entries: Vec<Ranked>) -> Self {
        Self { entries, cycle: 0 }
    }

    pub fn entries(&self) -> &[Ranked] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|r| r.id)
    }

    pub fn nearest(&self) -> Option<&Ranked> {
        self.entries.first()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.entries.iter().any(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scan cycle that produced this ranking.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    fn same_membership(&self, other: &[Ranked]) -> bool {
        if self.entries.len() != other.len() {
            return false;
        }
        if self.nearest().map(|r| r.id) != other.first().map(|r| r.id) {
            return false;
        }
        let ids: HashSet<u32> = self.ids().collect();
        other.iter().all(|r| ids.contains(&r.id))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ScanContext {
    pub at: DateTime<Utc>,
    pub viewpoint: Vector3<f64>,
    /// Monotonic frame clock.
    pub clock: Duration,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleStep {
    /// Small set, re-sort interval not yet elapsed.
    Idle,
    Scanning { cursor: usize, total: usize },
    Ranked { swapped: bool },
}

pub struct ProximityScheduler {
    config: ProximityConfig,
    cursor: usize,
    buffer: Vec<Ranked>,
    published: Arc<RankedSubset>,
    last_sort: Option<Duration>,
    last_publish: Option<Duration>,
    cycles: u64,
}

impl ProximityScheduler {
    pub fn new(mut config: ProximityConfig) -> Self {
        config.sort_batch_size = config.sort_batch_size.max(1);
        Self {
            config,
            cursor: 0,
            buffer: Vec::new(),
            published: Arc::new(RankedSubset::default()),
            last_sort: None,
            last_publish: None,
            cycles: 0,
        }
    }

    /// Drops the scan in progress and the published ranking.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.buffer.clear();
        self.published = Arc::new(RankedSubset::default());
        self.last_sort = None;
        self.last_publish = None;
    }

    pub fn current(&self) -> Arc<RankedSubset> {
        Arc::clone(&self.published)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn tick<P: Propagator>(
        &mut self,
        propagator: &P,
        cache: &CacheSnapshot<P::Handle>,
        candidates: &QueryResult,
        ctx: &ScanContext,
    ) -> ScheduleStep {
        let total = candidates.len();

        if total <= self.config.max_visible {
            self.cursor = 0;
            self.buffer.clear();
            if let Some(last) = self.last_sort {
                if ctx.clock.saturating_sub(last) < self.config.min_resort_interval() {
                    return ScheduleStep::Idle;
                }
            }
            let mut entries: Vec<Ranked> = (0..total)
                .filter_map(|i| score(propagator, cache, candidates.id_at(i)?, ctx))
                .collect();
            sort_by_distance(&mut entries);
            self.last_sort = Some(ctx.clock);
            let swapped = self.publish(entries, ctx.clock);
            return ScheduleStep::Ranked { swapped };
        }

        if self.cursor >= total {
            self.cursor = 0;
        }
        let end = (self.cursor + self.config.sort_batch_size).min(total);
        for i in self.cursor..end {
            if let Some(ranked) = candidates.id_at(i).and_then(|id| score(propagator, cache, id, ctx)) {
                self.buffer.push(ranked);
            }
        }
        self.cursor = end;

        if self.cursor < total {
            return ScheduleStep::Scanning {
                cursor: self.cursor,
                total,
            };
        }

        self.cursor = 0;
        let mut entries = std::mem::take(&mut self.buffer);
        sort_by_distance(&mut entries);
        entries.truncate(self.config.max_visible);
        let swapped = self.publish(entries, ctx.clock);
        ScheduleStep::Ranked { swapped }
    }

    fn publish(&mut self, entries: Vec<Ranked>, clock: Duration) -> bool {
        self.cycles += 1;
        let interval_elapsed = match self.last_publish {
            Some(last) => clock.saturating_sub(last) >= self.config.min_publish_interval(),
            None => true,
        };
        if !interval_elapsed && self.published.same_membership(&entries) {
            return false;
        }
        debug!(
            "ranked subset cycle {}: {} entries, nearest {:?}",
            self.cycles,
            entries.len(),
            entries.first().map(|r| r.id)
        );
        self.published = Arc::new(RankedSubset {
            entries,
            cycle: self.cycles,
        });
        self.last_publish = Some(clock);
        true
    }
}

fn score<P: Propagator>(propagator: &P, cache: &CacheSnapshot<P::Handle>, id: u32, ctx: &ScanContext) -> Option<Ranked> {
    let handle = cache.get(id)?;
    let state = propagator.propagate(handle, ctx.at).ok()?;
    Some(Ranked {
        id,
        distance_sq: (state.position - ctx.viewpoint).norm_squared(),
        position: state.position,
    })
}

fn sort_by_distance(entries: &mut [Ranked]) {
    entries.sort_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
}
