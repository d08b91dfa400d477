//! The engine context.
//!
//! Owns the catalog, cache, current query, scheduler and pipeline, and runs
//! them in dependency order once per frame: pending catalog delivery, one
//! cache build step, proximity scan, working-set refresh. Nothing here blocks;
//! each stage reads whatever its producer last published.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;

use crate::cache::{BuildProgress, CacheSnapshot, PropagationCache};
use crate::catalog::{ElementCatalog, LoadReport};
use crate::config::EngineConfig;
use crate::ingest::CatalogFeed;
use crate::pipeline::{FrameInput, FrameReport, FrameUpdatePipeline, Picker, RenderSink};
use crate::propagation::{Propagator, StateVector};
use crate::query::{Query, QueryResult};
use crate::scheduler::{ProximityScheduler, RankedSubset, ScanContext, ScheduleStep};
use crate::tle::{mean_motion_to_altitude_km, ElementRecord, OrbitClass};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheProgress {
    pub built: usize,
    pub processed: usize,
    pub total: usize,
    pub complete: bool,
}

#[derive(Clone, Debug)]
pub struct FrameOutput {
    pub frame: u64,
    pub catalog_generation: u64,
    /// Set when a catalog delivery was loaded at the start of this frame.
    pub catalog_loaded: Option<LoadReport>,
    pub cache: CacheProgress,
    pub result_len: usize,
    pub schedule: ScheduleStep,
    pub ranked: Arc<RankedSubset>,
    pub pipeline: FrameReport,
}

impl FrameOutput {
    /// Whether downstream consumers of the ranked subset should rebuild.
    pub fn ranked_swapped(&self) -> bool {
        matches!(self.schedule, ScheduleStep::Ranked { swapped: true })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ObjectDetails {
    pub record: ElementRecord,
    pub epoch_year: Option<i32>,
    pub mean_motion: Option<f64>,
    pub eccentricity: Option<f64>,
    pub orbit_class: Option<OrbitClass>,
    pub altitude_km: Option<f64>,
    pub has_handle: bool,
    pub state: Option<StateVector>,
    /// Position in the current ranked subset, nearest first.
    pub near_rank: Option<usize>,
}

pub struct Engine<P: Propagator> {
    config: EngineConfig,
    propagator: P,
    catalog: ElementCatalog,
    cache: PropagationCache<P::Handle>,
    query_text: String,
    query: Query,
    result: QueryResult,
    scheduler: ProximityScheduler,
    pipeline: FrameUpdatePipeline,
    feed: Option<CatalogFeed>,
    frame: u64,
}

impl<P: Propagator> Engine<P> {
    pub fn new(config: EngineConfig, propagator: P) -> Self {
        Self {
            cache: PropagationCache::new(config.cache.batch_size),
            scheduler: ProximityScheduler::new(config.proximity.clone()),
            pipeline: FrameUpdatePipeline::new(config.pipeline.clone()),
            config,
            propagator,
            catalog: ElementCatalog::new(),
            query_text: String::new(),
            query: Query::default(),
            result: QueryResult::empty(),
            feed: None,
            frame: 0,
        }
    }

    /// Push-based catalog updates, polled at the start of every tick.
    pub fn with_feed(mut self, feed: CatalogFeed) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn propagator(&self) -> &P {
        &self.propagator
    }

    /// Replaces the catalog. The in-flight cache build, the proximity scan
    /// and the working set are all superseded; every slot ramps in as new.
    pub fn load(&mut self, records: Vec<ElementRecord>) -> LoadReport {
        let report = self.catalog.load(records);
        self.cache.begin_build(self.catalog.snapshot());
        self.pipeline.reset();
        self.refresh_result();
        report
    }

    /// Changes the query. Re-evaluates only when the text differs.
    pub fn set_query(&mut self, text: &str) {
        if text == self.query_text {
            return;
        }
        self.query_text = text.to_string();
        self.query = Query::parse(text);
        self.refresh_result();
    }

    fn refresh_result(&mut self) {
        self.result = QueryResult::evaluate(&self.query, &self.catalog.snapshot());
        info!("query [{}] -> {} of {} records", self.query, self.result.len(), self.catalog.all().len());
        self.scheduler.reset();
        self.pipeline.set_source(self.result.ids().into());
    }

    pub fn catalog(&self) -> &ElementCatalog {
        &self.catalog
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn query_text(&self) -> &str {
        &self.query_text
    }

    pub fn result(&self) -> &QueryResult {
        &self.result
    }

    pub fn cache_snapshot(&self) -> Arc<CacheSnapshot<P::Handle>> {
        self.cache.snapshot()
    }

    pub fn ranked(&self) -> Arc<RankedSubset> {
        self.scheduler.current()
    }

    pub fn active_ids(&self) -> &[u32] {
        self.pipeline.active_ids()
    }

    pub fn request_hit_test(&mut self) {
        self.pipeline.request_hit_test();
    }

    pub fn tick<S, K>(&mut self, input: &FrameInput, sink: &mut S, picker: &mut K) -> FrameOutput
    where
        S: RenderSink + ?Sized,
        K: Picker + ?Sized,
    {
        let delivery = self.feed.as_mut().and_then(CatalogFeed::poll);
        let catalog_loaded = delivery.map(|records| self.load(records));

        let progress = self.cache.advance_build(&self.propagator, self.config.cache.batches_per_tick);
        let cache = self.cache.snapshot();

        let ctx = ScanContext {
            at: input.at,
            viewpoint: input.viewpoint.position,
            clock: input.clock,
        };
        let schedule = self.scheduler.tick(&self.propagator, &cache, &self.result, &ctx);
        let ranked = self.scheduler.current();

        let report = self.pipeline.tick(&self.propagator, &cache, &ranked, input, sink, picker);

        let (processed, total) = self.cache.progress();
        let output = FrameOutput {
            frame: self.frame,
            catalog_generation: self.catalog.generation(),
            catalog_loaded,
            cache: CacheProgress {
                built: cache.len(),
                processed,
                total,
                complete: progress == BuildProgress::Completed,
            },
            result_len: self.result.len(),
            schedule,
            ranked,
            pipeline: report,
        };
        self.frame += 1;
        output
    }

    pub fn inspect(&self, id: u32, at: DateTime<Utc>) -> Option<ObjectDetails> {
        let record = self.catalog.get(id)?;
        let cache = self.cache.snapshot();
        let handle = cache.get(id);
        let mean_motion = record.mean_motion();
        Some(ObjectDetails {
            record: record.clone(),
            epoch_year: record.epoch_year(),
            mean_motion,
            eccentricity: record.eccentricity(),
            orbit_class: record.orbit_class(),
            altitude_km: mean_motion.filter(|mm| *mm > 0.0).map(mean_motion_to_altitude_km),
            has_handle: handle.is_some(),
            state: handle.and_then(|h| self.propagator.propagate(h, at).ok()),
            near_rank: self.scheduler.current().ids().position(|r| r == id),
        })
    }
}
