//! Propagation state cache.
//!
//! Handles are built from the catalog in fixed-size batches, one call to
//! `advance_build` per frame tick. Each finished batch becomes an immutable
//! chunk; the published `CacheSnapshot` is a list of shared chunks plus the
//! catalog they were built from, so publishing costs one `Arc` clone per
//! batch and readers never see a partially written chunk.

use std::sync::Arc;

use log::{debug, info, trace};

use crate::catalog::CatalogSnapshot;
use crate::propagation::Propagator;

pub struct CacheSnapshot<H> {
    catalog: Arc<CatalogSnapshot>,
    batch_size: usize,
    chunks: Vec<Arc<[Option<H>]>>,
    built: usize,
    complete: bool,
}

impl<H> CacheSnapshot<H> {
    fn empty(catalog: Arc<CatalogSnapshot>, batch_size: usize) -> Self {
        let complete = catalog.is_empty();
        Self {
            catalog,
            batch_size,
            chunks: Vec::new(),
            built: 0,
            complete,
        }
    }

    pub fn generation(&self) -> u64 {
        self.catalog.generation()
    }

    pub fn get(&self, id: u32) -> Option<&H> {
        let pos = self.catalog.position(id)?;
        self.chunks.get(pos / self.batch_size)?.get(pos % self.batch_size)?.as_ref()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.get(id).is_some()
    }

    /// Number of handles built so far.
    pub fn len(&self) -> usize {
        self.built
    }

    pub fn is_empty(&self) -> bool {
        self.built == 0
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.iter())
            .zip(self.catalog.all())
            .filter(|(handle, _)| handle.is_some())
            .map(|(_, record)| record.id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildProgress {
    InProgress,
    Completed,
}

struct BuildJob<H> {
    catalog: Arc<CatalogSnapshot>,
    cursor: usize,
    chunks: Vec<Arc<[Option<H>]>>,
    built: usize,
    malformed: usize,
}

pub struct PropagationCache<H> {
    batch_size: usize,
    published: Arc<CacheSnapshot<H>>,
    job: Option<BuildJob<H>>,
}

impl<H> PropagationCache<H> {
    pub fn new(batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            published: Arc::new(CacheSnapshot::empty(Arc::new(CatalogSnapshot::default()), batch_size)),
            job: None,
        }
    }

    /// Starts building handles for `catalog`, abandoning any build in flight.
    /// The published snapshot is reset to an empty one for the new catalog.
    pub fn begin_build(&mut self, catalog: Arc<CatalogSnapshot>) {
        if let Some(old) = self.job.take() {
            debug!(
                "cancelling cache build for generation {} at {}/{}",
                old.catalog.generation(),
                old.cursor,
                old.catalog.len()
            );
        }
        info!("building propagation cache for generation {} ({} records)", catalog.generation(), catalog.len());
        self.published = Arc::new(CacheSnapshot::empty(Arc::clone(&catalog), self.batch_size));
        if catalog.is_empty() {
            return;
        }
        self.job = Some(BuildJob {
            catalog,
            cursor: 0,
            chunks: Vec::new(),
            built: 0,
            malformed: 0,
        });
    }

    /// Builds up to `max_batches` batches and publishes after each one.
    pub fn advance_build<P>(&mut self, propagator: &P, max_batches: usize) -> BuildProgress
    where
        P: Propagator<Handle = H>,
    {
        let Some(job) = self.job.as_mut() else {
            return BuildProgress::Completed;
        };

        for _ in 0..max_batches.max(1) {
            let catalog = Arc::clone(&job.catalog);
            let records = catalog.all();
            let end = (job.cursor + self.batch_size).min(records.len());
            let mut built = 0;
            let mut malformed = 0;
            let chunk: Arc<[Option<H>]> = records[job.cursor..end]
                .iter()
                .map(|record| match propagator.build(&record.line1, &record.line2) {
                    Ok(handle) => {
                        built += 1;
                        Some(handle)
                    }
                    Err(e) => {
                        malformed += 1;
                        trace!("record {} omitted from cache: {e}", record.id);
                        None
                    }
                })
                .collect();
            job.built += built;
            job.malformed += malformed;
            job.chunks.push(chunk);
            job.cursor = end;

            let complete = job.cursor >= catalog.len();
            self.published = Arc::new(CacheSnapshot {
                catalog: Arc::clone(&catalog),
                batch_size: self.batch_size,
                chunks: job.chunks.clone(),
                built: job.built,
                complete,
            });

            if complete {
                info!(
                    "propagation cache for generation {} complete: {} built, {} malformed",
                    job.catalog.generation(),
                    job.built,
                    job.malformed
                );
                self.job = None;
                return BuildProgress::Completed;
            }
        }
        BuildProgress::InProgress
    }

    pub fn snapshot(&self) -> Arc<CacheSnapshot<H>> {
        Arc::clone(&self.published)
    }

    pub fn is_complete(&self) -> bool {
        self.job.is_none()
    }

    /// Records processed / total for the build in flight.
    pub fn progress(&self) -> (usize, usize) {
        match &self.job {
            Some(job) => (job.cursor, job.catalog.len()),
            None => (self.published.catalog.len(), self.published.catalog.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ElementCatalog;
    use crate::testing::{record, FakePropagator};

    fn catalog_of(ids: std::ops::Range<u32>) -> Arc<CatalogSnapshot> {
        let mut catalog = ElementCatalog::new();
        catalog.load(ids.map(|id| record(id, &format!("SAT-{id}"))).collect());
        catalog.snapshot()
    }

    #[test]
    fn builds_in_batches_and_publishes_each() {
        let propagator = FakePropagator::default();
        let mut cache = PropagationCache::new(4);
        cache.begin_build(catalog_of(1..11));

        assert_eq!(cache.snapshot().len(), 0);
        assert_eq!(cache.advance_build(&propagator, 1), BuildProgress::InProgress);
        assert_eq!(cache.snapshot().len(), 4);
        assert!(!cache.snapshot().is_complete());
        assert_eq!(cache.advance_build(&propagator, 1), BuildProgress::InProgress);
        assert_eq!(cache.advance_build(&propagator, 1), BuildProgress::Completed);
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 10);
        assert!(snapshot.is_complete());
        assert!(cache.is_complete());
        assert!(snapshot.contains(10));
        assert_eq!(cache.advance_build(&propagator, 1), BuildProgress::Completed);
    }

    #[test]
    fn malformed_records_are_omitted() {
        let propagator = FakePropagator::default().with_malformed([3, 5]);
        let mut cache = PropagationCache::new(100);
        cache.begin_build(catalog_of(1..8));
        cache.advance_build(&propagator, 1);
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 5);
        assert!(!snapshot.contains(3));
        assert!(snapshot.contains(4));
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), [1, 2, 4, 6, 7]);
    }

    #[test]
    fn restart_never_mixes_generations() {
        let propagator = FakePropagator::default();
        let mut catalog = ElementCatalog::new();
        let mut cache = PropagationCache::new(3);
        catalog.load((1..10).map(|id| record(id, "OLD")).collect());
        cache.begin_build(catalog.snapshot());
        cache.advance_build(&propagator, 1);
        let stale = cache.snapshot();

        catalog.load((100..105).map(|id| record(id, "NEW")).collect());
        cache.begin_build(catalog.snapshot());
        assert_eq!(cache.snapshot().len(), 0);
        while cache.advance_build(&propagator, 1) == BuildProgress::InProgress {}

        let snapshot = cache.snapshot();
        assert_eq!(snapshot.ids().collect::<Vec<_>>(), [100, 101, 102, 103, 104]);
        assert!(!snapshot.contains(1));
        assert_eq!((stale.generation(), snapshot.generation()), (1, 2));
        assert_eq!(stale.len(), 3);
    }

    #[test]
    fn empty_catalog_is_complete_immediately() {
        let mut cache: PropagationCache<crate::testing::FakeHandle> = PropagationCache::new(10);
        cache.begin_build(Arc::new(CatalogSnapshot::default()));
        assert!(cache.is_complete());
        assert!(cache.snapshot().is_complete());
    }

    #[test]
    fn multiple_batches_per_tick() {
        let propagator = FakePropagator::default();
        let mut cache = PropagationCache::new(2);
        cache.begin_build(catalog_of(1..7));
        assert_eq!(cache.advance_build(&propagator, 2), BuildProgress::InProgress);
        assert_eq!(cache.progress(), (4, 6));
        assert_eq!(cache.advance_build(&propagator, 2), BuildProgress::Completed);
    }
}
