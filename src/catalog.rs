//! Element catalog and id index.
//!
//! A catalog is immutable once loaded. `ElementCatalog::load` builds a fresh
//! `CatalogSnapshot` and swaps it in whole, so anyone holding the previous
//! `Arc` keeps a consistent view. Every load gets a new generation number
//! that downstream state uses to recognise stale work.

use std::collections::HashMap;
use std::sync::Arc;

use log::{info, warn};

use crate::tle::ElementRecord;

#[derive(Debug, Default)]
pub struct CatalogSnapshot {
    generation: u64,
    records: Vec<ElementRecord>,
    index: HashMap<u32, usize>,
}

impl CatalogSnapshot {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: u32) -> Option<&ElementRecord> {
        self.index.get(&id).map(|&pos| &self.records[pos])
    }

    /// Position of `id` in insertion order.
    pub fn position(&self, id: u32) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn all(&self) -> &[ElementRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadReport {
    pub generation: u64,
    pub loaded: usize,
    pub duplicates: usize,
}

#[derive(Debug, Default)]
pub struct ElementCatalog {
    current: Arc<CatalogSnapshot>,
}

impl ElementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the catalog and index. Later records repeating an id already
    /// seen are dropped.
    pub fn load(&mut self, records: Vec<ElementRecord>) -> LoadReport {
        let generation = self.current.generation + 1;
        let mut index = HashMap::with_capacity(records.len());
        let mut kept = Vec::with_capacity(records.len());
        let mut duplicates = 0;

        for record in records {
            if index.contains_key(&record.id) {
                duplicates += 1;
                continue;
            }
            index.insert(record.id, kept.len());
            kept.push(record);
        }

        if duplicates > 0 {
            warn!("catalog generation {generation}: dropped {duplicates} records with repeated ids");
        }
        info!("catalog generation {generation}: {} records", kept.len());

        let report = LoadReport {
            generation,
            loaded: kept.len(),
            duplicates,
        };
        self.current = Arc::new(CatalogSnapshot {
            generation,
            records: kept,
            index,
        });
        report
    }

    pub fn get(&self, id: u32) -> Option<&ElementRecord> {
        self.current.get(id)
    }

    pub fn all(&self) -> &[ElementRecord] {
        self.current.all()
    }

    pub fn snapshot(&self) -> Arc<CatalogSnapshot> {
        Arc::clone(&self.current)
    }

    pub fn generation(&self) -> u64 {
        self.current.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u32, name: &str) -> ElementRecord {
        ElementRecord::new(id, name, "", "")
    }

    #[test]
    fn load_indexes_in_insertion_order() {
        let mut catalog = ElementCatalog::new();
        let report = catalog.load(vec![record(3, "C"), record(1, "A"), record(2, "B")]);
        assert_eq!(report.loaded, 3);
        assert_eq!(report.generation, 1);
        let ids: Vec<u32> = catalog.all().iter().map(|r| r.id).collect();
        assert_eq!(ids, [3, 1, 2]);
        assert_eq!(catalog.get(1).map(|r| r.name.as_str()), Some("A"));
        assert_eq!(catalog.snapshot().position(2), Some(2));
        assert!(catalog.get(9).is_none());
    }

    #[test]
    fn reload_replaces_wholesale() {
        let mut catalog = ElementCatalog::new();
        catalog.load(vec![record(1, "A")]);
        let before = catalog.snapshot();
        catalog.load(vec![record(2, "B")]);
        assert!(catalog.get(1).is_none());
        assert_eq!(catalog.generation(), 2);
        assert_eq!(before.get(1).map(|r| r.name.as_str()), Some("A"));
    }

    #[test]
    fn empty_load_gives_empty_catalog() {
        let mut catalog = ElementCatalog::new();
        catalog.load(vec![record(1, "A")]);
        let report = catalog.load(Vec::new());
        assert_eq!(report.loaded, 0);
        assert!(catalog.all().is_empty());
        assert!(catalog.snapshot().is_empty());
    }

    #[test]
    fn first_duplicate_wins() {
        let mut catalog = ElementCatalog::new();
        let report = catalog.load(vec![record(1, "A"), record(1, "A2"), record(2, "B")]);
        assert_eq!(report.duplicates, 1);
        assert_eq!(catalog.all().len(), 2);
        assert_eq!(catalog.get(1).map(|r| r.name.as_str()), Some("A"));
    }
}
