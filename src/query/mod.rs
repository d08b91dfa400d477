//! Query filter engine.
//!
//! ```text
//! STARLINK OR ONEWEB limit:100
//! china GEO year:2015
//! debris LEO SKIP 50 FIRST 25
//! ```

mod aliases;
mod eval;
mod parse;

use std::sync::Arc;

use crate::catalog::CatalogSnapshot;
use crate::tle::ElementRecord;

pub use eval::{is_debris, is_rocket_body, Query};
pub use parse::{parse, Directive, OrbitKeyword, Term, TypeKeyword};

/// Ordered view into a catalog snapshot; holds positions, not copies.
#[derive(Clone, Debug)]
pub struct QueryResult {
    catalog: Arc<CatalogSnapshot>,
    positions: Arc<[usize]>,
}

impl QueryResult {
    pub fn evaluate(query: &Query, catalog: &Arc<CatalogSnapshot>) -> Self {
        let positions = query.select(catalog.all());
        Self {
            catalog: Arc::clone(catalog),
            positions: positions.into(),
        }
    }

    pub fn empty() -> Self {
        Self {
            catalog: Arc::new(CatalogSnapshot::default()),
            positions: Arc::from(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ElementRecord> {
        let pos = *self.positions.get(index)?;
        self.catalog.all().get(pos)
    }

    pub fn id_at(&self, index: usize) -> Option<u32> {
        self.get(index).map(|record| record.id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementRecord> + '_ {
        self.positions.iter().map(|&pos| &self.catalog.all()[pos])
    }

    pub fn ids(&self) -> Vec<u32> {
        self.iter().map(|record| record.id).collect()
    }

    pub fn generation(&self) -> u64 {
        self.catalog.generation()
    }
}

/// One-shot parse and filter.
pub fn filter<'a>(records: &'a [ElementRecord], query: &str) -> Vec<&'a ElementRecord> {
    Query::parse(query).filter(records)
}
