//! Real-time satellite catalog engine.
//!
//! Ingests TLE element sets, builds SGP4 handles incrementally, filters the
//! catalog with a small query language, keeps the objects nearest to a moving
//! viewpoint ranked, and drives a bounded per-frame working set into a
//! caller-supplied render sink. [`Engine`] ties the stages together.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod propagation;
pub mod query;
pub mod scheduler;
pub mod tle;

#[cfg(test)]
mod testing;

pub use cache::{BuildProgress, CacheSnapshot, PropagationCache};
pub use catalog::{CatalogSnapshot, ElementCatalog, LoadReport};
pub use config::EngineConfig;
pub use engine::{CacheProgress, Engine, FrameOutput, ObjectDetails};
pub use error::{EngineError, PropagationError, Result};
pub use pipeline::{FrameInput, FrameReport, FrameUpdatePipeline, HitTest, HitTestSkip, Picker, PriorityClass, RenderSink, Viewpoint};
pub use propagation::{Propagator, Sgp4Propagator, StateVector};
pub use query::{Query, QueryResult};
pub use scheduler::{ProximityScheduler, Ranked, RankedSubset, ScanContext, ScheduleStep};
pub use tle::{CatalogSource, ElementRecord, OrbitClass};
