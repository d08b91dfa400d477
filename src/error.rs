//! Error types for the catalog engine.
//!
//! `EngineError` covers the fallible edges (configuration, catalog
//! ingestion). Propagation failures live in `PropagationError` and are
//! always recovered inside the engine.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("fetch of {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    #[error("failed to read catalog {path}: {source}")]
    CatalogRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no valid element records found")]
    EmptyCatalog,
}

/// Why a propagator could not produce a handle or a state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PropagationError {
    /// The element lines could not be turned into a propagator handle.
    #[error("malformed element record: {0}")]
    MalformedRecord(String),

    /// The handle is valid but yields no state at the requested time.
    #[error("no valid state: {0}")]
    NoValidState(String),
}
