//! Engine configuration.
//!
//! Every section has defaults, so a TOML file only needs the keys it changes:
//!
//! ```toml
//! [proximity]
//! max_visible = 200
//!
//! [pipeline]
//! instance_cap = 50000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{EngineError, Result};

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub batch_size: usize,
    pub batches_per_tick: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            batch_size: 500,
            batches_per_tick: 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProximityConfig {
    pub max_visible: usize,
    pub sort_batch_size: usize,
    pub min_resort_interval_ms: u64,
    pub min_publish_interval_ms: u64,
}

impl ProximityConfig {
    pub fn min_resort_interval(&self) -> Duration {
        Duration::from_millis(self.min_resort_interval_ms)
    }

    pub fn min_publish_interval(&self) -> Duration {
        Duration::from_millis(self.min_publish_interval_ms)
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            max_visible: 150,
            sort_batch_size: 500,
            min_resort_interval_ms: 500,
            min_publish_interval_ms: 1000,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub ramp_step: usize,
    pub instance_cap: usize,
    pub refresh_period: u64,
    pub hit_tests_per_second: u32,
    pub fast_pointer_px: f64,
}

impl PipelineConfig {
    pub fn min_hit_test_interval(&self) -> Duration {
        Duration::from_secs(1) / self.hit_tests_per_second.max(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ramp_step: 1000,
            instance_cap: 30_000,
            refresh_period: 10,
            hit_tests_per_second: 20,
            fast_pointer_px: 8.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    pub proximity: ProximityConfig,
    pub pipeline: PipelineConfig,
}

impl EngineConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|source| EngineError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    /// Loads `path` if it exists, otherwise returns defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                log::warn!("config {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let checks = [
            (self.cache.batch_size, "cache.batch_size"),
            (self.cache.batches_per_tick, "cache.batches_per_tick"),
            (self.proximity.max_visible, "proximity.max_visible"),
            (self.proximity.sort_batch_size, "proximity.sort_batch_size"),
            (self.pipeline.ramp_step, "pipeline.ramp_step"),
            (self.pipeline.instance_cap, "pipeline.instance_cap"),
            (self.pipeline.refresh_period as usize, "pipeline.refresh_period"),
            (self.pipeline.hit_tests_per_second as usize, "pipeline.hit_tests_per_second"),
        ];
        for (value, name) in checks {
            if value == 0 {
                return Err(EngineError::InvalidConfig(format!("{name} must be greater than zero")));
            }
        }
        if !(self.pipeline.fast_pointer_px.is_finite() && self.pipeline.fast_pointer_px >= 0.0) {
            return Err(EngineError::InvalidConfig("pipeline.fast_pointer_px must be a non-negative number".into()));
        }
        Ok(())
    }
}
