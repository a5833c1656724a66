//! Configuration builder.
//!
//! This module provides a builder pattern API for creating configurations.

use super::{Result, models::*, validation};
use std::path::Path;
use std::time::Duration;

/// Builder for creating MemwardenConfig instances.
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: MemwardenConfig,
}

impl ConfigBuilder {
    /// Create a new configuration builder with default values.
    pub fn new() -> Self {
        Self {
            config: MemwardenConfig::default(),
        }
    }

    /// Create a builder seeded with validated defaults.
    pub fn defaults() -> Self {
        Self::new()
    }

    /// Set the sampling interval.
    pub fn with_sampling_interval(mut self, interval: Duration) -> Self {
        self.config.monitoring.sampling_interval = interval;
        self
    }

    /// Set the event channel capacity.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.config.monitoring.event_capacity = capacity;
        self
    }

    /// Set the trigger percentages for all three tiers at once.
    pub fn with_thresholds(mut self, warning: f64, critical: f64, emergency: f64) -> Self {
        self.config.thresholds.warning = warning;
        self.config.thresholds.critical = critical;
        self.config.thresholds.emergency = emergency;
        self
    }

    /// Set the hysteresis margin in percentage points.
    pub fn with_hysteresis(mut self, hysteresis: f64) -> Self {
        self.config.thresholds.hysteresis = hysteresis;
        self
    }

    /// Set the model memory budget in bytes.
    pub fn with_model_budget_bytes(mut self, bytes: u64) -> Self {
        self.config.eviction.model_budget_bytes = bytes;
        self
    }

    /// Set the eviction priority convention.
    pub fn with_eviction_order(mut self, order: EvictionOrder) -> Self {
        self.config.eviction.order = order;
        self
    }

    /// Set the reclamation headroom in percentage points.
    pub fn with_headroom_percentage(mut self, headroom: f64) -> Self {
        self.config.eviction.headroom_percentage = headroom;
        self
    }

    /// Set the log level.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.config.logging.level = level;
        self
    }

    /// Set the log format.
    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.config.logging.format = format;
        self
    }

    /// Configure logging to a file.
    pub fn with_log_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config.logging.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enable or disable stdout logging.
    pub fn with_stdout_logging(mut self, stdout: bool) -> Self {
        self.config.logging.stdout = stdout;
        self
    }

    /// Validate and return the configuration.
    pub fn build(self) -> Result<MemwardenConfig> {
        validation::validate_config(&self.config)?;
        Ok(self.config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
