//! Configuration model definitions.
//!
//! This module contains the configuration structures for all Memwarden
//! components. Configuration is constructor-only: the orchestrator takes a
//! validated config once and nothing is mutable mid-session.

use crate::models::ThresholdLevel;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Main configuration structure for Memwarden.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MemwardenConfig {
    /// Sampling loop configuration
    pub monitoring: MonitoringConfig,

    /// Severity tier configuration
    pub thresholds: ThresholdConfig,

    /// Model eviction configuration
    pub eviction: EvictionConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Configuration for the sampling loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Interval between memory samples
    #[serde(with = "humantime_serde")]
    pub sampling_interval: Duration,

    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            sampling_interval: Duration::from_secs(5),
            event_capacity: 64,
        }
    }
}

/// Trigger percentages and hysteresis for the severity tiers.
///
/// Escalation fires when usage reaches a trigger; de-escalation requires
/// usage strictly below `trigger - hysteresis`, preventing alert flapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Usage percentage that enters the warning tier
    pub warning: f64,

    /// Usage percentage that enters the critical tier
    pub critical: f64,

    /// Usage percentage that enters the emergency tier
    pub emergency: f64,

    /// Percentage-point drop below a trigger required before de-escalating
    pub hysteresis: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            warning: 75.0,
            critical: 87.5,
            emergency: 95.0,
            hysteresis: 5.0,
        }
    }
}

impl ThresholdConfig {
    /// Trigger percentage for an alerting level.
    ///
    /// `Normal` has no trigger; it is the floor state.
    pub fn trigger_for(&self, level: ThresholdLevel) -> f64 {
        match level {
            ThresholdLevel::Normal => 0.0,
            ThresholdLevel::Warning => self.warning,
            ThresholdLevel::Critical => self.critical,
            ThresholdLevel::Emergency => self.emergency,
        }
    }

    /// The highest level whose trigger the given usage meets or exceeds.
    pub fn level_for_usage(&self, usage_percentage: f64) -> ThresholdLevel {
        if usage_percentage >= self.emergency {
            ThresholdLevel::Emergency
        } else if usage_percentage >= self.critical {
            ThresholdLevel::Critical
        } else if usage_percentage >= self.warning {
            ThresholdLevel::Warning
        } else {
            ThresholdLevel::Normal
        }
    }

    /// Usage must fall strictly below this floor before leaving `level`.
    pub fn clear_floor(&self, level: ThresholdLevel) -> f64 {
        self.trigger_for(level) - self.hysteresis
    }
}

/// Which end of the priority scale is evicted first.
///
/// Hosts disagree on whether a larger priority number means "more important"
/// or "evict me first", so the convention is explicit configuration rather
/// than an assumption.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvictionOrder {
    /// Lower priority values are evicted first (default)
    #[default]
    LowestPriorityFirst,

    /// Higher priority values are evicted first
    HighestPriorityFirst,
}

impl fmt::Display for EvictionOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowestPriorityFirst => write!(f, "lowest_priority_first"),
            Self::HighestPriorityFirst => write!(f, "highest_priority_first"),
        }
    }
}

/// Configuration for model eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvictionConfig {
    /// Memory budget for loaded models, in bytes
    pub model_budget_bytes: u64,

    /// Which end of the priority scale is evicted first
    pub order: EvictionOrder,

    /// Extra percentage points of total memory reclaimed beyond the bare
    /// overage, so a successful pass lands strictly below the trigger
    pub headroom_percentage: f64,
}

impl Default for EvictionConfig {
    fn default() -> Self {
        Self {
            model_budget_bytes: 8 * 1024 * 1024 * 1024,
            order: EvictionOrder::default(),
            headroom_percentage: 1.0,
        }
    }
}

/// Configuration for logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,

    /// Log format
    pub format: LogFormat,

    /// File to log to (if any)
    pub file: Option<PathBuf>,

    /// Whether to log to stdout
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Default,
            file: None,
            stdout: true,
        }
    }
}

/// Log level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,

    /// Debug level
    Debug,

    /// Info level
    Info,

    /// Warn level
    Warn,

    /// Error level
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Default format
    Default,

    /// JSON format
    Json,

    /// Compact format
    Compact,

    /// Pretty format
    Pretty,
}
