//! Memory telemetry models shared across the monitoring pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity tiers for memory pressure
///
/// The ordering is meaningful: escalation walks upward one level at a time,
/// de-escalation drops directly to the highest level still exceeded.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdLevel {
    /// Usage below every configured trigger
    Normal = 0,

    /// First tier: worth surfacing, no automatic action
    Warning = 1,

    /// Second tier: proactive model eviction kicks in
    Critical = 2,

    /// Highest tier: emergency cleanup runs
    Emergency = 3,
}

impl ThresholdLevel {
    /// The next severity step above this level, if any
    pub fn step_up(&self) -> Option<ThresholdLevel> {
        match self {
            Self::Normal => Some(Self::Warning),
            Self::Warning => Some(Self::Critical),
            Self::Critical => Some(Self::Emergency),
            Self::Emergency => None,
        }
    }

    /// The next severity step below this level, if any
    pub fn step_down(&self) -> Option<ThresholdLevel> {
        match self {
            Self::Normal => None,
            Self::Warning => Some(Self::Normal),
            Self::Critical => Some(Self::Warning),
            Self::Emergency => Some(Self::Critical),
        }
    }

    /// All alerting tiers in ascending order (everything above `Normal`)
    pub fn alerting() -> [ThresholdLevel; 3] {
        [Self::Warning, Self::Critical, Self::Emergency]
    }
}

impl std::fmt::Display for ThresholdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

/// Resource categories tracked by the threshold state machine
///
/// Each category carries its own severity state and its own alerts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ResourceCategory {
    /// Host system RAM
    System,
    /// Aggregate GPU memory (only present when a probe reports it)
    Gpu,
}

impl std::fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Gpu => write!(f, "gpu"),
        }
    }
}

/// A point-in-time snapshot of system memory state
///
/// Recomputed on every sample and never persisted. `stale` is set when a
/// probe failure forced reuse of the previous snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemMemoryInfo {
    /// Total physical memory in bytes
    pub total_bytes: u64,

    /// Memory currently in use, in bytes
    pub used_bytes: u64,

    /// Memory available for allocation, in bytes
    pub available_bytes: u64,

    /// Used memory as a percentage of total, clamped to 0..=100
    pub usage_percentage: f64,

    /// Platform tag for the host (e.g. "linux", "macos", "windows")
    pub platform: String,

    /// When this snapshot was taken
    pub sampled_at: DateTime<Utc>,

    /// True when this snapshot is a reused previous sample after a probe failure
    pub stale: bool,

    /// GPU memory state, when the probe reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu: Option<GpuMemoryInfo>,
}

impl SystemMemoryInfo {
    /// Create a snapshot from raw totals, deriving the available bytes and
    /// the clamped usage percentage.
    pub fn new(total_bytes: u64, used_bytes: u64, platform: impl Into<String>) -> Self {
        Self {
            total_bytes,
            used_bytes,
            available_bytes: total_bytes.saturating_sub(used_bytes),
            usage_percentage: usage_percentage(used_bytes, total_bytes),
            platform: platform.into(),
            sampled_at: Utc::now(),
            stale: false,
            gpu: None,
        }
    }

    /// Attach GPU memory state to this snapshot
    pub fn with_gpu(mut self, gpu: GpuMemoryInfo) -> Self {
        self.gpu = Some(gpu);
        self
    }

    /// Usage percentage for a resource category, if the sample covers it
    pub fn usage_for(&self, category: ResourceCategory) -> Option<f64> {
        match category {
            ResourceCategory::System => Some(self.usage_percentage),
            ResourceCategory::Gpu => self.gpu.as_ref().map(|g| g.usage_percentage),
        }
    }

    /// Total bytes for a resource category, if the sample covers it
    pub fn total_for(&self, category: ResourceCategory) -> Option<u64> {
        match category {
            ResourceCategory::System => Some(self.total_bytes),
            ResourceCategory::Gpu => self.gpu.as_ref().map(|g| g.total_bytes),
        }
    }

    /// Used bytes for a resource category, if the sample covers it
    pub fn used_for(&self, category: ResourceCategory) -> Option<u64> {
        match category {
            ResourceCategory::System => Some(self.used_bytes),
            ResourceCategory::Gpu => self.gpu.as_ref().map(|g| g.used_bytes),
        }
    }
}

/// Aggregate GPU memory state across all reported devices
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuMemoryInfo {
    /// Total GPU memory in bytes, summed over devices
    pub total_bytes: u64,

    /// GPU memory in use, in bytes
    pub used_bytes: u64,

    /// GPU memory available, in bytes
    pub available_bytes: u64,

    /// Used GPU memory as a percentage of total, clamped to 0..=100
    pub usage_percentage: f64,

    /// Per-device utilization detail
    pub devices: Vec<GpuDeviceInfo>,
}

impl GpuMemoryInfo {
    /// Create GPU state from raw totals
    pub fn new(total_bytes: u64, used_bytes: u64) -> Self {
        Self {
            total_bytes,
            used_bytes,
            available_bytes: total_bytes.saturating_sub(used_bytes),
            usage_percentage: usage_percentage(used_bytes, total_bytes),
            devices: Vec::new(),
        }
    }

    /// Add a device record
    pub fn with_device(mut self, device: GpuDeviceInfo) -> Self {
        self.devices.push(device);
        self
    }
}

/// Utilization detail for a single GPU device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GpuDeviceInfo {
    /// Device index as reported by the driver
    pub device_id: u32,

    /// Human-readable device name
    pub name: String,

    /// Compute/memory utilization percentage for this device
    pub utilization_percentage: f64,
}

/// Registry record for a loaded AI model
///
/// Created by `register_model`, replaced wholesale on re-registration with
/// the same id, and removed on unregister or after a successful unload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMemoryInfo {
    /// Unique model identifier (registry key)
    pub model_id: String,

    /// Resident memory attributed to this model, in bytes
    pub memory_usage_bytes: u64,

    /// Whether the model is currently loaded
    pub is_loaded: bool,

    /// When the model was last used for inference
    pub last_accessed: DateTime<Utc>,

    /// Eviction priority; interpretation follows the configured eviction order
    /// (by default, lower values are evicted first)
    pub priority: i32,

    /// Whether this model may be unloaded to reclaim memory
    pub can_unload: bool,

    /// Bytes expected to be reclaimed by unloading this model
    pub unload_savings_bytes: u64,
}

impl ModelMemoryInfo {
    /// Create a record for a freshly loaded model
    ///
    /// Defaults: loaded, unloadable, priority 0, unload savings equal to the
    /// reported usage, last accessed now.
    pub fn new(model_id: impl Into<String>, memory_usage_bytes: u64) -> Self {
        Self {
            model_id: model_id.into(),
            memory_usage_bytes,
            is_loaded: true,
            last_accessed: Utc::now(),
            priority: 0,
            can_unload: true,
            unload_savings_bytes: memory_usage_bytes,
        }
    }

    /// Set the eviction priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the model as pinned (never an eviction candidate)
    pub fn pinned(mut self) -> Self {
        self.can_unload = false;
        self
    }

    /// Override the expected unload savings
    pub fn with_unload_savings(mut self, bytes: u64) -> Self {
        self.unload_savings_bytes = bytes;
        self
    }

    /// Override the last-accessed timestamp
    pub fn with_last_accessed(mut self, at: DateTime<Utc>) -> Self {
        self.last_accessed = at;
        self
    }
}

/// Aggregate view over the model registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelMemorySummary {
    /// Total memory attributed to loaded models, in bytes
    pub total_used_bytes: u64,

    /// Configured model memory budget, in bytes
    pub budget_bytes: u64,

    /// Used model memory as a percentage of the budget, clamped to 0..=100
    pub utilization_percentage: f64,

    /// Number of loaded models
    pub loaded_count: usize,

    /// Number of loaded models eligible for eviction
    pub unloadable_count: usize,
}

/// Compute a usage percentage clamped to the valid 0..=100 range.
pub(crate) fn usage_percentage(used: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    ((used as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_percentage_clamped() {
        assert_eq!(usage_percentage(0, 100), 0.0);
        assert_eq!(usage_percentage(50, 100), 50.0);
        assert_eq!(usage_percentage(150, 100), 100.0);
        assert_eq!(usage_percentage(10, 0), 0.0);
    }

    #[test]
    fn test_threshold_level_ordering() {
        assert!(ThresholdLevel::Normal < ThresholdLevel::Warning);
        assert!(ThresholdLevel::Warning < ThresholdLevel::Critical);
        assert!(ThresholdLevel::Critical < ThresholdLevel::Emergency);
    }

    #[test]
    fn test_threshold_level_step_up() {
        assert_eq!(
            ThresholdLevel::Normal.step_up(),
            Some(ThresholdLevel::Warning)
        );
        assert_eq!(ThresholdLevel::Emergency.step_up(), None);
    }

    #[test]
    fn test_system_memory_info_derives_fields() {
        let info = SystemMemoryInfo::new(100, 25, "linux");
        assert_eq!(info.available_bytes, 75);
        assert_eq!(info.usage_percentage, 25.0);
        assert!(!info.stale);
        assert_eq!(info.usage_for(ResourceCategory::Gpu), None);
    }

    #[test]
    fn test_gpu_usage_lookup() {
        let info = SystemMemoryInfo::new(100, 25, "linux").with_gpu(GpuMemoryInfo::new(1000, 900));
        assert_eq!(info.usage_for(ResourceCategory::Gpu), Some(90.0));
        assert_eq!(info.total_for(ResourceCategory::Gpu), Some(1000));
    }
}
