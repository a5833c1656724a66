//! Data models for memory telemetry and alerting

pub mod alert;
pub mod memory;

pub use alert::{AlertLevel, MemoryAlert, RemediationAction, RemediationHandler};
pub use memory::{
    GpuDeviceInfo, GpuMemoryInfo, ModelMemoryInfo, ModelMemorySummary, ResourceCategory,
    SystemMemoryInfo, ThresholdLevel,
};
