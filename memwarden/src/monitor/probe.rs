//! Collaborator traits for the OS abstraction layer.
//!
//! The monitor never talks to the operating system directly; it goes through
//! a [`MemoryProbe`], and emergency cleanup goes through a capability-queried
//! [`GcHook`]. Both seams are injectable so tests can script memory state
//! deterministically.

use crate::models::SystemMemoryInfo;
use async_trait::async_trait;
use std::sync::Mutex;
use sysinfo::System;

/// Error type for memory sampling
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// The underlying platform probe failed
    #[error("Memory probe failed: {0}")]
    SampleFailed(String),

    /// A sample was requested before any sample ever succeeded
    #[error("No memory sample available yet")]
    NoSample,
}

/// Source of system memory snapshots
#[async_trait]
pub trait MemoryProbe: Send + Sync + std::fmt::Debug {
    /// Take a fresh snapshot of system (and optionally GPU) memory.
    async fn sample(&self) -> Result<SystemMemoryInfo, ProbeError>;
}

/// Optional runtime garbage-collection hook
///
/// Availability is queried explicitly so that a missing hook is never
/// silently mistaken for a successful collection.
#[async_trait]
pub trait GcHook: Send + Sync + std::fmt::Debug {
    /// Whether the runtime exposes a collector at all.
    fn is_available(&self) -> bool;

    /// Request a collection. Returns a human-readable reason on failure.
    async fn trigger(&self) -> Result<(), String>;
}

/// GC hook for runtimes without an exposed collector.
#[derive(Debug, Default)]
pub struct NoopGcHook;

#[async_trait]
impl GcHook for NoopGcHook {
    fn is_available(&self) -> bool {
        false
    }

    async fn trigger(&self) -> Result<(), String> {
        Err("no garbage collector exposed by this runtime".to_string())
    }
}

/// Default probe backed by `sysinfo`.
///
/// Reports host RAM only; GPU data comes from host-specific probes injected
/// by the inference layer.
pub struct SystemProbe {
    system: Mutex<System>,
}

impl SystemProbe {
    /// Create a probe over a fresh `sysinfo` handle.
    pub fn new() -> Self {
        Self {
            system: Mutex::new(System::new()),
        }
    }
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SystemProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemProbe").finish()
    }
}

#[async_trait]
impl MemoryProbe for SystemProbe {
    async fn sample(&self) -> Result<SystemMemoryInfo, ProbeError> {
        let (total, used) = {
            let mut system = self
                .system
                .lock()
                .map_err(|e| ProbeError::SampleFailed(format!("probe lock poisoned: {}", e)))?;
            system.refresh_memory();
            (system.total_memory(), system.used_memory())
        };

        if total == 0 {
            return Err(ProbeError::SampleFailed(
                "platform reported zero total memory".to_string(),
            ));
        }

        Ok(SystemMemoryInfo::new(total, used, std::env::consts::OS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_probe_reports_sane_values() {
        let probe = SystemProbe::new();
        let info = tokio_test::block_on(probe.sample()).unwrap();
        assert!(info.total_bytes > 0);
        assert!(info.usage_percentage >= 0.0 && info.usage_percentage <= 100.0);
        assert!(!info.stale);
    }

    #[tokio::test]
    async fn test_noop_gc_hook_is_unavailable() {
        let hook = NoopGcHook;
        assert!(!hook.is_available());
        assert!(hook.trigger().await.is_err());
    }
}
