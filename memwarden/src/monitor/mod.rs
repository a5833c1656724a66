//! Memory Monitor
//!
//! Caches the latest [`SystemMemoryInfo`] snapshot and shields the rest of
//! the pipeline from probe failures: a failed sample re-serves the previous
//! snapshot flagged stale instead of propagating an error. Overlapping
//! samples are skipped, never queued.

mod probe;

pub use probe::{GcHook, MemoryProbe, NoopGcHook, ProbeError, SystemProbe};

use crate::models::SystemMemoryInfo;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Samples memory through an injected probe and caches the latest snapshot.
#[derive(Debug)]
pub struct MemoryMonitor {
    probe: Arc<dyn MemoryProbe>,
    latest: RwLock<Option<SystemMemoryInfo>>,
    sampling: AtomicBool,
}

impl MemoryMonitor {
    /// Create a monitor over the given probe.
    pub fn new(probe: Arc<dyn MemoryProbe>) -> Self {
        Self {
            probe,
            latest: RwLock::new(None),
            sampling: AtomicBool::new(false),
        }
    }

    /// Take a sample for a scheduled tick.
    ///
    /// Returns `None` when a previous sample is still in flight — the tick is
    /// skipped rather than queued behind a slow probe.
    pub async fn try_sample(&self) -> Option<Result<SystemMemoryInfo, ProbeError>> {
        if self.sampling.swap(true, Ordering::Acquire) {
            debug!("previous sample still in flight; skipping tick");
            return None;
        }

        let result = self.sample_inner().await;
        self.sampling.store(false, Ordering::Release);
        Some(result)
    }

    /// Re-measure memory directly.
    ///
    /// Used by emergency cleanup to observe the outcome of a reclamation pass
    /// without scheduling another evaluation tick.
    pub async fn resample(&self) -> Result<SystemMemoryInfo, ProbeError> {
        self.sample_inner().await
    }

    /// The most recent snapshot, if any sample ever succeeded.
    pub async fn latest(&self) -> Option<SystemMemoryInfo> {
        self.latest.read().await.clone()
    }

    async fn sample_inner(&self) -> Result<SystemMemoryInfo, ProbeError> {
        match self.probe.sample().await {
            Ok(info) => {
                let mut latest = self.latest.write().await;
                *latest = Some(info.clone());
                Ok(info)
            }
            Err(err) => {
                warn!(error = %err, "memory probe failed; reusing previous sample");
                let mut latest = self.latest.write().await;
                match latest.as_mut() {
                    Some(previous) => {
                        previous.stale = true;
                        Ok(previous.clone())
                    }
                    None => Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SystemMemoryInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Debug)]
    struct ScriptedProbe {
        samples: Mutex<Vec<Result<SystemMemoryInfo, ProbeError>>>,
    }

    impl ScriptedProbe {
        fn new(samples: Vec<Result<SystemMemoryInfo, ProbeError>>) -> Self {
            Self {
                samples: Mutex::new(samples),
            }
        }
    }

    #[async_trait]
    impl MemoryProbe for ScriptedProbe {
        async fn sample(&self) -> Result<SystemMemoryInfo, ProbeError> {
            let mut samples = self.samples.lock().unwrap();
            if samples.is_empty() {
                return Err(ProbeError::SampleFailed("script exhausted".to_string()));
            }
            samples.remove(0)
        }
    }

    #[tokio::test]
    async fn test_successful_sample_is_cached() {
        let probe = ScriptedProbe::new(vec![Ok(SystemMemoryInfo::new(100, 40, "test"))]);
        let monitor = MemoryMonitor::new(Arc::new(probe));

        let info = monitor.try_sample().await.unwrap().unwrap();
        assert_eq!(info.usage_percentage, 40.0);
        assert_eq!(monitor.latest().await.unwrap().usage_percentage, 40.0);
    }

    #[tokio::test]
    async fn test_failed_sample_reuses_previous_flagged_stale() {
        let probe = ScriptedProbe::new(vec![
            Ok(SystemMemoryInfo::new(100, 40, "test")),
            Err(ProbeError::SampleFailed("probe offline".to_string())),
        ]);
        let monitor = MemoryMonitor::new(Arc::new(probe));

        monitor.try_sample().await.unwrap().unwrap();
        let info = monitor.try_sample().await.unwrap().unwrap();

        assert!(info.stale);
        assert_eq!(info.usage_percentage, 40.0);
        assert!(monitor.latest().await.unwrap().stale);
    }

    #[tokio::test]
    async fn test_failure_with_no_previous_sample_errors() {
        let probe = ScriptedProbe::new(vec![Err(ProbeError::SampleFailed(
            "probe offline".to_string(),
        ))]);
        let monitor = MemoryMonitor::new(Arc::new(probe));

        assert!(monitor.try_sample().await.unwrap().is_err());
        assert!(monitor.latest().await.is_none());
    }
}
