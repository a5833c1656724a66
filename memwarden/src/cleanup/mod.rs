//! Emergency Cleanup
//!
//! Last-resort reclamation sequence invoked when a resource category reaches
//! the emergency tier: unload candidates sized to return below the critical
//! trigger, run the optional GC hook, re-measure, and report the outcome.
//! Individual step failures are recorded and never abort the remaining
//! steps; a partial failure is documented through a critical alert.

use crate::alerts::AlertCenter;
use crate::config::{EvictionConfig, ThresholdConfig};
use crate::events::{EventBus, MemoryEvent};
use crate::lifecycle::ModelLifecycleController;
use crate::models::{AlertLevel, ResourceCategory, SystemMemoryInfo};
use crate::monitor::{GcHook, MemoryMonitor};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error type for emergency cleanup
#[derive(Debug, thiserror::Error)]
pub enum CleanupError {
    /// Some cleanup steps failed; completed steps were kept
    #[error("Emergency cleanup partially failed: {0}")]
    Partial(String),
}

/// Result of an emergency cleanup pass
#[derive(Debug, Clone, Serialize)]
pub struct CleanupOutcome {
    /// Bytes reclaimed: the larger of the measured drop and the sum of
    /// per-model unload savings
    pub memory_saved_bytes: u64,

    /// Human-readable record of each completed step
    pub actions_taken: Vec<String>,

    /// False when any step failed along the way
    pub completed: bool,

    /// The post-cleanup re-sample, when re-measuring succeeded
    pub resample: Option<SystemMemoryInfo>,
}

/// Runs the emergency reclamation sequence.
#[derive(Debug)]
pub struct EmergencyCleanup {
    monitor: Arc<MemoryMonitor>,
    lifecycle: Arc<ModelLifecycleController>,
    gc: Arc<dyn GcHook>,
    alerts: Arc<AlertCenter>,
    events: EventBus,
    thresholds: ThresholdConfig,
    eviction: EvictionConfig,
}

impl EmergencyCleanup {
    /// Wire the cleanup sequence to its collaborators.
    pub fn new(
        monitor: Arc<MemoryMonitor>,
        lifecycle: Arc<ModelLifecycleController>,
        gc: Arc<dyn GcHook>,
        alerts: Arc<AlertCenter>,
        events: EventBus,
        thresholds: ThresholdConfig,
        eviction: EvictionConfig,
    ) -> Self {
        Self {
            monitor,
            lifecycle,
            gc,
            alerts,
            events,
            thresholds,
            eviction,
        }
    }

    /// Run the cleanup sequence for a category currently at emergency.
    ///
    /// Never propagates step failures: completed steps are kept, failures
    /// are collected, and a partial outcome is documented with a critical
    /// alert. Not retried within the tick; the next scheduled sample
    /// re-evaluates pressure and may trigger it again.
    pub async fn run(
        &self,
        category: ResourceCategory,
        sample: &SystemMemoryInfo,
    ) -> CleanupOutcome {
        let mut actions_taken = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        // Step 1: size the reclamation to land just below the critical trigger.
        let target_bytes = self.reclaim_target(category, sample);
        debug!(%category, target_bytes, "starting emergency cleanup");

        // Step 2: unload candidates, continuing past individual failures.
        let plan = self.lifecycle.select_unload_candidates(target_bytes);
        if plan.shortfall_bytes > 0 {
            warn!(
                %category,
                shortfall_bytes = plan.shortfall_bytes,
                "unload candidates cannot cover the reclamation target"
            );
        }
        let mut freed_bytes = 0u64;
        for candidate in &plan.candidates {
            match self.lifecycle.unload_model(&candidate.model_id).await {
                Ok(bytes) => {
                    freed_bytes = freed_bytes.saturating_add(bytes);
                    actions_taken.push(format!("unloaded model '{}'", candidate.model_id));
                }
                Err(err) => failures.push(err.to_string()),
            }
        }

        // Step 3: GC hook, only when the runtime actually exposes one.
        if self.gc.is_available() {
            match self.gc.trigger().await {
                Ok(()) => actions_taken.push("triggered garbage collection".to_string()),
                Err(reason) => failures.push(format!("garbage collection failed: {}", reason)),
            }
        } else {
            debug!("no garbage collector exposed; skipping GC step");
        }

        // Step 4: re-measure to observe the outcome. This goes through the
        // monitor's direct resample entry point, so the next evaluation
        // happens on the next scheduled tick instead of recursing here.
        let resample = match self.monitor.resample().await {
            Ok(after) => Some(after),
            Err(err) => {
                failures.push(format!("post-cleanup re-sample failed: {}", err));
                None
            }
        };

        let measured_drop = match (&resample, sample.used_for(category)) {
            (Some(after), Some(before_used)) => after
                .used_for(category)
                .map(|after_used| before_used.saturating_sub(after_used))
                .unwrap_or(0),
            _ => 0,
        };
        let memory_saved_bytes = freed_bytes.max(measured_drop);

        // Step 5: report.
        self.events.publish(MemoryEvent::EmergencyCleanupCompleted {
            memory_saved_bytes,
            actions_taken: actions_taken.clone(),
        });

        let completed = failures.is_empty();
        if completed {
            info!(
                %category,
                memory_saved_bytes,
                actions = actions_taken.len(),
                "emergency cleanup completed"
            );
        } else {
            let error = CleanupError::Partial(failures.join("; "));
            warn!(%category, %error, "emergency cleanup finished with failures");
            let kept = if actions_taken.is_empty() {
                "no steps completed".to_string()
            } else {
                format!("completed steps: {}", actions_taken.join(", "))
            };
            self.alerts.create_alert(
                AlertLevel::Critical,
                category,
                "Emergency cleanup partially failed",
                format!("{}. {}", error, kept),
                Vec::new(),
                true,
            );
        }

        CleanupOutcome {
            memory_saved_bytes,
            actions_taken,
            completed,
            resample,
        }
    }

    /// Bytes that must be reclaimed for usage to land just below the
    /// critical trigger, including the configured headroom cushion.
    fn reclaim_target(&self, category: ResourceCategory, sample: &SystemMemoryInfo) -> u64 {
        let (Some(total), Some(used)) = (sample.total_for(category), sample.used_for(category))
        else {
            return 0;
        };

        let floor_pct =
            (self.thresholds.critical - self.eviction.headroom_percentage).max(0.0);
        let floor_bytes = ((total as f64) * floor_pct / 100.0) as u64;
        used.saturating_sub(floor_bytes)
    }
}
