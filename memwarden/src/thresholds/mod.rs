//! Threshold Manager
//!
//! Per-category severity state machine. Each sample is evaluated against the
//! configured tiers: escalation walks upward one level at a time (an
//! instantaneous multi-level jump emits one trigger per intermediate level,
//! in ascending order), de-escalation requires usage strictly below the
//! current tier's trigger minus hysteresis. Crossing into the critical tier
//! starts proactive model eviction; crossing into the emergency tier runs
//! the emergency cleanup sequence and awaits its result.

use crate::alerts::AlertCenter;
use crate::cleanup::EmergencyCleanup;
use crate::config::{EvictionConfig, ThresholdConfig};
use crate::events::{EventBus, MemoryEvent};
use crate::lifecycle::ModelLifecycleController;
use crate::models::{ResourceCategory, SystemMemoryInfo, ThresholdLevel};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Error type for threshold evaluation
///
/// Evaluation failures are non-fatal: the orchestrator logs them and
/// abandons the tick, keeping the previous state until the next sample.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// A sample carried a usage value outside the representable range
    #[error("Invalid usage percentage {usage} for {category}")]
    InvalidUsage {
        /// The category whose reading was invalid
        category: ResourceCategory,
        /// The offending value
        usage: f64,
    },
}

/// Evaluates samples against the severity tiers and drives reactions.
#[derive(Debug)]
pub struct ThresholdManager {
    config: ThresholdConfig,
    eviction: EvictionConfig,
    states: Mutex<HashMap<ResourceCategory, ThresholdLevel>>,
    lifecycle: Arc<ModelLifecycleController>,
    cleanup: Arc<EmergencyCleanup>,
    alerts: Arc<AlertCenter>,
    events: EventBus,
}

impl ThresholdManager {
    /// Wire the manager to its reactive collaborators.
    pub fn new(
        config: ThresholdConfig,
        eviction: EvictionConfig,
        lifecycle: Arc<ModelLifecycleController>,
        cleanup: Arc<EmergencyCleanup>,
        alerts: Arc<AlertCenter>,
        events: EventBus,
    ) -> Self {
        Self {
            config,
            eviction,
            states: Mutex::new(HashMap::new()),
            lifecycle,
            cleanup,
            alerts,
            events,
        }
    }

    /// Current severity state for a category.
    pub fn current_state(&self, category: ResourceCategory) -> ThresholdLevel {
        self.states
            .lock()
            .map(|states| {
                states
                    .get(&category)
                    .copied()
                    .unwrap_or(ThresholdLevel::Normal)
            })
            .unwrap_or(ThresholdLevel::Normal)
    }

    /// Evaluate one sample across all categories it covers.
    pub async fn evaluate(&self, sample: &SystemMemoryInfo) -> Result<(), EvaluationError> {
        for category in [ResourceCategory::System, ResourceCategory::Gpu] {
            let Some(usage) = sample.usage_for(category) else {
                continue;
            };
            self.evaluate_category(category, usage, sample).await?;
        }
        Ok(())
    }

    async fn evaluate_category(
        &self,
        category: ResourceCategory,
        usage: f64,
        sample: &SystemMemoryInfo,
    ) -> Result<(), EvaluationError> {
        if !usage.is_finite() || !(0.0..=100.0).contains(&usage) {
            return Err(EvaluationError::InvalidUsage { category, usage });
        }

        let target = self.config.level_for_usage(usage);
        let current = self.current_state(category);

        if target > current {
            self.escalate(category, current, target, usage, sample).await;
        } else if target < current && usage < self.config.clear_floor(current) {
            self.deescalate(category, current, target, usage);
        }

        Ok(())
    }

    /// Step upward through every intermediate level, then react to the
    /// final state.
    async fn escalate(
        &self,
        category: ResourceCategory,
        current: ThresholdLevel,
        target: ThresholdLevel,
        usage: f64,
        sample: &SystemMemoryInfo,
    ) {
        let mut level = current;
        while level < target {
            let Some(next) = level.step_up() else {
                break;
            };
            level = next;
            self.set_state(category, level);
            info!(%category, %level, usage, "memory threshold triggered");
            self.events.publish(MemoryEvent::ThresholdTriggered {
                category,
                level,
                usage_percentage: usage,
            });
            self.alerts.create_alert(
                level.into(),
                category,
                format!("{} memory {}", capitalized(category), level),
                format!(
                    "{} memory usage reached {:.1}%, crossing the {} threshold ({:.1}%)",
                    capitalized(category),
                    usage,
                    level,
                    self.config.trigger_for(level)
                ),
                Vec::new(),
                true,
            );
        }

        match target {
            ThresholdLevel::Critical => self.relieve_pressure(category, sample).await,
            ThresholdLevel::Emergency => {
                let outcome = self.cleanup.run(category, sample).await;
                debug!(
                    %category,
                    memory_saved_bytes = outcome.memory_saved_bytes,
                    completed = outcome.completed,
                    "emergency cleanup returned"
                );
            }
            _ => {}
        }
    }

    /// Drop directly to the new state, emitting a clear per level left.
    fn deescalate(
        &self,
        category: ResourceCategory,
        current: ThresholdLevel,
        target: ThresholdLevel,
        usage: f64,
    ) {
        self.set_state(category, target);

        let mut level = current;
        while level > target {
            info!(%category, %level, usage, "memory threshold cleared");
            self.events.publish(MemoryEvent::ThresholdCleared {
                category,
                level,
                usage_percentage: usage,
            });
            self.alerts.resolve_cleared(level.into(), category);
            let Some(below) = level.step_down() else {
                break;
            };
            level = below;
        }
    }

    /// Proactively unload models sized to return below the critical trigger.
    ///
    /// Individual unload failures are surfaced as informational alerts and
    /// never retried within the tick; the next threshold crossing retries
    /// naturally.
    async fn relieve_pressure(&self, category: ResourceCategory, sample: &SystemMemoryInfo) {
        let target_bytes = self.reclaim_target(category, sample);
        if target_bytes == 0 {
            return;
        }

        let plan = self.lifecycle.select_unload_candidates(target_bytes);
        if plan.candidates.is_empty() {
            warn!(%category, target_bytes, "no unload candidates available for pressure relief");
            return;
        }

        for candidate in &plan.candidates {
            if let Err(err) = self.lifecycle.unload_model(&candidate.model_id).await {
                self.alerts.create_alert(
                    crate::models::AlertLevel::Info,
                    category,
                    "Model unload failed",
                    err.to_string(),
                    Vec::new(),
                    true,
                );
            }
        }
    }

    fn reclaim_target(&self, category: ResourceCategory, sample: &SystemMemoryInfo) -> u64 {
        let (Some(total), Some(used)) = (sample.total_for(category), sample.used_for(category))
        else {
            return 0;
        };

        let floor_pct = (self.config.critical - self.eviction.headroom_percentage).max(0.0);
        let floor_bytes = ((total as f64) * floor_pct / 100.0) as u64;
        used.saturating_sub(floor_bytes)
    }

    fn set_state(&self, category: ResourceCategory, level: ThresholdLevel) {
        if let Ok(mut states) = self.states.lock() {
            states.insert(category, level);
        }
    }
}

fn capitalized(category: ResourceCategory) -> &'static str {
    match category {
        ResourceCategory::System => "System",
        ResourceCategory::Gpu => "GPU",
    }
}
