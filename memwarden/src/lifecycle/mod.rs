//! Model Lifecycle Controller
//!
//! Registry of loaded AI models and the eviction-selection policy. The
//! registry is a concurrent keyed map, so the inference layer can register
//! and touch models while a monitoring tick is in flight; unloading
//! delegates to an injected callback owned by the inference layer.

use crate::config::{EvictionConfig, EvictionOrder};
use crate::models::memory::usage_percentage;
use crate::models::{ModelMemoryInfo, ModelMemorySummary};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Error type for model unload operations
#[derive(Debug, thiserror::Error)]
pub enum UnloadError {
    /// The model is not present in the registry
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// The model is registered but marked as not unloadable
    #[error("Model '{0}' is pinned and cannot be unloaded")]
    NotUnloadable(String),

    /// The inference layer's unload callback rejected
    #[error("Unload callback failed for model '{model_id}': {reason}")]
    CallbackFailed {
        /// The model the callback was invoked for
        model_id: String,
        /// Failure reason reported by the inference layer
        reason: String,
    },
}

/// Callback seam into the inference layer.
///
/// The orchestrator imposes no timeout: a hung callback counts as still in
/// progress and stalls only its owning tick.
#[async_trait]
pub trait ModelUnloader: Send + Sync + std::fmt::Debug {
    /// Unload the given model. Returns a human-readable reason on failure.
    async fn unload(&self, model_id: &str) -> Result<(), String>;
}

/// Result of an eviction-candidate selection pass
#[derive(Debug, Clone, Serialize)]
pub struct EvictionPlan {
    /// Selected candidates in unload order
    pub candidates: Vec<ModelMemoryInfo>,

    /// Bytes expected to be reclaimed by unloading every candidate
    pub reclaimable_bytes: u64,

    /// Bytes still missing when candidates were exhausted before the target
    pub shortfall_bytes: u64,
}

impl EvictionPlan {
    /// Whether the selected candidates cover the requested target.
    pub fn is_sufficient(&self) -> bool {
        self.shortfall_bytes == 0
    }
}

/// Registry of loaded AI models plus the eviction-selection policy.
#[derive(Debug)]
pub struct ModelLifecycleController {
    models: DashMap<String, ModelMemoryInfo>,
    unloader: Arc<dyn ModelUnloader>,
    config: EvictionConfig,
}

impl ModelLifecycleController {
    /// Create a controller with the given unload callback and eviction config.
    pub fn new(unloader: Arc<dyn ModelUnloader>, config: EvictionConfig) -> Self {
        Self {
            models: DashMap::new(),
            unloader,
            config,
        }
    }

    /// Insert or replace a model record by its id.
    pub fn register_model(&self, model: ModelMemoryInfo) {
        debug!(
            model_id = %model.model_id,
            memory_bytes = model.memory_usage_bytes,
            "registering model"
        );
        self.models.insert(model.model_id.clone(), model);
    }

    /// Remove a model record. Returns whether it existed.
    pub fn unregister_model(&self, model_id: &str) -> bool {
        self.models.remove(model_id).is_some()
    }

    /// Update a model's last-accessed timestamp. Returns whether it existed.
    pub fn touch(&self, model_id: &str) -> bool {
        match self.models.get_mut(model_id) {
            Some(mut entry) => {
                entry.last_accessed = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Look up a model record by id.
    pub fn get(&self, model_id: &str) -> Option<ModelMemoryInfo> {
        self.models.get(model_id).map(|entry| entry.clone())
    }

    /// All model records, unordered.
    pub fn all(&self) -> Vec<ModelMemoryInfo> {
        self.models.iter().map(|entry| entry.clone()).collect()
    }

    /// Aggregate totals over the registry.
    pub fn summary(&self) -> ModelMemorySummary {
        let mut total_used_bytes = 0u64;
        let mut loaded_count = 0usize;
        let mut unloadable_count = 0usize;

        for entry in self.models.iter() {
            if !entry.is_loaded {
                continue;
            }
            total_used_bytes = total_used_bytes.saturating_add(entry.memory_usage_bytes);
            loaded_count += 1;
            if entry.can_unload {
                unloadable_count += 1;
            }
        }

        ModelMemorySummary {
            total_used_bytes,
            budget_bytes: self.config.model_budget_bytes,
            utilization_percentage: usage_percentage(
                total_used_bytes,
                self.config.model_budget_bytes,
            ),
            loaded_count,
            unloadable_count,
        }
    }

    /// Select eviction candidates sized to reclaim `target_bytes`.
    ///
    /// Candidates are loaded, unloadable models ordered by the configured
    /// priority convention, breaking ties toward the longest-idle model and
    /// then by id, so identical registry state always yields an identical
    /// plan. Savings are accumulated greedily until the target is met or the
    /// candidates run out; the remainder is reported as shortfall.
    pub fn select_unload_candidates(&self, target_bytes: u64) -> EvictionPlan {
        let mut eligible: Vec<ModelMemoryInfo> = self
            .models
            .iter()
            .filter(|entry| entry.is_loaded && entry.can_unload)
            .map(|entry| entry.clone())
            .collect();

        eligible.sort_by(|a, b| {
            let priority_order = match self.config.order {
                EvictionOrder::LowestPriorityFirst => a.priority.cmp(&b.priority),
                EvictionOrder::HighestPriorityFirst => b.priority.cmp(&a.priority),
            };
            priority_order
                .then_with(|| a.last_accessed.cmp(&b.last_accessed))
                .then_with(|| a.model_id.cmp(&b.model_id))
        });

        let mut candidates = Vec::new();
        let mut reclaimable_bytes = 0u64;
        for model in eligible {
            if reclaimable_bytes >= target_bytes {
                break;
            }
            reclaimable_bytes = reclaimable_bytes.saturating_add(model.unload_savings_bytes);
            candidates.push(model);
        }

        let shortfall_bytes = target_bytes.saturating_sub(reclaimable_bytes);
        debug!(
            target_bytes,
            reclaimable_bytes,
            shortfall_bytes,
            candidate_count = candidates.len(),
            "selected eviction candidates"
        );

        EvictionPlan {
            candidates,
            reclaimable_bytes,
            shortfall_bytes,
        }
    }

    /// Unload a model through the inference-layer callback.
    ///
    /// The registry record is removed only after the callback resolves; on
    /// failure the model stays registered and loaded, and the error is
    /// surfaced to the caller without any same-tick retry. Returns the bytes
    /// reclaimed.
    pub async fn unload_model(&self, model_id: &str) -> Result<u64, UnloadError> {
        let model = self
            .get(model_id)
            .ok_or_else(|| UnloadError::UnknownModel(model_id.to_string()))?;

        if !model.can_unload {
            return Err(UnloadError::NotUnloadable(model_id.to_string()));
        }

        match self.unloader.unload(model_id).await {
            Ok(()) => {
                self.models.remove(model_id);
                info!(
                    model_id,
                    freed_bytes = model.unload_savings_bytes,
                    "model unloaded"
                );
                Ok(model.unload_savings_bytes)
            }
            Err(reason) => {
                warn!(model_id, %reason, "model unload failed; model stays loaded");
                Err(UnloadError::CallbackFailed {
                    model_id: model_id.to_string(),
                    reason,
                })
            }
        }
    }
}
