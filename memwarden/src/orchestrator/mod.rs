//! Orchestrator
//!
//! Composition root for the memory-safety pipeline. Owns the sampling loop,
//! wires the monitor, threshold manager, lifecycle controller, notification
//! system and emergency cleanup together, and exposes the public API and
//! event stream consumed by the GUI layer.
//!
//! # Examples
//!
//! ```no_run
//! use memwarden::config::ConfigBuilder;
//! use memwarden::lifecycle::ModelUnloader;
//! use memwarden::orchestrator::MemoryOrchestratorBuilder;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct EngineUnloader;
//!
//! #[async_trait]
//! impl ModelUnloader for EngineUnloader {
//!     async fn unload(&self, _model_id: &str) -> Result<(), String> {
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> memwarden::Result<()> {
//!     let config = ConfigBuilder::new().build()?;
//!     let orchestrator = MemoryOrchestratorBuilder::new(config)
//!         .with_unloader(Arc::new(EngineUnloader))
//!         .build()?;
//!     orchestrator.initialize().await?;
//!     // ... application runs ...
//!     orchestrator.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod ticker;

pub use ticker::{IntervalTicker, ManualTicker, TickSource};

use crate::alerts::AlertCenter;
use crate::cleanup::EmergencyCleanup;
use crate::config::{validate_config, MemwardenConfig};
use crate::events::{EventBus, EventStream, MemoryEvent};
use crate::lifecycle::{ModelLifecycleController, ModelUnloader};
use crate::models::{
    AlertLevel, MemoryAlert, ModelMemoryInfo, ModelMemorySummary, RemediationAction,
    ResourceCategory, SystemMemoryInfo, ThresholdLevel,
};
use crate::monitor::{GcHook, MemoryMonitor, MemoryProbe, NoopGcHook, SystemProbe};
use crate::thresholds::ThresholdManager;
use crate::{MemwardenError, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Builder wiring the orchestrator to its external collaborators.
///
/// The unload callback is mandatory; the probe defaults to the
/// `sysinfo`-backed [`SystemProbe`] and the GC hook defaults to the
/// unavailable [`NoopGcHook`].
#[derive(Debug)]
pub struct MemoryOrchestratorBuilder {
    config: MemwardenConfig,
    probe: Option<Arc<dyn MemoryProbe>>,
    unloader: Option<Arc<dyn ModelUnloader>>,
    gc: Option<Arc<dyn GcHook>>,
}

impl MemoryOrchestratorBuilder {
    /// Start a builder from a configuration.
    pub fn new(config: MemwardenConfig) -> Self {
        Self {
            config,
            probe: None,
            unloader: None,
            gc: None,
        }
    }

    /// Inject a memory probe (defaults to [`SystemProbe`]).
    pub fn with_probe(mut self, probe: Arc<dyn MemoryProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Inject the inference layer's unload callback (required).
    pub fn with_unloader(mut self, unloader: Arc<dyn ModelUnloader>) -> Self {
        self.unloader = Some(unloader);
        self
    }

    /// Inject a runtime GC hook (defaults to none available).
    pub fn with_gc_hook(mut self, gc: Arc<dyn GcHook>) -> Self {
        self.gc = Some(gc);
        self
    }

    /// Validate the configuration and wire all components.
    pub fn build(self) -> Result<MemoryOrchestrator> {
        validate_config(&self.config)
            .map_err(|e| MemwardenError::Configuration(e.to_string()))?;

        let unloader = self.unloader.ok_or_else(|| {
            MemwardenError::Configuration(
                "a model unloader callback is required; use with_unloader()".to_string(),
            )
        })?;
        let probe = self.probe.unwrap_or_else(|| Arc::new(SystemProbe::new()));
        let gc = self.gc.unwrap_or_else(|| Arc::new(NoopGcHook));

        let events = EventBus::new(self.config.monitoring.event_capacity);
        let monitor = Arc::new(MemoryMonitor::new(probe));
        let lifecycle = Arc::new(ModelLifecycleController::new(
            unloader,
            self.config.eviction.clone(),
        ));
        let alerts = Arc::new(AlertCenter::new(events.clone()));
        let cleanup = Arc::new(EmergencyCleanup::new(
            monitor.clone(),
            lifecycle.clone(),
            gc,
            alerts.clone(),
            events.clone(),
            self.config.thresholds,
            self.config.eviction.clone(),
        ));
        let thresholds = Arc::new(ThresholdManager::new(
            self.config.thresholds,
            self.config.eviction.clone(),
            lifecycle.clone(),
            cleanup,
            alerts.clone(),
            events.clone(),
        ));

        Ok(MemoryOrchestrator {
            config: self.config,
            monitor,
            lifecycle,
            alerts,
            thresholds,
            events,
            sampling_loop: Mutex::new(SamplingLoop::default()),
        })
    }
}

#[derive(Debug, Default)]
struct SamplingLoop {
    task: Option<JoinHandle<()>>,
    shutdown: Option<watch::Sender<bool>>,
}

/// The memory-safety orchestrator.
///
/// Constructed explicitly by its owner via [`MemoryOrchestratorBuilder`];
/// see [`crate::simple`] for the optional process-global wrapper.
#[derive(Debug)]
pub struct MemoryOrchestrator {
    config: MemwardenConfig,
    monitor: Arc<MemoryMonitor>,
    lifecycle: Arc<ModelLifecycleController>,
    alerts: Arc<AlertCenter>,
    thresholds: Arc<ThresholdManager>,
    events: EventBus,
    sampling_loop: Mutex<SamplingLoop>,
}

impl MemoryOrchestrator {
    /// Start the sampling loop on the configured interval.
    ///
    /// Calling this while the loop is already active is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        let ticker = IntervalTicker::new(self.config.monitoring.sampling_interval);
        self.initialize_with_ticker(Box::new(ticker)).await
    }

    /// Start the sampling loop on an injected tick source.
    pub async fn initialize_with_ticker(&self, mut ticker: Box<dyn TickSource>) -> Result<()> {
        validate_config(&self.config)
            .map_err(|e| MemwardenError::Configuration(e.to_string()))?;

        let mut sampling_loop = match self.sampling_loop.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if sampling_loop.task.is_some() {
            debug!("orchestrator already initialized; ignoring");
            return Ok(());
        }

        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let monitor = self.monitor.clone();
        let thresholds = self.thresholds.clone();
        let events = self.events.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    proceed = ticker.tick() => {
                        if !proceed {
                            debug!("tick source exhausted; stopping sampling loop");
                            break;
                        }
                        // The tick runs to completion inside this arm, so a
                        // shutdown signal arriving mid-tick waits for it.
                        run_tick(&monitor, &thresholds, &events).await;
                    }
                }
            }
            debug!("sampling loop stopped");
        });

        sampling_loop.task = Some(task);
        sampling_loop.shutdown = Some(shutdown_tx);
        Ok(())
    }

    /// Stop the sampling loop, letting an in-flight tick finish first.
    ///
    /// Idempotent; safe to call while a tick (including an emergency
    /// cleanup) is executing.
    pub async fn shutdown(&self) -> Result<()> {
        let (task, shutdown) = {
            let mut sampling_loop = match self.sampling_loop.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            (sampling_loop.task.take(), sampling_loop.shutdown.take())
        };

        let Some(task) = task else {
            return Ok(());
        };
        if let Some(shutdown) = shutdown {
            let _ = shutdown.send(true);
        }
        if let Err(err) = task.await {
            warn!(error = %err, "sampling loop task ended abnormally");
        }
        Ok(())
    }

    /// Whether the sampling loop is currently active.
    pub fn is_running(&self) -> bool {
        self.sampling_loop
            .lock()
            .map(|l| l.task.is_some())
            .unwrap_or(false)
    }

    /// The most recent memory snapshot, if any sample has succeeded yet.
    pub async fn current_memory_status(&self) -> Option<SystemMemoryInfo> {
        self.monitor.latest().await
    }

    /// Aggregate totals over the model registry.
    pub fn model_memory_status(&self) -> ModelMemorySummary {
        self.lifecycle.summary()
    }

    /// All registered model records.
    pub fn models(&self) -> Vec<ModelMemoryInfo> {
        self.lifecycle.all()
    }

    /// All unresolved alerts, newest first.
    pub fn active_alerts(&self) -> Vec<MemoryAlert> {
        self.alerts.active_alerts()
    }

    /// Acknowledge an alert. Unknown ids return `false`.
    pub fn acknowledge_alert(&self, alert_id: &str) -> bool {
        self.alerts.acknowledge_alert(alert_id)
    }

    /// Register (or replace) a model record.
    pub fn register_model(&self, model: ModelMemoryInfo) {
        self.lifecycle.register_model(model);
    }

    /// Remove a model record. Returns whether it existed.
    pub fn unregister_model(&self, model_id: &str) -> bool {
        self.lifecycle.unregister_model(model_id)
    }

    /// Update a model's last-accessed timestamp.
    pub fn touch_model(&self, model_id: &str) -> bool {
        self.lifecycle.touch(model_id)
    }

    /// Entry point for externally-originated warnings (e.g. the GUI layer).
    pub fn create_custom_alert(
        &self,
        level: AlertLevel,
        category: ResourceCategory,
        title: impl Into<String>,
        message: impl Into<String>,
        actions: Vec<RemediationAction>,
        auto_resolve: bool,
    ) -> MemoryAlert {
        self.alerts
            .create_alert(level, category, title, message, actions, auto_resolve)
    }

    /// Execute a remediation action on an alert, best-effort.
    pub async fn run_alert_action(&self, alert_id: &str, action_id: &str) -> bool {
        self.alerts.run_action(alert_id, action_id).await
    }

    /// Current severity state for a resource category.
    pub fn threshold_state(&self, category: ResourceCategory) -> ThresholdLevel {
        self.thresholds.current_state(category)
    }

    /// Subscribe to subsequent memory events.
    pub fn subscribe(&self) -> broadcast::Receiver<MemoryEvent> {
        self.events.subscribe()
    }

    /// Subscribe to subsequent memory events as a `Stream`.
    pub fn event_stream(&self) -> EventStream {
        self.events.stream()
    }
}

/// One complete evaluation pass: sample, publish, evaluate, react.
///
/// Every failure mode is isolated here so the loop itself never dies: a
/// busy monitor skips the tick, a probe failure with no prior snapshot
/// skips the tick, and an evaluation error abandons the tick with the
/// previous threshold state retained.
async fn run_tick(
    monitor: &Arc<MemoryMonitor>,
    thresholds: &Arc<ThresholdManager>,
    events: &EventBus,
) {
    let sample = match monitor.try_sample().await {
        None => return,
        Some(Err(err)) => {
            warn!(error = %err, "sampling failed with no previous snapshot; tick skipped");
            return;
        }
        Some(Ok(sample)) => sample,
    };

    events.publish(MemoryEvent::MemoryUpdate {
        info: sample.clone(),
    });

    if let Err(err) = thresholds.evaluate(&sample).await {
        error!(error = %err, "threshold evaluation failed; tick abandoned");
    }
}
