//! # Memwarden
//!
//! Memory-safety orchestrator for desktop AI assistants: samples system and
//! GPU memory pressure, escalates alerts through configured severity tiers,
//! and automatically reclaims memory by unloading AI models and invoking
//! garbage collection when pressure becomes critical.
//!
//! ## Quick Start
//!
//! ```no_run
//! use memwarden::prelude::*;
//! use async_trait::async_trait;
//! use std::sync::Arc;
//!
//! #[derive(Debug)]
//! struct EngineUnloader;
//!
//! #[async_trait]
//! impl ModelUnloader for EngineUnloader {
//!     async fn unload(&self, model_id: &str) -> std::result::Result<(), String> {
//!         // hand off to the inference engine
//!         let _ = model_id;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> memwarden::Result<()> {
//!     let config = ConfigBuilder::new()
//!         .with_thresholds(75.0, 87.5, 95.0)
//!         .build()?;
//!
//!     let warden = memwarden::init(config, Arc::new(EngineUnloader)).await?;
//!
//!     // Tell the warden about loaded models
//!     warden.register_model(
//!         ModelMemoryInfo::new("llama-7b", 4 * 1024 * 1024 * 1024).with_priority(3),
//!     );
//!
//!     // Watch pressure events
//!     let mut events = warden.subscribe();
//!     while let Ok(event) = events.recv().await {
//!         println!("memory event: {event:?}");
//!     }
//!
//!     warden.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Monitor**: samples memory through an injected probe; probe failures
//!   re-serve the previous snapshot flagged stale.
//! - **Threshold Manager**: per-resource severity state machine with stepped
//!   escalation and hysteresis-gated de-escalation.
//! - **Lifecycle Controller**: model registry plus a deterministic
//!   eviction-selection policy.
//! - **Notification System**: deduplicated, acknowledgeable, auto-resolving
//!   alerts.
//! - **Emergency Cleanup**: last-resort unload + GC + re-measure sequence.
//! - **Orchestrator**: composition root owning the sampling loop and the
//!   public API.
//!
//! One timer drives one tick at a time; the public API stays callable during
//! a tick because alerts and model records live in concurrent keyed maps.

pub mod alerts;
pub mod cleanup;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod logging;
pub mod models;
pub mod monitor;
pub mod orchestrator;
pub mod simple;
pub mod thresholds;

/// The prelude re-exports commonly used types for convenience
pub mod prelude {
    // Re-export the composition root and its builder
    pub use crate::orchestrator::{
        IntervalTicker, ManualTicker, MemoryOrchestrator, MemoryOrchestratorBuilder, TickSource,
    };

    // Re-export initialization helpers
    pub use crate::{init, init_with_defaults};

    // Re-export config types
    pub use crate::config::{
        ConfigBuilder, ConfigLoader, EvictionOrder, LogFormat, LogLevel, MemwardenConfig,
        ThresholdConfig,
    };

    // Re-export data-model types
    pub use crate::models::{
        AlertLevel, MemoryAlert, ModelMemoryInfo, ModelMemorySummary, RemediationAction,
        RemediationHandler, ResourceCategory, SystemMemoryInfo, ThresholdLevel,
    };

    // Re-export collaborator seams
    pub use crate::lifecycle::ModelUnloader;
    pub use crate::monitor::{GcHook, MemoryProbe, SystemProbe};

    // Re-export the event surface
    pub use crate::events::{EventStream, MemoryEvent};

    // Re-export essential result type
    pub use crate::{MemwardenError, Result};
}

/// Current library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Error type for Memwarden operations
///
/// Only configuration errors are fatal; every per-tick failure is isolated
/// to its subsystem and reported through alerts and logs instead.
#[derive(Debug, thiserror::Error)]
pub enum MemwardenError {
    /// Sampling failed; stale data is reused where possible
    #[error("Probe error: {0}")]
    Probe(#[from] monitor::ProbeError),

    /// Threshold evaluation failed; the tick was abandoned
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] thresholds::EvaluationError),

    /// An unload callback rejected; the model stays loaded
    #[error("Unload error: {0}")]
    Unload(#[from] lifecycle::UnloadError),

    /// Emergency cleanup partially failed
    #[error("Cleanup error: {0}")]
    Cleanup(#[from] cleanup::CleanupError),

    /// Invalid configuration; fatal at construction
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Logging error
    #[error("Logging error: {0}")]
    Logging(#[from] logging::LogError),

    /// Other unclassified errors
    #[error("{0}")]
    Other(String),
}

impl From<config::ConfigError> for MemwardenError {
    fn from(err: config::ConfigError) -> Self {
        MemwardenError::Configuration(err.to_string())
    }
}

/// Result type for Memwarden operations
pub type Result<T> = std::result::Result<T, MemwardenError>;

/// Initialize Memwarden with default configuration.
///
/// Builds an orchestrator over the default `sysinfo` probe, starts its
/// sampling loop, and returns it ready for model registration.
pub async fn init_with_defaults(
    unloader: std::sync::Arc<dyn lifecycle::ModelUnloader>,
) -> Result<std::sync::Arc<orchestrator::MemoryOrchestrator>> {
    let config = config::ConfigBuilder::defaults().build()?;
    init(config, unloader).await
}

/// Initialize Memwarden with the provided configuration.
///
/// Sets up logging, validates the configuration (invalid configuration is
/// fatal and rejected here), wires all components, and starts the sampling
/// loop.
pub async fn init(
    config: config::MemwardenConfig,
    unloader: std::sync::Arc<dyn lifecycle::ModelUnloader>,
) -> Result<std::sync::Arc<orchestrator::MemoryOrchestrator>> {
    // Initialize logging; ignore errors if tracing is already initialized
    let _ = logging::init(&config.logging);

    let orchestrator = orchestrator::MemoryOrchestratorBuilder::new(config)
        .with_unloader(unloader)
        .build()?;
    let orchestrator = std::sync::Arc::new(orchestrator);
    orchestrator.initialize().await?;

    Ok(orchestrator)
}
