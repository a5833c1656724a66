//! Alert models for the notification system

use super::memory::{ResourceCategory, ThresholdLevel};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Severity of an alert shown to the user
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    /// Informational notice, no action required
    Info = 0,

    /// Elevated memory pressure worth attention
    Warning = 1,

    /// High pressure; automatic mitigation is running
    Critical = 2,

    /// Last-resort mitigation in progress
    Emergency = 3,
}

impl std::fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Critical => write!(f, "critical"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

impl From<ThresholdLevel> for AlertLevel {
    fn from(level: ThresholdLevel) -> Self {
        match level {
            ThresholdLevel::Normal => Self::Info,
            ThresholdLevel::Warning => Self::Warning,
            ThresholdLevel::Critical => Self::Critical,
            ThresholdLevel::Emergency => Self::Emergency,
        }
    }
}

/// Handler invoked when a user (or the GUI) runs a remediation action
///
/// Execution is best-effort: failures are surfaced as informational alerts
/// and never propagated to the caller.
#[async_trait]
pub trait RemediationHandler: Send + Sync + std::fmt::Debug {
    /// Run the remediation. Returns a human-readable reason on failure.
    async fn run(&self) -> Result<(), String>;
}

/// An action offered alongside an alert (e.g. "Unload idle models")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationAction {
    /// Stable identifier for the action within its alert
    pub id: String,

    /// Human-readable label shown in the dashboard
    pub label: String,

    /// Callback executed when the action is taken; not serialized
    #[serde(skip)]
    pub handler: Option<Arc<dyn RemediationHandler>>,
}

impl RemediationAction {
    /// Create an action with a handler
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: Arc<dyn RemediationHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            handler: Some(handler),
        }
    }

    /// Create a label-only action (the GUI handles it out of band)
    pub fn label_only(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            handler: None,
        }
    }
}

/// An active memory alert
///
/// At most one *unacknowledged* alert exists per (level, category) pair;
/// re-triggers update the existing record in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryAlert {
    /// Unique alert identifier
    pub id: String,

    /// Alert severity
    pub level: AlertLevel,

    /// Which resource the alert concerns
    pub category: ResourceCategory,

    /// Short title for the dashboard
    pub title: String,

    /// Detailed message
    pub message: String,

    /// When the alert was created or last re-triggered
    pub timestamp: DateTime<Utc>,

    /// Whether the user has acknowledged the alert
    pub acknowledged: bool,

    /// Whether the alert is removed automatically when its threshold clears
    pub auto_resolve: bool,

    /// Remediation actions offered with the alert
    pub actions: Vec<RemediationAction>,
}

impl MemoryAlert {
    /// Create a new unacknowledged alert
    pub fn new(
        level: AlertLevel,
        category: ResourceCategory,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            level,
            category,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            acknowledged: false,
            auto_resolve: false,
            actions: Vec::new(),
        }
    }

    /// Mark the alert for automatic resolution when its threshold clears
    pub fn with_auto_resolve(mut self, auto_resolve: bool) -> Self {
        self.auto_resolve = auto_resolve;
        self
    }

    /// Attach remediation actions
    pub fn with_actions(mut self, actions: Vec<RemediationAction>) -> Self {
        self.actions = actions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_level_from_threshold_level() {
        assert_eq!(
            AlertLevel::from(ThresholdLevel::Warning),
            AlertLevel::Warning
        );
        assert_eq!(
            AlertLevel::from(ThresholdLevel::Emergency),
            AlertLevel::Emergency
        );
    }

    #[test]
    fn test_new_alert_is_unacknowledged() {
        let alert = MemoryAlert::new(
            AlertLevel::Warning,
            ResourceCategory::System,
            "High memory usage",
            "System memory usage reached 76%",
        );
        assert!(!alert.acknowledged);
        assert!(!alert.auto_resolve);
        assert!(!alert.id.is_empty());
    }
}
