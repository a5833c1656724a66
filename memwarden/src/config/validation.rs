//! Configuration validation utilities.
//!
//! This module provides validation functions for configuration values.
//! Validation failures are fatal: `initialize()` rejects an orchestrator
//! built from an invalid configuration.

use super::ConfigError;
use super::models::*;

/// Validate the entire configuration.
pub fn validate_config(config: &MemwardenConfig) -> Result<(), ConfigError> {
    validate_monitoring_config(&config.monitoring)?;
    validate_threshold_config(&config.thresholds)?;
    validate_eviction_config(&config.eviction)?;

    Ok(())
}

/// Validate sampling loop configuration.
fn validate_monitoring_config(config: &MonitoringConfig) -> Result<(), ConfigError> {
    if config.sampling_interval.is_zero() {
        return Err(ConfigError::ValidationError(
            "Sampling interval must be greater than zero".to_string(),
        ));
    }

    if config.event_capacity == 0 {
        return Err(ConfigError::ValidationError(
            "Event channel capacity must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

/// Validate threshold tier configuration.
fn validate_threshold_config(config: &ThresholdConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("warning", config.warning),
        ("critical", config.critical),
        ("emergency", config.emergency),
    ] {
        if !value.is_finite() || value <= 0.0 || value > 100.0 {
            return Err(ConfigError::ValidationError(format!(
                "Threshold '{}' must be a percentage in (0, 100], got {}",
                name, value
            )));
        }
    }

    if config.warning >= config.critical || config.critical >= config.emergency {
        return Err(ConfigError::ValidationError(format!(
            "Thresholds must be strictly increasing: warning {} < critical {} < emergency {}",
            config.warning, config.critical, config.emergency
        )));
    }

    if !config.hysteresis.is_finite() || config.hysteresis < 0.0 {
        return Err(ConfigError::ValidationError(format!(
            "Hysteresis must be non-negative, got {}",
            config.hysteresis
        )));
    }

    if config.hysteresis >= config.warning {
        return Err(ConfigError::ValidationError(format!(
            "Hysteresis {} must be smaller than the warning threshold {}",
            config.hysteresis, config.warning
        )));
    }

    Ok(())
}

/// Validate eviction configuration.
fn validate_eviction_config(config: &EvictionConfig) -> Result<(), ConfigError> {
    if config.model_budget_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "Model memory budget must be greater than zero".to_string(),
        ));
    }

    if !config.headroom_percentage.is_finite()
        || config.headroom_percentage < 0.0
        || config.headroom_percentage > 100.0
    {
        return Err(ConfigError::ValidationError(format!(
            "Eviction headroom must be a percentage in [0, 100], got {}",
            config.headroom_percentage
        )));
    }

    Ok(())
}
