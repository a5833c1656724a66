#[cfg(test)]
mod tests {
    use crate::config::{
        ConfigBuilder, ConfigLoader, EvictionOrder, LogLevel, MemwardenConfig, validation,
    };
    use crate::models::ThresholdLevel;
    use std::io::Write;
    use std::time::Duration;

    #[test]
    fn test_default_config() {
        let config = MemwardenConfig::default();
        assert_eq!(config.thresholds.warning, 75.0);
        assert_eq!(config.thresholds.critical, 87.5);
        assert_eq!(config.thresholds.emergency, 95.0);
        assert_eq!(config.thresholds.hysteresis, 5.0);
        assert_eq!(config.monitoring.sampling_interval, Duration::from_secs(5));
        assert_eq!(config.eviction.order, EvictionOrder::LowestPriorityFirst);
        assert_eq!(config.logging.level, LogLevel::Info);
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validation::validate_config(&MemwardenConfig::default()).is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .with_sampling_interval(Duration::from_secs(2))
            .with_thresholds(70.0, 85.0, 93.0)
            .with_hysteresis(3.0)
            .with_model_budget_bytes(4 * 1024 * 1024 * 1024)
            .with_eviction_order(EvictionOrder::HighestPriorityFirst)
            .with_log_level(LogLevel::Debug)
            .build()
            .unwrap();

        assert_eq!(config.monitoring.sampling_interval, Duration::from_secs(2));
        assert_eq!(config.thresholds.warning, 70.0);
        assert_eq!(config.thresholds.emergency, 93.0);
        assert_eq!(config.eviction.order, EvictionOrder::HighestPriorityFirst);
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_builder_rejects_unordered_thresholds() {
        let result = ConfigBuilder::new().with_thresholds(90.0, 85.0, 95.0).build();
        assert!(result.is_err());

        let result = ConfigBuilder::new().with_thresholds(75.0, 95.0, 95.0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_out_of_range_percentages() {
        assert!(ConfigBuilder::new().with_thresholds(0.0, 50.0, 90.0).build().is_err());
        assert!(ConfigBuilder::new().with_thresholds(50.0, 90.0, 110.0).build().is_err());
    }

    #[test]
    fn test_builder_rejects_oversized_hysteresis() {
        let result = ConfigBuilder::new()
            .with_thresholds(10.0, 50.0, 90.0)
            .with_hysteresis(10.0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_rejects_zero_budget() {
        assert!(ConfigBuilder::new().with_model_budget_bytes(0).build().is_err());
    }

    #[test]
    fn test_builder_rejects_zero_interval() {
        let result = ConfigBuilder::new()
            .with_sampling_interval(Duration::ZERO)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_level_for_usage() {
        let config = MemwardenConfig::default();
        assert_eq!(
            config.thresholds.level_for_usage(50.0),
            ThresholdLevel::Normal
        );
        assert_eq!(
            config.thresholds.level_for_usage(75.0),
            ThresholdLevel::Warning
        );
        assert_eq!(
            config.thresholds.level_for_usage(90.0),
            ThresholdLevel::Critical
        );
        assert_eq!(
            config.thresholds.level_for_usage(96.0),
            ThresholdLevel::Emergency
        );
    }

    #[test]
    fn test_clear_floor_subtracts_hysteresis() {
        let config = MemwardenConfig::default();
        assert_eq!(config.thresholds.clear_floor(ThresholdLevel::Warning), 70.0);
        assert_eq!(config.thresholds.clear_floor(ThresholdLevel::Critical), 82.5);
    }

    #[test]
    fn test_loader_reads_toml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[thresholds]\nwarning = 60.0\ncritical = 80.0\nemergency = 92.0\n"
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_file(file.path()).unwrap();
        let config = loader.extract().unwrap();

        assert_eq!(config.thresholds.warning, 60.0);
        assert_eq!(config.thresholds.critical, 80.0);
        // Untouched sections keep their defaults
        assert_eq!(config.monitoring.sampling_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_loader_rejects_missing_file() {
        let mut loader = ConfigLoader::new();
        assert!(loader.load_file("/nonexistent/memwarden.toml").is_err());
    }

    #[test]
    fn test_loader_rejects_invalid_values() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "[thresholds]\nwarning = 90.0\ncritical = 80.0\nemergency = 92.0\n"
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader.load_file(file.path()).unwrap();
        assert!(loader.extract().is_err());
    }
}
