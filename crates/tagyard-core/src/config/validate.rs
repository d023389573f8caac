//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.general.model_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "general.model_dir must not be empty".into(),
            ));
        }
        if self.general.data_dir.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "general.data_dir must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.defaults.general_threshold) {
            return Err(ConfigError::ValidationError(
                "defaults.general_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.defaults.character_threshold) {
            return Err(ConfigError::ValidationError(
                "defaults.character_threshold must be between 0.0 and 1.0".into(),
            ));
        }
        if self.defaults.model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "defaults.model must not be empty".into(),
            ));
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "logging.format must be \"pretty\" or \"json\", got {other:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = Config::default();
        config.defaults.general_threshold = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general_threshold"));

        config.defaults.general_threshold = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("general_threshold"));
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let mut config = Config::default();
        config.defaults.model = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("defaults.model"));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.format"));
    }
}
