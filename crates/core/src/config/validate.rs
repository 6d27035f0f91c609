use super::{types::Config, ConfigError};

/// Validate a loaded configuration before wiring anything up.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.folders.monitor_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "folders.monitor_path must not be empty".to_string(),
        ));
    }
    if config.folders.tool_path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "folders.tool_path must not be empty".to_string(),
        ));
    }
    if config.monitor.poll_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "monitor.poll_interval_secs must be greater than zero".to_string(),
        ));
    }
    if config.monitor.backoff_secs == 0 {
        return Err(ConfigError::Invalid(
            "monitor.backoff_secs must be greater than zero".to_string(),
        ));
    }
    Ok(())
}
