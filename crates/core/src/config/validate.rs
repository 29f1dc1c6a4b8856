use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Database path is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Database validation
    if config.database.path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "database.path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
