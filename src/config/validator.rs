//! Configuration validator for Memory-Probe
//!
//! Validates configuration values to ensure they are within acceptable ranges.

use super::defaults::MAX_READ_SIZE;
use super::loader::{Config, ConfigError, LoggingConfig, MemoryConfig, ScannerConfig};

/// Smallest chunk the scanner will request
pub const MIN_CHUNK_SIZE: usize = 16;

/// Configuration validator
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the entire configuration
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        Self::validate_scanner(&config.scanner)?;
        Self::validate_memory(&config.memory)?;
        Self::validate_logging(&config.logging)?;
        Ok(())
    }

    /// Validates scanner configuration
    fn validate_scanner(scanner: &ScannerConfig) -> Result<(), ConfigError> {
        if scanner.max_results == 0 {
            return Err(ConfigError::Invalid(
                "Maximum results must be at least 1".to_string(),
            ));
        }

        // Chunk size must be a power of 2 so chunks stay page aligned
        if scanner.chunk_size < MIN_CHUNK_SIZE || !scanner.chunk_size.is_power_of_two() {
            return Err(ConfigError::Invalid(format!(
                "Chunk size must be a power of 2 and at least {}",
                MIN_CHUNK_SIZE
            )));
        }

        if scanner.regex_window == 0 {
            return Err(ConfigError::Invalid(
                "Regex window must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Validates memory configuration
    fn validate_memory(memory: &MemoryConfig) -> Result<(), ConfigError> {
        if memory.max_read_size == 0 {
            return Err(ConfigError::Invalid(
                "Maximum read size must be greater than 0".to_string(),
            ));
        }

        if memory.max_read_size > MAX_READ_SIZE {
            tracing::warn!(
                max_read_size = memory.max_read_size,
                "Maximum read size exceeds 100MB"
            );
        }

        if !memory.float_tolerance.is_finite() || memory.float_tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "Float tolerance must be a finite, non-negative number: {}",
                memory.float_tolerance
            )));
        }

        Ok(())
    }

    /// Validates logging configuration
    fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                logging.level, valid_levels
            )));
        }

        if let Some(file) = &logging.file {
            if file.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "Log file path cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Validates a configuration
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    ConfigValidator::validate(config)
}
