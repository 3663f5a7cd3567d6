//! Configuration module for Memory-Probe
//!
//! Provides configuration loading, validation, and default settings
//! for the scanning engines and the command line tool.

mod defaults;
mod loader;
mod validator;

pub use defaults::{
    default_config, ConfigDefaults, CHUNK_SIZE, FLOAT_TOLERANCE, MAX_CHAIN_OFFSET, MAX_READ_SIZE,
    MAX_RESULTS, REGEX_WINDOW,
};
pub use loader::{
    load_config, ConfigLoader, LoggingConfig, MemoryConfig, ScannerConfig, CONFIG_ENV_VAR,
    DEFAULT_CONFIG_FILE,
};
pub use validator::{validate_config, ConfigValidator, MIN_CHUNK_SIZE};

// Re-export the main configuration structure
pub use loader::Config;

// Configuration-related error type
pub use loader::ConfigError;

// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;
