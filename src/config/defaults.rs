//! Default configuration values for Memory-Probe

use serde::{Deserialize, Serialize};

/// Hard ceiling on collected matches per scan
pub const MAX_RESULTS: usize = 10_000;
/// Largest single span the differ or a raw read will accept (100MB)
pub const MAX_READ_SIZE: usize = 100 * 1024 * 1024;
/// Bytes requested from the primitive layer per chunk (1MB)
pub const CHUNK_SIZE: usize = 1024 * 1024;
/// Overlap carried between chunks for regex scans
pub const REGEX_WINDOW: usize = 4096;
/// Widest `pointsTo` to target distance accepted by offset-free chain discovery
pub const MAX_CHAIN_OFFSET: usize = 0x1000;
/// Absolute tolerance for float and double searches
pub const FLOAT_TOLERANCE: f64 = 0.001;

/// Default configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDefaults {
    pub scanner: ScannerDefaults,
    pub memory: MemoryDefaults,
    pub logging: LoggingDefaults,
}

/// Default scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerDefaults {
    pub max_results: usize,
    pub chunk_size: usize,
    pub regex_window: usize,
    pub max_chain_offset: usize,
}

/// Default memory configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryDefaults {
    pub max_read_size: usize,
    pub float_tolerance: f64,
}

/// Default logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingDefaults {
    pub level: String,
    pub file: Option<String>,
}

/// Returns the default configuration
pub fn default_config() -> ConfigDefaults {
    ConfigDefaults {
        scanner: ScannerDefaults {
            max_results: MAX_RESULTS,
            chunk_size: CHUNK_SIZE,
            regex_window: REGEX_WINDOW,
            max_chain_offset: MAX_CHAIN_OFFSET,
        },
        memory: MemoryDefaults {
            max_read_size: MAX_READ_SIZE,
            float_tolerance: FLOAT_TOLERANCE,
        },
        logging: LoggingDefaults {
            level: "info".to_string(),
            file: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scanner_defaults() {
        let config = default_config();
        assert_eq!(config.scanner.max_results, 10_000);
        assert_eq!(config.scanner.chunk_size, 1_048_576);
        assert!(config.scanner.chunk_size.is_power_of_two());
        assert_eq!(config.scanner.regex_window, 4096);
        assert_eq!(config.scanner.max_chain_offset, 0x1000);
    }

    #[test]
    fn test_memory_defaults() {
        let config = default_config();
        assert_eq!(config.memory.max_read_size, 104_857_600);
        assert_eq!(config.memory.float_tolerance, 0.001);
    }

    #[test]
    fn test_logging_defaults() {
        let config = default_config();
        assert_eq!(config.logging.level, "info");
        assert!(config.logging.file.is_none());
    }
}
