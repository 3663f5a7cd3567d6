//! Core module containing fundamental types for Memory-Probe
//!
//! This module provides the foundational building blocks used throughout
//! the crate, including address handling, region and module records,
//! match types, and error types.

pub mod types;

// Re-export commonly used types for convenience
pub use types::{
    Address, ErrorCode, MemoryError, MemoryRegion, MemoryResult, ModuleInfo, PointerWidth,
    SafeOperationResult, ScanResult,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
