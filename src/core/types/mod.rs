//! Core type definitions for Memory-Probe
//!
//! This module contains the value types exchanged between the engines and
//! their callers: addresses, regions, modules, numeric targets, match records
//! and the error taxonomy.

mod address;
mod error;
mod process_info;
mod region;
mod safe_result;
mod scan_result;
mod value;

// Re-export all public types
pub use address::Address;
pub use error::{ErrorCode, MemoryError, MemoryOperationError, MemoryResult};
pub use process_info::{ModuleInfo, PointerWidth};
pub use region::{MemoryRegion, MemoryRegionEx, RegionState, RegionType};
pub use safe_result::SafeOperationResult;
pub use scan_result::{
    Located, Matches, NumericMatch, PatternMatch, PointerResult, ScanResult, ScanStats,
};
pub use value::{DataType, NumericValue};

// Common type aliases
pub type ProcessId = u32;
