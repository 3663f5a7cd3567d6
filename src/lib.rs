//! Memory-Probe: scanning and inspection of another process's address space
//!
//! The engines in [`memory`] are generic over the [`process::ProcessMemory`]
//! primitive layer. [`process::SnapshotProcess`] backs them with in-memory
//! buffers; on Windows, `windows::WindowsProcess` backs them with a live
//! process.

pub mod config;
pub mod core;
pub mod memory;
pub mod process;
#[cfg(windows)]
pub mod windows;

// Re-export main types from core module
pub use core::types::{
    Address, DataType, ErrorCode, Matches, MemoryError, MemoryOperationError, MemoryRegion,
    MemoryRegionEx, MemoryResult, ModuleInfo, NumericMatch, NumericValue, PatternMatch,
    PointerResult, PointerWidth, ProcessId, RegionState, RegionType, SafeOperationResult,
    ScanResult, ScanStats,
};
pub use memory::{
    MemoryDiffer, MemoryScanner, PointerResolver, RegionClassifier, SafeOperations, ScanBounds,
    ScanLimits,
};
pub use process::{ProcessMemory, SnapshotProcess};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_module_accessible() {
        assert_eq!(core::VERSION, env!("CARGO_PKG_VERSION"));
        assert_eq!(core::AUTHORS, env!("CARGO_PKG_AUTHORS"));
    }

    #[test]
    fn test_reexports_compose() {
        let process = SnapshotProcess::new().with_segment(Address::new(0x1000), vec![1, 2, 3], 0x04);
        let mut ops = SafeOperations::new(process, ScanLimits::default());

        let result = ops.scan_for_bytes(&[2, 3], &ScanBounds::All);
        assert_eq!(
            result.data().map(|r| r.addresses.clone()),
            Some(vec![Address::new(0x1001)])
        );
    }

    #[test]
    fn test_memory_error_reexport() {
        let error = MemoryError::ProcessNotFound("notepad.exe".to_string());
        assert!(error.to_string().contains("Process not found"));
        assert_eq!(error.code(), ErrorCode::ProcessNotFound);
    }
}
