//! Engines built on top of the primitive layer
//!
//! - [`scanner`]: byte patterns, strings, regular expressions, numeric
//!   values and machine code
//! - [`pointer`]: points-to search and pointer chains
//! - [`regions`]: region enumeration, filtering and point queries
//! - [`diff`]: span and snapshot comparison
//! - [`safe`]: the result-envelope boundary over all of the above

pub mod diff;
pub mod pointer;
pub mod regions;
pub mod safe;
pub mod scanner;

pub use diff::{ChangedBytes, MemoryDiff, MemoryDiffer, MemorySnapshot};
pub use pointer::PointerResolver;
pub use regions::{
    presets, FilterCriteria, ProtectionFlags, RegionClassifier, RegionFilter, RegionListFilter,
};
pub use safe::SafeOperations;
pub use scanner::{
    bytes_to_hex_string, create_pattern, format_address, get_alignment, hex_string_to_bytes,
    parse_byte_pattern, parse_pattern_mask, BytePattern, MemoryScanner, NumericOptions,
    PatternByte, RegexPattern, ScanBounds, ScanLimits, StringOptions, FUNCTION_PROLOGS,
};
