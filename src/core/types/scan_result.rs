//! Match records and scan statistics

use super::{Address, DataType};
use serde::{Deserialize, Serialize};

/// Counters accumulated while walking target memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStats {
    /// Bytes actually read and examined
    pub total_scanned: usize,
    pub successful_reads: usize,
    pub failed_reads: usize,
    /// Set once the match count reached the result cap
    pub truncated: bool,
}

/// Matches produced by an engine search together with its statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matches<T> {
    pub matches: Vec<T>,
    pub stats: ScanStats,
}

impl<T> Matches<T> {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn truncated(&self) -> bool {
        self.stats.truncated
    }

    /// Maps every match while keeping the statistics
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Matches<U> {
        Matches {
            matches: self.matches.into_iter().map(f).collect(),
            stats: self.stats,
        }
    }
}

impl<T> Default for Matches<T> {
    fn default() -> Self {
        Matches {
            matches: Vec::new(),
            stats: ScanStats::default(),
        }
    }
}

/// Address-only view of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub addresses: Vec<Address>,
    pub total_scanned: usize,
    pub successful_reads: usize,
    pub failed_reads: usize,
    pub truncated: bool,
}

impl<T: Located> From<Matches<T>> for ScanResult {
    fn from(found: Matches<T>) -> Self {
        ScanResult {
            addresses: found.matches.iter().map(Located::address).collect(),
            total_scanned: found.stats.total_scanned,
            successful_reads: found.stats.successful_reads,
            failed_reads: found.stats.failed_reads,
            truncated: found.stats.truncated,
        }
    }
}

/// Anything that resolves to a single address in the target
pub trait Located {
    fn address(&self) -> Address;
}

impl Located for Address {
    fn address(&self) -> Address {
        *self
    }
}

/// A byte, string or regex match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub address: Address,
    pub size: usize,
    /// Bytes captured at match time
    pub data: Vec<u8>,
}

impl Located for PatternMatch {
    fn address(&self) -> Address {
        self.address
    }
}

/// A numeric search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericMatch {
    pub address: Address,
    pub data_type: DataType,
    pub raw_data: Vec<u8>,
}

impl Located for NumericMatch {
    fn address(&self) -> Address {
        self.address
    }
}

/// A pointer cell found in target memory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointerResult {
    /// Location of the pointer
    pub address: Address,
    /// Value stored at `address`
    pub points_to: Address,
    /// Distance from `points_to` to the address this level leads to
    pub offset: usize,
    /// Chain level, 0 for direct pointers
    pub depth: usize,
}

impl Located for PointerResult {
    fn address(&self) -> Address {
        self.address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_result_from_matches() {
        let found = Matches {
            matches: vec![
                PatternMatch {
                    address: Address::new(0x1000),
                    size: 2,
                    data: vec![0x4D, 0x5A],
                },
                PatternMatch {
                    address: Address::new(0x1003),
                    size: 2,
                    data: vec![0x4D, 0x5A],
                },
            ],
            stats: ScanStats {
                total_scanned: 5,
                successful_reads: 1,
                failed_reads: 0,
                truncated: false,
            },
        };

        let result = ScanResult::from(found);
        assert_eq!(
            result.addresses,
            vec![Address::new(0x1000), Address::new(0x1003)]
        );
        assert_eq!(result.total_scanned, 5);
        assert!(!result.truncated);
    }

    #[test]
    fn test_scan_result_serialization() {
        let result = ScanResult {
            addresses: vec![Address::new(0x1000)],
            total_scanned: 16,
            successful_reads: 1,
            failed_reads: 2,
            truncated: true,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["addresses"][0], "0x1000");
        assert_eq!(json["totalScanned"], 16);
        assert_eq!(json["failedReads"], 2);
        assert_eq!(json["truncated"], true);
    }

    #[test]
    fn test_matches_map() {
        let found = Matches {
            matches: vec![1usize, 2, 3],
            stats: ScanStats {
                truncated: true,
                ..Default::default()
            },
        };
        let mapped = found.map(|v| v * 2);
        assert_eq!(mapped.matches, vec![2, 4, 6]);
        assert!(mapped.truncated());
        assert_eq!(mapped.len(), 3);
    }
}
