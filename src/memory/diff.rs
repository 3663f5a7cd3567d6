//! Byte-level comparison of memory spans and snapshots

use crate::core::types::{Address, MemoryError, MemoryResult};
use crate::memory::scanner::{ensure_attached, ScanLimits};
use crate::process::ProcessMemory;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Offsets, relative to the compared spans, where two spans differ
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryDiff {
    pub differences: Vec<usize>,
    /// Bytes compared
    pub compared: usize,
    pub truncated: bool,
}

/// Absolute addresses whose bytes no longer match a baseline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedBytes {
    pub addresses: Vec<Address>,
    pub compared: usize,
    pub truncated: bool,
}

/// A copy of a span taken at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub address: Address,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl MemorySnapshot {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn end_address(&self) -> Address {
        Address::new(self.address.as_usize().saturating_add(self.bytes.len()))
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode_upper(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

/// Compares live memory against other spans or earlier snapshots
pub struct MemoryDiffer<'a, P: ProcessMemory + ?Sized> {
    process: &'a P,
    limits: ScanLimits,
}

impl<'a, P: ProcessMemory + ?Sized> MemoryDiffer<'a, P> {
    pub fn new(process: &'a P, limits: ScanLimits) -> Self {
        MemoryDiffer { process, limits }
    }

    /// Compares `size` bytes at `first` with `size` bytes at `second`
    pub fn compare_memory_regions(
        &self,
        first: Address,
        second: Address,
        size: usize,
    ) -> MemoryResult<MemoryDiff> {
        ensure_attached(self.process)?;
        self.check_size(size)?;

        let left = self.read(first, size)?;
        let right = self.read(second, size)?;

        let (differences, truncated) = self.differing(&left, &right);
        debug!(
            operation = "compareMemoryRegions",
            first = %first,
            second = %second,
            size,
            differences = differences.len(),
            "compared"
        );

        Ok(MemoryDiff {
            differences,
            compared: size,
            truncated,
        })
    }

    /// Re-reads `original.len()` bytes at `address` and reports the addresses
    /// that changed. `original` is not modified.
    pub fn find_changed_bytes(&self, address: Address, original: &[u8]) -> MemoryResult<ChangedBytes> {
        ensure_attached(self.process)?;
        if original.is_empty() {
            return Err(MemoryError::InvalidSize("baseline is empty".to_string()));
        }
        self.check_size(original.len())?;

        let current = self.read(address, original.len())?;
        let (offsets, truncated) = self.differing(original, &current);
        debug!(
            operation = "findChangedBytes",
            address = %address,
            size = original.len(),
            changed = offsets.len(),
            "compared"
        );

        Ok(ChangedBytes {
            addresses: offsets
                .into_iter()
                .map(|offset| Address::new(address.as_usize() + offset))
                .collect(),
            compared: original.len(),
            truncated,
        })
    }

    /// Copies `size` bytes at `address`
    pub fn capture(&self, address: Address, size: usize) -> MemoryResult<MemorySnapshot> {
        ensure_attached(self.process)?;
        self.check_size(size)?;
        let bytes = self.read(address, size)?;
        Ok(MemorySnapshot { address, bytes })
    }

    /// Addresses that changed since `snapshot` was captured
    pub fn changed_since(&self, snapshot: &MemorySnapshot) -> MemoryResult<ChangedBytes> {
        self.find_changed_bytes(snapshot.address, &snapshot.bytes)
    }

    fn check_size(&self, size: usize) -> MemoryResult<()> {
        if size == 0 {
            return Err(MemoryError::InvalidSize("size must be greater than zero".to_string()));
        }
        if size > self.limits.max_read_size {
            return Err(MemoryError::InvalidSize(format!(
                "{} bytes exceeds the {} byte limit",
                size, self.limits.max_read_size
            )));
        }
        Ok(())
    }

    fn read(&self, address: Address, size: usize) -> MemoryResult<Vec<u8>> {
        self.process
            .read_bytes(address, size)
            .ok_or_else(|| MemoryError::read_failed(address, format!("cannot read {} bytes", size)))
    }

    fn differing(&self, left: &[u8], right: &[u8]) -> (Vec<usize>, bool) {
        let cap = self.limits.max_results;
        let mut offsets = Vec::new();
        let mut truncated = cap == 0;

        // Same rule as the scanners: reaching the cap stops the walk
        for (offset, (a, b)) in left.iter().zip(right).enumerate() {
            if truncated {
                break;
            }
            if a != b {
                offsets.push(offset);
                truncated = offsets.len() >= cap;
            }
        }

        if truncated {
            warn!(max_results = cap, "difference list truncated");
        }
        (offsets, truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::ErrorCode;
    use crate::process::SnapshotProcess;

    fn process() -> SnapshotProcess {
        SnapshotProcess::new()
            .with_segment(Address::new(0x1000), vec![1, 2, 3, 4, 5, 6, 7, 8], 0x04)
            .with_segment(Address::new(0x2000), vec![1, 2, 0, 4, 5, 6, 0, 8], 0x04)
    }

    #[test]
    fn test_compare_regions() {
        let process = process();
        let differ = MemoryDiffer::new(&process, ScanLimits::default());

        let diff = differ
            .compare_memory_regions(Address::new(0x1000), Address::new(0x2000), 8)
            .unwrap();
        assert_eq!(diff.differences, vec![2, 6]);
        assert_eq!(diff.compared, 8);
        assert!(!diff.truncated);

        let same = differ
            .compare_memory_regions(Address::new(0x1000), Address::new(0x1000), 8)
            .unwrap();
        assert!(same.differences.is_empty());
    }

    #[test]
    fn test_compare_size_and_read_errors() {
        let process = process();
        let limits = ScanLimits {
            max_read_size: 16,
            ..ScanLimits::default()
        };
        let differ = MemoryDiffer::new(&process, limits);

        let zero = differ
            .compare_memory_regions(Address::new(0x1000), Address::new(0x2000), 0)
            .unwrap_err();
        assert_eq!(zero.code(), ErrorCode::InvalidSize);

        let huge = differ
            .compare_memory_regions(Address::new(0x1000), Address::new(0x2000), 17)
            .unwrap_err();
        assert_eq!(huge.code(), ErrorCode::InvalidSize);

        let unreadable = differ
            .compare_memory_regions(Address::new(0x1000), Address::new(0x3000), 4)
            .unwrap_err();
        assert_eq!(unreadable.code(), ErrorCode::ReadMemoryFailed);
    }

    #[test]
    fn test_difference_cap() {
        let process = process();
        let limits = ScanLimits {
            max_results: 1,
            ..ScanLimits::default()
        };
        let differ = MemoryDiffer::new(&process, limits);

        let diff = differ
            .compare_memory_regions(Address::new(0x1000), Address::new(0x2000), 8)
            .unwrap();
        assert_eq!(diff.differences, vec![2]);
        assert!(diff.truncated);

        // Hitting the cap exactly still reports truncation
        let at_cap = MemoryDiffer::new(
            &process,
            ScanLimits {
                max_results: 2,
                ..ScanLimits::default()
            },
        );
        let diff = at_cap
            .compare_memory_regions(Address::new(0x1000), Address::new(0x2000), 8)
            .unwrap();
        assert_eq!(diff.differences, vec![2, 6]);
        assert!(diff.truncated);
    }

    #[test]
    fn test_snapshot_and_changes() {
        let process = process();
        let differ = MemoryDiffer::new(&process, ScanLimits::default());

        let snapshot = differ.capture(Address::new(0x1000), 8).unwrap();
        assert_eq!(snapshot.len(), 8);
        assert!(differ.changed_since(&snapshot).unwrap().addresses.is_empty());

        assert!(process.write_bytes(Address::new(0x1003), &[0xFF]));
        let changed = differ.changed_since(&snapshot).unwrap();
        assert_eq!(changed.addresses, vec![Address::new(0x1003)]);
        assert_eq!(snapshot.bytes[3], 4);

        let empty = differ.find_changed_bytes(Address::new(0x1000), &[]).unwrap_err();
        assert_eq!(empty.code(), ErrorCode::InvalidSize);
    }

    #[test]
    fn test_snapshot_serializes_hex() {
        let snapshot = MemorySnapshot {
            address: Address::new(0x1000),
            bytes: vec![0x4D, 0x5A],
        };
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["address"], "0x1000");
        assert_eq!(json["bytes"], "4D5A");

        let back: MemorySnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }
}
