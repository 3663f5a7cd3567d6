//! Memory region records reported by the primitive layer

use super::Address;
use crate::memory::ProtectionFlags;
use serde::{Deserialize, Serialize};

/// State of a memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionState {
    /// Memory is committed and accessible
    Committed,
    /// Memory is reserved but not committed
    Reserved,
    /// Memory is free/unallocated
    Free,
}

/// Type of memory region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionType {
    /// Private memory
    Private,
    /// Mapped memory (file mapping)
    Mapped,
    /// Image memory (executable/DLL)
    Image,
}

/// A contiguous span of address space with uniform protection and state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRegion {
    pub base_address: Address,
    pub size: usize,
    /// Raw `PAGE_*` protection bits
    pub protection: u32,
    pub state: RegionState,
    #[serde(rename = "type")]
    pub region_type: RegionType,
}

impl MemoryRegion {
    pub fn new(
        base_address: Address,
        size: usize,
        protection: u32,
        state: RegionState,
        region_type: RegionType,
    ) -> Self {
        MemoryRegion {
            base_address,
            size,
            protection,
            state,
            region_type,
        }
    }

    /// Committed private region with the given protection
    pub fn committed(base_address: Address, size: usize, protection: u32) -> Self {
        MemoryRegion::new(
            base_address,
            size,
            protection,
            RegionState::Committed,
            RegionType::Private,
        )
    }

    pub fn is_committed(&self) -> bool {
        self.state == RegionState::Committed
    }

    /// Check if the region is readable
    pub fn is_readable(&self) -> bool {
        self.flags().is_readable() && !self.is_guarded()
    }

    /// Check if the region is writable
    pub fn is_writable(&self) -> bool {
        self.flags().is_writable()
    }

    /// Check if the region is executable
    pub fn is_executable(&self) -> bool {
        self.flags().is_executable()
    }

    /// Check if the region is guarded
    pub fn is_guarded(&self) -> bool {
        self.flags().is_guard()
    }

    pub fn flags(&self) -> ProtectionFlags {
        ProtectionFlags::new(self.protection)
    }

    /// Committed and readable, i.e. eligible for scanning
    pub fn is_scannable(&self) -> bool {
        self.is_committed() && self.is_readable()
    }

    /// Get the end address of the region
    pub fn end_address(&self) -> Address {
        Address::new(self.base_address.as_usize().saturating_add(self.size))
    }

    /// Check if an address is within this region
    pub fn contains(&self, address: Address) -> bool {
        address >= self.base_address && address < self.end_address()
    }
}

/// Region enriched with its end address and owning module
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRegionEx {
    #[serde(flatten)]
    pub region: MemoryRegion,
    pub end_address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_name: Option<String>,
}

impl MemoryRegionEx {
    pub fn new(region: MemoryRegion, module_name: Option<String>) -> Self {
        MemoryRegionEx {
            end_address: region.end_address(),
            region,
            module_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_predicates() {
        let rw = MemoryRegion::committed(Address::new(0x1000), 0x1000, 0x04);
        assert!(rw.is_readable());
        assert!(rw.is_writable());
        assert!(!rw.is_executable());

        let rx = MemoryRegion::committed(Address::new(0x1000), 0x1000, 0x20);
        assert!(rx.is_readable());
        assert!(!rx.is_writable());
        assert!(rx.is_executable());

        let guard = MemoryRegion::committed(Address::new(0x1000), 0x1000, 0x104);
        assert!(guard.is_guarded());
        assert!(!guard.is_readable());

        let no_access = MemoryRegion::committed(Address::new(0x1000), 0x1000, 0x01);
        assert!(!no_access.is_readable());

        let execute_only = MemoryRegion::committed(Address::new(0x1000), 0x1000, 0x10);
        assert!(!execute_only.is_readable());
        assert!(execute_only.is_executable());

        // Predicates agree with the flag view of the same bits
        for protection in [0x02, 0x08, 0x40, 0x80, 0x204] {
            let region = MemoryRegion::committed(Address::new(0x1000), 0x1000, protection);
            let flags = ProtectionFlags::new(protection);
            assert_eq!(region.flags(), flags);
            assert_eq!(region.is_readable(), flags.is_readable());
            assert_eq!(region.is_writable(), flags.is_writable());
            assert_eq!(region.is_executable(), flags.is_executable());
        }
    }

    #[test]
    fn test_region_bounds() {
        let region = MemoryRegion::committed(Address::new(0x1000), 0x100, 0x02);
        assert_eq!(region.end_address(), Address::new(0x1100));
        assert!(region.contains(Address::new(0x10FF)));
        assert!(!region.contains(Address::new(0x1100)));
        assert!(!region.contains(Address::new(0x0FFF)));
    }

    #[test]
    fn test_scannable_requires_commit() {
        let reserved = MemoryRegion::new(
            Address::new(0x1000),
            0x1000,
            0x04,
            RegionState::Reserved,
            RegionType::Private,
        );
        assert!(!reserved.is_scannable());
    }

    #[test]
    fn test_region_ex_serialization() {
        let region = MemoryRegion::new(
            Address::new(0x400000),
            0x1000,
            0x20,
            RegionState::Committed,
            RegionType::Image,
        );
        let ex = MemoryRegionEx::new(region, Some("game.exe".to_string()));
        let json = serde_json::to_value(&ex).unwrap();
        assert_eq!(json["baseAddress"], "0x400000");
        assert_eq!(json["endAddress"], "0x401000");
        assert_eq!(json["state"], "committed");
        assert_eq!(json["type"], "image");
        assert_eq!(json["moduleName"], "game.exe");
    }
}
