//! In-memory address space
//!
//! `SnapshotProcess` holds a set of regions with backing bytes, optional
//! unreadable holes and a module table. It answers the primitive-layer
//! contract exactly like a live process would, which makes it the backend
//! for the test suite and for scanning captured memory dumps offline.

use super::{select_module, ProcessMemory};
use crate::core::types::{Address, MemoryRegion, ModuleInfo, PointerWidth};
use std::cell::RefCell;

#[derive(Debug)]
struct Segment {
    region: MemoryRegion,
    bytes: RefCell<Vec<u8>>,
}

/// An address space backed by owned byte buffers
#[derive(Debug)]
pub struct SnapshotProcess {
    segments: Vec<Segment>,
    holes: Vec<(Address, Address)>,
    modules: Vec<ModuleInfo>,
    pointer_width: PointerWidth,
    attached: bool,
}

impl SnapshotProcess {
    /// Creates an empty, attached address space with the host pointer width
    pub fn new() -> Self {
        SnapshotProcess {
            segments: Vec::new(),
            holes: Vec::new(),
            modules: Vec::new(),
            pointer_width: PointerWidth::native(),
            attached: true,
        }
    }

    /// Creates an address space with nothing attached
    pub fn detached() -> Self {
        SnapshotProcess {
            attached: false,
            ..SnapshotProcess::new()
        }
    }

    /// Adds a region. `bytes` is zero-padded or cut to the region size;
    /// regions that are not committed keep no data.
    pub fn with_region(mut self, region: MemoryRegion, mut bytes: Vec<u8>) -> Self {
        bytes.resize(if region.is_committed() { region.size } else { 0 }, 0);
        let at = self
            .segments
            .partition_point(|segment| segment.region.base_address < region.base_address);
        self.segments.insert(
            at,
            Segment {
                region,
                bytes: RefCell::new(bytes),
            },
        );
        self
    }

    /// Adds a committed private region sized to `bytes`
    pub fn with_segment(self, base: Address, bytes: Vec<u8>, protection: u32) -> Self {
        let region = MemoryRegion::committed(base, bytes.len(), protection);
        self.with_region(region, bytes)
    }

    /// Marks `[start, start + len)` as unreadable and unwritable while keeping
    /// it inside its region
    pub fn with_hole(mut self, start: Address, len: usize) -> Self {
        let end = Address::new(start.as_usize().saturating_add(len));
        self.holes.push((start, end));
        self
    }

    pub fn with_module(mut self, module: ModuleInfo) -> Self {
        self.modules.push(module);
        self
    }

    pub fn with_pointer_width(mut self, width: PointerWidth) -> Self {
        self.pointer_width = width;
        self
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    fn segment_for(&self, address: Address, size: usize) -> Option<(&Segment, usize)> {
        let end = address.as_usize().checked_add(size)?;
        self.segments.iter().find_map(|segment| {
            let region = &segment.region;
            let fits = region.contains(address) && end <= region.end_address().as_usize();
            fits.then(|| (segment, address.as_usize() - region.base_address.as_usize()))
        })
    }

    fn overlaps_hole(&self, address: Address, size: usize) -> bool {
        let end = address.as_usize().saturating_add(size);
        self.holes
            .iter()
            .any(|(start, stop)| address.as_usize() < stop.as_usize() && start.as_usize() < end)
    }
}

impl Default for SnapshotProcess {
    fn default() -> Self {
        SnapshotProcess::new()
    }
}

impl ProcessMemory for SnapshotProcess {
    fn is_attached(&self) -> bool {
        self.attached
    }

    fn pointer_width(&self) -> PointerWidth {
        self.pointer_width
    }

    fn read_bytes(&self, address: Address, size: usize) -> Option<Vec<u8>> {
        if !self.attached || self.overlaps_hole(address, size) {
            return None;
        }
        let (segment, offset) = self.segment_for(address, size)?;
        if !segment.region.is_scannable() {
            return None;
        }
        let bytes = segment.bytes.borrow();
        bytes.get(offset..offset + size).map(<[u8]>::to_vec)
    }

    fn write_bytes(&self, address: Address, data: &[u8]) -> bool {
        if !self.attached || self.overlaps_hole(address, data.len()) {
            return false;
        }
        let Some((segment, offset)) = self.segment_for(address, data.len()) else {
            return false;
        };
        if !segment.region.is_committed() || !segment.region.is_writable() {
            return false;
        }
        let mut bytes = segment.bytes.borrow_mut();
        match bytes.get_mut(offset..offset + data.len()) {
            Some(target) => {
                target.copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    fn list_regions(&self) -> Vec<MemoryRegion> {
        if !self.attached {
            return Vec::new();
        }
        self.segments
            .iter()
            .map(|segment| segment.region.clone())
            .collect()
    }

    fn find_module(&self, name: &str) -> Option<ModuleInfo> {
        if !self.attached {
            return None;
        }
        select_module(&self.modules, name)
    }

    fn modules(&self) -> Vec<ModuleInfo> {
        if !self.attached {
            return Vec::new();
        }
        self.modules.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{RegionState, RegionType};

    fn sample() -> SnapshotProcess {
        SnapshotProcess::new()
            .with_segment(Address::new(0x2000), (0..16).collect(), 0x04)
            .with_segment(Address::new(0x1000), vec![0xAA; 8], 0x02)
    }

    #[test]
    fn test_regions_sorted() {
        let process = sample();
        let bases: Vec<_> = process
            .list_regions()
            .iter()
            .map(|r| r.base_address)
            .collect();
        assert_eq!(bases, vec![Address::new(0x1000), Address::new(0x2000)]);
    }

    #[test]
    fn test_read_within_region() {
        let process = sample();
        assert_eq!(
            process.read_bytes(Address::new(0x2004), 3),
            Some(vec![4, 5, 6])
        );
        assert_eq!(process.read_bytes(Address::new(0x200E), 4), None);
        assert_eq!(process.read_bytes(Address::new(0x3000), 1), None);
    }

    #[test]
    fn test_holes_block_access() {
        let process = sample().with_hole(Address::new(0x2008), 4);
        assert!(process.read_bytes(Address::new(0x2000), 8).is_some());
        assert!(process.read_bytes(Address::new(0x2006), 4).is_none());
        assert!(!process.write_bytes(Address::new(0x200A), &[1]));
    }

    #[test]
    fn test_write_requires_writable() {
        let process = sample();
        assert!(process.write_bytes(Address::new(0x2000), &[9, 9]));
        assert_eq!(process.read_bytes(Address::new(0x2000), 2), Some(vec![9, 9]));
        assert!(!process.write_bytes(Address::new(0x1000), &[1]));
    }

    #[test]
    fn test_uncommitted_regions_unreadable() {
        let reserved = MemoryRegion::new(
            Address::new(0x5000),
            0x100,
            0x04,
            RegionState::Reserved,
            RegionType::Private,
        );
        let process = SnapshotProcess::new().with_region(reserved, vec![1; 0x100]);
        assert_eq!(process.list_regions().len(), 1);
        assert!(process.read_bytes(Address::new(0x5000), 1).is_none());
    }

    #[test]
    fn test_detached_process() {
        let mut process = sample();
        process.detach();
        assert!(!process.is_attached());
        assert!(process.read_bytes(Address::new(0x2000), 1).is_none());
        assert!(process.list_regions().is_empty());

        process.attach();
        assert!(process.is_attached());
        assert!(process.read_bytes(Address::new(0x2000), 1).is_some());
    }

    #[test]
    fn test_module_lookup() {
        let process = sample()
            .with_module(ModuleInfo::new("game.exe", Address::new(0x1000), 8))
            .with_pointer_width(PointerWidth::Bits32);
        assert_eq!(process.pointer_width(), PointerWidth::Bits32);
        assert!(process.find_module("GAME.exe").is_some());
        assert_eq!(
            process.module_at(Address::new(0x1004)).map(|m| m.name),
            Some("game.exe".to_string())
        );
        assert!(process.module_at(Address::new(0x2000)).is_none());
    }
}
