//! Process-memory primitive layer
//!
//! Every engine in [`crate::memory`] is generic over [`ProcessMemory`], the
//! contract a backend must expose: raw reads and writes, region and module
//! enumeration, attachment status and pointer width. Implementations never
//! panic on unreadable memory; they return `None` or `false` instead.
//!
//! Two backends ship with the crate: [`SnapshotProcess`], an in-memory image
//! of an address space, and `WindowsProcess` (Windows only), which talks to a
//! live process through `ReadProcessMemory` and friends.

pub mod snapshot;

pub use snapshot::SnapshotProcess;

use crate::core::types::{Address, MemoryRegion, ModuleInfo, PointerWidth};

/// Raw access to the address space of one attached process
pub trait ProcessMemory {
    /// Whether a process is currently attached
    fn is_attached(&self) -> bool;

    /// Native pointer width of the attached process
    fn pointer_width(&self) -> PointerWidth;

    /// Reads exactly `size` bytes, or `None` if any part is unreadable
    fn read_bytes(&self, address: Address, size: usize) -> Option<Vec<u8>>;

    /// Writes all of `data`, returning `false` on any failure
    fn write_bytes(&self, address: Address, data: &[u8]) -> bool;

    /// Fresh enumeration of every region, in ascending address order
    fn list_regions(&self) -> Vec<MemoryRegion>;

    /// Looks a module up by name
    fn find_module(&self, name: &str) -> Option<ModuleInfo>;

    /// All loaded modules, when the backend can list them
    fn modules(&self) -> Vec<ModuleInfo> {
        Vec::new()
    }

    /// Module whose image contains `address`
    fn module_at(&self, address: Address) -> Option<ModuleInfo> {
        self.modules()
            .into_iter()
            .find(|module| module.contains_address(address))
    }
}

impl<P: ProcessMemory + ?Sized> ProcessMemory for &P {
    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }

    fn pointer_width(&self) -> PointerWidth {
        (**self).pointer_width()
    }

    fn read_bytes(&self, address: Address, size: usize) -> Option<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn write_bytes(&self, address: Address, data: &[u8]) -> bool {
        (**self).write_bytes(address, data)
    }

    fn list_regions(&self) -> Vec<MemoryRegion> {
        (**self).list_regions()
    }

    fn find_module(&self, name: &str) -> Option<ModuleInfo> {
        (**self).find_module(name)
    }

    fn modules(&self) -> Vec<ModuleInfo> {
        (**self).modules()
    }

    fn module_at(&self, address: Address) -> Option<ModuleInfo> {
        (**self).module_at(address)
    }
}

impl<P: ProcessMemory + ?Sized> ProcessMemory for Box<P> {
    fn is_attached(&self) -> bool {
        (**self).is_attached()
    }

    fn pointer_width(&self) -> PointerWidth {
        (**self).pointer_width()
    }

    fn read_bytes(&self, address: Address, size: usize) -> Option<Vec<u8>> {
        (**self).read_bytes(address, size)
    }

    fn write_bytes(&self, address: Address, data: &[u8]) -> bool {
        (**self).write_bytes(address, data)
    }

    fn list_regions(&self) -> Vec<MemoryRegion> {
        (**self).list_regions()
    }

    fn find_module(&self, name: &str) -> Option<ModuleInfo> {
        (**self).find_module(name)
    }

    fn modules(&self) -> Vec<ModuleInfo> {
        (**self).modules()
    }

    fn module_at(&self, address: Address) -> Option<ModuleInfo> {
        (**self).module_at(address)
    }
}

/// Picks a module by name: an exact case-insensitive match wins, otherwise
/// the first module whose name contains `name` case-insensitively
pub fn select_module<'a, I>(modules: I, name: &str) -> Option<ModuleInfo>
where
    I: IntoIterator<Item = &'a ModuleInfo>,
{
    let needle = name.to_lowercase();
    let mut partial = None;

    for module in modules {
        let candidate = module.name.to_lowercase();
        if candidate == needle {
            return Some(module.clone());
        }
        if partial.is_none() && candidate.contains(&needle) {
            partial = Some(module.clone());
        }
    }

    partial
}
