//! Live-process backend for the primitive layer

use super::bindings::{kernel32, psapi};
use super::handle::Handle;
use crate::core::types::{
    Address, MemoryRegion, MemoryResult, ModuleInfo, PointerWidth, ProcessId, RegionState,
    RegionType,
};
use crate::process::{select_module, ProcessMemory};
use tracing::{debug, info};
use winapi::um::winnt::{
    MEMORY_BASIC_INFORMATION, MEM_COMMIT, MEM_IMAGE, MEM_MAPPED, MEM_RESERVE, PROCESS_QUERY_INFORMATION,
    PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};

const ACCESS_RIGHTS: u32 =
    PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION | PROCESS_QUERY_INFORMATION;

struct Attachment {
    pid: ProcessId,
    handle: Handle,
    pointer_width: PointerWidth,
}

/// A process opened through `OpenProcess`
#[derive(Default)]
pub struct WindowsProcess {
    attachment: Option<Attachment>,
}

impl WindowsProcess {
    /// Starts detached
    pub fn new() -> Self {
        WindowsProcess::default()
    }

    /// Opens `pid`, detaching from any previously attached process first
    pub fn attach(&mut self, pid: ProcessId) -> MemoryResult<()> {
        self.detach();

        let handle = Handle::new(kernel32::open_process(pid, ACCESS_RIGHTS)?);
        let wow64 = unsafe { kernel32::is_wow64_process(handle.raw())? };
        let pointer_width = if wow64 {
            PointerWidth::Bits32
        } else {
            PointerWidth::native()
        };

        info!(pid, ?pointer_width, "attached to process");
        self.attachment = Some(Attachment {
            pid,
            handle,
            pointer_width,
        });
        Ok(())
    }

    /// Closes the handle; a no-op when nothing is attached
    pub fn detach(&mut self) {
        if let Some(previous) = self.attachment.take() {
            info!(pid = previous.pid, "detached from process");
        }
    }

    pub fn pid(&self) -> Option<ProcessId> {
        self.attachment.as_ref().map(|a| a.pid)
    }

    fn handle(&self) -> Option<&Handle> {
        self.attachment.as_ref().map(|a| &a.handle)
    }
}

fn region_from(mbi: &MEMORY_BASIC_INFORMATION) -> MemoryRegion {
    let state = match mbi.State {
        MEM_COMMIT => RegionState::Committed,
        MEM_RESERVE => RegionState::Reserved,
        _ => RegionState::Free,
    };
    let region_type = match mbi.Type {
        MEM_IMAGE => RegionType::Image,
        MEM_MAPPED => RegionType::Mapped,
        _ => RegionType::Private,
    };
    MemoryRegion::new(
        Address::new(mbi.BaseAddress as usize),
        mbi.RegionSize,
        mbi.Protect,
        state,
        region_type,
    )
}

impl ProcessMemory for WindowsProcess {
    fn is_attached(&self) -> bool {
        self.attachment.is_some()
    }

    fn pointer_width(&self) -> PointerWidth {
        self.attachment
            .as_ref()
            .map_or_else(PointerWidth::native, |a| a.pointer_width)
    }

    fn read_bytes(&self, address: Address, size: usize) -> Option<Vec<u8>> {
        let handle = self.handle()?;
        let mut buffer = vec![0u8; size];
        match unsafe { kernel32::read_process_memory(handle.raw(), address.as_usize(), &mut buffer) } {
            Ok(()) => Some(buffer),
            Err(err) => {
                debug!(address = %address, size, error = %err, "read failed");
                None
            }
        }
    }

    fn write_bytes(&self, address: Address, data: &[u8]) -> bool {
        let Some(handle) = self.handle() else {
            return false;
        };
        match unsafe { kernel32::write_process_memory(handle.raw(), address.as_usize(), data) } {
            Ok(()) => true,
            Err(err) => {
                debug!(address = %address, size = data.len(), error = %err, "write failed");
                false
            }
        }
    }

    fn list_regions(&self) -> Vec<MemoryRegion> {
        let Some(handle) = self.handle() else {
            return Vec::new();
        };

        let mut regions = Vec::new();
        let mut address = 0usize;
        while let Some(mbi) = unsafe { kernel32::virtual_query_ex(handle.raw(), address) } {
            let region = region_from(&mbi);
            let next = region.base_address.as_usize().checked_add(region.size);
            regions.push(region);
            match next {
                Some(next) if next > address => address = next,
                _ => break,
            }
        }
        regions
    }

    fn find_module(&self, name: &str) -> Option<ModuleInfo> {
        select_module(&self.modules(), name)
    }

    fn modules(&self) -> Vec<ModuleInfo> {
        let Some(handle) = self.handle() else {
            return Vec::new();
        };
        match unsafe { psapi::list_modules(handle.raw()) } {
            Ok(modules) => modules,
            Err(err) => {
                debug!(error = %err, "module enumeration failed");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_detached() {
        let process = WindowsProcess::new();
        assert!(!process.is_attached());
        assert!(process.list_regions().is_empty());
        assert!(process.read_bytes(Address::new(0x1000), 4).is_none());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_attach_to_current_process() {
        let value: u64 = 0x1122_3344_5566_7788;
        let address = Address::new(&value as *const u64 as usize);

        let mut process = WindowsProcess::new();
        process.attach(std::process::id()).unwrap();
        assert_eq!(process.pid(), Some(std::process::id()));
        assert_eq!(process.pointer_width(), PointerWidth::native());

        let bytes = process.read_bytes(address, 8).unwrap();
        assert_eq!(bytes, value.to_le_bytes().to_vec());

        assert!(process
            .list_regions()
            .iter()
            .any(|region| region.contains(address) && region.is_committed()));
        assert!(process.find_module("kernel32").is_some());

        process.detach();
        assert!(!process.is_attached());
    }

    #[test]
    #[cfg_attr(miri, ignore = "FFI not supported in Miri")]
    fn test_attach_invalid_pid() {
        let mut process = WindowsProcess::new();
        assert!(process.attach(0).is_err());
        assert!(!process.is_attached());
    }
}
