//! Module and pointer-width types describing the attached process

use super::Address;
use serde::{Deserialize, Serialize};

/// Native pointer size of the attached process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PointerWidth {
    Bits32,
    Bits64,
}

impl PointerWidth {
    /// Width of the host build
    pub const fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            PointerWidth::Bits64
        } else {
            PointerWidth::Bits32
        }
    }

    /// Size of one pointer cell in bytes
    pub const fn bytes(&self) -> usize {
        match self {
            PointerWidth::Bits32 => 4,
            PointerWidth::Bits64 => 8,
        }
    }

    /// Decodes a little-endian pointer cell. Returns `None` when the slice is
    /// shorter than one cell.
    pub fn read_cell(&self, bytes: &[u8]) -> Option<usize> {
        match self {
            PointerWidth::Bits32 => {
                let cell: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
                Some(u32::from_le_bytes(cell) as usize)
            }
            PointerWidth::Bits64 => {
                let cell: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
                usize::try_from(u64::from_le_bytes(cell)).ok()
            }
        }
    }
}

impl Default for PointerWidth {
    fn default() -> Self {
        PointerWidth::native()
    }
}

/// Information about a loaded module in a process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfo {
    pub name: String,
    pub base_address: Address,
    pub size: usize,
}

impl ModuleInfo {
    /// Creates a new ModuleInfo
    pub fn new(name: impl Into<String>, base_address: Address, size: usize) -> Self {
        ModuleInfo {
            name: name.into(),
            base_address,
            size,
        }
    }

    /// Gets the end address of the module
    pub fn end_address(&self) -> Address {
        Address::new(self.base_address.as_usize().saturating_add(self.size))
    }

    /// Checks if an address is within this module
    pub fn contains_address(&self, address: Address) -> bool {
        address >= self.base_address && address < self.end_address()
    }

    /// Checks if the span `[start, end)` lies entirely inside this module
    pub fn contains_span(&self, start: Address, end: Address) -> bool {
        start >= self.base_address && end <= self.end_address()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointer_width() {
        assert_eq!(PointerWidth::Bits32.bytes(), 4);
        assert_eq!(PointerWidth::Bits64.bytes(), 8);
        assert_eq!(
            PointerWidth::Bits32.read_cell(&[0x78, 0x56, 0x34, 0x12, 0xFF]),
            Some(0x12345678)
        );
        assert_eq!(PointerWidth::Bits64.read_cell(&[1, 0, 0, 0]), None);
        assert_eq!(
            PointerWidth::Bits64.read_cell(&[0x00, 0x10, 0, 0, 0, 0, 0, 0]),
            Some(0x1000)
        );
    }

    #[test]
    fn test_module_bounds() {
        let module = ModuleInfo::new("game.exe", Address::new(0x400000), 0x1000);
        assert_eq!(module.end_address(), Address::new(0x401000));
        assert!(module.contains_address(Address::new(0x400FFF)));
        assert!(!module.contains_address(Address::new(0x401000)));
        assert!(module.contains_span(Address::new(0x400000), Address::new(0x401000)));
        assert!(!module.contains_span(Address::new(0x400000), Address::new(0x401001)));
    }

    #[test]
    fn test_module_serialization() {
        let module = ModuleInfo::new("game.exe", Address::new(0x400000), 0x1000);
        let json = serde_json::to_value(&module).unwrap();
        assert_eq!(json["baseAddress"], "0x400000");
        assert_eq!(json["size"], 4096);
    }
}
