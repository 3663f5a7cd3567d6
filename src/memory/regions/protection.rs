//! Page protection flags

use crate::core::types::MemoryRegion;

/// Memory protection flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectionFlags {
    value: u32,
}

impl ProtectionFlags {
    // Protection constants
    pub const PAGE_NOACCESS: u32 = 0x01;
    pub const PAGE_READONLY: u32 = 0x02;
    pub const PAGE_READWRITE: u32 = 0x04;
    pub const PAGE_WRITECOPY: u32 = 0x08;
    pub const PAGE_EXECUTE: u32 = 0x10;
    pub const PAGE_EXECUTE_READ: u32 = 0x20;
    pub const PAGE_EXECUTE_READWRITE: u32 = 0x40;
    pub const PAGE_EXECUTE_WRITECOPY: u32 = 0x80;
    pub const PAGE_GUARD: u32 = 0x100;
    pub const PAGE_NOCACHE: u32 = 0x200;
    pub const PAGE_WRITECOMBINE: u32 = 0x400;

    pub const fn new(value: u32) -> Self {
        ProtectionFlags { value }
    }

    /// Check if protection allows reading
    pub fn is_readable(&self) -> bool {
        let base = self.value & 0xFF;
        base != 0 && base != Self::PAGE_NOACCESS && base != Self::PAGE_EXECUTE
    }

    /// Check if protection allows writing
    pub fn is_writable(&self) -> bool {
        (self.value
            & (Self::PAGE_READWRITE
                | Self::PAGE_WRITECOPY
                | Self::PAGE_EXECUTE_READWRITE
                | Self::PAGE_EXECUTE_WRITECOPY))
            != 0
    }

    /// Check if protection allows execution
    pub fn is_executable(&self) -> bool {
        (self.value
            & (Self::PAGE_EXECUTE
                | Self::PAGE_EXECUTE_READ
                | Self::PAGE_EXECUTE_READWRITE
                | Self::PAGE_EXECUTE_WRITECOPY))
            != 0
    }

    pub fn is_guard(&self) -> bool {
        (self.value & Self::PAGE_GUARD) != 0
    }

    fn format_string(&self) -> String {
        let base = match self.value & 0xFF {
            Self::PAGE_NOACCESS => "NOACCESS",
            Self::PAGE_READONLY => "R",
            Self::PAGE_READWRITE => "RW",
            Self::PAGE_WRITECOPY => "WC",
            Self::PAGE_EXECUTE => "X",
            Self::PAGE_EXECUTE_READ => "RX",
            Self::PAGE_EXECUTE_READWRITE => "RWX",
            Self::PAGE_EXECUTE_WRITECOPY => "WCX",
            0 => "-",
            _ => "UNKNOWN",
        };

        let mut flags = String::from(base);
        if self.is_guard() {
            flags.push_str("+G");
        }
        if (self.value & Self::PAGE_NOCACHE) != 0 {
            flags.push_str("+NC");
        }
        if (self.value & Self::PAGE_WRITECOMBINE) != 0 {
            flags.push_str("+WCB");
        }
        flags
    }
}

impl From<u32> for ProtectionFlags {
    fn from(value: u32) -> Self {
        ProtectionFlags::new(value)
    }
}

impl From<&MemoryRegion> for ProtectionFlags {
    fn from(region: &MemoryRegion) -> Self {
        ProtectionFlags::new(region.protection)
    }
}

impl std::fmt::Display for ProtectionFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.format_string())
    }
}
