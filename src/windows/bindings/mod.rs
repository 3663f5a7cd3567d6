//! Windows API bindings
//!
//! Thin wrappers over the kernel32 and PSAPI calls the live backend needs.
//! Failures carry the `GetLastError` number so they classify into the
//! crate's error codes.

pub mod kernel32;
pub mod psapi;
