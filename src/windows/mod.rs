//! Windows implementation of the primitive layer
//!
//! [`WindowsProcess`] opens a process with `OpenProcess` and serves reads,
//! writes, region enumeration (`VirtualQueryEx`) and module enumeration
//! (PSAPI). All unsafe FFI calls are contained in [`bindings`].

pub mod bindings;
mod handle;
mod process;

pub use handle::Handle;
pub use process::WindowsProcess;
