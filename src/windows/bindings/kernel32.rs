//! Kernel32.dll bindings for process and memory operations

use crate::core::types::{MemoryError, MemoryResult};
use std::mem;
use winapi::shared::minwindef::{BOOL, FALSE, LPCVOID, LPVOID};
use winapi::um::errhandlingapi::GetLastError;
use winapi::um::handleapi::CloseHandle;
use winapi::um::memoryapi::{ReadProcessMemory, VirtualQueryEx, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::winnt::{HANDLE, MEMORY_BASIC_INFORMATION};
use winapi::um::wow64apiset::IsWow64Process;

/// Builds a classified error from `GetLastError`
pub fn last_error(context: &str) -> MemoryError {
    let code = unsafe { GetLastError() };
    MemoryError::windows_api(code, context)
}

/// Safe wrapper for OpenProcess
pub fn open_process(pid: u32, desired_access: u32) -> MemoryResult<HANDLE> {
    unsafe {
        let handle = OpenProcess(desired_access, FALSE, pid);
        if handle.is_null() {
            Err(last_error(&format!("OpenProcess failed for PID {}", pid)))
        } else {
            Ok(handle)
        }
    }
}

/// Safe wrapper for CloseHandle
///
/// # Safety
/// The handle must be a valid Windows handle
pub unsafe fn close_handle(handle: HANDLE) -> MemoryResult<()> {
    if handle.is_null() {
        return Ok(());
    }

    if CloseHandle(handle) == FALSE {
        Err(last_error("CloseHandle failed"))
    } else {
        Ok(())
    }
}

/// Reads exactly `buffer.len()` bytes; a partial copy is an error
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_READ`
pub unsafe fn read_process_memory(handle: HANDLE, address: usize, buffer: &mut [u8]) -> MemoryResult<()> {
    let mut bytes_read = 0;

    let result = ReadProcessMemory(
        handle,
        address as LPCVOID,
        buffer.as_mut_ptr() as LPVOID,
        buffer.len(),
        &mut bytes_read,
    );

    if result == FALSE || bytes_read != buffer.len() {
        Err(last_error(&format!("ReadProcessMemory failed at 0x{:X}", address)))
    } else {
        Ok(())
    }
}

/// Writes all of `data`; a partial copy is an error
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_VM_WRITE`
pub unsafe fn write_process_memory(handle: HANDLE, address: usize, data: &[u8]) -> MemoryResult<()> {
    let mut bytes_written = 0;

    let result = WriteProcessMemory(
        handle,
        address as LPVOID,
        data.as_ptr() as LPCVOID,
        data.len(),
        &mut bytes_written,
    );

    if result == FALSE || bytes_written != data.len() {
        Err(last_error(&format!("WriteProcessMemory failed at 0x{:X}", address)))
    } else {
        Ok(())
    }
}

/// Queries the region containing `address`; `None` past the top of the
/// address space
///
/// # Safety
/// The handle must be a valid process handle with `PROCESS_QUERY_INFORMATION`
pub unsafe fn virtual_query_ex(handle: HANDLE, address: usize) -> Option<MEMORY_BASIC_INFORMATION> {
    let mut mbi: MEMORY_BASIC_INFORMATION = mem::zeroed();

    let result = VirtualQueryEx(
        handle,
        address as LPCVOID,
        &mut mbi,
        mem::size_of::<MEMORY_BASIC_INFORMATION>(),
    );

    (result == mem::size_of::<MEMORY_BASIC_INFORMATION>()).then_some(mbi)
}

/// Whether the process runs under WOW64 (a 32-bit process on 64-bit Windows)
///
/// # Safety
/// The handle must be a valid process handle
pub unsafe fn is_wow64_process(handle: HANDLE) -> MemoryResult<bool> {
    let mut wow64: BOOL = FALSE;
    if IsWow64Process(handle, &mut wow64) == FALSE {
        return Err(last_error("IsWow64Process failed"));
    }
    Ok(wow64 != FALSE)
}
