//! PSAPI.dll bindings for module enumeration

use super::kernel32::last_error;
use crate::core::types::{Address, MemoryError, MemoryResult, ModuleInfo};
use std::ffi::OsString;
use std::os::windows::ffi::OsStringExt;
use winapi::shared::minwindef::{DWORD, FALSE, HMODULE, MAX_PATH};
use winapi::um::psapi::{EnumProcessModules, GetModuleBaseNameW, GetModuleInformation, MODULEINFO};
use winapi::um::winnt::HANDLE;

/// Safe wrapper for EnumProcessModules; grows the buffer until every module
/// handle fits
///
/// # Safety
/// The handle must be a valid process handle
pub unsafe fn enum_process_modules(handle: HANDLE) -> MemoryResult<Vec<HMODULE>> {
    let mut modules: Vec<HMODULE> = vec![std::ptr::null_mut(); 256];

    loop {
        let capacity = (modules.len() * std::mem::size_of::<HMODULE>()) as DWORD;
        let mut bytes_needed: DWORD = 0;

        if EnumProcessModules(handle, modules.as_mut_ptr(), capacity, &mut bytes_needed) == FALSE {
            return Err(last_error("EnumProcessModules failed"));
        }

        let count = bytes_needed as usize / std::mem::size_of::<HMODULE>();
        if count <= modules.len() {
            modules.truncate(count);
            return Ok(modules);
        }
        modules.resize(count, std::ptr::null_mut());
    }
}

/// Safe wrapper for GetModuleInformation
///
/// # Safety
/// The handle must be a valid process handle and module must be valid
pub unsafe fn get_module_information(handle: HANDLE, module: HMODULE) -> MemoryResult<MODULEINFO> {
    let mut info = MODULEINFO {
        lpBaseOfDll: std::ptr::null_mut(),
        SizeOfImage: 0,
        EntryPoint: std::ptr::null_mut(),
    };

    let result = GetModuleInformation(
        handle,
        module,
        &mut info,
        std::mem::size_of::<MODULEINFO>() as DWORD,
    );

    if result == FALSE {
        return Err(last_error("GetModuleInformation failed"));
    }

    Ok(info)
}

/// Safe wrapper for GetModuleBaseNameW
///
/// # Safety
/// The handle must be a valid process handle and module must be valid
pub unsafe fn get_module_base_name(handle: HANDLE, module: HMODULE) -> MemoryResult<String> {
    let mut buffer = vec![0u16; MAX_PATH];

    let length = GetModuleBaseNameW(handle, module, buffer.as_mut_ptr(), MAX_PATH as DWORD);
    if length == 0 {
        return Err(last_error("GetModuleBaseNameW failed"));
    }

    buffer.truncate(length as usize);
    OsString::from_wide(&buffer)
        .into_string()
        .map_err(|_| MemoryError::Unknown("module name is not valid UTF-16".to_string()))
}

/// Every module loaded in the process. Modules whose details cannot be
/// queried are skipped.
///
/// # Safety
/// The handle must be a valid process handle with query and read access
pub unsafe fn list_modules(handle: HANDLE) -> MemoryResult<Vec<ModuleInfo>> {
    let modules = enum_process_modules(handle)?;

    Ok(modules
        .into_iter()
        .filter_map(|module| {
            let info = get_module_information(handle, module).ok()?;
            let name = get_module_base_name(handle, module).ok()?;
            Some(ModuleInfo::new(
                name,
                Address::new(info.lpBaseOfDll as usize),
                info.SizeOfImage as usize,
            ))
        })
        .collect())
}
