//! Error types and the closed error-code taxonomy

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed classification every failure is mapped onto before it leaves the
/// safe-operation boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    ProcessNotFound = 1,
    AccessDenied = 2,
    InvalidAddress = 3,
    InvalidSize = 4,
    ReadMemoryFailed = 5,
    WriteMemoryFailed = 6,
    ScanningFailed = 7,
    ModuleNotFound = 8,
    InvalidPattern = 9,
    InsufficientPrivileges = 10,
    ProcessNotAttached = 11,
    UnknownError = 12,
}

impl ErrorCode {
    /// Stable numeric value of the code
    pub const fn as_u32(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// Windows system error numbers that carry a more precise classification.
const ERROR_ACCESS_DENIED: u32 = 5;
const ERROR_INVALID_ADDRESS: u32 = 487;
const ERROR_NOACCESS: u32 = 998;
const ERROR_PARTIAL_COPY: u32 = 299;
const ERROR_PRIVILEGE_NOT_HELD: u32 = 1314;

/// Main error type for memory operations
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid memory address: {0}")]
    InvalidAddress(String),

    #[error("Invalid size: {0}")]
    InvalidSize(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("No process attached")]
    ProcessNotAttached,

    #[error("Access denied to process {pid}: {reason}")]
    AccessDenied { pid: u32, reason: String },

    #[error("Failed to read memory at {address}: {reason}")]
    ReadFailed { address: String, reason: String },

    #[error("Failed to write memory at {address}: {reason}")]
    WriteFailed { address: String, reason: String },

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Invalid pattern format: {0}")]
    InvalidPattern(String),

    #[error("Pointer chain broken at level {level}: {reason}")]
    PointerChainBroken { level: usize, reason: String },

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Insufficient privileges: {0}")]
    InsufficientPrivileges(String),

    #[error("Windows API error {code}: {message}")]
    WindowsApi { code: u32, message: String },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Result type alias for memory operations
pub type MemoryResult<T> = Result<T, MemoryError>;

impl MemoryError {
    /// Creates an access denied error for a process
    pub fn access_denied(pid: u32, reason: impl Into<String>) -> Self {
        MemoryError::AccessDenied {
            pid,
            reason: reason.into(),
        }
    }

    /// Creates a read failed error
    pub fn read_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::ReadFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a write failed error
    pub fn write_failed(address: impl fmt::Display, reason: impl Into<String>) -> Self {
        MemoryError::WriteFailed {
            address: address.to_string(),
            reason: reason.into(),
        }
    }

    /// Creates a pointer chain broken error
    pub fn pointer_chain_broken(level: usize, reason: impl Into<String>) -> Self {
        MemoryError::PointerChainBroken {
            level,
            reason: reason.into(),
        }
    }

    /// Creates an error from a raw Windows error number
    pub fn windows_api(code: u32, message: impl Into<String>) -> Self {
        MemoryError::WindowsApi {
            code,
            message: message.into(),
        }
    }

    /// Classifies the error into the closed taxonomy
    pub fn code(&self) -> ErrorCode {
        match self {
            MemoryError::InvalidAddress(_) => ErrorCode::InvalidAddress,
            MemoryError::InvalidSize(_) | MemoryError::InvalidArgument(_) => ErrorCode::InvalidSize,
            MemoryError::ProcessNotFound(_) => ErrorCode::ProcessNotFound,
            MemoryError::ProcessNotAttached => ErrorCode::ProcessNotAttached,
            MemoryError::AccessDenied { .. } => ErrorCode::AccessDenied,
            MemoryError::ReadFailed { .. } | MemoryError::PointerChainBroken { .. } => {
                ErrorCode::ReadMemoryFailed
            }
            MemoryError::WriteFailed { .. } => ErrorCode::WriteMemoryFailed,
            MemoryError::ModuleNotFound(_) => ErrorCode::ModuleNotFound,
            MemoryError::InvalidPattern(_) => ErrorCode::InvalidPattern,
            MemoryError::ScanFailed(_) => ErrorCode::ScanningFailed,
            MemoryError::InsufficientPrivileges(_) => ErrorCode::InsufficientPrivileges,
            MemoryError::WindowsApi { code, .. } => match *code {
                ERROR_ACCESS_DENIED => ErrorCode::AccessDenied,
                ERROR_INVALID_ADDRESS | ERROR_NOACCESS => ErrorCode::InvalidAddress,
                ERROR_PARTIAL_COPY => ErrorCode::ReadMemoryFailed,
                ERROR_PRIVILEGE_NOT_HELD => ErrorCode::InsufficientPrivileges,
                _ => ErrorCode::UnknownError,
            },
            MemoryError::JsonError(_) | MemoryError::Unknown(_) => ErrorCode::UnknownError,
        }
    }

    /// OS error number carried by the error, if any
    pub fn native_code(&self) -> Option<u32> {
        match self {
            MemoryError::WindowsApi { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Serializable error record produced at the safe-operation boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryOperationError {
    pub message: String,
    pub error_code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub native_error_code: Option<u32>,
    pub operation: String,
}

impl MemoryOperationError {
    /// Builds an error record for a failed operation
    pub fn new(operation: impl Into<String>, error: &MemoryError) -> Self {
        MemoryOperationError {
            message: error.to_string(),
            error_code: error.code(),
            native_error_code: error.native_code(),
            operation: operation.into(),
        }
    }

    /// Message prefixed with the operation and suffixed with the OS error
    pub fn detailed_message(&self) -> String {
        let mut msg = format!("[{}] {}", self.operation, self.message);
        if let Some(code) = self.native_error_code {
            msg.push_str(&format!(" (Windows Error: {})", code));
        }
        msg
    }
}

impl fmt::Display for MemoryOperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detailed_message())
    }
}

impl std::error::Error for MemoryOperationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MemoryError::InvalidAddress("0xDEADBEEF".to_string());
        assert_eq!(err.to_string(), "Invalid memory address: 0xDEADBEEF");

        let err = MemoryError::access_denied(1234, "SeDebugPrivilege required");
        assert_eq!(
            err.to_string(),
            "Access denied to process 1234: SeDebugPrivilege required"
        );

        assert_eq!(
            MemoryError::ProcessNotAttached.to_string(),
            "No process attached"
        );
    }

    #[test]
    fn test_classification() {
        let cases: Vec<(MemoryError, ErrorCode)> = vec![
            (
                MemoryError::InvalidAddress("0x0".to_string()),
                ErrorCode::InvalidAddress,
            ),
            (
                MemoryError::InvalidSize("0".to_string()),
                ErrorCode::InvalidSize,
            ),
            (
                MemoryError::InvalidArgument("tolerance".to_string()),
                ErrorCode::InvalidSize,
            ),
            (
                MemoryError::ProcessNotFound("1".to_string()),
                ErrorCode::ProcessNotFound,
            ),
            (MemoryError::ProcessNotAttached, ErrorCode::ProcessNotAttached),
            (MemoryError::access_denied(1, "x"), ErrorCode::AccessDenied),
            (
                MemoryError::read_failed("0x10", "x"),
                ErrorCode::ReadMemoryFailed,
            ),
            (
                MemoryError::write_failed("0x10", "x"),
                ErrorCode::WriteMemoryFailed,
            ),
            (
                MemoryError::pointer_chain_broken(2, "x"),
                ErrorCode::ReadMemoryFailed,
            ),
            (
                MemoryError::ModuleNotFound("a.dll".to_string()),
                ErrorCode::ModuleNotFound,
            ),
            (
                MemoryError::InvalidPattern("GG".to_string()),
                ErrorCode::InvalidPattern,
            ),
            (
                MemoryError::ScanFailed("x".to_string()),
                ErrorCode::ScanningFailed,
            ),
            (
                MemoryError::InsufficientPrivileges("x".to_string()),
                ErrorCode::InsufficientPrivileges,
            ),
            (MemoryError::Unknown("x".to_string()), ErrorCode::UnknownError),
        ];

        for (error, expected) in cases {
            assert_eq!(error.code(), expected, "{}", error);
        }
    }

    #[test]
    fn test_windows_error_classification() {
        assert_eq!(
            MemoryError::windows_api(5, "denied").code(),
            ErrorCode::AccessDenied
        );
        assert_eq!(
            MemoryError::windows_api(487, "bad").code(),
            ErrorCode::InvalidAddress
        );
        assert_eq!(
            MemoryError::windows_api(998, "bad").code(),
            ErrorCode::InvalidAddress
        );
        assert_eq!(
            MemoryError::windows_api(299, "partial").code(),
            ErrorCode::ReadMemoryFailed
        );
        assert_eq!(
            MemoryError::windows_api(1314, "priv").code(),
            ErrorCode::InsufficientPrivileges
        );
        assert_eq!(
            MemoryError::windows_api(31, "other").code(),
            ErrorCode::UnknownError
        );
        assert_eq!(MemoryError::windows_api(5, "x").native_code(), Some(5));
        assert_eq!(MemoryError::ProcessNotAttached.native_code(), None);
    }

    #[test]
    fn test_operation_error() {
        let err = MemoryOperationError::new("readMemory", &MemoryError::windows_api(5, "denied"));
        assert_eq!(err.error_code, ErrorCode::AccessDenied);
        assert_eq!(err.native_error_code, Some(5));
        assert_eq!(
            err.detailed_message(),
            "[readMemory] Windows API error 5: denied (Windows Error: 5)"
        );

        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["errorCode"], "AccessDenied");
        assert_eq!(json["nativeErrorCode"], 5);
        assert_eq!(json["operation"], "readMemory");
    }

    #[test]
    fn test_error_code_numbers() {
        assert_eq!(ErrorCode::ProcessNotFound.as_u32(), 1);
        assert_eq!(ErrorCode::ProcessNotAttached.as_u32(), 11);
        assert_eq!(ErrorCode::UnknownError.as_u32(), 12);
        assert_eq!(ErrorCode::InvalidPattern.to_string(), "InvalidPattern");
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let mem_err: MemoryError = json_err.into();
        assert!(matches!(mem_err, MemoryError::JsonError(_)));
        assert_eq!(mem_err.code(), ErrorCode::UnknownError);
    }
}
