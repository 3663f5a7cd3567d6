//! Result envelope returned across the safe-operation boundary

use super::error::{MemoryOperationError, MemoryResult};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

/// Either the data of a successful call or the classified error of a failed
/// one. Serializes as `{"success":true,"data":…}` or
/// `{"success":false,"error":…}`.
#[derive(Debug, Clone, PartialEq)]
pub enum SafeOperationResult<T> {
    Success(T),
    Failure(MemoryOperationError),
}

impl<T> SafeOperationResult<T> {
    /// Wraps an engine result, tagging failures with the operation name
    pub fn from_result(operation: &str, result: MemoryResult<T>) -> Self {
        match result {
            Ok(data) => SafeOperationResult::Success(data),
            Err(err) => SafeOperationResult::Failure(MemoryOperationError::new(operation, &err)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SafeOperationResult::Success(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            SafeOperationResult::Success(data) => Some(data),
            SafeOperationResult::Failure(_) => None,
        }
    }

    pub fn error(&self) -> Option<&MemoryOperationError> {
        match self {
            SafeOperationResult::Success(_) => None,
            SafeOperationResult::Failure(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, MemoryOperationError> {
        match self {
            SafeOperationResult::Success(data) => Ok(data),
            SafeOperationResult::Failure(err) => Err(err),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> SafeOperationResult<U> {
        match self {
            SafeOperationResult::Success(data) => SafeOperationResult::Success(f(data)),
            SafeOperationResult::Failure(err) => SafeOperationResult::Failure(err),
        }
    }
}

impl<T: Serialize> Serialize for SafeOperationResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("SafeOperationResult", 2)?;
        match self {
            SafeOperationResult::Success(data) => {
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
            }
            SafeOperationResult::Failure(err) => {
                state.serialize_field("success", &false)?;
                state.serialize_field("error", err)?;
            }
        }
        state.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{ErrorCode, MemoryError};

    #[test]
    fn test_success_envelope() {
        let result = SafeOperationResult::from_result("readMemory", Ok(vec![1u8, 2]));
        assert!(result.is_success());
        assert_eq!(result.data(), Some(&vec![1, 2]));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][1], 2);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_envelope() {
        let result: SafeOperationResult<u32> =
            SafeOperationResult::from_result("scanForPattern", Err(MemoryError::ProcessNotAttached));
        assert!(!result.is_success());
        let err = result.error().unwrap();
        assert_eq!(err.error_code, ErrorCode::ProcessNotAttached);
        assert_eq!(err.operation, "scanForPattern");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["errorCode"], "ProcessNotAttached");
        assert!(json.get("data").is_none());

        assert!(result.into_result().is_err());
    }

    #[test]
    fn test_map_keeps_failure() {
        let result: SafeOperationResult<u32> =
            SafeOperationResult::from_result("op", Err(MemoryError::InvalidSize("0".into())));
        let mapped = result.map(|v| v + 1);
        assert_eq!(mapped.error().unwrap().error_code, ErrorCode::InvalidSize);
    }
}
