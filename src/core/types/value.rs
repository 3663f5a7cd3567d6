//! Numeric values searched for in target memory

use super::error::{MemoryError, MemoryResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a numeric match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int32,
    Int64,
    Float,
    Double,
}

impl DataType {
    /// Returns the size in bytes of the type
    pub const fn size(&self) -> usize {
        match self {
            DataType::Int32 | DataType::Float => 4,
            DataType::Int64 | DataType::Double => 8,
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            DataType::Int32 => "int32",
            DataType::Int64 => "int64",
            DataType::Float => "float",
            DataType::Double => "double",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed numeric target for the numeric search engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum NumericValue {
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl NumericValue {
    /// Classifies an integer: the signed 32-bit range selects `I32`,
    /// anything wider selects `I64`
    pub fn from_integer(value: i64) -> Self {
        match i32::try_from(value) {
            Ok(narrow) => NumericValue::I32(narrow),
            Err(_) => NumericValue::I64(value),
        }
    }

    /// Classifies an arbitrary number. Integral values follow
    /// [`NumericValue::from_integer`]; everything else is searched as a
    /// double.
    pub fn from_number(value: f64) -> Self {
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value < i64::MAX as f64
        {
            NumericValue::from_integer(value as i64)
        } else {
            NumericValue::F64(value)
        }
    }

    pub fn data_type(&self) -> DataType {
        match self {
            NumericValue::I32(_) => DataType::Int32,
            NumericValue::I64(_) => DataType::Int64,
            NumericValue::F32(_) => DataType::Float,
            NumericValue::F64(_) => DataType::Double,
        }
    }

    /// Little-endian encoding as stored in target memory
    pub fn to_le_bytes(&self) -> Vec<u8> {
        match self {
            NumericValue::I32(v) => v.to_le_bytes().to_vec(),
            NumericValue::I64(v) => v.to_le_bytes().to_vec(),
            NumericValue::F32(v) => v.to_le_bytes().to_vec(),
            NumericValue::F64(v) => v.to_le_bytes().to_vec(),
        }
    }

    /// Decodes a value of the given type from the start of `bytes`
    pub fn decode(bytes: &[u8], data_type: DataType) -> Option<Self> {
        let value = match data_type {
            DataType::Int32 => NumericValue::I32(i32::from_le_bytes(bytes.get(..4)?.try_into().ok()?)),
            DataType::Int64 => NumericValue::I64(i64::from_le_bytes(bytes.get(..8)?.try_into().ok()?)),
            DataType::Float => NumericValue::F32(f32::from_le_bytes(bytes.get(..4)?.try_into().ok()?)),
            DataType::Double => NumericValue::F64(f64::from_le_bytes(bytes.get(..8)?.try_into().ok()?)),
        };
        Some(value)
    }
}

impl TryFrom<&serde_json::Value> for NumericValue {
    type Error = MemoryError;

    fn try_from(value: &serde_json::Value) -> MemoryResult<Self> {
        let number = match value {
            serde_json::Value::Number(number) => number,
            other => {
                return Err(MemoryError::InvalidArgument(format!(
                    "Unsupported value type: {}",
                    json_type(other)
                )))
            }
        };

        if let Some(integer) = number.as_i64() {
            Ok(NumericValue::from_integer(integer))
        } else if let Some(float) = number.as_f64() {
            Ok(NumericValue::from_number(float))
        } else {
            Err(MemoryError::InvalidArgument(format!(
                "Unsupported numeric value: {}",
                number
            )))
        }
    }
}

fn json_type(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl fmt::Display for NumericValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericValue::I32(v) => write!(f, "{}", v),
            NumericValue::I64(v) => write!(f, "{}", v),
            NumericValue::F32(v) => write!(f, "{}", v),
            NumericValue::F64(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_classification() {
        assert_eq!(NumericValue::from_integer(1000), NumericValue::I32(1000));
        assert_eq!(
            NumericValue::from_integer(i32::MIN as i64),
            NumericValue::I32(i32::MIN)
        );
        assert_eq!(
            NumericValue::from_integer(i32::MAX as i64 + 1),
            NumericValue::I64(2_147_483_648)
        );
    }

    #[test]
    fn test_number_classification() {
        assert_eq!(NumericValue::from_number(42.0), NumericValue::I32(42));
        assert_eq!(NumericValue::from_number(3.5), NumericValue::F64(3.5));
        assert_eq!(
            NumericValue::from_number(5_000_000_000.0),
            NumericValue::I64(5_000_000_000)
        );
        assert!(matches!(
            NumericValue::from_number(f64::NAN),
            NumericValue::F64(_)
        ));
    }

    #[test]
    fn test_json_dispatch() {
        assert_eq!(
            NumericValue::try_from(&json!(100)).unwrap(),
            NumericValue::I32(100)
        );
        assert_eq!(
            NumericValue::try_from(&json!(-3_000_000_000i64)).unwrap(),
            NumericValue::I64(-3_000_000_000)
        );
        assert_eq!(
            NumericValue::try_from(&json!(1.25)).unwrap(),
            NumericValue::F64(1.25)
        );

        let err = NumericValue::try_from(&json!("100")).unwrap_err();
        assert!(err.to_string().contains("string"));
        assert!(NumericValue::try_from(&json!(null)).is_err());
    }

    #[test]
    fn test_encode_decode() {
        let value = NumericValue::I32(1000);
        let bytes = value.to_le_bytes();
        assert_eq!(bytes, vec![0xE8, 0x03, 0x00, 0x00]);
        assert_eq!(NumericValue::decode(&bytes, DataType::Int32), Some(value));
        assert_eq!(NumericValue::decode(&bytes, DataType::Int64), None);
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(DataType::Int32.size(), 4);
        assert_eq!(DataType::Double.size(), 8);
        assert_eq!(DataType::Float.to_string(), "float");
        assert_eq!(serde_json::to_value(DataType::Int64).unwrap(), "int64");
    }
}
