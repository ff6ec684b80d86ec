//! Value and `DataType` definitions for ruql.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a host-registered type (see `DataContextBuilder::add_custom_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CustomTypeId(pub u32);

/// Types known to the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean.
    Bool,
    /// Unsigned 8-bit integer.
    Byte,
    /// Signed 8-bit integer.
    SByte,
    /// UTF-16 code unit.
    Char,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    UInt16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    UInt32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    UInt64,
    /// 32-bit floating point.
    Float32,
    /// 64-bit floating point.
    Float64,
    /// 128-bit decimal.
    Decimal,
    /// UTF-8 string.
    String,
    /// Top type; every value converts to it.
    Object,
    /// Type of the `NULL` literal; converts to every type.
    Null,
    /// Type of anything that failed to resolve.
    Unknown,
    /// Host-registered type.
    Custom(CustomTypeId),
}

impl DataType {
    /// Every built-in type a CAST can name.
    pub const BUILT_IN: [DataType; 15] = [
        DataType::Bool,
        DataType::Byte,
        DataType::SByte,
        DataType::Char,
        DataType::Int16,
        DataType::UInt16,
        DataType::Int32,
        DataType::UInt32,
        DataType::Int64,
        DataType::UInt64,
        DataType::Float32,
        DataType::Float64,
        DataType::Decimal,
        DataType::String,
        DataType::Object,
    ];

    /// Returns the name of the data type as used in query text.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Byte => "byte",
            DataType::SByte => "sbyte",
            DataType::Char => "char",
            DataType::Int16 => "short",
            DataType::UInt16 => "ushort",
            DataType::Int32 => "int",
            DataType::UInt32 => "uint",
            DataType::Int64 => "long",
            DataType::UInt64 => "ulong",
            DataType::Float32 => "float",
            DataType::Float64 => "double",
            DataType::Decimal => "decimal",
            DataType::String => "string",
            DataType::Object => "object",
            DataType::Null => "null",
            DataType::Unknown => "?",
            DataType::Custom(_) => "custom",
        }
    }

    /// Resolves a built-in type name (case-insensitive, with common aliases).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let data_type = match name.to_ascii_lowercase().as_str() {
            "bool" | "boolean" => DataType::Bool,
            "byte" => DataType::Byte,
            "sbyte" => DataType::SByte,
            "char" => DataType::Char,
            "short" | "int16" => DataType::Int16,
            "ushort" | "uint16" => DataType::UInt16,
            "int" | "int32" => DataType::Int32,
            "uint" | "uint32" => DataType::UInt32,
            "long" | "int64" => DataType::Int64,
            "ulong" | "uint64" => DataType::UInt64,
            "float" | "single" => DataType::Float32,
            "double" => DataType::Float64,
            "decimal" => DataType::Decimal,
            "string" => DataType::String,
            "object" => DataType::Object,
            _ => return None,
        };
        Some(data_type)
    }

    /// Returns whether this type is an integral type (char excluded).
    #[must_use]
    pub fn is_integral(&self) -> bool {
        self.is_signed_integral() || self.is_unsigned_integral()
    }

    #[must_use]
    pub fn is_signed_integral(&self) -> bool {
        matches!(
            self,
            DataType::SByte | DataType::Int16 | DataType::Int32 | DataType::Int64
        )
    }

    #[must_use]
    pub fn is_unsigned_integral(&self) -> bool {
        matches!(
            self,
            DataType::Byte | DataType::UInt16 | DataType::UInt32 | DataType::UInt64
        )
    }

    /// Returns whether this type is numeric (integral, floating or decimal).
    #[must_use]
    pub fn is_numeric(&self) -> bool {
        self.is_integral()
            || matches!(
                self,
                DataType::Float32 | DataType::Float64 | DataType::Decimal
            )
    }

    /// Returns whether values of this type have a total order usable by ORDER BY.
    #[must_use]
    pub fn is_orderable(&self) -> bool {
        self.is_numeric() || matches!(self, DataType::Char | DataType::String | DataType::Bool)
    }

    /// Returns whether this is the type of an unresolved expression.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, DataType::Unknown)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Custom(CustomTypeId(id)) => write!(f, "custom#{id}"),
            other => f.write_str(other.name()),
        }
    }
}

/// Literal value container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 32-bit signed integer value.
    Int32(i32),
    /// 64-bit signed integer value.
    Int64(i64),
    /// 64-bit floating point value.
    Float64(f64),
    /// Boolean value.
    Bool(bool),
    /// String value.
    String(String),
    /// Null value.
    Null,
}

// Manual Hash implementation because f64 doesn't implement Hash
impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Int32(v) => v.hash(state),
            Value::Int64(v) => v.hash(state),
            Value::Float64(v) => v.to_bits().hash(state),
            Value::Bool(v) => v.hash(state),
            Value::String(v) => v.hash(state),
            Value::Null => {}
        }
    }
}

// Manual Eq implementation because f64 doesn't implement Eq
impl Eq for Value {}

impl Value {
    /// Attempts to extract an i64 value, widening 32-bit integers.
    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(i64::from(*i)),
            Value::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Attempts to extract an f64 value, widening integers.
    #[must_use]
    pub fn as_float64(&self) -> Option<f64> {
        match self {
            Value::Float64(f) => Some(*f),
            Value::Int32(i) => Some(f64::from(*i)),
            #[allow(clippy::cast_precision_loss)]
            Value::Int64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Returns the data type of this value; `NULL` has type [`DataType::Null`].
    #[must_use]
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::Bool(_) => DataType::Bool,
            Value::String(_) => DataType::String,
            Value::Null => DataType::Null,
        }
    }

    /// Compares two values using SQL null semantics.
    ///
    /// Integers compare across widths and against floats. Returns None if
    /// either value is null or the types are not comparable.
    #[must_use]
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Int32(_) | Value::Int64(_), Value::Int32(_) | Value::Int64(_)) => {
                Some(self.as_int64()?.cmp(&other.as_int64()?))
            }
            (
                Value::Int32(_) | Value::Int64(_) | Value::Float64(_),
                Value::Int32(_) | Value::Int64(_) | Value::Float64(_),
            ) => self.as_float64()?.partial_cmp(&other.as_float64()?),
            // Null or type mismatch
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v:?}"),
            Value::Bool(true) => f.write_str("TRUE"),
            Value::Bool(false) => f.write_str("FALSE"),
            Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Value::Null => f.write_str("NULL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names_roundtrip() {
        for data_type in DataType::BUILT_IN {
            assert_eq!(DataType::from_name(data_type.name()), Some(data_type));
        }
        assert_eq!(DataType::from_name("SINGLE"), Some(DataType::Float32));
        assert_eq!(DataType::from_name("Int64"), Some(DataType::Int64));
        assert_eq!(DataType::from_name("varchar"), None);
    }

    #[test]
    fn test_integral_classification() {
        assert!(DataType::SByte.is_signed_integral());
        assert!(DataType::UInt64.is_unsigned_integral());
        assert!(!DataType::Char.is_integral());
        assert!(DataType::Decimal.is_numeric());
        assert!(!DataType::String.is_numeric());
    }

    #[test]
    fn test_compare_mixed_numeric() {
        assert_eq!(Value::Int32(3).compare(&Value::Int64(3)), Some(Ordering::Equal));
        assert_eq!(Value::Int32(2).compare(&Value::Float64(2.5)), Some(Ordering::Less));
        assert_eq!(Value::Null.compare(&Value::Int32(1)), None);
        assert_eq!(Value::String("a".into()).compare(&Value::Int32(1)), None);
    }

    #[test]
    fn test_value_display_quotes_strings() {
        assert_eq!(Value::String("it's".into()).to_string(), "'it''s'");
        assert_eq!(Value::Float64(3.0).to_string(), "3.0");
        assert_eq!(Value::Null.to_string(), "NULL");
    }
}
