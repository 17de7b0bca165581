//! Raw and clean record representations shared by the decoder, transformer,
//! and materializer.

use rmpv::Value as MsgpackValue;

use crate::schema::ScalarType;

/// A single decoded, type-checked value in a raw record. Deliberately a
/// closed set matching [`ScalarType`] rather than the full `rmpv::Value`
/// surface: the decoder has already validated each field against its
/// schema-declared type by the time a `RawValue` exists.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// Absent (right-padded, or an optional field with no value).
    Null,
    /// A signed 64-bit integer.
    Int(i64),
    /// A floating-point number.
    Float(f64),
    /// A UTF-8 string.
    Str(String),
    /// A boolean.
    Bool(bool),
}

impl RawValue {
    /// The raw integer this value carries, if it is a non-null integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RawValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// `true` if this value is [`RawValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// Validates and converts a decoded msgpack value against a declared
    /// scalar type, returning `None` on a type mismatch.
    pub fn from_msgpack(value: &MsgpackValue, scalar_type: ScalarType) -> Option<Self> {
        if value.is_nil() {
            return Some(RawValue::Null);
        }
        match scalar_type {
            ScalarType::Int => value.as_i64().map(RawValue::Int),
            ScalarType::Float => value
                .as_f64()
                .map(RawValue::Float)
                .or_else(|| value.as_i64().map(|i| RawValue::Float(i as f64))),
            ScalarType::Str => value.as_str().map(|s| RawValue::Str(s.to_owned())),
            ScalarType::Bool => value.as_bool().map(RawValue::Bool),
        }
    }
}

/// A decoded, schema-validated raw record: an ordered name→value mapping
/// whose keys follow the raw schema's field order.
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// The aspect this record belongs to.
    pub aspect: &'static str,
    /// Field values, in raw schema order.
    pub fields: Vec<(&'static str, RawValue)>,
}

impl RawRecord {
    /// Looks up a field's value by name.
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}

/// A single value in a clean record, after dequantization and/or enum
/// interning.
#[derive(Debug, Clone, PartialEq)]
pub enum CleanValue {
    /// Absent.
    Null,
    /// A signed 64-bit integer.
    Int(i64),
    /// A 64-bit float, either a pass-through float or a dequantized value.
    Float(f64),
    /// A UTF-8 string.
    Str(String),
    /// A boolean.
    Bool(bool),
    /// An interned enum member's symbolic name.
    Enum(&'static str),
}

impl CleanValue {
    /// `true` if this value is [`CleanValue::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, CleanValue::Null)
    }

    /// The value as `f64`, coercing `Int`. Used by the materializer and
    /// contract engine, which both treat numeric clean fields uniformly.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CleanValue::Float(v) => Some(*v),
            CleanValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// The value as `i64`, without coercion.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CleanValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// A transformed record: the clean-schema counterpart of a [`RawRecord`].
#[derive(Debug, Clone)]
pub struct CleanRecord {
    /// The aspect this record belongs to.
    pub aspect: &'static str,
    /// Field values, in clean schema order.
    pub fields: Vec<(&'static str, CleanValue)>,
}

impl CleanRecord {
    /// Looks up a field's value by name.
    pub fn get(&self, name: &str) -> Option<&CleanValue> {
        self.fields.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }
}
