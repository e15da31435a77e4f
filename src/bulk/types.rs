//! Property maps, wire type tags, and classified values.

use std::fmt;

use serde_json::{Map, Value};

/// Property map as supplied by callers; iteration order is declaration order.
pub type Properties = Map<String, Value>;

/// Wire type of a property value. The discriminant is the tag byte on the wire.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum PropertyType {
    /// Absent or empty value.
    Null = 0,
    /// Boolean value.
    Bool = 1,
    /// 64-bit floating point number.
    Double = 2,
    /// NUL-terminated UTF-8 string.
    String = 3,
    /// 64-bit signed integer.
    Long = 4,
    /// Counted sequence of values.
    Array = 5,
}

impl PropertyType {
    /// Tag byte written before the value payload.
    pub const fn tag(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::Null => "null",
            PropertyType::Bool => "bool",
            PropertyType::Double => "double",
            PropertyType::String => "string",
            PropertyType::Long => "long",
            PropertyType::Array => "array",
        };
        f.write_str(name)
    }
}

/// Property value after classification, ready to encode.
#[derive(Clone, Debug, PartialEq)]
pub enum PropValue {
    /// Null value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit floating point number.
    Double(f64),
    /// Owned string.
    Str(String),
    /// 64-bit signed integer.
    Long(i64),
    /// Array of classified values.
    Array(Vec<PropValue>),
}

impl PropValue {
    /// Wire type of this value.
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropValue::Null => PropertyType::Null,
            PropValue::Bool(_) => PropertyType::Bool,
            PropValue::Double(_) => PropertyType::Double,
            PropValue::Str(_) => PropertyType::String,
            PropValue::Long(_) => PropertyType::Long,
            PropValue::Array(_) => PropertyType::Array,
        }
    }

    /// Classifies a JSON value into its wire representation.
    pub fn classify(value: &Value) -> PropValue {
        super::props::classify_value(value)
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => write!(f, "null"),
            PropValue::Bool(v) => write!(f, "{v}"),
            PropValue::Double(v) => write!(f, "{v}"),
            PropValue::Str(v) => write!(f, "{v}"),
            PropValue::Long(v) => write!(f, "{v}"),
            PropValue::Array(items) => write!(f, "array(len={})", items.len()),
        }
    }
}

impl From<&Value> for PropValue {
    fn from(value: &Value) -> Self {
        PropValue::classify(value)
    }
}
