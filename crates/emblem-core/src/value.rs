//! Dynamic values
//!
//! `Value` is the tagged union every attribute value and every conversion
//! input/output is expressed in. It carries only data: type references are
//! names, nested metadata is an `AnnotationValue`, and host objects are
//! opaque payloads tagged with a type name.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::annotation::AnnotationValue;
use crate::name::{names, TypeName};

/// A constant of an enum type
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnumConstant {
    /// Enum type
    pub type_name: TypeName,
    /// Constant name
    pub name: String,
}

impl EnumConstant {
    /// Create an enum constant
    pub fn new(type_name: impl Into<TypeName>, name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            name: name.into(),
        }
    }
}

/// A typed array (`component[]`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    /// Component type
    pub component: TypeName,
    /// Elements in order
    pub items: Vec<Value>,
}

/// Opaque host value tagged with its type name
#[derive(Clone)]
pub struct ObjectValue {
    /// Runtime type of the payload
    pub type_name: TypeName,
    payload: Arc<dyn Any + Send + Sync>,
}

impl ObjectValue {
    /// Wrap a host value
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<TypeName>, payload: T) -> Self {
        Self {
            type_name: type_name.into(),
            payload: Arc::new(payload),
        }
    }

    /// Borrow the payload as a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for ObjectValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectValue")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ObjectValue {
    fn eq(&self, other: &Self) -> bool {
        self.type_name == other.type_name && Arc::ptr_eq(&self.payload, &other.payload)
    }
}

/// A dynamic value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Character
    Char(char),
    /// 8-bit integer
    Byte(i8),
    /// 16-bit integer
    Short(i16),
    /// 32-bit integer
    Int(i32),
    /// 64-bit integer
    Long(i64),
    /// 32-bit float
    Float(f32),
    /// 64-bit float
    Double(f64),
    /// String
    String(String),
    /// Enum constant
    Enum(EnumConstant),
    /// Lazily-resolvable type reference
    Class(TypeName),
    /// Nested declarative metadata value
    Annotation(AnnotationValue),
    /// Typed array
    Array(ArrayValue),
    /// Ordered list
    List(Vec<Value>),
    /// String-keyed map preserving insertion order
    Map(IndexMap<String, Value>),
    /// Calendar date
    Date(NaiveDate),
    /// Calendar date and time
    DateTime(NaiveDateTime),
    /// Elapsed time
    Duration(Duration),
    /// Opaque host value (not serializable)
    #[serde(skip)]
    Object(ObjectValue),
}

impl Value {
    /// Create a string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Create a `String[]` value
    pub fn string_array<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::array(
            TypeName::new(names::STRING),
            items.into_iter().map(|s| Value::String(s.into())).collect(),
        )
    }

    /// Create a typed array value
    pub fn array(component: impl Into<TypeName>, items: Vec<Value>) -> Self {
        Value::Array(ArrayValue {
            component: component.into(),
            items,
        })
    }

    /// Create an enum constant value
    pub fn enum_constant(type_name: impl Into<TypeName>, name: impl Into<String>) -> Self {
        Value::Enum(EnumConstant::new(type_name, name))
    }

    /// Create a type reference value
    pub fn class(type_name: impl Into<TypeName>) -> Self {
        Value::Class(type_name.into())
    }

    /// Canonical runtime type of this value
    pub fn type_name(&self) -> TypeName {
        match self {
            Value::Bool(_) => TypeName::new(names::BOOLEAN),
            Value::Char(_) => TypeName::new(names::CHARACTER),
            Value::Byte(_) => TypeName::new(names::BYTE),
            Value::Short(_) => TypeName::new(names::SHORT),
            Value::Int(_) => TypeName::new(names::INTEGER),
            Value::Long(_) => TypeName::new(names::LONG),
            Value::Float(_) => TypeName::new(names::FLOAT),
            Value::Double(_) => TypeName::new(names::DOUBLE),
            Value::String(_) => TypeName::new(names::STRING),
            Value::Enum(constant) => constant.type_name.clone(),
            Value::Class(_) => TypeName::new(names::CLASS),
            Value::Annotation(_) => TypeName::new(names::ANNOTATION),
            Value::Array(array) => array.component.array_of(),
            Value::List(_) => TypeName::new(names::LIST),
            Value::Map(_) => TypeName::new(names::MAP),
            Value::Date(_) => TypeName::new(names::LOCAL_DATE),
            Value::DateTime(_) => TypeName::new(names::LOCAL_DATE_TIME),
            Value::Duration(_) => TypeName::new(names::DURATION),
            Value::Object(object) => object.type_name.clone(),
        }
    }

    /// Lists and maps always convert element-wise, even to an assignable target
    pub fn is_container(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_))
    }

    /// Lists, maps and arrays
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, Value::List(_) | Value::Map(_) | Value::Array(_))
    }

    /// Elements of a list or array
    pub fn items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            Value::Array(array) => Some(&array.items),
            _ => None,
        }
    }

    /// Consume into elements of a list or array
    pub fn into_items(self) -> Result<Vec<Value>, Value> {
        match self {
            Value::List(items) => Ok(items),
            Value::Array(array) => Ok(array.items),
            other => Err(other),
        }
    }

    /// Unwrap a single-element list or array to its element
    pub fn unwrap_single(self) -> Value {
        match self {
            Value::List(mut items) if items.len() == 1 => items.remove(0),
            Value::Array(mut array) if array.items.len() == 1 => array.items.remove(0),
            other => other,
        }
    }

    /// Borrow as a string slice (strings only)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Read as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Read any integral value as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Read any numeric value as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Check if this is a numeric value
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            Value::Byte(_)
                | Value::Short(_)
                | Value::Int(_)
                | Value::Long(_)
                | Value::Float(_)
                | Value::Double(_)
        )
    }

    /// Borrow as a nested annotation
    pub fn as_annotation(&self) -> Option<&AnnotationValue> {
        match self {
            Value::Annotation(av) => Some(av),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", v),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Enum(constant) => f.write_str(&constant.name),
            Value::Class(name) => write!(f, "{}", name),
            Value::Annotation(av) => write!(f, "{}", av),
            Value::Array(array) => write_items(f, &array.items),
            Value::List(items) => write_items(f, items),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, "}}")
            }
            Value::Date(date) => write!(f, "{}", date),
            Value::DateTime(dt) => write!(f, "{}", dt),
            Value::Duration(d) => write!(f, "{:?}", d),
            Value::Object(object) => write!(f, "{}", object.type_name),
        }
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    write!(f, "[")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    write!(f, "]")
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<AnnotationValue> for Value {
    fn from(v: AnnotationValue) -> Self {
        Value::Annotation(v)
    }
}

impl From<Duration> for Value {
    fn from(v: Duration) -> Self {
        Value::Duration(v)
    }
}
