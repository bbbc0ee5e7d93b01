//! Typed extraction from dynamic values
//!
//! Implement `FromValue` to make a Rust type a conversion target: the
//! conversion engine converts to `argument()` and `from_value` unwraps the
//! matching variant.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use crate::annotation::AnnotationValue;
use crate::argument::Argument;
use crate::name::{names, TypeName};
use crate::value::Value;

/// Extract a Rust value from a converted `Value`
pub trait FromValue: Sized {
    /// The conversion target for this type
    fn argument() -> Argument;

    /// Unwrap a value already converted to `argument()`
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! from_value_variant {
    ($ty:ty, $name:expr, $variant:ident) => {
        impl FromValue for $ty {
            fn argument() -> Argument {
                Argument::of($name)
            }

            fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

from_value_variant!(bool, names::BOOLEAN, Bool);
from_value_variant!(char, names::CHARACTER, Char);
from_value_variant!(i8, names::BYTE, Byte);
from_value_variant!(i16, names::SHORT, Short);
from_value_variant!(i32, names::INTEGER, Int);
from_value_variant!(i64, names::LONG, Long);
from_value_variant!(f32, names::FLOAT, Float);
from_value_variant!(f64, names::DOUBLE, Double);
from_value_variant!(String, names::STRING, String);
from_value_variant!(TypeName, names::CLASS, Class);
from_value_variant!(Duration, names::DURATION, Duration);
from_value_variant!(NaiveDate, names::LOCAL_DATE, Date);
from_value_variant!(NaiveDateTime, names::LOCAL_DATE_TIME, DateTime);
from_value_variant!(AnnotationValue, names::ANNOTATION, Annotation);

impl FromValue for Value {
    fn argument() -> Argument {
        Argument::object()
    }

    fn from_value(value: Value) -> Option<Self> {
        Some(value)
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn argument() -> Argument {
        Argument::list_of(T::argument())
    }

    fn from_value(value: Value) -> Option<Self> {
        value
            .into_items()
            .ok()?
            .into_iter()
            .map(T::from_value)
            .collect()
    }
}
