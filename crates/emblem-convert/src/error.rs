//! Conversion errors

use emblem_core::{TypeName, Value};
use thiserror::Error;

/// Why a single conversion attempt was rejected
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConversionErrorKind {
    /// Text could not be parsed into the target
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// A multi-valued source was converted to a single-valued target
    #[error("expected a single value but found {0}")]
    MultipleValues(usize),

    /// No enum constant matched
    #[error("no constant named {constant}")]
    UnknownEnumConstant {
        /// The rejected constant name
        constant: String,
    },

    /// A type reference named an unknown type
    #[error("unknown type {0}")]
    UnknownType(String),

    /// The value does not fit the target type
    #[error("value out of range")]
    OutOfRange,

    /// No converter is registered for the source and target
    #[error("no converter registered")]
    NoConverter,
}

/// A rejected conversion: the raw value, the requested target and the cause
#[derive(Debug, Clone, Error, PartialEq)]
#[error("cannot convert '{value}' to {target}: {kind}")]
pub struct ConversionError {
    /// The rejected raw value
    pub value: Value,
    /// The requested target type
    pub target: TypeName,
    /// The cause
    pub kind: ConversionErrorKind,
}

impl ConversionError {
    /// Create a conversion error
    pub fn new(value: Value, target: TypeName, kind: ConversionErrorKind) -> Self {
        Self {
            value,
            target,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_names_value_and_target() {
        let err = ConversionError::new(
            Value::string("abc"),
            TypeName::new("Integer"),
            ConversionErrorKind::InvalidFormat("invalid digit found in string".into()),
        );
        assert_eq!(
            err.to_string(),
            "cannot convert 'abc' to Integer: invalid format: invalid digit found in string"
        );
    }
}
