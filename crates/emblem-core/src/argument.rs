//! Conversion targets
//!
//! An `Argument` is a target type plus its type parameters (`List<Integer>`
//! is `List` with one parameter). Element-wise conversions read the element
//! type from the first type parameter.

use std::fmt;

use crate::name::{names, TypeName};

/// A target type with optional type parameters and name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Argument {
    type_name: TypeName,
    type_parameters: Vec<Argument>,
    name: Option<String>,
}

impl Argument {
    /// Argument of a plain type
    pub fn of(type_name: impl Into<TypeName>) -> Self {
        Self {
            type_name: type_name.into(),
            type_parameters: Vec::new(),
            name: None,
        }
    }

    /// Argument of a generic type with type parameters
    pub fn generic(type_name: impl Into<TypeName>, type_parameters: Vec<Argument>) -> Self {
        Self {
            type_name: type_name.into(),
            type_parameters,
            name: None,
        }
    }

    /// The universal "any" target
    pub fn object() -> Self {
        Self::of(names::OBJECT)
    }

    /// `List<element>`
    pub fn list_of(element: Argument) -> Self {
        Self::generic(names::LIST, vec![element])
    }

    /// `element[]`
    pub fn array_of(element: &TypeName) -> Self {
        Self::of(element.array_of())
    }

    /// `Map<String, value>`
    pub fn map_of(value: Argument) -> Self {
        Self::generic(names::MAP, vec![Argument::of(names::STRING), value])
    }

    /// Attach a name (parameter or member name) for diagnostics
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The target type
    pub fn type_name(&self) -> &TypeName {
        &self.type_name
    }

    /// Type parameters
    pub fn type_parameters(&self) -> &[Argument] {
        &self.type_parameters
    }

    /// First type parameter, if any
    pub fn first_type_parameter(&self) -> Option<&Argument> {
        self.type_parameters.first()
    }

    /// Name, if any
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Same argument with a different target type
    pub fn with_type(&self, type_name: TypeName) -> Self {
        Self {
            type_name,
            type_parameters: self.type_parameters.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)?;
        if !self.type_parameters.is_empty() {
            write!(f, "<")?;
            for (i, param) in self.type_parameters.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", param)?;
            }
            write!(f, ">")?;
        }
        Ok(())
    }
}

impl From<&str> for Argument {
    fn from(name: &str) -> Self {
        Argument::of(name)
    }
}

impl From<TypeName> for Argument {
    fn from(name: TypeName) -> Self {
        Argument::of(name)
    }
}

impl From<&TypeName> for Argument {
    fn from(name: &TypeName) -> Self {
        Argument::of(name.clone())
    }
}
