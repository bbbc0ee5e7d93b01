//! Type descriptors
//!
//! A `TypeDescriptor` is the minimal shape of a type needed for conversion
//! dispatch and metadata queries: its kind, nominal supertypes, and for
//! enums the declared constants. No live type handles are ever held.

use std::fmt;

use crate::name::TypeName;

/// Kind of a described type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    /// Primitive value type (`int`, `boolean`, ...)
    Primitive,
    /// Concrete or abstract class
    Class,
    /// Interface
    Interface,
    /// Enum type with a fixed set of constants
    Enum,
    /// Declarative metadata (annotation) type
    Annotation,
}

impl fmt::Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Primitive => write!(f, "primitive"),
            TypeKind::Class => write!(f, "class"),
            TypeKind::Interface => write!(f, "interface"),
            TypeKind::Enum => write!(f, "enum"),
            TypeKind::Annotation => write!(f, "annotation"),
        }
    }
}

/// Nominal description of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// Type name
    pub name: TypeName,
    /// Type kind
    pub kind: TypeKind,
    /// Parent class (if any)
    pub superclass: Option<TypeName>,
    /// Implemented (or, for interfaces, extended) interfaces in declaration order
    pub interfaces: Vec<TypeName>,
    /// Enum constants in declaration order (enums only)
    pub enum_constants: Vec<String>,
}

impl TypeDescriptor {
    fn with_kind(name: impl Into<TypeName>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            superclass: None,
            interfaces: Vec::new(),
            enum_constants: Vec::new(),
        }
    }

    /// Describe a class
    pub fn class(name: impl Into<TypeName>) -> Self {
        Self::with_kind(name, TypeKind::Class)
    }

    /// Describe an interface
    pub fn interface(name: impl Into<TypeName>) -> Self {
        Self::with_kind(name, TypeKind::Interface)
    }

    /// Describe a primitive
    pub fn primitive(name: impl Into<TypeName>) -> Self {
        Self::with_kind(name, TypeKind::Primitive)
    }

    /// Describe an annotation type
    pub fn annotation(name: impl Into<TypeName>) -> Self {
        Self::with_kind(name, TypeKind::Annotation)
            .implements(crate::names::ANNOTATION)
    }

    /// Describe an enum with its constants
    pub fn enumeration<I, S>(name: impl Into<TypeName>, constants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut desc = Self::with_kind(name, TypeKind::Enum).extends(crate::names::ENUM);
        desc.enum_constants = constants.into_iter().map(Into::into).collect();
        desc
    }

    /// Set the parent class
    pub fn extends(mut self, superclass: impl Into<TypeName>) -> Self {
        self.superclass = Some(superclass.into());
        self
    }

    /// Add an implemented interface
    pub fn implements(mut self, interface: impl Into<TypeName>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    /// Check if this is an interface
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    /// Check if this is an enum
    pub fn is_enum(&self) -> bool {
        self.kind == TypeKind::Enum
    }
}
