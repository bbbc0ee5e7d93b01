//! Type names
//!
//! Every type the metadata model and the conversion engine talk about is
//! identified by a `TypeName`. Names are lazily-resolvable tokens: holding one
//! never requires the named type to be known to a registry.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Suffix marking an array type name (`Integer[]`)
const ARRAY_SUFFIX: &str = "[]";

/// Name of a type (class, interface, enum, annotation, primitive or array)
///
/// Cloning is a reference-count bump, so names can be used freely as map
/// keys and cache keys.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeName(Arc<str>);

impl TypeName {
    /// Create a type name
    pub fn new(name: impl AsRef<str>) -> Self {
        TypeName(Arc::from(name.as_ref()))
    }

    /// The full name
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name without its package (`a.b.Named` -> `Named`)
    pub fn simple_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// The package part of the name (`a.b.Named` -> `a.b`), empty if none
    pub fn package(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    /// Whether this names an array type
    pub fn is_array(&self) -> bool {
        self.0.ends_with(ARRAY_SUFFIX)
    }

    /// Component type of an array type
    pub fn component(&self) -> Option<TypeName> {
        self.0
            .strip_suffix(ARRAY_SUFFIX)
            .map(TypeName::new)
    }

    /// The array type whose component is this type
    pub fn array_of(&self) -> TypeName {
        TypeName::new(format!("{}{}", self.0, ARRAY_SUFFIX))
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeName({})", self.0)
    }
}

impl From<&str> for TypeName {
    fn from(name: &str) -> Self {
        TypeName::new(name)
    }
}

impl From<String> for TypeName {
    fn from(name: String) -> Self {
        TypeName(Arc::from(name))
    }
}

impl From<&TypeName> for TypeName {
    fn from(name: &TypeName) -> Self {
        name.clone()
    }
}

impl AsRef<str> for TypeName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for TypeName {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for TypeName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for TypeName {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for TypeName {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl Serialize for TypeName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TypeName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(TypeName::from)
    }
}

/// Canonical names of the built-in type universe
pub mod names {
    /// The universal "any" type; every type is assignable to it
    pub const OBJECT: &str = "Object";
    /// Root of all array types
    pub const ARRAY: &str = "Array";
    /// Array of references
    pub const OBJECT_ARRAY: &str = "Object[]";

    /// Character sequences
    pub const CHAR_SEQUENCE: &str = "CharSequence";
    /// Strings
    pub const STRING: &str = "String";

    /// Abstract numbers
    pub const NUMBER: &str = "Number";
    /// Boxed 8-bit integer
    pub const BYTE: &str = "Byte";
    /// Boxed 16-bit integer
    pub const SHORT: &str = "Short";
    /// Boxed 32-bit integer
    pub const INTEGER: &str = "Integer";
    /// Boxed 64-bit integer
    pub const LONG: &str = "Long";
    /// Boxed 32-bit float
    pub const FLOAT: &str = "Float";
    /// Boxed 64-bit float
    pub const DOUBLE: &str = "Double";
    /// Boxed boolean
    pub const BOOLEAN: &str = "Boolean";
    /// Boxed character
    pub const CHARACTER: &str = "Character";

    /// Primitive boolean
    pub const PRIM_BOOLEAN: &str = "boolean";
    /// Primitive char
    pub const PRIM_CHAR: &str = "char";
    /// Primitive byte
    pub const PRIM_BYTE: &str = "byte";
    /// Primitive short
    pub const PRIM_SHORT: &str = "short";
    /// Primitive int
    pub const PRIM_INT: &str = "int";
    /// Primitive long
    pub const PRIM_LONG: &str = "long";
    /// Primitive float
    pub const PRIM_FLOAT: &str = "float";
    /// Primitive double
    pub const PRIM_DOUBLE: &str = "double";

    /// Comparable values
    pub const COMPARABLE: &str = "Comparable";
    /// Base of every enum type
    pub const ENUM: &str = "Enum";
    /// Type-reference tokens
    pub const CLASS: &str = "Class";
    /// Base of every annotation type; nested annotation values
    pub const ANNOTATION: &str = "Annotation";

    /// Iterable values
    pub const ITERABLE: &str = "Iterable";
    /// Collections
    pub const COLLECTION: &str = "Collection";
    /// Ordered lists
    pub const LIST: &str = "List";
    /// String-keyed maps
    pub const MAP: &str = "Map";

    /// Date and time values
    pub const TEMPORAL: &str = "Temporal";
    /// Calendar date
    pub const LOCAL_DATE: &str = "LocalDate";
    /// Calendar date with time of day
    pub const LOCAL_DATE_TIME: &str = "LocalDateTime";
    /// Elapsed time
    pub const DURATION: &str = "Duration";

    /// Primitive / boxed pairs
    pub const PRIMITIVES: [(&str, &str); 8] = [
        (PRIM_BOOLEAN, BOOLEAN),
        (PRIM_CHAR, CHARACTER),
        (PRIM_BYTE, BYTE),
        (PRIM_SHORT, SHORT),
        (PRIM_INT, INTEGER),
        (PRIM_LONG, LONG),
        (PRIM_FLOAT, FLOAT),
        (PRIM_DOUBLE, DOUBLE),
    ];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_name_and_package() {
        let name = TypeName::new("app.web.Controller");
        assert_eq!(name.simple_name(), "Controller");
        assert_eq!(name.package(), "app.web");

        let bare = TypeName::new("Controller");
        assert_eq!(bare.simple_name(), "Controller");
        assert_eq!(bare.package(), "");
    }

    #[test]
    fn test_array_names() {
        let int = TypeName::new("int");
        let arr = int.array_of();
        assert_eq!(arr.as_str(), "int[]");
        assert!(arr.is_array());
        assert!(!int.is_array());
        assert_eq!(arr.component(), Some(int));
    }

    #[test]
    fn test_borrow_lookup() {
        let mut map = std::collections::HashMap::new();
        map.insert(TypeName::new("Named"), 1);
        assert_eq!(map.get("Named"), Some(&1));
    }
}
