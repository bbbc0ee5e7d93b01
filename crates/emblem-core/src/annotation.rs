//! Declarative metadata values
//!
//! An `AnnotationValue` pairs a metadata type name with its attribute map.
//! It is the generic key-value view returned by "find annotation X" queries:
//! members can be read by name, and members with no explicit value fall back
//! to the defaults registered for the type.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::name::TypeName;
use crate::value::Value;

/// Name of the implicit single member
pub const VALUE_MEMBER: &str = "value";

/// Attribute name -> value, in declaration order
pub type AttributeValues = IndexMap<String, Value>;

/// A declarative metadata instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationValue {
    annotation_name: TypeName,
    #[serde(default)]
    values: AttributeValues,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    defaults: AttributeValues,
}

impl AnnotationValue {
    /// Create a value with no members set
    pub fn new(annotation_name: impl Into<TypeName>) -> Self {
        Self {
            annotation_name: annotation_name.into(),
            values: AttributeValues::new(),
            defaults: AttributeValues::new(),
        }
    }

    /// Create a value with explicit members
    pub fn with_values(annotation_name: impl Into<TypeName>, values: AttributeValues) -> Self {
        Self {
            annotation_name: annotation_name.into(),
            values,
            defaults: AttributeValues::new(),
        }
    }

    /// Set a member
    pub fn member(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }

    /// Attach the defaults of the annotation type
    pub fn with_defaults(mut self, defaults: AttributeValues) -> Self {
        self.defaults = defaults;
        self
    }

    /// The annotation type name
    pub fn annotation_name(&self) -> &TypeName {
        &self.annotation_name
    }

    /// Explicitly set members
    pub fn values(&self) -> &AttributeValues {
        &self.values
    }

    /// Consume into the explicit member map
    pub fn into_values(self) -> AttributeValues {
        self.values
    }

    /// Default member values of the annotation type
    pub fn defaults(&self) -> &AttributeValues {
        &self.defaults
    }

    /// Check if a member is explicitly set
    pub fn contains(&self, member: &str) -> bool {
        self.values.contains_key(member)
    }

    /// Read a member, falling back to its default
    pub fn value(&self, member: &str) -> Option<&Value> {
        self.values.get(member).or_else(|| self.defaults.get(member))
    }

    /// Read a member as a string
    ///
    /// Strings, enum constants and type references are read by name; a
    /// single-element array is unwrapped.
    pub fn string_value(&self, member: &str) -> Option<String> {
        match self.value(member)? {
            Value::String(s) => Some(s.clone()),
            Value::Enum(constant) => Some(constant.name.clone()),
            Value::Class(name) => Some(name.to_string()),
            other => match other.items() {
                Some([single]) => single_string(single),
                _ => None,
            },
        }
    }

    /// Read a member as a list of strings
    pub fn string_values(&self, member: &str) -> Vec<String> {
        match self.value(member) {
            Some(value) => match value.items() {
                Some(items) => items.iter().filter_map(single_string).collect(),
                None => single_string(value).into_iter().collect(),
            },
            None => Vec::new(),
        }
    }

    /// Read a boolean member
    pub fn bool_value(&self, member: &str) -> Option<bool> {
        self.value(member)?.as_bool()
    }

    /// Read an integral member
    pub fn long_value(&self, member: &str) -> Option<i64> {
        self.value(member)?.as_i64()
    }

    /// Read a nested annotation member
    pub fn annotation(&self, member: &str) -> Option<&AnnotationValue> {
        match self.value(member)? {
            Value::Annotation(av) => Some(av),
            other => other.items()?.first()?.as_annotation(),
        }
    }

    /// Read a member holding nested annotations
    pub fn annotations(&self, member: &str) -> Vec<&AnnotationValue> {
        match self.value(member) {
            Some(Value::Annotation(av)) => vec![av],
            Some(other) => other
                .items()
                .map(|items| items.iter().filter_map(Value::as_annotation).collect())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// Set a member in place
    pub fn insert(&mut self, member: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(member.into(), value)
    }

    /// Copy members of `other` that are not set here
    pub fn merge_missing(&mut self, other: &AnnotationValue) {
        for (member, value) in &other.values {
            if !self.values.contains_key(member) {
                self.values.insert(member.clone(), value.clone());
            }
        }
        if self.defaults.is_empty() {
            self.defaults = other.defaults.clone();
        }
    }
}

fn single_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Enum(constant) => Some(constant.name.clone()),
        Value::Class(name) => Some(name.to_string()),
        _ => None,
    }
}

/// Equality is over the type name and explicit members
impl PartialEq for AnnotationValue {
    fn eq(&self, other: &Self) -> bool {
        self.annotation_name == other.annotation_name && self.values == other.values
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.annotation_name.simple_name())?;
        if self.values.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, (member, value)) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", member, value)?;
        }
        write!(f, ")")
    }
}
