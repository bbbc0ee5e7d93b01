//! The annotation metadata query surface
//!
//! `AnnotationMetadata` is implemented by single stores, hierarchies and the
//! environment decorator. Implementors supply presence queries, name
//! enumeration and raw value lookup; every typed getter is a provided method
//! following one template:
//!
//! 1. look up the raw member value (`raw_value`), which already handles
//!    repeatable redirection, stereotype fallback and registered defaults
//! 2. pass it through the implementor's `ValueMapper`, if any
//! 3. convert it to the requested type through the conversion service
//!
//! Plain getters never fail: a missing or unconvertible value is `None`.
//! `required_value` is the opt-in throwing variant.

use emblem_convert::{
    ConversionContext, ConversionError, ConversionErrorKind, ConversionService, FORMAT,
};
use emblem_core::{names, AnnotationValue, Argument, EnumConstant, TypeName, Value, VALUE_MEMBER};

use crate::error::MetadataError;

/// Which layers a lookup consults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Only metadata declared directly on the element
    Declared,
    /// Declared and inherited metadata
    All,
}

/// Hook applied to raw values before conversion
pub trait ValueMapper: Send + Sync {
    /// Map a value for a single-valued query; errors propagate
    fn map_value(&self, value: &Value) -> Result<Value, MetadataError>;

    /// Map a value for a multi-valued query; never fails
    fn map_values(&self, value: &Value) -> Value {
        self.map_value(value).unwrap_or_else(|_| value.clone())
    }
}

/// Queryable annotation metadata of one program element
pub trait AnnotationMetadata: Send + Sync {
    // ========================================================================
    // Presence
    // ========================================================================

    /// Check for a declared or inherited annotation
    fn has_annotation(&self, annotation: &str) -> bool;

    /// Check for an annotation declared directly on the element
    fn has_declared_annotation(&self, annotation: &str) -> bool;

    /// Check for an annotation or stereotype, declared or inherited
    fn has_stereotype(&self, annotation: &str) -> bool;

    /// Check for an annotation or stereotype declared on the element
    fn has_declared_stereotype(&self, annotation: &str) -> bool;

    /// Check if there is no metadata at all
    fn is_empty(&self) -> bool;

    // ========================================================================
    // Names
    // ========================================================================

    /// Names of declared and inherited annotations
    fn annotation_names(&self) -> Vec<TypeName>;

    /// Names of annotations declared on the element
    fn declared_annotation_names(&self) -> Vec<TypeName>;

    /// Names of all stereotypes
    fn stereotype_names(&self) -> Vec<TypeName>;

    /// Names of stereotypes reachable from declared annotations
    fn declared_stereotype_names(&self) -> Vec<TypeName>;

    /// Annotation types carrying `stereotype`, first discovered first
    fn annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName>;

    /// Declared annotation types carrying `stereotype`
    fn declared_annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName>;

    // ========================================================================
    // Annotation values
    // ========================================================================

    /// Find an annotation (or stereotype) value with defaults attached
    fn find_annotation(&self, annotation: &str) -> Option<AnnotationValue>;

    /// Find an annotation declared on the element
    fn find_declared_annotation(&self, annotation: &str) -> Option<AnnotationValue>;

    /// Every value of an annotation type, including repeated occurrences
    fn annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue>;

    /// Every declared value of an annotation type
    fn declared_annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue>;

    /// Every annotation value whose type carries `stereotype`
    fn annotation_values_by_stereotype(&self, stereotype: &str) -> Vec<AnnotationValue>;

    // ========================================================================
    // Raw values
    // ========================================================================

    /// Raw value of a member, falling back to the registered default
    fn raw_value(&self, annotation: &str, member: &str, scope: Scope) -> Option<Value>;

    /// Raw values of a member across repeated occurrences and layers
    fn raw_values(&self, annotation: &str, member: &str, scope: Scope) -> Vec<Value>;

    // ========================================================================
    // Services
    // ========================================================================

    /// Conversion service typed getters go through
    fn conversion(&self) -> &ConversionService;

    /// Name of the element this metadata belongs to
    fn origin(&self) -> Option<&str>;

    /// Mapper applied to raw values before conversion
    fn value_mapper(&self) -> Option<&dyn ValueMapper> {
        None
    }

    // ========================================================================
    // Provided: stereotype lookups
    // ========================================================================

    /// First annotation type carrying `stereotype`
    fn annotation_type_by_stereotype(&self, stereotype: &str) -> Option<TypeName> {
        self.annotation_names_by_stereotype(stereotype).into_iter().next()
    }

    /// First declared annotation type carrying `stereotype`
    fn declared_annotation_type_by_stereotype(&self, stereotype: &str) -> Option<TypeName> {
        self.declared_annotation_names_by_stereotype(stereotype)
            .into_iter()
            .next()
    }

    // ========================================================================
    // Provided: value template
    // ========================================================================

    /// Resolve, map and convert a member value with an explicit mapper
    ///
    /// `Ok(None)` means the member has no value. Mapper failures and
    /// conversion failures are errors.
    fn resolve_value_with(
        &self,
        annotation: &str,
        member: &str,
        argument: &Argument,
        scope: Scope,
        mapper: Option<&dyn ValueMapper>,
    ) -> Result<Option<Value>, MetadataError> {
        let Some(raw) = self.raw_value(annotation, member, scope) else {
            return Ok(None);
        };
        let mapped = match mapper {
            Some(mapper) => mapper.map_value(&raw)?,
            None => raw,
        };
        let mut ctx = ConversionContext::new(argument.clone());
        match self.conversion().convert(&mapped, &mut ctx) {
            Some(converted) => Ok(Some(converted)),
            None => {
                let target = argument.type_name().clone();
                let source = ctx.take_errors().pop().unwrap_or_else(|| {
                    ConversionError::new(mapped, target.clone(), ConversionErrorKind::NoConverter)
                });
                Err(MetadataError::Conversion {
                    element: self.origin().unwrap_or_default().to_string(),
                    annotation: TypeName::new(annotation),
                    member: member.to_string(),
                    target,
                    source,
                })
            }
        }
    }

    /// Resolve, map and convert a member value with this metadata's mapper
    fn resolve_value(
        &self,
        annotation: &str,
        member: &str,
        argument: &Argument,
        scope: Scope,
    ) -> Result<Option<Value>, MetadataError> {
        self.resolve_value_with(annotation, member, argument, scope, self.value_mapper())
    }

    /// Resolve every value of a member, mapped and converted to `element`
    ///
    /// Lists and arrays are flattened; items that fail to convert are
    /// skipped.
    fn resolve_values(
        &self,
        annotation: &str,
        member: &str,
        element: &Argument,
        scope: Scope,
    ) -> Vec<Value> {
        let mapper = self.value_mapper();
        let mut resolved = Vec::new();
        for raw in self.raw_values(annotation, member, scope) {
            let mapped = match mapper {
                Some(mapper) => mapper.map_values(&raw),
                None => raw,
            };
            let items = match mapped.into_items() {
                Ok(items) => items,
                Err(single) => vec![single],
            };
            for item in items {
                match self.conversion().convert_value(&item, element.clone()) {
                    Some(converted) => resolved.push(converted),
                    None => tracing::debug!(
                        annotation,
                        member,
                        target = %element,
                        "skipping unconvertible item"
                    ),
                }
            }
        }
        resolved
    }

    /// Converted member value, or `None`
    fn value_of(&self, annotation: &str, member: &str, argument: &Argument) -> Option<Value> {
        lenient(self.resolve_value(annotation, member, argument, Scope::All))
    }

    /// Converted member value from declared metadata, or `None`
    fn declared_value_of(&self, annotation: &str, member: &str, argument: &Argument) -> Option<Value> {
        lenient(self.resolve_value(annotation, member, argument, Scope::Declared))
    }

    /// Converted member value, failing if absent or unconvertible
    fn required_value(
        &self,
        annotation: &str,
        member: &str,
        argument: &Argument,
    ) -> Result<Value, MetadataError> {
        self.resolve_value(annotation, member, argument, Scope::All)?
            .ok_or_else(|| MetadataError::MissingValue {
                element: self.origin().unwrap_or_default().to_string(),
                annotation: TypeName::new(annotation),
                member: member.to_string(),
            })
    }

    /// Check if a member has a value, explicit or default
    fn is_present(&self, annotation: &str, member: &str) -> bool {
        self.raw_value(annotation, member, Scope::All).is_some()
    }

    // ========================================================================
    // Provided: typed getters
    // ========================================================================

    /// String member
    fn string_value(&self, annotation: &str, member: &str) -> Option<String> {
        string_of(self.value_of(annotation, member, &Argument::of(names::STRING)))
    }

    /// String member of declared metadata
    fn declared_string_value(&self, annotation: &str, member: &str) -> Option<String> {
        string_of(self.declared_value_of(annotation, member, &Argument::of(names::STRING)))
    }

    /// Every string value of a member
    fn string_values(&self, annotation: &str, member: &str) -> Vec<String> {
        self.resolve_values(annotation, member, &Argument::of(names::STRING), Scope::All)
            .into_iter()
            .filter_map(|v| string_of(Some(v)))
            .collect()
    }

    /// Integer member
    fn int_value(&self, annotation: &str, member: &str) -> Option<i32> {
        match self.value_of(annotation, member, &Argument::of(names::INTEGER))? {
            Value::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Long member
    fn long_value(&self, annotation: &str, member: &str) -> Option<i64> {
        match self.value_of(annotation, member, &Argument::of(names::LONG))? {
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Long member of declared metadata
    fn declared_long_value(&self, annotation: &str, member: &str) -> Option<i64> {
        match self.declared_value_of(annotation, member, &Argument::of(names::LONG))? {
            Value::Long(v) => Some(v),
            _ => None,
        }
    }

    /// Double member
    fn double_value(&self, annotation: &str, member: &str) -> Option<f64> {
        match self.value_of(annotation, member, &Argument::of(names::DOUBLE))? {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }

    /// Boolean member
    fn bool_value(&self, annotation: &str, member: &str) -> Option<bool> {
        self.value_of(annotation, member, &Argument::of(names::BOOLEAN))?
            .as_bool()
    }

    /// Boolean member of declared metadata
    fn declared_bool_value(&self, annotation: &str, member: &str) -> Option<bool> {
        self.declared_value_of(annotation, member, &Argument::of(names::BOOLEAN))?
            .as_bool()
    }

    /// Check if a boolean member is set and true
    fn is_true(&self, annotation: &str, member: &str) -> bool {
        self.bool_value(annotation, member).unwrap_or(false)
    }

    /// Check if a boolean member is unset or false
    fn is_false(&self, annotation: &str, member: &str) -> bool {
        !self.is_true(annotation, member)
    }

    /// Type reference member
    fn class_value(&self, annotation: &str, member: &str) -> Option<TypeName> {
        class_of(self.value_of(annotation, member, &Argument::of(names::CLASS)))
    }

    /// Type reference member of declared metadata
    fn declared_class_value(&self, annotation: &str, member: &str) -> Option<TypeName> {
        class_of(self.declared_value_of(annotation, member, &Argument::of(names::CLASS)))
    }

    /// Every type reference of a member
    fn class_values(&self, annotation: &str, member: &str) -> Vec<TypeName> {
        self.resolve_values(annotation, member, &Argument::of(names::CLASS), Scope::All)
            .into_iter()
            .filter_map(|v| class_of(Some(v)))
            .collect()
    }

    /// Enum member of type `enum_type`
    fn enum_value(&self, annotation: &str, member: &str, enum_type: &str) -> Option<EnumConstant> {
        enum_of(self.value_of(annotation, member, &Argument::of(enum_type)))
    }

    /// Enum member of declared metadata
    fn declared_enum_value(
        &self,
        annotation: &str,
        member: &str,
        enum_type: &str,
    ) -> Option<EnumConstant> {
        enum_of(self.declared_value_of(annotation, member, &Argument::of(enum_type)))
    }

    /// Every enum constant of a member
    fn enum_values(&self, annotation: &str, member: &str, enum_type: &str) -> Vec<EnumConstant> {
        self.resolve_values(annotation, member, &Argument::of(enum_type), Scope::All)
            .into_iter()
            .filter_map(|v| enum_of(Some(v)))
            .collect()
    }

    /// Nested annotation member
    fn annotation_value(&self, annotation: &str, member: &str) -> Option<AnnotationValue> {
        match self.raw_value(annotation, member, Scope::All)? {
            Value::Annotation(av) => Some(av),
            other => other.items()?.first()?.as_annotation().cloned(),
        }
    }

    /// Every nested annotation of a member
    fn annotation_values(&self, annotation: &str, member: &str) -> Vec<AnnotationValue> {
        self.raw_values(annotation, member, Scope::All)
            .into_iter()
            .flat_map(|raw| match raw.into_items() {
                Ok(items) => items,
                Err(single) => vec![single],
            })
            .filter_map(|v| match v {
                Value::Annotation(av) => Some(av),
                _ => None,
            })
            .collect()
    }

    /// `value` member as a string
    fn string_value_of(&self, annotation: &str) -> Option<String> {
        self.string_value(annotation, VALUE_MEMBER)
    }

    // ========================================================================
    // Provided: conversion context
    // ========================================================================

    /// Conversion context for converting into this element
    ///
    /// When the element carries the `Format` stereotype, the context is
    /// qualified with the carrying annotation and its pattern.
    fn conversion_context(&self, argument: Argument) -> ConversionContext {
        let ctx = ConversionContext::new(argument);
        match self.annotation_type_by_stereotype(FORMAT) {
            Some(qualifier) => {
                let pattern = self
                    .raw_value(FORMAT, VALUE_MEMBER, Scope::All)
                    .and_then(|v| v.as_str().map(str::to_string));
                ctx.with_format(qualifier, pattern)
            }
            None => ctx,
        }
    }
}

fn lenient(result: Result<Option<Value>, MetadataError>) -> Option<Value> {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(%err, "metadata value unavailable");
            None
        }
    }
}

fn string_of(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn class_of(value: Option<Value>) -> Option<TypeName> {
    match value? {
        Value::Class(name) => Some(name),
        _ => None,
    }
}

fn enum_of(value: Option<Value>) -> Option<EnumConstant> {
    match value? {
        Value::Enum(constant) => Some(constant),
        _ => None,
    }
}
