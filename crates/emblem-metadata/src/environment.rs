//! Environment-aware metadata
//!
//! `EnvironmentMetadata` wraps a store or hierarchy and resolves `${...}`
//! placeholders in string members before conversion. Single-valued getters
//! resolve strictly (`required_value` surfaces the `PlaceholderError`);
//! multi-valued getters are best-effort and keep the literal when a
//! placeholder cannot be resolved.

use std::sync::Arc;

use emblem_convert::ConversionService;
use emblem_core::{AnnotationValue, ArrayValue, TypeName, Value};

use crate::error::MetadataError;
use crate::metadata::{AnnotationMetadata, Scope, ValueMapper};
use crate::placeholder::PlaceholderResolver;

/// Value mapper substituting placeholders in strings
#[derive(Clone)]
pub struct PlaceholderMapper {
    resolver: Arc<dyn PlaceholderResolver>,
}

impl PlaceholderMapper {
    /// Mapper backed by `resolver`
    pub fn new(resolver: Arc<dyn PlaceholderResolver>) -> Self {
        Self { resolver }
    }

    fn resolve_strict(&self, text: &str) -> Result<String, MetadataError> {
        if !self.resolver.has_placeholder(text) {
            return Ok(text.to_string());
        }
        Ok(self.resolver.resolve_required(text)?)
    }

    fn resolve_lenient(&self, text: &str) -> String {
        if !self.resolver.has_placeholder(text) {
            return text.to_string();
        }
        match self.resolver.resolve_required(text) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::debug!(%err, text, "keeping unresolved placeholder literal");
                text.to_string()
            }
        }
    }

    fn has_placeholder(&self, value: &Value) -> bool {
        match value {
            Value::String(s) => self.resolver.has_placeholder(s),
            other => other
                .items()
                .is_some_and(|items| items.iter().any(|item| self.has_placeholder(item))),
        }
    }

    /// Resolve string members of an annotation value, keeping literals on
    /// failure
    pub fn map_annotation(&self, annotation: AnnotationValue) -> AnnotationValue {
        if !annotation.values().values().any(|v| self.has_placeholder(v)) {
            return annotation;
        }
        let defaults = annotation.defaults().clone();
        let name = annotation.annotation_name().clone();
        let values = annotation
            .into_values()
            .into_iter()
            .map(|(member, value)| {
                let mapped = self.map_strings(&value, &|text: &str| {
                    Value::String(self.resolve_lenient(text))
                });
                (member, mapped)
            })
            .collect();
        AnnotationValue::with_values(name, values).with_defaults(defaults)
    }

    fn map_strings(&self, value: &Value, resolve: &dyn Fn(&str) -> Value) -> Value {
        match value {
            Value::String(s) => resolve(s),
            Value::Array(array) => Value::Array(ArrayValue {
                component: array.component.clone(),
                items: array.items.iter().map(|v| self.map_strings(v, resolve)).collect(),
            }),
            Value::List(items) => {
                Value::List(items.iter().map(|v| self.map_strings(v, resolve)).collect())
            }
            other => other.clone(),
        }
    }
}

impl ValueMapper for PlaceholderMapper {
    fn map_value(&self, value: &Value) -> Result<Value, MetadataError> {
        match value {
            Value::String(s) => Ok(Value::String(self.resolve_strict(s)?)),
            Value::Array(array) => {
                let items = array
                    .items
                    .iter()
                    .map(|item| self.map_value(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::Array(ArrayValue {
                    component: array.component.clone(),
                    items,
                }))
            }
            Value::List(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.map_value(item))
                    .collect::<Result<Vec<_>, _>>()?,
            )),
            other => Ok(other.clone()),
        }
    }

    /// Resolved strings holding commas are split into several values
    fn map_values(&self, value: &Value) -> Value {
        let mapped = self.map_strings(value, &|text: &str| {
            if !self.resolver.has_placeholder(text) {
                return Value::String(text.to_string());
            }
            let resolved = self.resolve_lenient(text);
            if resolved.contains(',') {
                Value::string_array(resolved.split(',').map(str::trim).filter(|s| !s.is_empty()))
            } else {
                Value::String(resolved)
            }
        });
        flatten_nested(mapped)
    }
}

/// Flatten arrays produced by splitting inside an outer array
fn flatten_nested(value: Value) -> Value {
    match value {
        Value::Array(array) => Value::Array(ArrayValue {
            component: array.component,
            items: array.items.into_iter().flat_map(spread).collect(),
        }),
        Value::List(items) => Value::List(items.into_iter().flat_map(spread).collect()),
        other => other,
    }
}

fn spread(value: Value) -> Vec<Value> {
    match value {
        Value::Array(_) | Value::List(_) => value.into_items().unwrap_or_default(),
        single => vec![single],
    }
}

/// Metadata whose string members resolve placeholders
#[derive(Clone)]
pub struct EnvironmentMetadata {
    inner: Arc<dyn AnnotationMetadata>,
    mapper: PlaceholderMapper,
}

impl EnvironmentMetadata {
    /// Wrap `inner`, resolving placeholders through `resolver`
    pub fn new(inner: Arc<dyn AnnotationMetadata>, resolver: Arc<dyn PlaceholderResolver>) -> Self {
        Self {
            inner,
            mapper: PlaceholderMapper::new(resolver),
        }
    }

    /// The wrapped metadata
    pub fn inner(&self) -> &Arc<dyn AnnotationMetadata> {
        &self.inner
    }

    /// The placeholder resolver
    pub fn resolver(&self) -> &Arc<dyn PlaceholderResolver> {
        &self.mapper.resolver
    }
}

impl AnnotationMetadata for EnvironmentMetadata {
    fn has_annotation(&self, annotation: &str) -> bool {
        self.inner.has_annotation(annotation)
    }

    fn has_declared_annotation(&self, annotation: &str) -> bool {
        self.inner.has_declared_annotation(annotation)
    }

    fn has_stereotype(&self, annotation: &str) -> bool {
        self.inner.has_stereotype(annotation)
    }

    fn has_declared_stereotype(&self, annotation: &str) -> bool {
        self.inner.has_declared_stereotype(annotation)
    }

    fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn annotation_names(&self) -> Vec<TypeName> {
        self.inner.annotation_names()
    }

    fn declared_annotation_names(&self) -> Vec<TypeName> {
        self.inner.declared_annotation_names()
    }

    fn stereotype_names(&self) -> Vec<TypeName> {
        self.inner.stereotype_names()
    }

    fn declared_stereotype_names(&self) -> Vec<TypeName> {
        self.inner.declared_stereotype_names()
    }

    fn annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName> {
        self.inner.annotation_names_by_stereotype(stereotype)
    }

    fn declared_annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName> {
        self.inner.declared_annotation_names_by_stereotype(stereotype)
    }

    fn find_annotation(&self, annotation: &str) -> Option<AnnotationValue> {
        self.inner
            .find_annotation(annotation)
            .map(|av| self.mapper.map_annotation(av))
    }

    fn find_declared_annotation(&self, annotation: &str) -> Option<AnnotationValue> {
        self.inner
            .find_declared_annotation(annotation)
            .map(|av| self.mapper.map_annotation(av))
    }

    fn annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue> {
        self.inner
            .annotation_values_by_type(annotation)
            .into_iter()
            .map(|av| self.mapper.map_annotation(av))
            .collect()
    }

    fn declared_annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue> {
        self.inner
            .declared_annotation_values_by_type(annotation)
            .into_iter()
            .map(|av| self.mapper.map_annotation(av))
            .collect()
    }

    fn annotation_values_by_stereotype(&self, stereotype: &str) -> Vec<AnnotationValue> {
        self.inner
            .annotation_values_by_stereotype(stereotype)
            .into_iter()
            .map(|av| self.mapper.map_annotation(av))
            .collect()
    }

    fn raw_value(&self, annotation: &str, member: &str, scope: Scope) -> Option<Value> {
        self.inner.raw_value(annotation, member, scope)
    }

    fn raw_values(&self, annotation: &str, member: &str, scope: Scope) -> Vec<Value> {
        self.inner.raw_values(annotation, member, scope)
    }

    fn conversion(&self) -> &ConversionService {
        self.inner.conversion()
    }

    fn origin(&self) -> Option<&str> {
        self.inner.origin()
    }

    fn value_mapper(&self) -> Option<&dyn ValueMapper> {
        Some(&self.mapper)
    }
}

impl std::fmt::Debug for EnvironmentMetadata {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentMetadata")
            .field("origin", &self.inner.origin())
            .finish()
    }
}
