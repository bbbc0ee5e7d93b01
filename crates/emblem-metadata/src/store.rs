//! Per-element metadata store
//!
//! A `MetadataStore` owns four value maps plus the stereotype index:
//!
//! - `declared`: annotations directly present on the element
//! - `declared_stereotypes`: meta-annotations reachable from `declared`
//! - `all_stereotypes`: meta-annotations reachable from every layer
//! - `all`: declared and inherited annotations merged
//!
//! Stores are immutable and cheap to clone (the maps sit behind one `Arc`).
//! Programmatic changes go through `mutate()`, which copies the maps into a
//! `MetadataStoreMut` owned by the caller; `freeze()` turns it back into a
//! new shareable store. The original is never touched.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use emblem_convert::ConversionService;
use emblem_core::{AnnotationValue, AttributeValues, TypeName, Value};
use serde::{Deserialize, Serialize};

use crate::metadata::{AnnotationMetadata, Scope};
use crate::registry::MetadataRegistry;
use crate::values::{
    container_items, index_parents, merge_values, push_repeated, remove_repeated,
    AnnotationValues, StereotypeIndex,
};

/// The maps backing a store
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) origin: Option<String>,
    #[serde(default)]
    pub(crate) declared: AnnotationValues,
    #[serde(default)]
    pub(crate) declared_stereotypes: AnnotationValues,
    #[serde(default)]
    pub(crate) all_stereotypes: AnnotationValues,
    #[serde(default)]
    pub(crate) all: AnnotationValues,
    #[serde(default)]
    pub(crate) stereotype_index: StereotypeIndex,
}

impl StoreParts {
    fn maps(&self, scope: Scope) -> (&AnnotationValues, &AnnotationValues) {
        match scope {
            Scope::Declared => (&self.declared, &self.declared_stereotypes),
            Scope::All => (&self.all, &self.all_stereotypes),
        }
    }
}

/// Immutable annotation metadata of one element
#[derive(Clone)]
pub struct MetadataStore {
    parts: Arc<StoreParts>,
    registry: Arc<MetadataRegistry>,
}

impl MetadataStore {
    /// A store with no metadata
    pub fn empty(registry: Arc<MetadataRegistry>) -> Self {
        Self::from_parts(StoreParts::default(), registry)
    }

    pub(crate) fn from_parts(parts: StoreParts, registry: Arc<MetadataRegistry>) -> Self {
        Self {
            parts: Arc::new(parts),
            registry,
        }
    }

    pub(crate) fn parts(&self) -> &StoreParts {
        &self.parts
    }

    /// Registry this store reads defaults and containers from
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// Annotations declared on the element
    pub fn declared(&self) -> &AnnotationValues {
        &self.parts.declared
    }

    /// Stereotypes reachable from declared annotations
    pub fn declared_stereotypes(&self) -> &AnnotationValues {
        &self.parts.declared_stereotypes
    }

    /// Stereotypes reachable from every layer
    pub fn all_stereotypes(&self) -> &AnnotationValues {
        &self.parts.all_stereotypes
    }

    /// Declared and inherited annotations
    pub fn all(&self) -> &AnnotationValues {
        &self.parts.all
    }

    /// Stereotype -> carrying annotation types
    pub fn stereotype_index(&self) -> &StereotypeIndex {
        &self.parts.stereotype_index
    }

    // ========================================================================
    // Copy and mutate
    // ========================================================================

    /// Copy the maps into a mutable store
    pub fn mutate(&self) -> MetadataStoreMut {
        MetadataStoreMut {
            parts: (*self.parts).clone(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Copy with a declared annotation added
    pub fn with_annotation(&self, annotation: AnnotationValue) -> Self {
        let mut copy = self.mutate();
        copy.add_declared_annotation(annotation);
        copy.freeze()
    }

    /// Copy with a declared stereotype added under `parents`
    pub fn with_stereotype(&self, parents: &[TypeName], stereotype: AnnotationValue) -> Self {
        let mut copy = self.mutate();
        copy.add_declared_stereotype(parents, stereotype);
        copy.freeze()
    }

    /// Copy with an annotation removed
    pub fn without_annotation(&self, annotation: &str) -> Self {
        let mut copy = self.mutate();
        copy.remove_annotation(annotation);
        copy.freeze()
    }

    /// Copy with a stereotype and its carriers removed
    pub fn without_stereotype(&self, stereotype: &str) -> Self {
        let mut copy = self.mutate();
        copy.remove_stereotype(stereotype);
        copy.freeze()
    }

    // ========================================================================
    // Lookup helpers
    // ========================================================================

    fn repeated_items(&self, annotation: &str, scope: Scope) -> Option<Vec<AnnotationValue>> {
        let container = self.registry.repeatable_container(annotation)?;
        let (values, stereotypes) = self.parts.maps(scope);
        let items: Vec<AnnotationValue> = [values, stereotypes]
            .into_iter()
            .filter_map(|map| map.get(&container))
            .flat_map(container_items)
            .filter(|item| item.annotation_name() == annotation)
            .cloned()
            .collect();
        Some(items)
    }

    fn entry(&self, annotation: &str, scope: Scope) -> Option<&AttributeValues> {
        let (values, stereotypes) = self.parts.maps(scope);
        values.get(annotation).or_else(|| stereotypes.get(annotation))
    }

    fn with_registered_defaults(&self, value: AnnotationValue) -> AnnotationValue {
        if !value.defaults().is_empty() {
            return value;
        }
        let defaults = self.registry.defaults_or_empty(value.annotation_name());
        value.with_defaults(defaults)
    }

    fn member_or_default(&self, item: &AnnotationValue, member: &str) -> Option<Value> {
        item.value(member)
            .cloned()
            .or_else(|| self.registry.default_value(item.annotation_name(), member))
    }

    fn find(&self, annotation: &str, scope: Scope) -> Option<AnnotationValue> {
        if let Some(items) = self.repeated_items(annotation, scope) {
            if let Some(first) = items.into_iter().next() {
                return Some(self.with_registered_defaults(first));
            }
        }
        let values = self.entry(annotation, scope)?;
        Some(self.with_registered_defaults(AnnotationValue::with_values(
            annotation,
            values.clone(),
        )))
    }

    fn values_by_type(&self, annotation: &str, scope: Scope) -> Vec<AnnotationValue> {
        if let Some(items) = self.repeated_items(annotation, scope) {
            if !items.is_empty() {
                return items
                    .into_iter()
                    .map(|item| self.with_registered_defaults(item))
                    .collect();
            }
        }
        self.find(annotation, scope).into_iter().collect()
    }

    fn names_by_stereotype(&self, stereotype: &str, scope: Scope) -> Vec<TypeName> {
        let (values, stereotypes) = self.parts.maps(scope);
        match self.parts.stereotype_index.get(stereotype) {
            Some(carriers) => carriers
                .iter()
                .filter(|carrier| match scope {
                    Scope::All => true,
                    Scope::Declared => {
                        values.contains_key(*carrier) || stereotypes.contains_key(*carrier)
                    }
                })
                .cloned()
                .collect(),
            None if values.contains_key(stereotype) => vec![TypeName::new(stereotype)],
            None => Vec::new(),
        }
    }

    fn present(&self, annotation: &str, scope: Scope, include_stereotypes: bool) -> bool {
        let (values, stereotypes) = self.parts.maps(scope);
        if values.contains_key(annotation)
            || (include_stereotypes && stereotypes.contains_key(annotation))
        {
            return true;
        }
        let Some(container) = self.registry.repeatable_container(annotation) else {
            return false;
        };
        let mut maps = vec![values];
        if include_stereotypes {
            maps.push(stereotypes);
        }
        maps.into_iter()
            .filter_map(|map| map.get(&container))
            .flat_map(container_items)
            .any(|item| item.annotation_name() == annotation)
    }
}

impl AnnotationMetadata for MetadataStore {
    fn has_annotation(&self, annotation: &str) -> bool {
        self.present(annotation, Scope::All, false)
    }

    fn has_declared_annotation(&self, annotation: &str) -> bool {
        self.present(annotation, Scope::Declared, false)
    }

    fn has_stereotype(&self, annotation: &str) -> bool {
        self.present(annotation, Scope::All, true)
    }

    fn has_declared_stereotype(&self, annotation: &str) -> bool {
        self.present(annotation, Scope::Declared, true)
    }

    fn is_empty(&self) -> bool {
        self.parts.all.is_empty() && self.parts.all_stereotypes.is_empty()
    }

    fn annotation_names(&self) -> Vec<TypeName> {
        self.parts.all.keys().cloned().collect()
    }

    fn declared_annotation_names(&self) -> Vec<TypeName> {
        self.parts.declared.keys().cloned().collect()
    }

    fn stereotype_names(&self) -> Vec<TypeName> {
        self.parts.all_stereotypes.keys().cloned().collect()
    }

    fn declared_stereotype_names(&self) -> Vec<TypeName> {
        self.parts.declared_stereotypes.keys().cloned().collect()
    }

    fn annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName> {
        self.names_by_stereotype(stereotype, Scope::All)
    }

    fn declared_annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName> {
        self.names_by_stereotype(stereotype, Scope::Declared)
    }

    fn find_annotation(&self, annotation: &str) -> Option<AnnotationValue> {
        self.find(annotation, Scope::All)
    }

    fn find_declared_annotation(&self, annotation: &str) -> Option<AnnotationValue> {
        self.find(annotation, Scope::Declared)
    }

    fn annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue> {
        self.values_by_type(annotation, Scope::All)
    }

    fn declared_annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue> {
        self.values_by_type(annotation, Scope::Declared)
    }

    fn annotation_values_by_stereotype(&self, stereotype: &str) -> Vec<AnnotationValue> {
        self.annotation_names_by_stereotype(stereotype)
            .iter()
            .flat_map(|name| self.annotation_values_by_type(name))
            .collect()
    }

    fn raw_value(&self, annotation: &str, member: &str, scope: Scope) -> Option<Value> {
        if let Some(items) = self.repeated_items(annotation, scope) {
            if let Some(first) = items.first() {
                return self.member_or_default(first, member);
            }
        }
        let values = self.entry(annotation, scope)?;
        values
            .get(member)
            .cloned()
            .or_else(|| self.registry.default_value(annotation, member))
    }

    fn raw_values(&self, annotation: &str, member: &str, scope: Scope) -> Vec<Value> {
        if let Some(items) = self.repeated_items(annotation, scope) {
            if !items.is_empty() {
                return items
                    .iter()
                    .filter_map(|item| self.member_or_default(item, member))
                    .collect();
            }
        }
        self.raw_value(annotation, member, scope).into_iter().collect()
    }

    fn conversion(&self) -> &ConversionService {
        self.registry.conversion()
    }

    fn origin(&self) -> Option<&str> {
        self.parts.origin.as_deref()
    }
}

/// Equality is over the four value maps
impl PartialEq for MetadataStore {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.parts, &other.parts)
            || (self.parts.declared == other.parts.declared
                && self.parts.declared_stereotypes == other.parts.declared_stereotypes
                && self.parts.all_stereotypes == other.parts.all_stereotypes
                && self.parts.all == other.parts.all)
    }
}

/// Values hold floats, so the hash covers annotation names only
impl Hash for MetadataStore {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for map in [
            &self.parts.declared,
            &self.parts.declared_stereotypes,
            &self.parts.all_stereotypes,
            &self.parts.all,
        ] {
            let mut names: Vec<&TypeName> = map.keys().collect();
            names.sort();
            names.hash(state);
        }
    }
}

impl fmt::Debug for MetadataStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataStore")
            .field("origin", &self.parts.origin)
            .field("declared", &self.parts.declared.keys().collect::<Vec<_>>())
            .field("all", &self.parts.all.keys().collect::<Vec<_>>())
            .field(
                "stereotypes",
                &self.parts.all_stereotypes.keys().collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Unshared, mutable copy of a store
#[derive(Debug)]
pub struct MetadataStoreMut {
    parts: StoreParts,
    registry: Arc<MetadataRegistry>,
}

impl MetadataStoreMut {
    /// Start from an empty store
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        Self {
            parts: StoreParts::default(),
            registry,
        }
    }

    /// Name the element the metadata belongs to
    pub fn set_origin(&mut self, origin: impl Into<String>) {
        self.parts.origin = Some(origin.into());
    }

    /// Add an inherited annotation
    pub fn add_annotation(&mut self, annotation: AnnotationValue) {
        self.remember_defaults(&annotation);
        insert_value(&self.registry, &mut self.parts.all, &annotation);
    }

    /// Add an annotation declared on the element
    pub fn add_declared_annotation(&mut self, annotation: AnnotationValue) {
        self.remember_defaults(&annotation);
        insert_value(&self.registry, &mut self.parts.declared, &annotation);
        insert_value(&self.registry, &mut self.parts.all, &annotation);
    }

    /// Add an inherited stereotype carried by `parents`
    pub fn add_stereotype(&mut self, parents: &[TypeName], stereotype: AnnotationValue) {
        self.remember_defaults(&stereotype);
        let name = self.stored_name(&stereotype);
        insert_value(&self.registry, &mut self.parts.all_stereotypes, &stereotype);
        index_parents(&mut self.parts.stereotype_index, &name, parents);
    }

    /// Add a stereotype reachable from a declared annotation
    pub fn add_declared_stereotype(&mut self, parents: &[TypeName], stereotype: AnnotationValue) {
        self.remember_defaults(&stereotype);
        let name = self.stored_name(&stereotype);
        insert_value(&self.registry, &mut self.parts.declared_stereotypes, &stereotype);
        insert_value(&self.registry, &mut self.parts.all_stereotypes, &stereotype);
        index_parents(&mut self.parts.stereotype_index, &name, parents);
    }

    /// Declare `item` repeatable into `container` and add it as declared
    ///
    /// Falls back to a plain declared annotation if the item already repeats
    /// into a different container.
    pub fn add_repeatable(&mut self, container: &TypeName, item: AnnotationValue) {
        if let Err(existing) = self.registry.register_repeatable(item.annotation_name(), container) {
            tracing::warn!(
                annotation = %item.annotation_name(),
                %container,
                %existing,
                "repeatable container conflict"
            );
        }
        self.add_declared_annotation(item);
    }

    /// Remove an annotation, its repeated occurrences and orphaned stereotypes
    pub fn remove_annotation(&mut self, annotation: &str) {
        let name = TypeName::new(annotation);
        match self.registry.repeatable_container(annotation) {
            Some(container) => {
                for map in [&mut self.parts.declared, &mut self.parts.all] {
                    remove_item(map, &container, &name);
                }
                if !self.parts.all.contains_key(&container) {
                    self.prune(container);
                }
            }
            None => {
                self.parts.declared.shift_remove(annotation);
                self.parts.all.shift_remove(annotation);
            }
        }
        self.prune(name);
    }

    /// Remove a stereotype and every annotation carrying it
    pub fn remove_stereotype(&mut self, stereotype: &str) {
        let name = TypeName::new(stereotype);
        let carriers = self
            .parts
            .stereotype_index
            .shift_remove(stereotype)
            .unwrap_or_default();
        for map in [
            &mut self.parts.declared_stereotypes,
            &mut self.parts.all_stereotypes,
            &mut self.parts.declared,
            &mut self.parts.all,
        ] {
            map.shift_remove(stereotype);
        }
        for carrier in carriers {
            self.remove_annotation(&carrier);
            for map in [
                &mut self.parts.declared_stereotypes,
                &mut self.parts.all_stereotypes,
            ] {
                map.shift_remove(&carrier);
            }
            self.prune(carrier);
        }
        self.prune(name);
    }

    /// Finish mutating and share the result
    pub fn freeze(self) -> MetadataStore {
        MetadataStore::from_parts(self.parts, self.registry)
    }

    fn remember_defaults(&self, annotation: &AnnotationValue) {
        if !annotation.defaults().is_empty() {
            self.registry
                .register_defaults(annotation.annotation_name(), annotation.defaults().clone());
        }
    }

    fn stored_name(&self, annotation: &AnnotationValue) -> TypeName {
        self.registry
            .repeatable_container(annotation.annotation_name())
            .unwrap_or_else(|| annotation.annotation_name().clone())
    }

    /// Drop `removed` from the index and cascade to stereotypes left
    /// without any carrier
    fn prune(&mut self, removed: TypeName) {
        let mut pending = vec![removed];
        while let Some(name) = pending.pop() {
            let mut orphaned = Vec::new();
            for (stereotype, carriers) in self.parts.stereotype_index.iter_mut() {
                let before = carriers.len();
                carriers.retain(|carrier| carrier != &name);
                if before > 0 && carriers.is_empty() {
                    orphaned.push(stereotype.clone());
                }
            }
            self.parts.stereotype_index.retain(|_, carriers| !carriers.is_empty());

            for stereotype in orphaned {
                if self.parts.all.contains_key(&stereotype) {
                    continue;
                }
                self.parts.declared_stereotypes.shift_remove(&stereotype);
                self.parts.all_stereotypes.shift_remove(&stereotype);
                pending.push(stereotype);
            }
        }
    }
}

/// Insert a value, routing repeatable types into their container
pub(crate) fn insert_value(
    registry: &MetadataRegistry,
    map: &mut AnnotationValues,
    annotation: &AnnotationValue,
) {
    match registry.repeatable_container(annotation.annotation_name()) {
        Some(container) => push_repeated(map, &container, annotation),
        None => merge_values(map, annotation.annotation_name(), annotation.values()),
    }
}

fn remove_item(map: &mut AnnotationValues, container: &TypeName, item: &TypeName) {
    let emptied = match map.get_mut(container) {
        Some(values) => remove_repeated(values, item),
        None => false,
    };
    if emptied {
        map.shift_remove(container);
    }
}
