//! Persisted metadata
//!
//! A `MetadataSnapshot` captures everything needed to rebuild a store
//! without running the builder again: the four value maps, the stereotype
//! index, and the registry entries (defaults and repeatable containers) of
//! the annotation types the store mentions. Snapshots are encoded as JSON.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use emblem_core::{AttributeValues, TypeName};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::MetadataError;
use crate::registry::MetadataRegistry;
use crate::store::{MetadataStore, StoreParts};
use crate::values::container_items;

/// Serializable form of one store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataSnapshot {
    store: StoreParts,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    defaults: IndexMap<TypeName, AttributeValues>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    repeatables: IndexMap<TypeName, TypeName>,
}

impl MetadataSnapshot {
    /// Capture a store and the registry entries it depends on
    pub fn capture(store: &MetadataStore) -> Self {
        let parts = store.parts().clone();
        let registry = store.registry();
        let mut defaults = IndexMap::new();
        let mut repeatables = IndexMap::new();

        for map in [
            &parts.declared,
            &parts.declared_stereotypes,
            &parts.all_stereotypes,
            &parts.all,
        ] {
            for (name, values) in map {
                if let Some(found) = registry.defaults(name) {
                    defaults.entry(name.clone()).or_insert_with(|| (*found).clone());
                }
                for item in container_items(values) {
                    let item_name = item.annotation_name();
                    if registry.is_container_of(name, item_name) {
                        repeatables.insert(item_name.clone(), name.clone());
                    }
                    if let Some(found) = registry.defaults(item_name) {
                        defaults
                            .entry(item_name.clone())
                            .or_insert_with(|| (*found).clone());
                    }
                }
            }
        }

        Self {
            store: parts,
            defaults,
            repeatables,
        }
    }

    /// Rebuild the store against `registry`
    ///
    /// Captured defaults and containers are registered first; entries the
    /// registry already holds are kept.
    pub fn restore(&self, registry: &Arc<MetadataRegistry>) -> MetadataStore {
        for (name, defaults) in &self.defaults {
            registry.register_defaults(name, defaults.clone());
        }
        for (item, container) in &self.repeatables {
            if let Err(existing) = registry.register_repeatable(item, container) {
                tracing::warn!(%item, %container, %existing, "snapshot container conflicts with registry");
            }
        }
        tracing::debug!(
            element = self.origin().unwrap_or_default(),
            annotations = self.store.all.len(),
            "restored metadata snapshot"
        );
        MetadataStore::from_parts(self.store.clone(), Arc::clone(registry))
    }

    /// Element the snapshot was captured from
    pub fn origin(&self) -> Option<&str> {
        self.store.origin.as_deref()
    }

    /// Captured annotation defaults
    pub fn defaults(&self) -> &IndexMap<TypeName, AttributeValues> {
        &self.defaults
    }

    /// Captured repeatable item -> container entries
    pub fn repeatables(&self) -> &IndexMap<TypeName, TypeName> {
        &self.repeatables
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<String, MetadataError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write as JSON to `path`
    pub fn write_to(&self, path: &Path) -> Result<(), MetadataError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read JSON from `path`
    pub fn read_from(path: &Path) -> Result<Self, MetadataError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Snapshots of many elements, keyed by element name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBundle {
    elements: IndexMap<String, MetadataSnapshot>,
}

impl SnapshotBundle {
    /// Empty bundle
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture `store` under `element`
    pub fn capture(&mut self, element: impl Into<String>, store: &MetadataStore) {
        self.elements
            .insert(element.into(), MetadataSnapshot::capture(store));
    }

    /// Add a snapshot under `element`
    pub fn insert(&mut self, element: impl Into<String>, snapshot: MetadataSnapshot) {
        self.elements.insert(element.into(), snapshot);
    }

    /// Snapshot of an element
    pub fn get(&self, element: &str) -> Option<&MetadataSnapshot> {
        self.elements.get(element)
    }

    /// Element names and snapshots, in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &MetadataSnapshot)> {
        self.elements.iter()
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the bundle is empty
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Encode as JSON
    pub fn to_json(&self) -> Result<String, MetadataError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON
    pub fn from_json(json: &str) -> Result<Self, MetadataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write as JSON to `path`
    pub fn write_to(&self, path: &Path) -> Result<(), MetadataError> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Read JSON from `path`
    pub fn read_from(path: &Path) -> Result<Self, MetadataError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

impl IntoIterator for SnapshotBundle {
    type Item = (String, MetadataSnapshot);
    type IntoIter = indexmap::map::IntoIter<String, MetadataSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}
