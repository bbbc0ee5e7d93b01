//! Lazily restored metadata
//!
//! `MetadataRepository` holds snapshots keyed by element name and turns each
//! into a `MetadataStore` on first access. Restored stores are cached, so
//! concurrent readers of the same element share one instance.

use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;

use crate::error::MetadataError;
use crate::registry::MetadataRegistry;
use crate::snapshot::{MetadataSnapshot, SnapshotBundle};
use crate::store::MetadataStore;

/// Element name -> metadata, restored on demand
#[derive(Debug)]
pub struct MetadataRepository {
    registry: Arc<MetadataRegistry>,
    snapshots: DashMap<String, Arc<MetadataSnapshot>>,
    stores: DashMap<String, MetadataStore>,
}

impl MetadataRepository {
    /// Empty repository restoring into `registry`
    pub fn new(registry: Arc<MetadataRegistry>) -> Self {
        Self {
            registry,
            snapshots: DashMap::new(),
            stores: DashMap::new(),
        }
    }

    /// Repository over every snapshot of a bundle
    pub fn from_bundle(registry: Arc<MetadataRegistry>, bundle: SnapshotBundle) -> Self {
        let repository = Self::new(registry);
        for (element, snapshot) in bundle {
            repository.insert_snapshot(element, snapshot);
        }
        repository
    }

    /// Repository over a bundle file
    pub fn load(registry: Arc<MetadataRegistry>, path: &Path) -> Result<Self, MetadataError> {
        let bundle = SnapshotBundle::read_from(path)?;
        tracing::debug!(path = %path.display(), elements = bundle.len(), "loaded snapshot bundle");
        Ok(Self::from_bundle(registry, bundle))
    }

    /// Add or replace the snapshot of an element
    ///
    /// A store already restored for the element is dropped.
    pub fn insert_snapshot(&self, element: impl Into<String>, snapshot: MetadataSnapshot) {
        let element = element.into();
        self.stores.remove(&element);
        self.snapshots.insert(element, Arc::new(snapshot));
    }

    /// Metadata of an element, restoring it on first access
    pub fn get(&self, element: &str) -> Option<MetadataStore> {
        if let Some(store) = self.stores.get(element) {
            return Some(store.value().clone());
        }
        let snapshot = self
            .snapshots
            .get(element)
            .map(|entry| Arc::clone(entry.value()))?;
        let store = self
            .stores
            .entry(element.to_string())
            .or_insert_with(|| snapshot.restore(&self.registry))
            .value()
            .clone();
        Some(store)
    }

    /// Check if an element has a snapshot
    pub fn contains(&self, element: &str) -> bool {
        self.snapshots.contains_key(element)
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Check if the repository is empty
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Number of elements restored so far
    pub fn restored_count(&self) -> usize {
        self.stores.len()
    }

    /// Registry stores are restored into
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }
}
