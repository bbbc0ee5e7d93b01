//! Process-wide metadata registries
//!
//! `MetadataRegistry` is the explicit service holding what is shared by every
//! store: default member values per annotation type, the repeatable item ->
//! container table and the conversion service typed getters go through.
//! Entries are insert-if-absent and never pruned; tests construct their own
//! registry instead of sharing a global one.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use emblem_convert::{ConversionConfig, ConversionService};
use emblem_core::{create_standard_registry, AttributeValues, TypeName, TypeRegistry, Value};

/// Shared default-value and repeatable-container tables
#[derive(Debug)]
pub struct MetadataRegistry {
    conversion: Arc<ConversionService>,
    defaults: DashMap<TypeName, Arc<AttributeValues>>,
    repeatables: DashMap<TypeName, TypeName>,
}

impl MetadataRegistry {
    /// Registry converting through `conversion`
    pub fn new(conversion: Arc<ConversionService>) -> Self {
        Self {
            conversion,
            defaults: DashMap::new(),
            repeatables: DashMap::new(),
        }
    }

    /// Registry over the built-in type universe and converters
    pub fn standard() -> Self {
        Self::with_config(&ConversionConfig::default())
    }

    /// Registry over the built-in universe with the given cache tuning
    pub fn with_config(config: &ConversionConfig) -> Self {
        let types = Arc::new(create_standard_registry());
        Self::new(Arc::new(ConversionService::with_config(types, config)))
    }

    /// Conversion service
    pub fn conversion(&self) -> &ConversionService {
        &self.conversion
    }

    /// Shared handle to the conversion service
    pub fn conversion_handle(&self) -> Arc<ConversionService> {
        Arc::clone(&self.conversion)
    }

    /// Known-type registry
    pub fn types(&self) -> &Arc<TypeRegistry> {
        self.conversion.types()
    }

    // ========================================================================
    // Default values
    // ========================================================================

    /// Record the defaults of an annotation type
    ///
    /// The first registration wins; returns false if defaults were already
    /// present.
    pub fn register_defaults(&self, annotation: &TypeName, defaults: AttributeValues) -> bool {
        match self.defaults.entry(annotation.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                tracing::trace!(%annotation, members = defaults.len(), "registered defaults");
                slot.insert(Arc::new(defaults));
                true
            }
        }
    }

    /// Defaults of an annotation type
    pub fn defaults(&self, annotation: &str) -> Option<Arc<AttributeValues>> {
        self.defaults
            .get(annotation)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Default value of one member
    pub fn default_value(&self, annotation: &str, member: &str) -> Option<Value> {
        self.defaults.get(annotation)?.get(member).cloned()
    }

    /// Defaults of an annotation type, or an empty map
    pub(crate) fn defaults_or_empty(&self, annotation: &str) -> AttributeValues {
        self.defaults(annotation)
            .map(|defaults| (*defaults).clone())
            .unwrap_or_default()
    }

    // ========================================================================
    // Repeatable containers
    // ========================================================================

    /// Record that `item` repeats into `container`
    ///
    /// Fails with the already registered container if it differs.
    pub fn register_repeatable(&self, item: &TypeName, container: &TypeName) -> Result<(), TypeName> {
        match self.repeatables.entry(item.clone()) {
            Entry::Occupied(existing) if existing.get() != container => Err(existing.get().clone()),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(slot) => {
                slot.insert(container.clone());
                Ok(())
            }
        }
    }

    /// Container of a repeatable item type
    pub fn repeatable_container(&self, item: &str) -> Option<TypeName> {
        self.repeatables.get(item).map(|entry| entry.value().clone())
    }

    /// Check if `container` aggregates `item`
    pub fn is_container_of(&self, container: &str, item: &str) -> bool {
        self.repeatables
            .get(item)
            .is_some_and(|entry| entry.value() == container)
    }
}
