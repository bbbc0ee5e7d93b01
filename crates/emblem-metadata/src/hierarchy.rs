//! Layered metadata
//!
//! A `MetadataHierarchy` presents several metadata sources as one. Layer 0 is
//! the most specific (the element itself); later layers are supertypes or
//! overridden members. Declared queries only consult layer 0, presence and
//! single-valued queries take the first layer with an answer, and multi-valued
//! queries concatenate. `find_annotation` is the exception: it merges the
//! annotation across every layer declaring it, earlier layers winning per key.

use std::sync::Arc;

use emblem_convert::ConversionService;
use emblem_core::{AnnotationValue, TypeName, Value};
use rustc_hash::FxHashSet;

use crate::error::MetadataError;
use crate::merge::merge_annotation_values;
use crate::metadata::{AnnotationMetadata, Scope};

/// Metadata layers, most specific first
#[derive(Clone)]
pub struct MetadataHierarchy {
    layers: Vec<Arc<dyn AnnotationMetadata>>,
}

impl MetadataHierarchy {
    /// Stack `layers`, most specific first
    pub fn new(layers: Vec<Arc<dyn AnnotationMetadata>>) -> Result<Self, MetadataError> {
        if layers.is_empty() {
            return Err(MetadataError::EmptyHierarchy);
        }
        Ok(Self { layers })
    }

    /// Stack `layers`, collapsing to the first layer when the rest are empty
    pub fn compose(
        layers: Vec<Arc<dyn AnnotationMetadata>>,
    ) -> Result<Arc<dyn AnnotationMetadata>, MetadataError> {
        let hierarchy = Self::new(layers)?;
        if hierarchy.layers[1..].iter().all(|layer| layer.is_empty()) {
            return Ok(Arc::clone(&hierarchy.layers[0]));
        }
        Ok(Arc::new(hierarchy))
    }

    /// The layers, most specific first
    pub fn layers(&self) -> &[Arc<dyn AnnotationMetadata>] {
        &self.layers
    }

    /// The most specific layer
    pub fn declared_layer(&self) -> &Arc<dyn AnnotationMetadata> {
        &self.layers[0]
    }

    fn scoped(&self, scope: Scope) -> &[Arc<dyn AnnotationMetadata>] {
        match scope {
            Scope::Declared => &self.layers[..1],
            Scope::All => &self.layers,
        }
    }

    fn union<F>(&self, names: F) -> Vec<TypeName>
    where
        F: Fn(&dyn AnnotationMetadata) -> Vec<TypeName>,
    {
        let mut seen = FxHashSet::default();
        self.layers
            .iter()
            .flat_map(|layer| names(layer.as_ref()))
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    fn distinct<F>(&self, values: F) -> Vec<AnnotationValue>
    where
        F: Fn(&dyn AnnotationMetadata) -> Vec<AnnotationValue>,
    {
        let mut collected: Vec<AnnotationValue> = Vec::new();
        for value in self.layers.iter().flat_map(|layer| values(layer.as_ref())) {
            if !collected.contains(&value) {
                collected.push(value);
            }
        }
        collected
    }
}

impl AnnotationMetadata for MetadataHierarchy {
    fn has_annotation(&self, annotation: &str) -> bool {
        self.layers.iter().any(|layer| layer.has_annotation(annotation))
    }

    fn has_declared_annotation(&self, annotation: &str) -> bool {
        self.declared_layer().has_declared_annotation(annotation)
    }

    fn has_stereotype(&self, annotation: &str) -> bool {
        self.layers.iter().any(|layer| layer.has_stereotype(annotation))
    }

    fn has_declared_stereotype(&self, annotation: &str) -> bool {
        self.declared_layer().has_declared_stereotype(annotation)
    }

    fn is_empty(&self) -> bool {
        self.layers.iter().all(|layer| layer.is_empty())
    }

    fn annotation_names(&self) -> Vec<TypeName> {
        self.union(|layer| layer.annotation_names())
    }

    fn declared_annotation_names(&self) -> Vec<TypeName> {
        self.declared_layer().declared_annotation_names()
    }

    fn stereotype_names(&self) -> Vec<TypeName> {
        self.union(|layer| layer.stereotype_names())
    }

    fn declared_stereotype_names(&self) -> Vec<TypeName> {
        self.declared_layer().declared_stereotype_names()
    }

    fn annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName> {
        self.union(|layer| layer.annotation_names_by_stereotype(stereotype))
    }

    fn declared_annotation_names_by_stereotype(&self, stereotype: &str) -> Vec<TypeName> {
        self.declared_layer()
            .declared_annotation_names_by_stereotype(stereotype)
    }

    fn find_annotation(&self, annotation: &str) -> Option<AnnotationValue> {
        merge_annotation_values(
            self.layers
                .iter()
                .filter_map(|layer| layer.find_annotation(annotation)),
        )
    }

    fn find_declared_annotation(&self, annotation: &str) -> Option<AnnotationValue> {
        self.declared_layer().find_declared_annotation(annotation)
    }

    fn annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue> {
        self.distinct(|layer| layer.annotation_values_by_type(annotation))
    }

    fn declared_annotation_values_by_type(&self, annotation: &str) -> Vec<AnnotationValue> {
        self.declared_layer()
            .declared_annotation_values_by_type(annotation)
    }

    fn annotation_values_by_stereotype(&self, stereotype: &str) -> Vec<AnnotationValue> {
        self.distinct(|layer| layer.annotation_values_by_stereotype(stereotype))
    }

    fn raw_value(&self, annotation: &str, member: &str, scope: Scope) -> Option<Value> {
        self.scoped(scope)
            .iter()
            .find_map(|layer| layer.raw_value(annotation, member, scope))
    }

    fn raw_values(&self, annotation: &str, member: &str, scope: Scope) -> Vec<Value> {
        self.scoped(scope)
            .iter()
            .flat_map(|layer| layer.raw_values(annotation, member, scope))
            .collect()
    }

    fn conversion(&self) -> &ConversionService {
        self.declared_layer().conversion()
    }

    fn origin(&self) -> Option<&str> {
        self.declared_layer().origin()
    }
}

impl std::fmt::Debug for MetadataHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataHierarchy")
            .field("origin", &self.origin())
            .field("layers", &self.layers.len())
            .finish()
    }
}
