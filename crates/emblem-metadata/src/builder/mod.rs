//! Metadata store construction
//!
//! `MetadataBuilder` turns a `RawElement` into a `MetadataStore`:
//!
//! 1. walk the element's inheritance graph, most general layer first, so
//!    more specific layers overwrite inherited members
//! 2. run each raw annotation through the registered transformers,
//!    remappers and mappers
//! 3. apply member aliases; an alias into another annotation type turns that
//!    type into a stereotype of the current one
//! 4. route repeatable annotations into their container
//! 5. recurse into meta-annotations, recording each as a stereotype of the
//!    annotation chain that led to it
//!
//! Problems are collected as `BuildError`s against the element and never
//! abort the build.

pub mod raw;

use std::sync::Arc;

use emblem_core::{AnnotationValue, AttributeValues, TypeDescriptor, TypeName};
use indexmap::IndexMap;

use crate::config::BuilderConfig;
use crate::error::BuildError;
use crate::registry::MetadataRegistry;
use crate::store::{MetadataStore, MetadataStoreMut};

pub use raw::{AliasFor, AnnotationType, AnnotationTypes, ElementKind, RawAnnotation, RawElement};

/// Rewrites one annotation into zero or more annotations
pub type AnnotationMapper = Arc<dyn Fn(&AnnotationValue) -> Vec<AnnotationValue> + Send + Sync>;

/// Pluggable checks run on every annotation the builder adds
pub trait MetadataValidator: Send + Sync {
    /// Inspect an annotation about to be added to `element`
    fn validate(&self, element: &RawElement, annotation: &AnnotationValue) -> Vec<BuildError> {
        let _ = (element, annotation);
        Vec::new()
    }

    /// Observe a build error as soon as it is found
    fn report(&self, error: &BuildError) {
        let _ = error;
    }
}

/// Where an annotation ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layer {
    /// The element's own declaration
    Declared,
    /// A supertype or overridden member
    Inherited,
}

/// Builds metadata stores from raw elements
pub struct MetadataBuilder {
    registry: Arc<MetadataRegistry>,
    types: Arc<AnnotationTypes>,
    config: BuilderConfig,
    mappers: IndexMap<TypeName, Vec<AnnotationMapper>>,
    transformers: IndexMap<TypeName, Vec<AnnotationMapper>>,
    remappers: IndexMap<String, Vec<AnnotationMapper>>,
    validators: Vec<Arc<dyn MetadataValidator>>,
    errors: Vec<BuildError>,
}

impl MetadataBuilder {
    /// Builder over an annotation type catalog
    pub fn new(registry: Arc<MetadataRegistry>, types: Arc<AnnotationTypes>) -> Self {
        Self {
            registry,
            types,
            config: BuilderConfig::default(),
            mappers: IndexMap::new(),
            transformers: IndexMap::new(),
            remappers: IndexMap::new(),
            validators: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Apply builder configuration
    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    /// Add annotations derived from `annotation`, keeping the original
    pub fn add_mapper<F>(&mut self, annotation: impl Into<TypeName>, mapper: F)
    where
        F: Fn(&AnnotationValue) -> Vec<AnnotationValue> + Send + Sync + 'static,
    {
        self.mappers
            .entry(annotation.into())
            .or_default()
            .push(Arc::new(mapper));
    }

    /// Replace `annotation` with the transformer's output
    pub fn add_transformer<F>(&mut self, annotation: impl Into<TypeName>, transformer: F)
    where
        F: Fn(&AnnotationValue) -> Vec<AnnotationValue> + Send + Sync + 'static,
    {
        self.transformers
            .entry(annotation.into())
            .or_default()
            .push(Arc::new(transformer));
    }

    /// Replace every annotation of `package` with the remapper's output
    pub fn add_remapper<F>(&mut self, package: impl Into<String>, remapper: F)
    where
        F: Fn(&AnnotationValue) -> Vec<AnnotationValue> + Send + Sync + 'static,
    {
        self.remappers
            .entry(package.into())
            .or_default()
            .push(Arc::new(remapper));
    }

    /// Register a validator
    pub fn add_validator(&mut self, validator: Arc<dyn MetadataValidator>) {
        self.validators.push(validator);
    }

    /// Registry the built stores share
    pub fn registry(&self) -> &Arc<MetadataRegistry> {
        &self.registry
    }

    /// Errors collected since the last `take_errors`
    pub fn errors(&self) -> &[BuildError] {
        &self.errors
    }

    /// Drain the collected errors
    pub fn take_errors(&mut self) -> Vec<BuildError> {
        std::mem::take(&mut self.errors)
    }

    // ========================================================================
    // Building
    // ========================================================================

    /// Build the metadata of one element
    pub fn build(&mut self, element: &RawElement) -> MetadataStore {
        let origin = element.qualified_name();
        let mut store = MetadataStoreMut::new(Arc::clone(&self.registry));
        store.set_origin(origin.clone());

        let layers = element.hierarchy();
        let own = layers.len() - 1;
        for (index, layer) in layers.into_iter().enumerate() {
            let kind = if index == own {
                Layer::Declared
            } else {
                Layer::Inherited
            };
            for raw in layer.annotations() {
                for annotation in self.map_annotation(raw) {
                    if kind == Layer::Inherited && !self.is_inherited(annotation.annotation_name()) {
                        continue;
                    }
                    self.run_validators(element, &annotation);
                    self.add_annotation(&mut store, &origin, annotation, kind);
                }
            }
        }

        let store = store.freeze();
        tracing::trace!(element = %origin, annotations = store.all().len(), "built metadata");
        store
    }

    /// Build every element, in order
    pub fn build_all<'a, I>(&mut self, elements: I) -> Vec<MetadataStore>
    where
        I: IntoIterator<Item = &'a RawElement>,
    {
        elements.into_iter().map(|element| self.build(element)).collect()
    }

    fn map_annotation(&self, raw: &AnnotationValue) -> Vec<AnnotationValue> {
        let name = raw.annotation_name();
        if let Some(transformers) = self.transformers.get(name) {
            return transformers.iter().flat_map(|t| t(raw)).collect();
        }
        if let Some(remappers) = self.remappers.get(name.package()) {
            return remappers.iter().flat_map(|r| r(raw)).collect();
        }
        let mut mapped = vec![raw.clone()];
        if let Some(mappers) = self.mappers.get(name) {
            mapped.extend(mappers.iter().flat_map(|m| m(raw)));
        }
        mapped
    }

    fn is_inherited(&self, annotation: &TypeName) -> bool {
        self.config.inherit_all
            || self
                .types
                .get(annotation)
                .is_some_and(AnnotationType::is_inherited)
    }

    fn run_validators(&mut self, element: &RawElement, annotation: &AnnotationValue) {
        let found: Vec<BuildError> = self
            .validators
            .iter()
            .flat_map(|v| v.validate(element, annotation))
            .collect();
        for error in found {
            self.record(error);
        }
    }

    fn record(&mut self, error: BuildError) {
        tracing::warn!(element = error.element(), %error, "metadata build error");
        for validator in &self.validators {
            validator.report(&error);
        }
        self.errors.push(error);
    }

    // ========================================================================
    // Annotations
    // ========================================================================

    fn add_annotation(
        &mut self,
        store: &mut MetadataStoreMut,
        origin: &str,
        annotation: AnnotationValue,
        layer: Layer,
    ) {
        let name = annotation.annotation_name().clone();
        let definition = self.types.get(&name).cloned();
        self.register_type(&name, definition.as_ref());
        let container = definition
            .as_ref()
            .and_then(|ty| self.repeatable_container(origin, ty));

        let (values, cross) = self.apply_aliases(origin, &annotation, definition.as_ref());
        let value = AnnotationValue::with_values(name.clone(), values);
        match layer {
            Layer::Declared => store.add_declared_annotation(value),
            Layer::Inherited => store.add_annotation(value),
        }

        let carrier = container.unwrap_or_else(|| name.clone());
        let mut parents = vec![carrier];
        let mut visiting = vec![name];
        // Aliased values win over the meta-annotation's own values
        if let Some(ty) = definition {
            self.add_meta_annotations(store, origin, &ty, &mut parents, &mut visiting, layer);
        }
        self.add_alias_stereotypes(store, origin, cross, &mut parents, &mut visiting, layer);
    }

    fn add_meta_annotations(
        &mut self,
        store: &mut MetadataStoreMut,
        origin: &str,
        ty: &AnnotationType,
        parents: &mut Vec<TypeName>,
        visiting: &mut Vec<TypeName>,
        layer: Layer,
    ) {
        for raw in ty.meta_annotations() {
            for meta in self.map_annotation(raw) {
                self.add_stereotype(store, origin, meta, parents, visiting, layer);
            }
        }
    }

    fn add_stereotype(
        &mut self,
        store: &mut MetadataStoreMut,
        origin: &str,
        stereotype: AnnotationValue,
        parents: &mut Vec<TypeName>,
        visiting: &mut Vec<TypeName>,
        layer: Layer,
    ) {
        let name = stereotype.annotation_name().clone();
        if visiting.contains(&name) {
            let mut chain = visiting.clone();
            chain.push(name);
            self.record(BuildError::StereotypeCycle {
                element: origin.to_string(),
                chain,
            });
            return;
        }

        let definition = self.types.get(&name).cloned();
        self.register_type(&name, definition.as_ref());
        let container = definition
            .as_ref()
            .and_then(|ty| self.repeatable_container(origin, ty));

        let (values, cross) = self.apply_aliases(origin, &stereotype, definition.as_ref());
        let value = AnnotationValue::with_values(name.clone(), values);
        match layer {
            Layer::Declared => store.add_declared_stereotype(parents, value),
            Layer::Inherited => store.add_stereotype(parents, value),
        }

        parents.push(container.unwrap_or_else(|| name.clone()));
        visiting.push(name);
        if let Some(ty) = definition {
            self.add_meta_annotations(store, origin, &ty, parents, visiting, layer);
        }
        self.add_alias_stereotypes(store, origin, cross, parents, visiting, layer);
        visiting.pop();
        parents.pop();
    }

    fn add_alias_stereotypes(
        &mut self,
        store: &mut MetadataStoreMut,
        origin: &str,
        cross: Vec<AnnotationValue>,
        parents: &mut Vec<TypeName>,
        visiting: &mut Vec<TypeName>,
        layer: Layer,
    ) {
        for target in cross {
            self.add_stereotype(store, origin, target, parents, visiting, layer);
        }
    }

    // ========================================================================
    // Type definitions
    // ========================================================================

    fn register_type(&self, name: &TypeName, definition: Option<&AnnotationType>) {
        self.registry
            .types()
            .register(TypeDescriptor::annotation(name.clone()));
        if let Some(ty) = definition {
            if !ty.defaults().is_empty() {
                self.registry.register_defaults(name, ty.defaults().clone());
            }
        }
    }

    /// Validated container of a repeatable type
    fn repeatable_container(&mut self, origin: &str, ty: &AnnotationType) -> Option<TypeName> {
        let container = ty.container()?.clone();
        let usable = &container != ty.name() && self.types.contains(&container);
        if usable && self.registry.register_repeatable(ty.name(), &container).is_ok() {
            self.register_type(&container, self.types.get(&container));
            return Some(container);
        }
        self.record(BuildError::RepeatableMismatch {
            element: origin.to_string(),
            annotation: ty.name().clone(),
            container,
        });
        None
    }

    /// Apply member aliases
    ///
    /// Returns the annotation's own members, with same-type aliases added,
    /// and one value per aliased foreign annotation type.
    fn apply_aliases(
        &mut self,
        origin: &str,
        annotation: &AnnotationValue,
        definition: Option<&AnnotationType>,
    ) -> (AttributeValues, Vec<AnnotationValue>) {
        let mut values = annotation.values().clone();
        let mut cross: IndexMap<TypeName, AttributeValues> = IndexMap::new();
        let Some(ty) = definition else {
            return (values, Vec::new());
        };

        for (member, value) in annotation.values() {
            for alias in ty.aliases_of(member) {
                match &alias.annotation {
                    None => {
                        values.entry(alias.member.clone()).or_insert_with(|| value.clone());
                    }
                    Some(target) if target == ty.name() => {
                        values.entry(alias.member.clone()).or_insert_with(|| value.clone());
                    }
                    Some(target) if self.types.contains(target) => {
                        cross
                            .entry(target.clone())
                            .or_default()
                            .insert(alias.member.clone(), value.clone());
                    }
                    Some(target) => self.record(BuildError::UnresolvedAlias {
                        element: origin.to_string(),
                        annotation: ty.name().clone(),
                        member: member.clone(),
                        target: target.clone(),
                    }),
                }
            }
        }

        let cross = cross
            .into_iter()
            .map(|(target, values)| AnnotationValue::with_values(target, values))
            .collect();
        (values, cross)
    }
}

impl std::fmt::Debug for MetadataBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataBuilder")
            .field("types", &self.types.len())
            .field("mappers", &self.mappers.len())
            .field("transformers", &self.transformers.len())
            .field("remappers", &self.remappers.len())
            .field("validators", &self.validators.len())
            .field("errors", &self.errors.len())
            .finish()
    }
}
