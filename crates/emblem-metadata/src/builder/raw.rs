//! Builder input model
//!
//! The element walker hands the builder `RawElement`s: the element's own
//! annotations plus the elements it inherits from (supertypes for a type,
//! overridden members for a method). Annotation type definitions, with their
//! defaults, aliases, repeatable container and meta-annotations, come from an
//! `AnnotationTypes` catalog.

use std::collections::VecDeque;

use emblem_core::{AnnotationValue, AttributeValues, TypeName, Value};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// An annotation instance as read from source
pub type RawAnnotation = AnnotationValue;

/// What kind of program element carries the annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// Class, interface, enum or annotation type
    Type,
    /// Method
    Method,
    /// Constructor
    Constructor,
    /// Field
    Field,
    /// Method or constructor parameter
    Parameter,
}

/// A program element and the annotations attached to it
#[derive(Debug, Clone)]
pub struct RawElement {
    name: String,
    kind: ElementKind,
    declaring_type: Option<TypeName>,
    annotations: Vec<RawAnnotation>,
    inherits_from: Vec<RawElement>,
}

impl RawElement {
    /// Element with no annotations
    pub fn new(name: impl Into<String>, kind: ElementKind) -> Self {
        Self {
            name: name.into(),
            kind,
            declaring_type: None,
            annotations: Vec::new(),
            inherits_from: Vec::new(),
        }
    }

    /// Type element
    pub fn type_element(name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Type)
    }

    /// Method element declared by `declaring_type`
    pub fn method(declaring_type: impl Into<TypeName>, name: impl Into<String>) -> Self {
        Self::new(name, ElementKind::Method).declared_by(declaring_type)
    }

    /// Set the declaring type
    pub fn declared_by(mut self, declaring_type: impl Into<TypeName>) -> Self {
        self.declaring_type = Some(declaring_type.into());
        self
    }

    /// Attach an annotation
    pub fn annotate(mut self, annotation: RawAnnotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Add a supertype or overridden member
    pub fn inherits(mut self, parent: RawElement) -> Self {
        self.inherits_from.push(parent);
        self
    }

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element kind
    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Declaring type of a member
    pub fn declaring_type(&self) -> Option<&TypeName> {
        self.declaring_type.as_ref()
    }

    /// Annotations attached directly, in source order
    pub fn annotations(&self) -> &[RawAnnotation] {
        &self.annotations
    }

    /// Direct supertypes or overridden members
    pub fn parents(&self) -> &[RawElement] {
        &self.inherits_from
    }

    /// Qualified name, `Type#member` for members
    pub fn qualified_name(&self) -> String {
        match &self.declaring_type {
            Some(owner) => format!("{}#{}", owner, self.name),
            None => self.name.clone(),
        }
    }

    /// Every element in the inheritance graph, most general first
    ///
    /// The element itself comes last. A type, or a member with a declaring
    /// type, reachable along several paths appears once, at its most specific
    /// position. Members without a declaring type are never merged.
    pub fn hierarchy(&self) -> Vec<&RawElement> {
        let mut seen = FxHashSet::default();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([self]);
        while let Some(element) = queue.pop_front() {
            if !seen.insert(element.identity()) {
                continue;
            }
            order.push(element);
            queue.extend(element.inherits_from.iter());
        }
        order.reverse();
        order
    }

    fn identity(&self) -> ElementIdentity {
        match (&self.declaring_type, self.kind) {
            (None, ElementKind::Type) | (Some(_), _) => {
                ElementIdentity::Named(self.kind, self.qualified_name())
            }
            (None, _) => ElementIdentity::Anonymous(self as *const RawElement as usize),
        }
    }
}

/// Key deduplicating elements in a hierarchy walk
#[derive(Debug, PartialEq, Eq, Hash)]
enum ElementIdentity {
    Named(ElementKind, String),
    /// Address of an element with no qualified name
    Anonymous(usize),
}

/// Target of a member alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasFor {
    /// Annotation type receiving the value; `None` means the same type
    pub annotation: Option<TypeName>,
    /// Member receiving the value
    pub member: String,
}

impl AliasFor {
    /// Alias to another member of the same annotation
    pub fn member(member: impl Into<String>) -> Self {
        Self {
            annotation: None,
            member: member.into(),
        }
    }

    /// Alias to a member of another annotation
    pub fn annotation(annotation: impl Into<TypeName>, member: impl Into<String>) -> Self {
        Self {
            annotation: Some(annotation.into()),
            member: member.into(),
        }
    }
}

/// Definition of an annotation type
#[derive(Debug, Clone)]
pub struct AnnotationType {
    name: TypeName,
    defaults: AttributeValues,
    aliases: IndexMap<String, Vec<AliasFor>>,
    container: Option<TypeName>,
    meta_annotations: Vec<RawAnnotation>,
    inherited: bool,
}

impl AnnotationType {
    /// Type with no members
    pub fn new(name: impl Into<TypeName>) -> Self {
        Self {
            name: name.into(),
            defaults: AttributeValues::new(),
            aliases: IndexMap::new(),
            container: None,
            meta_annotations: Vec::new(),
            inherited: false,
        }
    }

    /// Declare a member default
    pub fn default_value(mut self, member: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(member.into(), value.into());
        self
    }

    /// Alias `member` to another member
    pub fn alias(mut self, member: impl Into<String>, target: AliasFor) -> Self {
        self.aliases.entry(member.into()).or_default().push(target);
        self
    }

    /// Make the type repeatable into `container`
    pub fn repeatable(mut self, container: impl Into<TypeName>) -> Self {
        self.container = Some(container.into());
        self
    }

    /// Annotate the annotation type itself
    pub fn meta(mut self, annotation: RawAnnotation) -> Self {
        self.meta_annotations.push(annotation);
        self
    }

    /// Let supertypes and overridden members pass the annotation on
    pub fn inherited(mut self) -> Self {
        self.inherited = true;
        self
    }

    /// Type name
    pub fn name(&self) -> &TypeName {
        &self.name
    }

    /// Member defaults
    pub fn defaults(&self) -> &AttributeValues {
        &self.defaults
    }

    /// Alias targets of a member
    pub fn aliases_of(&self, member: &str) -> &[AliasFor] {
        self.aliases.get(member).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Container type if repeatable
    pub fn container(&self) -> Option<&TypeName> {
        self.container.as_ref()
    }

    /// Meta-annotations
    pub fn meta_annotations(&self) -> &[RawAnnotation] {
        &self.meta_annotations
    }

    /// Check if the type is inherited
    pub fn is_inherited(&self) -> bool {
        self.inherited
    }
}

/// Catalog of annotation type definitions
#[derive(Debug, Clone, Default)]
pub struct AnnotationTypes {
    types: IndexMap<TypeName, AnnotationType>,
}

impl AnnotationTypes {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition, replacing any previous one of the same name
    pub fn define(mut self, annotation_type: AnnotationType) -> Self {
        self.insert(annotation_type);
        self
    }

    /// Add a definition in place
    pub fn insert(&mut self, annotation_type: AnnotationType) {
        self.types
            .insert(annotation_type.name.clone(), annotation_type);
    }

    /// Look up a definition
    pub fn get(&self, name: &str) -> Option<&AnnotationType> {
        self.types.get(name)
    }

    /// Check if a definition exists
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Number of definitions
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
