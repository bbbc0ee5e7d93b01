//! Integration tests for layered metadata
//!
//! Tests cover:
//! - Per-key merge of `find_annotation` across layers
//! - Declared-only queries against the first layer
//! - Concatenation of multi-valued queries
//! - Collapsing of single-layer hierarchies
//! - Copy-and-mutate round trips on stores

use std::sync::Arc;

use emblem_core::{AnnotationValue, TypeName, Value, VALUE_MEMBER};
use emblem_metadata::{
    merge_annotation_values, AnnotationMetadata, AnnotationType, AnnotationTypes, MetadataBuilder,
    MetadataError, MetadataHierarchy, MetadataRegistry, MetadataStore, RawElement,
};

fn registry() -> Arc<MetadataRegistry> {
    Arc::new(MetadataRegistry::standard())
}

fn layer(registry: &Arc<MetadataRegistry>, values: Vec<AnnotationValue>) -> Arc<dyn AnnotationMetadata> {
    let mut store = MetadataStore::empty(Arc::clone(registry)).mutate();
    for value in values {
        store.add_declared_annotation(value);
    }
    Arc::new(store.freeze())
}

// ============================================================================
// Merge precedence
// ============================================================================

mod precedence {
    use super::*;

    #[test]
    fn test_child_wins_per_key() {
        let registry = registry();
        let child = layer(&registry, vec![AnnotationValue::new("X").member("a", 1)]);
        let parent = layer(&registry, vec![AnnotationValue::new("X").member("a", 2).member("b", 3)]);
        let hierarchy = MetadataHierarchy::new(vec![child, parent]).unwrap();

        let merged = hierarchy.find_annotation("X").unwrap();
        assert_eq!(merged.values().get("a"), Some(&Value::Int(1)));
        assert_eq!(merged.values().get("b"), Some(&Value::Int(3)));
        assert_eq!(merged.values().len(), 2);

        // Single-valued getters take the first layer with a value
        assert_eq!(hierarchy.int_value("X", "a"), Some(1));
        assert_eq!(hierarchy.int_value("X", "b"), Some(3));
    }

    #[test]
    fn test_merge_routine_matches_hierarchy() {
        let merged = merge_annotation_values(vec![
            AnnotationValue::new("X").member("a", 1),
            AnnotationValue::new("X").member("a", 2).member("b", 3),
        ])
        .unwrap();
        assert_eq!(merged, AnnotationValue::new("X").member("a", 1).member("b", 3));
    }

    #[test]
    fn test_find_declared_uses_first_layer_only() {
        let registry = registry();
        let hierarchy = MetadataHierarchy::new(vec![
            layer(&registry, vec![AnnotationValue::new("X").member("a", 1)]),
            layer(&registry, vec![AnnotationValue::new("X").member("b", 3)]),
        ])
        .unwrap();

        let declared = hierarchy.find_declared_annotation("X").unwrap();
        assert_eq!(declared.values().get("b"), None);
        assert_eq!(hierarchy.declared_long_value("X", "b"), None);
        assert_eq!(hierarchy.long_value("X", "b"), Some(3));
    }
}

// ============================================================================
// Layered queries
// ============================================================================

mod layered {
    use super::*;

    #[test]
    fn test_names() {
        let registry = registry();
        let hierarchy = MetadataHierarchy::new(vec![
            layer(&registry, vec![AnnotationValue::new("A"), AnnotationValue::new("B")]),
            layer(&registry, vec![AnnotationValue::new("B"), AnnotationValue::new("C")]),
        ])
        .unwrap();

        let all: Vec<_> = hierarchy.annotation_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(all, vec!["A", "B", "C"]);
        assert_eq!(
            hierarchy.declared_annotation_names(),
            vec![TypeName::new("A"), TypeName::new("B")]
        );
        assert!(hierarchy.has_annotation("C"));
        assert!(!hierarchy.has_declared_annotation("C"));
    }

    #[test]
    fn test_multi_valued_concatenate() {
        let registry = registry();
        let hierarchy = MetadataHierarchy::new(vec![
            layer(&registry, vec![AnnotationValue::new("Produces").member(
                VALUE_MEMBER,
                Value::string_array(["application/json"]),
            )]),
            layer(&registry, vec![AnnotationValue::new("Produces").member(
                VALUE_MEMBER,
                Value::string_array(["text/plain", "application/json"]),
            )]),
        ])
        .unwrap();

        assert_eq!(
            hierarchy.string_values("Produces", VALUE_MEMBER),
            vec!["application/json", "text/plain", "application/json"]
        );
    }

    #[test]
    fn test_built_layers() {
        let registry = registry();
        let types = Arc::new(
            AnnotationTypes::new()
                .define(AnnotationType::new("app.Named").meta(AnnotationValue::new("app.Qualifier"))),
        );
        let mut builder = MetadataBuilder::new(Arc::clone(&registry), types);
        let method = builder.build(
            &RawElement::method("app.Repo", "find")
                .annotate(AnnotationValue::new("app.Named").member(VALUE_MEMBER, "primary")),
        );
        let owner = builder.build(
            &RawElement::type_element("app.Repo").annotate(AnnotationValue::new("app.Singleton")),
        );

        let layers: Vec<Arc<dyn AnnotationMetadata>> = vec![Arc::new(method), Arc::new(owner)];
        let hierarchy = MetadataHierarchy::new(layers).unwrap();
        assert!(hierarchy.has_stereotype("app.Qualifier"));
        assert!(hierarchy.has_annotation("app.Singleton"));
        assert_eq!(
            hierarchy.annotation_type_by_stereotype("app.Qualifier"),
            Some(TypeName::new("app.Named"))
        );
        assert_eq!(hierarchy.origin(), Some("app.Repo#find"));
    }

    #[test]
    fn test_repeated_values_are_distinct() {
        let registry = registry();
        registry
            .register_repeatable(&TypeName::new("Tag"), &TypeName::new("Tags"))
            .unwrap();
        let tag = |v: &str| AnnotationValue::new("Tag").member(VALUE_MEMBER, v);
        let hierarchy = MetadataHierarchy::new(vec![
            layer(&registry, vec![tag("x"), tag("y")]),
            layer(&registry, vec![tag("y"), tag("z")]),
        ])
        .unwrap();

        let tags: Vec<_> = hierarchy
            .annotation_values_by_type("Tag")
            .iter()
            .filter_map(|av| av.string_value(VALUE_MEMBER))
            .collect();
        assert_eq!(tags, vec!["x", "y", "z"]);
    }
}

// ============================================================================
// Composition
// ============================================================================

mod composition {
    use super::*;

    #[test]
    fn test_empty_rejected() {
        assert!(matches!(
            MetadataHierarchy::compose(Vec::new()),
            Err(MetadataError::EmptyHierarchy)
        ));
    }

    #[test]
    fn test_collapse_is_observably_equivalent() {
        let registry = registry();
        let child = layer(&registry, vec![AnnotationValue::new("X").member("a", 1)]);
        let empty: Arc<dyn AnnotationMetadata> = Arc::new(MetadataStore::empty(Arc::clone(&registry)));

        let collapsed = MetadataHierarchy::compose(vec![Arc::clone(&child), Arc::clone(&empty)]).unwrap();
        let full = MetadataHierarchy::new(vec![child, empty]).unwrap();

        assert_eq!(collapsed.find_annotation("X"), full.find_annotation("X"));
        assert_eq!(collapsed.annotation_names(), full.annotation_names());
        assert_eq!(collapsed.int_value("X", "a"), full.int_value("X", "a"));
    }
}

// ============================================================================
// Copy and mutate
// ============================================================================

mod mutation {
    use super::*;

    #[test]
    fn test_round_trip() {
        let original = MetadataStore::empty(registry());
        let added = original.with_annotation(AnnotationValue::new("A").member("member", "v"));
        assert_eq!(added.string_value("A", "member"), Some("v".to_string()));

        let removed = added.without_annotation("A");
        assert!(!removed.has_annotation("A"));
        assert!(added.has_annotation("A"));
        assert!(original.is_empty());
    }

    #[test]
    fn test_inherited_add_is_not_declared() {
        let mut store = MetadataStore::empty(registry()).mutate();
        store.add_annotation(AnnotationValue::new("A"));
        let store = store.freeze();
        assert!(store.has_annotation("A"));
        assert!(!store.has_declared_annotation("A"));
    }

    #[test]
    fn test_equality_ignores_registry() {
        let a = MetadataStore::empty(registry()).with_annotation(AnnotationValue::new("A"));
        let b = MetadataStore::empty(registry()).with_annotation(AnnotationValue::new("A"));
        assert_eq!(a, b);
    }
}
