//! Integration tests for placeholder-aware metadata
//!
//! Tests cover:
//! - Strict resolution on single-valued and required getters
//! - Best-effort resolution and comma splitting on multi-valued getters
//! - Placeholder resolution inside found annotation values
//! - Decorating hierarchies
//! - Custom placeholder syntax from configuration

use std::sync::Arc;

use emblem_core::{AnnotationValue, Argument, TypeName, Value, VALUE_MEMBER};
use emblem_metadata::{
    AnnotationMetadata, EnvironmentMetadata, MetadataConfig, MetadataError, MetadataHierarchy,
    MetadataRegistry, MetadataStore, PlaceholderError, PropertyPlaceholderResolver,
};

fn properties() -> Arc<PropertyPlaceholderResolver> {
    Arc::new(
        PropertyPlaceholderResolver::new()
            .with_property("client.host", "example.org")
            .with_property("client.port", "8443")
            .with_property("client.url", "https://${client.host}:${client.port}")
            .with_property("client.tags", "red, green,blue")
            .with_property("client.type", "Integer")
            .with_property("client.enabled", "yes"),
    )
}

fn client(values: AnnotationValue) -> EnvironmentMetadata {
    let store = MetadataStore::empty(Arc::new(MetadataRegistry::standard())).with_annotation(values);
    EnvironmentMetadata::new(Arc::new(store), properties())
}

// ============================================================================
// Single-valued
// ============================================================================

mod single {
    use super::*;

    #[test]
    fn test_string_resolved() {
        let metadata = client(AnnotationValue::new("app.Client").member("url", "${client.url}/api"));
        assert_eq!(
            metadata.string_value("app.Client", "url"),
            Some("https://example.org:8443/api".to_string())
        );
    }

    #[test]
    fn test_resolved_then_converted() {
        let metadata = client(
            AnnotationValue::new("app.Client")
                .member("port", "${client.port}")
                .member("enabled", "${client.enabled}")
                .member("type", "${client.type}"),
        );
        assert_eq!(metadata.int_value("app.Client", "port"), Some(8443));
        assert!(metadata.is_true("app.Client", "enabled"));
        assert_eq!(metadata.class_value("app.Client", "type"), Some(TypeName::new("Integer")));
    }

    #[test]
    fn test_default_in_placeholder() {
        let metadata = client(AnnotationValue::new("app.Client").member("timeout", "${client.timeout:30}"));
        assert_eq!(metadata.long_value("app.Client", "timeout"), Some(30));
    }

    #[test]
    fn test_unresolved_is_absent_but_required_fails() {
        let metadata = client(AnnotationValue::new("app.Client").member("id", "${client.id}"));
        assert_eq!(metadata.string_value("app.Client", "id"), None);

        let err = metadata
            .required_value("app.Client", "id", &Argument::of("String"))
            .unwrap_err();
        assert!(matches!(
            err,
            MetadataError::Placeholder(PlaceholderError::Unresolved { ref placeholder, .. })
                if placeholder == "client.id"
        ));
    }

    #[test]
    fn test_required_conversion_failure_names_element() {
        let metadata = client(AnnotationValue::new("app.Client").member("port", "${client.host}"));
        let err = metadata
            .required_value("app.Client", "port", &Argument::of("Integer"))
            .unwrap_err();
        match err {
            MetadataError::Conversion { annotation, member, target, .. } => {
                assert_eq!(annotation, TypeName::new("app.Client"));
                assert_eq!(member, "port");
                assert_eq!(target, TypeName::new("Integer"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_missing_required_value() {
        let metadata = client(AnnotationValue::new("app.Client"));
        assert!(matches!(
            metadata.required_value("app.Client", "port", &Argument::of("Integer")),
            Err(MetadataError::MissingValue { .. })
        ));
    }
}

// ============================================================================
// Multi-valued
// ============================================================================

mod multi {
    use super::*;

    #[test]
    fn test_comma_split() {
        let metadata = client(AnnotationValue::new("app.Client").member(
            "tags",
            Value::string_array(["${client.tags}", "yellow"]),
        ));
        assert_eq!(
            metadata.string_values("app.Client", "tags"),
            vec!["red", "green", "blue", "yellow"]
        );
    }

    #[test]
    fn test_unresolved_kept_literally() {
        let metadata = client(AnnotationValue::new("app.Client").member(
            "tags",
            Value::string_array(["${client.missing}", "yellow"]),
        ));
        assert_eq!(
            metadata.string_values("app.Client", "tags"),
            vec!["${client.missing}", "yellow"]
        );
    }

    #[test]
    fn test_single_string_split() {
        let metadata = client(AnnotationValue::new("app.Client").member("tags", "${client.tags}"));
        assert_eq!(metadata.string_values("app.Client", "tags"), vec!["red", "green", "blue"]);
    }
}

// ============================================================================
// Found annotations
// ============================================================================

mod found {
    use super::*;

    #[test]
    fn test_find_annotation_resolves_strings() {
        let metadata = client(
            AnnotationValue::new("app.Client")
                .member(VALUE_MEMBER, "${client.url}")
                .member("id", "${client.id}")
                .member("retries", 3),
        );
        let found = metadata.find_annotation("app.Client").unwrap();
        assert_eq!(
            found.string_value(VALUE_MEMBER),
            Some("https://example.org:8443".to_string())
        );
        assert_eq!(found.string_value("id"), Some("${client.id}".to_string()));
        assert_eq!(found.long_value("retries"), Some(3));
    }

    #[test]
    fn test_presence_delegates() {
        let metadata = client(AnnotationValue::new("app.Client"));
        assert!(metadata.has_annotation("app.Client"));
        assert!(metadata.has_declared_annotation("app.Client"));
        assert!(!metadata.has_annotation("app.Other"));
        assert!(!metadata.is_empty());
    }
}

// ============================================================================
// Decorated hierarchies
// ============================================================================

mod hierarchy {
    use super::*;

    #[test]
    fn test_hierarchy_values_resolved() {
        let registry = Arc::new(MetadataRegistry::standard());
        let child = MetadataStore::empty(Arc::clone(&registry))
            .with_annotation(AnnotationValue::new("app.Client").member("url", "${client.url}"));
        let parent = MetadataStore::empty(Arc::clone(&registry))
            .with_annotation(AnnotationValue::new("app.Client").member("port", "${client.port}"));
        let layers: Vec<Arc<dyn AnnotationMetadata>> = vec![Arc::new(child), Arc::new(parent)];
        let hierarchy = MetadataHierarchy::compose(layers).unwrap();
        let metadata = EnvironmentMetadata::new(hierarchy, properties());

        assert_eq!(metadata.int_value("app.Client", "port"), Some(8443));
        let found = metadata.find_annotation("app.Client").unwrap();
        assert_eq!(found.string_value("url"), Some("https://example.org:8443".to_string()));
        assert_eq!(found.string_value("port"), Some("8443".to_string()));
    }
}

// ============================================================================
// Configuration
// ============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_custom_syntax() {
        let config = MetadataConfig::from_toml_str(
            r##"
            [placeholders]
            prefix = "#{"
            suffix = "}"
            default_separator = "?"
            "##,
        )
        .unwrap();
        let resolver = PropertyPlaceholderResolver::with_syntax(config.placeholders)
            .unwrap()
            .with_property("name", "main");
        let store = MetadataStore::empty(Arc::new(MetadataRegistry::with_config(&config.conversion)))
            .with_annotation(
                AnnotationValue::new("app.Named")
                    .member(VALUE_MEMBER, "#{name}")
                    .member("other", "#{other?fallback}")
                    .member("literal", "${name}"),
            );
        let metadata = EnvironmentMetadata::new(Arc::new(store), Arc::new(resolver));

        assert_eq!(metadata.string_value("app.Named", VALUE_MEMBER), Some("main".to_string()));
        assert_eq!(metadata.string_value("app.Named", "other"), Some("fallback".to_string()));
        assert_eq!(metadata.string_value("app.Named", "literal"), Some("${name}".to_string()));
    }
}
