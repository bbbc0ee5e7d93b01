//! Integration tests for the shared value model
//!
//! Covers type registration from several threads, hierarchy ordering for
//! user types and JSON round-trips of nested values.

use std::sync::Arc;
use std::thread;

use emblem_core::{
    create_standard_registry, AnnotationValue, TypeDescriptor, TypeName, Value, VALUE_MEMBER,
};

// ============================================================================
// Hierarchy
// ============================================================================

mod hierarchy {
    use super::*;

    #[test]
    fn test_user_class_with_interfaces() {
        let registry = create_standard_registry();
        registry.register(TypeDescriptor::interface("app.Named"));
        registry.register(TypeDescriptor::interface("app.Entity").implements("app.Named"));
        registry.register(TypeDescriptor::class("app.Base").implements("app.Entity"));
        registry.register(
            TypeDescriptor::class("app.User")
                .extends("app.Base")
                .implements("Comparable"),
        );

        let h = registry.hierarchy(&TypeName::new("app.User"));
        let names: Vec<&str> = h.iter().map(|t| t.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "app.User",
                "Comparable",
                "app.Base",
                "app.Entity",
                "app.Named",
                "Object"
            ]
        );
    }

    #[test]
    fn test_concurrent_insert_if_absent() {
        let registry = Arc::new(create_standard_registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry.register(TypeDescriptor::class("app.Shared").extends("Number"))
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(inserted, 1);
        assert!(registry.is_assignable(&TypeName::new("app.Shared"), &TypeName::new("Number")));
    }
}

// ============================================================================
// Serialization
// ============================================================================

mod serialization {
    use super::*;

    #[test]
    fn test_nested_value_json_round_trip() {
        let tag = AnnotationValue::new("app.Tag").member(VALUE_MEMBER, "x");
        let value = Value::List(vec![
            Value::Annotation(tag),
            Value::string_array(["a", "b"]),
            Value::enum_constant("app.Color", "RED"),
            Value::class("app.User"),
        ]);

        let json = serde_json::to_string(&value).unwrap();
        let restored: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, value);
    }

    #[test]
    fn test_type_name_serializes_as_string() {
        let json = serde_json::to_string(&TypeName::new("app.User")).unwrap();
        assert_eq!(json, "\"app.User\"");
    }
}
