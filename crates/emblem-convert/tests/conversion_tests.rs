//! Integration tests for the conversion engine
//!
//! Tests cover:
//! - Scalar parsing and numeric narrowing
//! - Enum, type-reference and duration converters
//! - Format-qualified converters and unqualified fallback
//! - Element-wise container conversion and the single-value rule
//! - Primitive/boxed array pairs
//! - Hierarchy dispatch precedence
//! - Cache consistency under eviction and concurrent use

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::NaiveDate;
use emblem_convert::{
    ConversionConfig, ConversionContext, ConversionErrorKind, ConversionService, ConvertiblePair,
    FORMAT, READABLE_BYTES,
};
use emblem_core::{
    create_standard_registry, Argument, EnumConstant, TypeDescriptor, TypeName, TypeRegistry,
    Value,
};
use indexmap::IndexMap;

fn registry() -> Arc<TypeRegistry> {
    let types = create_standard_registry();
    types.register(TypeDescriptor::enumeration("app.Color", ["RED", "DARK_BLUE"]));
    Arc::new(types)
}

fn service() -> ConversionService {
    ConversionService::new(registry())
}

// ============================================================================
// Scalars
// ============================================================================

mod scalars {
    use super::*;

    #[test]
    fn test_string_to_numbers() {
        let service = service();
        assert_eq!(service.convert_to::<i32>(&Value::string("8080")), Some(8080));
        assert_eq!(service.convert_to::<i64>(&Value::string(" -12 ")), Some(-12));
        assert_eq!(service.convert_to::<f64>(&Value::string("2.5")), Some(2.5));
        assert_eq!(
            service.convert_value(&Value::string("7"), "int"),
            Some(Value::Int(7))
        );
    }

    #[test]
    fn test_invalid_number_reports_error() {
        let service = service();
        let err = service
            .convert_required(&Value::string("abc"), "Integer")
            .unwrap_err();
        assert!(matches!(err.kind, ConversionErrorKind::InvalidFormat(_)));
        assert_eq!(err.value, Value::string("abc"));

        let err = service
            .convert_required(&Value::string("300"), "Byte")
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::OutOfRange);
    }

    #[test]
    fn test_numeric_narrowing_and_widening() {
        let service = service();
        assert_eq!(service.convert_value(&Value::Long(42), "Integer"), Some(Value::Int(42)));
        assert_eq!(service.convert_value(&Value::Int(3), "Double"), Some(Value::Double(3.0)));
        assert_eq!(service.convert_value(&Value::Double(9.7), "Long"), Some(Value::Long(9)));
    }

    #[test]
    fn test_numeric_narrowing_rejects_out_of_range() {
        let service = service();
        let err = service.convert_required(&Value::Int(300), "Byte").unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::OutOfRange);
        assert_eq!(err.value, Value::Int(300));

        assert_eq!(service.convert_value(&Value::Long(1 << 40), "Integer"), None);
        assert_eq!(service.convert_value(&Value::Double(1e10), "int"), None);
        assert_eq!(service.convert_value(&Value::Int(-128), "Byte"), Some(Value::Byte(-128)));
    }

    #[test]
    fn test_booleans() {
        let service = service();
        for yes in ["true", "Yes", "y", "ON"] {
            assert_eq!(service.convert_to::<bool>(&Value::string(yes)), Some(true), "{}", yes);
        }
        assert_eq!(service.convert_to::<bool>(&Value::string("off")), Some(false));
        assert_eq!(service.convert_to::<bool>(&Value::string("maybe")), None);
        assert_eq!(service.convert_to::<bool>(&Value::Int(0)), Some(false));
    }

    #[test]
    fn test_anything_to_string() {
        let service = service();
        assert_eq!(service.convert_to::<String>(&Value::Int(5)), Some("5".to_string()));
        assert_eq!(
            service.convert_to::<String>(&Value::enum_constant("app.Color", "RED")),
            Some("RED".to_string())
        );
        assert_eq!(
            service.convert_to::<String>(&Value::class("app.User")),
            Some("app.User".to_string())
        );
    }

    #[test]
    fn test_character() {
        let service = service();
        assert_eq!(service.convert_to::<char>(&Value::string("x")), Some('x'));
        assert_eq!(service.convert_to::<char>(&Value::string("xy")), None);
    }
}

// ============================================================================
// Enums, type references, durations
// ============================================================================

mod references {
    use super::*;

    #[test]
    fn test_enum_exact_then_normalized() {
        let service = service();
        assert_eq!(
            service.convert_value(&Value::string("RED"), "app.Color"),
            Some(Value::Enum(EnumConstant::new("app.Color", "RED")))
        );
        assert_eq!(
            service.convert_value(&Value::string("dark-blue"), "app.Color"),
            Some(Value::Enum(EnumConstant::new("app.Color", "DARK_BLUE")))
        );

        let err = service
            .convert_required(&Value::string("purple"), "app.Color")
            .unwrap_err();
        assert_eq!(
            err.kind,
            ConversionErrorKind::UnknownEnumConstant {
                constant: "purple".to_string()
            }
        );
    }

    #[test]
    fn test_class_references_known_types_only() {
        let service = service();
        assert_eq!(
            service.convert_to::<TypeName>(&Value::string("String")),
            Some(TypeName::new("String"))
        );
        let err = service
            .convert_required(&Value::string("app.Missing"), "Class")
            .unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::UnknownType("app.Missing".to_string()));
    }

    #[test]
    fn test_durations() {
        let service = service();
        assert_eq!(
            service.convert_to::<Duration>(&Value::string("1m")),
            Some(Duration::from_secs(60))
        );
        assert_eq!(
            service.convert_to::<Duration>(&Value::string("15ms")),
            Some(Duration::from_millis(15))
        );
        assert_eq!(service.convert_to::<Duration>(&Value::string("soon")), None);
    }
}

// ============================================================================
// Format qualifiers
// ============================================================================

mod qualifiers {
    use super::*;

    #[test]
    fn test_iso_dates_without_qualifier() {
        let service = service();
        assert_eq!(
            service.convert_to::<NaiveDate>(&Value::string("2024-03-01")),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn test_pattern_from_format_qualifier() {
        let service = service();
        let mut ctx = ConversionContext::new("LocalDate").with_format(FORMAT, Some("%d/%m/%Y".into()));
        let date = service.convert(&Value::string("01/03/2024"), &mut ctx);
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 3, 1).map(Value::Date));

        let mut ctx = ConversionContext::new("String").with_format(FORMAT, Some("%d.%m.%Y".into()));
        let text = service.convert(&date.unwrap(), &mut ctx);
        assert_eq!(text, Some(Value::string("01.03.2024")));
    }

    #[test]
    fn test_bad_pattern_is_rejected() {
        let service = service();
        let date = Value::Date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        let mut ctx = ConversionContext::new("String").with_format(FORMAT, Some("%Q".into()));
        assert_eq!(service.convert(&date, &mut ctx), None);
        assert!(ctx.has_errors());
    }

    #[test]
    fn test_readable_bytes_narrow_to_target() {
        let service = service();
        let mut ctx = ConversionContext::new("Integer").with_format(READABLE_BYTES, None);
        assert_eq!(
            service.convert(&Value::string("10KB"), &mut ctx),
            Some(Value::Int(10 * 1024))
        );

        // Without the qualifier the suffix is just bad input
        assert_eq!(service.convert_value(&Value::string("10KB"), "Integer"), None);
    }

    #[test]
    fn test_unknown_qualifier_falls_back() {
        let service = service();
        let mut ctx = ConversionContext::new("Integer").with_format("app.Unrelated", None);
        assert_eq!(service.convert(&Value::string("12"), &mut ctx), Some(Value::Int(12)));
    }
}

// ============================================================================
// Containers
// ============================================================================

mod containers {
    use super::*;

    #[test]
    fn test_comma_separated_to_list() {
        let service = service();
        let target = Argument::list_of(Argument::of("Integer"));
        assert_eq!(
            service.convert_value(&Value::string("1, 2,3"), target),
            Some(Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]))
        );
        assert_eq!(
            service.convert_to::<Vec<String>>(&Value::string("a,b")),
            Some(vec!["a".to_string(), "b".to_string()])
        );
    }

    #[test]
    fn test_containers_always_convert_elements() {
        let service = service();
        let list = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let target = Argument::list_of(Argument::of("String"));
        assert_eq!(
            service.convert_value(&list, target),
            Some(Value::List(vec![Value::string("1"), Value::string("2")]))
        );
        // No type parameter: elements pass through
        assert_eq!(service.convert_value(&list, "List"), Some(list.clone()));
    }

    #[test]
    fn test_list_to_array() {
        let service = service();
        let list = Value::List(vec![Value::string("4"), Value::string("5")]);
        let converted = service.convert_value(&list, "Integer[]").unwrap();
        assert_eq!(converted, Value::array("Integer", vec![Value::Int(4), Value::Int(5)]));
        assert_eq!(converted.type_name().as_str(), "Integer[]");
    }

    #[test]
    fn test_single_value_rule() {
        let service = service();
        let one = Value::List(vec![Value::string("5")]);
        assert_eq!(service.convert_value(&one, "Integer"), Some(Value::Int(5)));

        let two = Value::string_array(["5", "6"]);
        let err = service.convert_required(&two, "Integer").unwrap_err();
        assert_eq!(err.kind, ConversionErrorKind::MultipleValues(2));

        assert_eq!(service.convert_value(&Value::List(vec![]), "Integer"), None);
    }

    #[test]
    fn test_scalar_to_singleton() {
        let service = service();
        let target = Argument::list_of(Argument::of("String"));
        assert_eq!(
            service.convert_value(&Value::Int(3), target),
            Some(Value::List(vec![Value::string("3")]))
        );
    }

    #[test]
    fn test_map_values_use_second_parameter() {
        let service = service();
        let mut map = IndexMap::new();
        map.insert("a".to_string(), Value::string("1"));
        map.insert("b".to_string(), Value::string("2"));

        let converted = service
            .convert_value(&Value::Map(map), Argument::map_of(Argument::of("Long")))
            .unwrap();
        let Value::Map(converted) = converted else {
            panic!("expected a map");
        };
        assert_eq!(converted.get("a"), Some(&Value::Long(1)));
        assert_eq!(converted.get("b"), Some(&Value::Long(2)));
    }

    #[test]
    fn test_element_failure_fails_whole_conversion() {
        let service = service();
        let target = Argument::list_of(Argument::of("Integer"));
        let mut ctx = ConversionContext::new(target);
        assert_eq!(service.convert(&Value::string("1,x"), &mut ctx), None);
        assert_eq!(ctx.errors().len(), 1);
        assert_eq!(ctx.errors()[0].target.as_str(), "Integer");
    }
}

// ============================================================================
// Primitive arrays
// ============================================================================

mod primitive_arrays {
    use super::*;

    #[test]
    fn test_boxed_and_primitive_arrays_convert_both_ways() {
        let service = service();
        let primitive = Value::array("int", vec![Value::Int(1), Value::Int(2)]);
        let boxed = service.convert_value(&primitive, "Integer[]").unwrap();
        assert_eq!(boxed.type_name().as_str(), "Integer[]");

        let back = service.convert_value(&boxed, "int[]").unwrap();
        assert_eq!(back, primitive);
    }

    #[test]
    fn test_dedicated_pairs_are_registered() {
        let service = service();
        for (primitive, boxed) in [("int", "Integer"), ("boolean", "Boolean"), ("char", "Character")] {
            let forward = ConvertiblePair::new(format!("{}[]", primitive), format!("{}[]", boxed));
            let reverse = ConvertiblePair::new(format!("{}[]", boxed), format!("{}[]", primitive));
            assert!(service.resolve(&forward).is_some());
            assert!(service.resolve(&reverse).is_some());
        }
    }
}

// ============================================================================
// Dispatch
// ============================================================================

mod dispatch {
    use super::*;

    #[test]
    fn test_specific_converter_beats_general_one() {
        let service = service();
        service.add_converter("Number", "String", |_, _, _| Some(Value::string("number")));
        service.add_converter("Integer", "String", |_, _, _| Some(Value::string("integer")));

        assert_eq!(
            service.convert_value(&Value::Int(5), "String"),
            Some(Value::string("integer"))
        );
        assert_eq!(
            service.convert_value(&Value::Double(5.0), "String"),
            Some(Value::string("number"))
        );
    }

    #[test]
    fn test_idempotence_for_assignable_values() {
        let service = service();
        let value = Value::string("same");
        assert_eq!(service.convert_value(&value, "String"), Some(value.clone()));
        assert_eq!(service.convert_value(&value, "CharSequence"), Some(value.clone()));
        assert_eq!(service.convert_value(&value, "Object"), Some(value));
    }

    #[test]
    fn test_user_types_dispatch_through_supertypes() {
        let types = registry();
        types.register(TypeDescriptor::class("app.Money").extends("Number"));
        let service = ConversionService::new(Arc::clone(&types));
        service.add_converter("CharSequence", "app.Money", |value, _, _| {
            let cents: i64 = value.as_str()?.replace('.', "").parse().ok()?;
            Some(Value::Long(cents))
        });

        assert_eq!(
            service.convert_value(&Value::string("12.34"), "app.Money"),
            Some(Value::Long(1234))
        );
        assert!(service.can_convert(&TypeName::new("String"), &TypeName::new("app.Money")));
        assert!(!service.can_convert(&TypeName::new("Boolean"), &TypeName::new("app.Money")));
    }

    #[test]
    fn test_can_convert() {
        let service = service();
        let string = TypeName::new("String");
        assert!(service.can_convert(&string, &TypeName::new("Integer")));
        assert!(service.can_convert(&string, &TypeName::new("app.Color")));
        assert!(service.can_convert(&TypeName::new("Integer"), &TypeName::new("Number")));
        assert!(!service.can_convert(&TypeName::new("Boolean"), &TypeName::new("Duration")));
    }
}

// ============================================================================
// Cache
// ============================================================================

mod cache {
    use super::*;

    const TYPES: [&str; 12] = [
        "String", "Integer", "Long", "Double", "Boolean", "Duration", "LocalDate", "List",
        "Integer[]", "int[]", "app.Color", "Class",
    ];

    #[test]
    fn test_answers_survive_eviction() {
        let config = ConversionConfig {
            cache_capacity: 8,
            eviction_percent: 50,
        };
        let small = ConversionService::with_config(registry(), &config);
        let large = ConversionService::new(registry());

        for _ in 0..3 {
            for source in TYPES {
                for target in TYPES {
                    let (s, t) = (TypeName::new(source), TypeName::new(target));
                    assert_eq!(
                        small.can_convert(&s, &t),
                        large.can_convert(&s, &t),
                        "{} -> {}",
                        source,
                        target
                    );
                }
            }
        }

        let stats = small.cache_stats();
        assert!(stats.evictions > 0);
        assert!(stats.entries <= 8);
    }

    #[test]
    fn test_misses_are_memoized() {
        let service = service();
        let pair = (TypeName::new("Boolean"), TypeName::new("Duration"));
        assert!(!service.can_convert(&pair.0, &pair.1));
        let before = service.cache_stats();
        assert!(!service.can_convert(&pair.0, &pair.1));
        let after = service.cache_stats();
        assert_eq!(after.hits, before.hits + 1);
        assert_eq!(after.misses, before.misses);
    }

    #[test]
    fn test_concurrent_conversion_and_registration() {
        let service = Arc::new(service());
        let mut handles = Vec::new();
        for worker in 0..8 {
            let service = Arc::clone(&service);
            handles.push(thread::spawn(move || {
                for i in 0..200 {
                    let n = worker * 1_000 + i;
                    let converted = service.convert_to::<i64>(&Value::string(n.to_string()));
                    assert_eq!(converted, Some(n as i64));
                    if i % 50 == 0 {
                        service.add_converter(
                            format!("app.Worker{}", worker),
                            "String",
                            |_, _, _| Some(Value::string("worker")),
                        );
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
