//! Built-in converters
//!
//! Registered by [`ConversionService::new`]. Converters are keyed on the most
//! general source and target that make sense (`CharSequence -> Enum`,
//! `Iterable -> Collection`), and the hierarchy walk routes concrete types to
//! them.
//!
//! ## Multi-valued sources
//!
//! Lists and arrays convert element-wise to the element type of the target
//! (first type parameter, or the array component), defaulting to `Object`.
//! Converting a multi-valued source to a single-valued target succeeds only
//! for exactly one element.

use std::borrow::Cow;
use std::fmt::Write;
use std::num::{IntErrorKind, ParseIntError};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use emblem_core::{names, Argument, ArrayValue, EnumConstant, TypeName, Value};
use indexmap::IndexMap;

use crate::context::ConversionContext;
use crate::error::{ConversionError, ConversionErrorKind};
use crate::service::ConversionService;

/// Qualifier of the pattern-driven date/time converters
pub const FORMAT: &str = "Format";

/// Qualifier of the byte-size converter (`"10KB"`)
pub const READABLE_BYTES: &str = "ReadableBytes";

/// Pattern used for `LocalDate` when no format pattern is given
pub const ISO_DATE: &str = "%Y-%m-%d";

/// Pattern used for `LocalDateTime` when no format pattern is given
pub const ISO_DATE_TIME: &str = "%Y-%m-%dT%H:%M:%S%.f";

const NUMERIC_TYPES: [&str; 6] = [
    names::BYTE,
    names::SHORT,
    names::INTEGER,
    names::LONG,
    names::FLOAT,
    names::DOUBLE,
];

pub(crate) fn register_defaults(service: &ConversionService) {
    register_text(service);
    register_numbers(service);
    register_temporal(service);
    register_containers(service);
    register_primitive_arrays(service);
}

fn reject(ctx: &mut ConversionContext, value: &Value, kind: ConversionErrorKind) -> Option<Value> {
    let error = ConversionError::new(value.clone(), ctx.target().clone(), kind);
    ctx.reject(error);
    None
}

fn text(value: &Value) -> Cow<'_, str> {
    match value.as_str() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(value.to_string()),
    }
}

// ============================================================================
// Text
// ============================================================================

fn register_text(service: &ConversionService) {
    service.add_converter(names::OBJECT, names::STRING, |value, _, _| {
        Some(Value::String(value.to_string()))
    });
    service.add_converter(names::OBJECT, names::CHAR_SEQUENCE, |value, _, _| {
        Some(Value::String(value.to_string()))
    });

    service.add_converter(names::CHAR_SEQUENCE, names::BOOLEAN, |value, ctx, _| {
        match text(value).trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "on" => Some(Value::Bool(true)),
            "false" | "no" | "n" | "off" => Some(Value::Bool(false)),
            other => {
                let kind = ConversionErrorKind::InvalidFormat(format!("'{}' is not a boolean", other));
                reject(ctx, value, kind)
            }
        }
    });

    service.add_converter(names::CHAR_SEQUENCE, names::CHARACTER, |value, ctx, _| {
        let s = text(value);
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Value::Char(c)),
            _ => {
                let kind = ConversionErrorKind::InvalidFormat("expected a single character".into());
                reject(ctx, value, kind)
            }
        }
    });

    service.add_converter(names::CHAR_SEQUENCE, names::ENUM, |value, ctx, service| {
        let target = ctx.target().clone();
        let Some(constants) = service.types().enum_constants(target.as_str()) else {
            return reject(ctx, value, ConversionErrorKind::UnknownType(target.to_string()));
        };
        let s = text(value);
        let name = s.trim();
        if let Some(found) = constants.iter().find(|c| c.as_str() == name) {
            return Some(Value::Enum(EnumConstant::new(target, found.clone())));
        }
        let normalized = name.to_uppercase().replace(['-', ' '], "_");
        match constants.iter().find(|c| **c == normalized) {
            Some(found) => Some(Value::Enum(EnumConstant::new(target, found.clone()))),
            None => reject(
                ctx,
                value,
                ConversionErrorKind::UnknownEnumConstant {
                    constant: name.to_string(),
                },
            ),
        }
    });

    service.add_converter(names::CHAR_SEQUENCE, names::CLASS, |value, ctx, service| {
        let s = text(value);
        let name = s.trim();
        if service.types().contains(name) {
            Some(Value::Class(TypeName::new(name)))
        } else {
            reject(ctx, value, ConversionErrorKind::UnknownType(name.to_string()))
        }
    });

    service.add_converter(names::CHAR_SEQUENCE, names::DURATION, |value, ctx, _| {
        match parse_duration(&text(value)) {
            Ok(duration) => Some(Value::Duration(duration)),
            Err(kind) => reject(ctx, value, kind),
        }
    });
}

/// Parse `<amount><unit>` with unit one of `ns us ms s m h d`
fn parse_duration(s: &str) -> Result<Duration, ConversionErrorKind> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| ConversionErrorKind::InvalidFormat(format!("'{}' has no unit", s)))?;
    let (amount, unit) = s.split_at(split);
    let amount: u64 = amount.parse().map_err(int_error)?;
    let duration = match unit.trim().to_ascii_lowercase().as_str() {
        "ns" => Duration::from_nanos(amount),
        "us" => Duration::from_micros(amount),
        "ms" => Duration::from_millis(amount),
        "s" => Duration::from_secs(amount),
        "m" => Duration::from_secs(amount.checked_mul(60).ok_or(ConversionErrorKind::OutOfRange)?),
        "h" => Duration::from_secs(amount.checked_mul(3_600).ok_or(ConversionErrorKind::OutOfRange)?),
        "d" => Duration::from_secs(amount.checked_mul(86_400).ok_or(ConversionErrorKind::OutOfRange)?),
        other => {
            return Err(ConversionErrorKind::InvalidFormat(format!(
                "unknown duration unit '{}'",
                other
            )))
        }
    };
    Ok(duration)
}

// ============================================================================
// Numbers
// ============================================================================

fn register_numbers(service: &ConversionService) {
    for target in NUMERIC_TYPES.into_iter().chain([names::NUMBER]) {
        service.add_converter(names::CHAR_SEQUENCE, target, move |value, ctx, _| {
            match parse_number(&text(value), target) {
                Ok(number) => Some(number),
                Err(kind) => reject(ctx, value, kind),
            }
        });
    }
    for target in NUMERIC_TYPES {
        service.add_converter(names::NUMBER, target, move |value, ctx, _| {
            match cast_number(value, target)? {
                Ok(cast) => Some(cast),
                Err(kind) => reject(ctx, value, kind),
            }
        });
    }

    service.add_converter(names::NUMBER, names::BOOLEAN, |value, _, _| {
        value.as_f64().map(|n| Value::Bool(n != 0.0))
    });

    service.add_qualified_converter(
        names::CHAR_SEQUENCE,
        names::NUMBER,
        READABLE_BYTES,
        |value, ctx, service| {
            let bytes = match parse_bytes(&text(value)) {
                Ok(bytes) => Value::Long(bytes),
                Err(kind) => return reject(ctx, value, kind),
            };
            // Narrow to the requested numeric type through the plain converters
            let mut plain = ctx.without_format();
            let converted = service.convert(&bytes, &mut plain);
            if converted.is_none() {
                ctx.absorb(plain);
            }
            converted
        },
    );
}

fn int_error(e: ParseIntError) -> ConversionErrorKind {
    match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => ConversionErrorKind::OutOfRange,
        _ => ConversionErrorKind::InvalidFormat(e.to_string()),
    }
}

fn parse_number(s: &str, target: &str) -> Result<Value, ConversionErrorKind> {
    let s = s.trim();
    let float_error = |e: std::num::ParseFloatError| ConversionErrorKind::InvalidFormat(e.to_string());
    match target {
        names::BYTE => s.parse().map(Value::Byte).map_err(int_error),
        names::SHORT => s.parse().map(Value::Short).map_err(int_error),
        names::INTEGER => s.parse().map(Value::Int).map_err(int_error),
        names::LONG => s.parse().map(Value::Long).map_err(int_error),
        names::FLOAT => s.parse().map(Value::Float).map_err(float_error),
        names::DOUBLE => s.parse().map(Value::Double).map_err(float_error),
        _ => match s.parse::<i64>() {
            Ok(n) => Ok(Value::Long(n)),
            Err(_) => s.parse().map(Value::Double).map_err(float_error),
        },
    }
}

fn cast_number(value: &Value, target: &str) -> Option<Result<Value, ConversionErrorKind>> {
    if let Some(n) = value.as_i64() {
        return Some(match target {
            names::BYTE => narrow(n).map(Value::Byte),
            names::SHORT => narrow(n).map(Value::Short),
            names::INTEGER => narrow(n).map(Value::Int),
            names::FLOAT => Ok(Value::Float(n as f32)),
            names::DOUBLE => Ok(Value::Double(n as f64)),
            _ => Ok(Value::Long(n)),
        });
    }
    let n = value.as_f64()?;
    Some(match target {
        names::BYTE => truncate(n).and_then(narrow).map(Value::Byte),
        names::SHORT => truncate(n).and_then(narrow).map(Value::Short),
        names::INTEGER => truncate(n).and_then(narrow).map(Value::Int),
        names::LONG => truncate(n).map(Value::Long),
        names::FLOAT => Ok(Value::Float(n as f32)),
        _ => Ok(Value::Double(n)),
    })
}

fn narrow<T: TryFrom<i64>>(n: i64) -> Result<T, ConversionErrorKind> {
    T::try_from(n).map_err(|_| ConversionErrorKind::OutOfRange)
}

/// Drop the fraction, rejecting values outside the `i64` range
fn truncate(n: f64) -> Result<i64, ConversionErrorKind> {
    let t = n.trunc();
    // i64::MAX as f64 rounds up to 2^63, which is itself out of range
    if !t.is_finite() || t < i64::MIN as f64 || t >= i64::MAX as f64 {
        return Err(ConversionErrorKind::OutOfRange);
    }
    Ok(t as i64)
}

/// Parse a byte size such as `512`, `10KB`, `4 mb` or `1GB`
fn parse_bytes(s: &str) -> Result<i64, ConversionErrorKind> {
    let upper = s.trim().to_ascii_uppercase();
    let (amount, multiplier) = if let Some(amount) = upper.strip_suffix("KB") {
        (amount, 1i64 << 10)
    } else if let Some(amount) = upper.strip_suffix("MB") {
        (amount, 1i64 << 20)
    } else if let Some(amount) = upper.strip_suffix("GB") {
        (amount, 1i64 << 30)
    } else {
        (upper.as_str(), 1)
    };
    let amount: i64 = amount.trim().parse().map_err(int_error)?;
    amount
        .checked_mul(multiplier)
        .ok_or(ConversionErrorKind::OutOfRange)
}

// ============================================================================
// Dates and times
// ============================================================================

fn register_temporal(service: &ConversionService) {
    service.add_converter(names::CHAR_SEQUENCE, names::LOCAL_DATE, |value, ctx, _| {
        parse_date(value, ISO_DATE, ctx)
    });
    service.add_converter(names::CHAR_SEQUENCE, names::LOCAL_DATE_TIME, |value, ctx, _| {
        parse_date_time(value, ISO_DATE_TIME, ctx)
    });

    service.add_qualified_converter(names::CHAR_SEQUENCE, names::LOCAL_DATE, FORMAT, |value, ctx, _| {
        let pattern = ctx.pattern().unwrap_or(ISO_DATE).to_string();
        parse_date(value, &pattern, ctx)
    });
    service.add_qualified_converter(
        names::CHAR_SEQUENCE,
        names::LOCAL_DATE_TIME,
        FORMAT,
        |value, ctx, _| {
            let pattern = ctx.pattern().unwrap_or(ISO_DATE_TIME).to_string();
            parse_date_time(value, &pattern, ctx)
        },
    );
    service.add_qualified_converter(names::TEMPORAL, names::CHAR_SEQUENCE, FORMAT, format_temporal);
    service.add_qualified_converter(names::TEMPORAL, names::STRING, FORMAT, format_temporal);
}

fn parse_date(value: &Value, pattern: &str, ctx: &mut ConversionContext) -> Option<Value> {
    match NaiveDate::parse_from_str(text(value).trim(), pattern) {
        Ok(date) => Some(Value::Date(date)),
        Err(e) => reject(ctx, value, ConversionErrorKind::InvalidFormat(e.to_string())),
    }
}

fn parse_date_time(value: &Value, pattern: &str, ctx: &mut ConversionContext) -> Option<Value> {
    match NaiveDateTime::parse_from_str(text(value).trim(), pattern) {
        Ok(dt) => Some(Value::DateTime(dt)),
        Err(e) => reject(ctx, value, ConversionErrorKind::InvalidFormat(e.to_string())),
    }
}

fn format_temporal(
    value: &Value,
    ctx: &mut ConversionContext,
    _service: &ConversionService,
) -> Option<Value> {
    let mut out = String::new();
    let written = match (value, ctx.pattern()) {
        (Value::Date(date), Some(pattern)) => write!(out, "{}", date.format(pattern)),
        (Value::Date(date), None) => write!(out, "{}", date.format(ISO_DATE)),
        (Value::DateTime(dt), Some(pattern)) => write!(out, "{}", dt.format(pattern)),
        (Value::DateTime(dt), None) => write!(out, "{}", dt.format(ISO_DATE_TIME)),
        _ => return None,
    };
    match written {
        Ok(()) => Some(Value::String(out)),
        Err(_) => {
            let pattern = ctx.pattern().unwrap_or_default().to_string();
            reject(
                ctx,
                value,
                ConversionErrorKind::InvalidFormat(format!("bad pattern '{}'", pattern)),
            )
        }
    }
}

// ============================================================================
// Containers
// ============================================================================

fn register_containers(service: &ConversionService) {
    for source in [names::ITERABLE, names::ARRAY] {
        service.add_converter(source, names::ITERABLE, |value, ctx, service| {
            let items = value.items()?;
            into_list(items, ctx, service)
        });
        service.add_converter(source, names::COLLECTION, |value, ctx, service| {
            let items = value.items()?;
            into_list(items, ctx, service)
        });
        service.add_converter(source, names::ARRAY, |value, ctx, service| {
            let items = value.items()?;
            into_array(items, ctx, service)
        });
        service.add_converter(source, names::OBJECT, convert_single);
    }

    service.add_converter(names::CHAR_SEQUENCE, names::COLLECTION, |value, ctx, service| {
        into_list(&split_commas(&text(value)), ctx, service)
    });
    service.add_converter(names::CHAR_SEQUENCE, names::ARRAY, |value, ctx, service| {
        into_array(&split_commas(&text(value)), ctx, service)
    });

    service.add_converter(names::OBJECT, names::COLLECTION, |value, ctx, service| {
        into_list(std::slice::from_ref(value), ctx, service)
    });
    service.add_converter(names::OBJECT, names::ARRAY, |value, ctx, service| {
        into_array(std::slice::from_ref(value), ctx, service)
    });

    service.add_converter(names::MAP, names::MAP, |value, ctx, service| {
        let Value::Map(map) = value else {
            return None;
        };
        let element = ctx
            .argument()
            .type_parameters()
            .get(1)
            .cloned()
            .unwrap_or_else(Argument::object);
        let mut converted = IndexMap::with_capacity(map.len());
        for (key, item) in map {
            let mut child = ctx.for_element(element.clone());
            match service.convert(item, &mut child) {
                Some(v) => {
                    converted.insert(key.clone(), v);
                }
                None => {
                    ctx.absorb(child);
                    return None;
                }
            }
        }
        Some(Value::Map(converted))
    });
}

fn split_commas(s: &str) -> Vec<Value> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(Value::string)
        .collect()
}

/// Convert every item to `element`, failing on the first rejected item
fn convert_elements(
    items: &[Value],
    element: &Argument,
    ctx: &mut ConversionContext,
    service: &ConversionService,
) -> Option<Vec<Value>> {
    let mut converted = Vec::with_capacity(items.len());
    for item in items {
        let mut child = ctx.for_element(element.clone());
        match service.convert(item, &mut child) {
            Some(v) => converted.push(v),
            None => {
                ctx.absorb(child);
                return None;
            }
        }
    }
    Some(converted)
}

fn into_list(items: &[Value], ctx: &mut ConversionContext, service: &ConversionService) -> Option<Value> {
    let element = ctx
        .first_type_parameter()
        .cloned()
        .unwrap_or_else(Argument::object);
    convert_elements(items, &element, ctx, service).map(Value::List)
}

fn into_array(items: &[Value], ctx: &mut ConversionContext, service: &ConversionService) -> Option<Value> {
    let element = match ctx.target().component() {
        Some(component) => Argument::of(component),
        None => ctx
            .first_type_parameter()
            .cloned()
            .unwrap_or_else(Argument::object),
    };
    let component = element.type_name().clone();
    let items = convert_elements(items, &element, ctx, service)?;
    Some(Value::Array(ArrayValue { component, items }))
}

/// Multi-valued source to single-valued target
fn convert_single(
    value: &Value,
    ctx: &mut ConversionContext,
    service: &ConversionService,
) -> Option<Value> {
    match value.items()? {
        [] => None,
        [single] => service.convert(single, ctx),
        items => reject(ctx, value, ConversionErrorKind::MultipleValues(items.len())),
    }
}

// ============================================================================
// Primitive arrays
// ============================================================================

fn register_primitive_arrays(service: &ConversionService) {
    for (primitive, boxed) in names::PRIMITIVES {
        let primitive = TypeName::new(primitive);
        let boxed = TypeName::new(boxed);
        service.add_converter(primitive.array_of(), boxed.array_of(), relabel(boxed.clone()));
        service.add_converter(boxed.array_of(), primitive.array_of(), relabel(primitive));
    }
}

fn relabel(
    component: TypeName,
) -> impl Fn(&Value, &mut ConversionContext, &ConversionService) -> Option<Value> + Send + Sync {
    move |value, ctx, service| {
        let element = Argument::of(component.clone());
        let items = convert_elements(value.items()?, &element, ctx, service)?;
        Some(Value::Array(ArrayValue {
            component: component.clone(),
            items,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(7_200)));
        assert_eq!(parse_duration(" 1d "), Ok(Duration::from_secs(86_400)));
        assert!(matches!(parse_duration("10"), Err(ConversionErrorKind::InvalidFormat(_))));
        assert!(matches!(parse_duration("10w"), Err(ConversionErrorKind::InvalidFormat(_))));
    }

    #[test]
    fn test_parse_number_range() {
        assert_eq!(parse_number("127", names::BYTE), Ok(Value::Byte(127)));
        assert_eq!(parse_number("128", names::BYTE), Err(ConversionErrorKind::OutOfRange));
        assert_eq!(parse_number("1.5", names::NUMBER), Ok(Value::Double(1.5)));
        assert_eq!(parse_number("15", names::NUMBER), Ok(Value::Long(15)));
    }

    #[test]
    fn test_cast_number_range() {
        assert_eq!(cast_number(&Value::Long(127), names::BYTE), Some(Ok(Value::Byte(127))));
        assert_eq!(
            cast_number(&Value::Int(300), names::BYTE),
            Some(Err(ConversionErrorKind::OutOfRange))
        );
        assert_eq!(
            cast_number(&Value::Long(i64::from(i32::MAX) + 1), names::INTEGER),
            Some(Err(ConversionErrorKind::OutOfRange))
        );
        assert_eq!(cast_number(&Value::Double(-2.9), names::SHORT), Some(Ok(Value::Short(-2))));
        assert_eq!(
            cast_number(&Value::Double(40_000.0), names::SHORT),
            Some(Err(ConversionErrorKind::OutOfRange))
        );
        assert_eq!(
            cast_number(&Value::Double(f64::NAN), names::LONG),
            Some(Err(ConversionErrorKind::OutOfRange))
        );
        assert_eq!(
            cast_number(&Value::Double(1e19), names::LONG),
            Some(Err(ConversionErrorKind::OutOfRange))
        );
        assert_eq!(cast_number(&Value::Int(5), names::DOUBLE), Some(Ok(Value::Double(5.0))));
        assert_eq!(cast_number(&Value::string("5"), names::INTEGER), None);
    }

    #[test]
    fn test_parse_bytes() {
        assert_eq!(parse_bytes("512"), Ok(512));
        assert_eq!(parse_bytes("10KB"), Ok(10 * 1024));
        assert_eq!(parse_bytes("4 mb"), Ok(4 * 1024 * 1024));
        assert!(parse_bytes("lots").is_err());
    }

    #[test]
    fn test_split_commas() {
        assert_eq!(
            split_commas(" a, b ,,c "),
            vec![Value::string("a"), Value::string("b"), Value::string("c")]
        );
    }
}
