//! Value map storage
//!
//! Plain nested maps keyed by annotation type name. Repeated annotations live
//! under their container type as a `value` list of nested annotation values.

use emblem_core::{AnnotationValue, AttributeValues, TypeName, Value, VALUE_MEMBER};
use indexmap::IndexMap;

/// Annotation type name -> attribute values
pub type AnnotationValues = IndexMap<TypeName, AttributeValues>;

/// Stereotype name -> annotation types carrying it, in discovery order
pub type StereotypeIndex = IndexMap<TypeName, Vec<TypeName>>;

/// Merge `values` into the entry for `annotation`; incoming keys win
pub fn merge_values(map: &mut AnnotationValues, annotation: &TypeName, values: &AttributeValues) {
    let entry = map.entry(annotation.clone()).or_default();
    for (member, value) in values {
        entry.insert(member.clone(), value.clone());
    }
}

/// Append a repeated annotation to its container entry
pub fn push_repeated(map: &mut AnnotationValues, container: &TypeName, item: &AnnotationValue) {
    let entry = map.entry(container.clone()).or_default();
    let slot = entry
        .entry(VALUE_MEMBER.to_string())
        .or_insert_with(|| Value::List(Vec::new()));
    match slot {
        Value::List(items) => items.push(Value::Annotation(item.clone())),
        other => {
            // A container written as a plain value becomes a list
            let previous = std::mem::replace(other, Value::List(Vec::new()));
            *other = Value::List(vec![previous, Value::Annotation(item.clone())]);
        }
    }
}

/// Nested annotations held by a container entry
pub fn container_items(values: &AttributeValues) -> impl Iterator<Item = &AnnotationValue> {
    values
        .get(VALUE_MEMBER)
        .and_then(Value::items)
        .unwrap_or(&[])
        .iter()
        .filter_map(Value::as_annotation)
}

/// Remove every item of type `item` from a container entry
///
/// Returns true if the container is left empty.
pub fn remove_repeated(values: &mut AttributeValues, item: &TypeName) -> bool {
    match values.get_mut(VALUE_MEMBER) {
        Some(Value::List(items)) => {
            items.retain(|v| v.as_annotation().map_or(true, |av| av.annotation_name() != item));
            items.is_empty()
        }
        Some(Value::Array(array)) => {
            array
                .items
                .retain(|v| v.as_annotation().map_or(true, |av| av.annotation_name() != item));
            array.items.is_empty()
        }
        _ => false,
    }
}

/// Record `parents` as carriers of `stereotype`, skipping duplicates
pub fn index_parents(index: &mut StereotypeIndex, stereotype: &TypeName, parents: &[TypeName]) {
    if parents.is_empty() {
        return;
    }
    let carriers = index.entry(stereotype.clone()).or_default();
    for parent in parents {
        if !carriers.contains(parent) {
            carriers.push(parent.clone());
        }
    }
}
