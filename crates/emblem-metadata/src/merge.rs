//! Per-key merge of annotation values across layers

use emblem_core::AnnotationValue;

/// Merge values of one annotation type, most specific first
///
/// The first value is the base; each later value only contributes members
/// the earlier ones did not set. Returns `None` for an empty input.
pub fn merge_annotation_values<I>(values: I) -> Option<AnnotationValue>
where
    I: IntoIterator<Item = AnnotationValue>,
{
    let mut values = values.into_iter();
    let mut merged = values.next()?;
    for value in values {
        if value.annotation_name() != merged.annotation_name() {
            tracing::debug!(
                expected = %merged.annotation_name(),
                found = %value.annotation_name(),
                "skipping value of a different annotation type"
            );
            continue;
        }
        merged.merge_missing(&value);
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use emblem_core::Value;

    #[test]
    fn test_child_wins_per_key() {
        let child = AnnotationValue::new("X").member("a", 1);
        let parent = AnnotationValue::new("X").member("a", 2).member("b", 3);
        let merged = merge_annotation_values([child, parent]).unwrap();
        assert_eq!(merged.values().get("a"), Some(&Value::Int(1)));
        assert_eq!(merged.values().get("b"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_three_layers() {
        let layers = [
            AnnotationValue::new("X").member("a", 1),
            AnnotationValue::new("X").member("b", 2),
            AnnotationValue::new("X").member("a", 9).member("c", 3),
        ];
        let merged = merge_annotation_values(layers).unwrap();
        let keys: Vec<_> = merged.values().keys().cloned().collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
        assert_eq!(merged.values().get("a"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_annotation_values(Vec::new()).is_none());
    }
}
