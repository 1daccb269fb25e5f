//! Field-level document diffing.
//!
//! A diff carries every leaf of the new document that is absent from, or
//! different to, the old document. `_id` is always carried so the update can
//! be addressed. Vector fields (paths containing the vector marker) are
//! compared by Euclidean distance so that floating point noise does not
//! trigger a re-upload.

use crate::document::{Document, ID_FIELD, PATH_SEPARATOR};
use crate::value::Value;

/// Marker identifying vector-valued fields.
pub const VECTOR_MARKER: &str = "_vector_";

/// Default distance below which two vectors are considered equal.
pub const DEFAULT_VECTOR_TOLERANCE: f64 = 1e-5;

/// Options controlling how values are compared.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffOptions {
    /// Substring that marks a path as vector-valued.
    pub vector_marker: String,
    /// Maximum Euclidean distance treated as "unchanged".
    pub tolerance: f64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            vector_marker: VECTOR_MARKER.to_string(),
            tolerance: DEFAULT_VECTOR_TOLERANCE,
        }
    }
}

impl DiffOptions {
    /// Creates options with the default marker and tolerance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vector marker.
    #[must_use]
    pub fn with_vector_marker(mut self, marker: impl Into<String>) -> Self {
        self.vector_marker = marker.into();
        self
    }

    /// Sets the vector tolerance.
    #[must_use]
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Returns true if the path holds a vector.
    pub fn is_vector_path(&self, path: &str) -> bool {
        !self.vector_marker.is_empty() && path.contains(&self.vector_marker)
    }

    /// Compares two values found at `path`.
    pub fn values_differ(&self, path: &str, old: &Value, new: &Value) -> bool {
        if self.is_vector_path(path) {
            match euclidean_distance(old, new) {
                Some(distance) => distance > self.tolerance,
                None => true,
            }
        } else {
            old != new
        }
    }
}

/// Euclidean distance between two numeric arrays.
///
/// Returns `None` when either side is not a numeric array or the lengths
/// differ.
pub fn euclidean_distance(a: &Value, b: &Value) -> Option<f64> {
    let a = a.as_vector()?;
    let b = b.as_vector()?;
    if a.len() != b.len() {
        return None;
    }
    let sum: f64 = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum();
    Some(sum.sqrt())
}

/// Computes the diff of `new` against `old`.
///
/// Both trees are walked key by key, so field names containing the path
/// separator are compared like any other field.
pub fn diff(old: &Document, new: &Document, options: &DiffOptions) -> Document {
    let Some(pairs) = new.as_value().as_map() else {
        return Document::new();
    };
    let changes = diff_pairs(Some(old.as_value()), pairs, None, options);
    Document::from_value(Value::Map(changes)).unwrap_or_default()
}

fn diff_pairs(
    old: Option<&Value>,
    pairs: &[(String, Value)],
    prefix: Option<&str>,
    options: &DiffOptions,
) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    for (key, new_value) in pairs {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{PATH_SEPARATOR}{key}"),
            None => key.clone(),
        };
        let old_value = old.and_then(|old| old.get(key));
        match new_value {
            Value::Map(children) if !children.is_empty() => {
                let changes = diff_pairs(old_value, children, Some(&path), options);
                if !changes.is_empty() {
                    out.push((key.clone(), Value::Map(changes)));
                }
            }
            _ => {
                let changed = match old_value {
                    Some(old_value) => options.values_differ(&path, old_value, new_value),
                    None => true,
                };
                if changed || (prefix.is_none() && key == ID_FIELD) {
                    out.push((key.clone(), new_value.clone()));
                }
            }
        }
    }
    out
}

/// Returns true if a diff carries nothing worth uploading.
pub fn is_noop(diff: &Document) -> bool {
    diff.keys().iter().all(|path| path == ID_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc(value: serde_json::Value) -> Document {
        Document::from_json(value).unwrap()
    }

    #[test]
    fn identical_documents_diff_to_id_only() {
        let a = doc(json!({"_id": "1", "text": "hello", "nested": {"n": 1}}));
        let d = diff(&a, &a.clone(), &DiffOptions::default());
        assert_eq!(d.to_json(), json!({"_id": "1"}));
        assert!(is_noop(&d));
    }

    #[test]
    fn new_and_changed_fields_are_carried() {
        let old = doc(json!({"_id": "1", "a": 1, "b": {"c": 2, "d": 3}}));
        let new = doc(json!({"_id": "1", "a": 1, "b": {"c": 5, "d": 3}, "e": "x"}));
        let d = diff(&old, &new, &DiffOptions::default());
        assert_eq!(d.to_json(), json!({"_id": "1", "b": {"c": 5}, "e": "x"}));
        assert!(!is_noop(&d));
    }

    #[test]
    fn removed_fields_are_not_carried() {
        let old = doc(json!({"_id": "1", "a": 1, "b": 2}));
        let new = doc(json!({"_id": "1", "a": 1}));
        assert!(is_noop(&diff(&old, &new, &DiffOptions::default())));
    }

    #[test]
    fn vector_within_tolerance_is_unchanged() {
        let old = doc(json!({"_id": "1", "title_vector_": [0.1, 0.2, 0.3]}));
        let new = doc(json!({"_id": "1", "title_vector_": [0.1, 0.200001, 0.3]}));
        assert!(is_noop(&diff(&old, &new, &DiffOptions::default())));
    }

    #[test]
    fn vector_beyond_tolerance_is_changed() {
        let old = doc(json!({"_id": "1", "title_vector_": [0.1, 0.2, 0.3]}));
        let new = doc(json!({"_id": "1", "title_vector_": [0.1, 0.25, 0.3]}));
        let d = diff(&old, &new, &DiffOptions::default());
        assert_eq!(d.get("title_vector_"), new.get("title_vector_"));
    }

    #[test]
    fn vector_length_mismatch_is_changed() {
        let old = doc(json!({"_id": "1", "v_vector_": [1.0, 2.0]}));
        let new = doc(json!({"_id": "1", "v_vector_": [1.0, 2.0, 3.0]}));
        assert!(!is_noop(&diff(&old, &new, &DiffOptions::default())));
    }

    #[test]
    fn vector_with_non_numeric_side_is_changed() {
        let old = doc(json!({"_id": "1", "v_vector_": "pending"}));
        let new = doc(json!({"_id": "1", "v_vector_": [1.0]}));
        assert!(!is_noop(&diff(&old, &new, &DiffOptions::default())));
    }

    #[test]
    fn non_vector_float_uses_strict_equality() {
        let old = doc(json!({"_id": "1", "score": 0.5}));
        let new = doc(json!({"_id": "1", "score": 0.5000001}));
        assert!(!is_noop(&diff(&old, &new, &DiffOptions::default())));
    }

    #[test]
    fn custom_marker_and_tolerance() {
        let options = DiffOptions::new()
            .with_vector_marker("_emb")
            .with_tolerance(0.1);
        let old = doc(json!({"_id": "1", "title_emb": [1.0, 1.0]}));
        let new = doc(json!({"_id": "1", "title_emb": [1.05, 1.0]}));
        assert!(is_noop(&diff(&old, &new, &options)));
    }

    #[test]
    fn field_names_with_dots_are_carried() {
        let old = doc(json!({"_id": "1"}));
        let new = doc(json!({"_id": "1", "a.b": 5, "m": {"x.y": [1, 2]}}));
        let d = diff(&old, &new, &DiffOptions::default());
        assert_eq!(d.to_json(), json!({"_id": "1", "a.b": 5, "m": {"x.y": [1, 2]}}));
        assert!(!is_noop(&d));

        assert!(is_noop(&diff(&new, &new.clone(), &DiffOptions::default())));
    }

    #[test]
    fn scalar_replaced_by_map_is_carried() {
        let old = doc(json!({"_id": "1", "a": 3}));
        let new = doc(json!({"_id": "1", "a": {"b": 3}}));
        let d = diff(&old, &new, &DiffOptions::default());
        assert_eq!(d.to_json(), json!({"_id": "1", "a": {"b": 3}}));
    }

    #[test]
    fn document_without_id_and_no_change_is_empty() {
        let a = doc(json!({"a": 1}));
        let d = diff(&a, &a, &DiffOptions::default());
        assert!(d.is_empty());
        assert!(is_noop(&d));
    }

    fn vector_strategy() -> impl Strategy<Value = Vec<f64>> {
        prop::collection::vec(-1.0e3f64..1.0e3, 1..16)
    }

    proptest! {
        #[test]
        fn vector_change_iff_distance_exceeds_tolerance(
            a in vector_strategy(),
            delta in prop::collection::vec(-1.0e-4f64..1.0e-4, 16),
        ) {
            let b: Vec<f64> = a.iter().zip(&delta).map(|(x, d)| x + d).collect();
            let old = Document::from_value(Value::Map(vec![
                ("_id".into(), Value::from("p")),
                ("x_vector_".into(), Value::from(a.clone())),
            ])).unwrap();
            let new = Document::from_value(Value::Map(vec![
                ("_id".into(), Value::from("p")),
                ("x_vector_".into(), Value::from(b.clone())),
            ])).unwrap();

            let distance = a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt();
            let changed = !is_noop(&diff(&old, &new, &DiffOptions::default()));
            prop_assert_eq!(changed, distance > DEFAULT_VECTOR_TOLERANCE);
        }

        #[test]
        fn vectors_of_different_length_always_change(
            a in vector_strategy(),
            extra in -1.0f64..1.0,
        ) {
            let mut b = a.clone();
            b.push(extra);
            let old = Value::from(a);
            let new = Value::from(b);
            prop_assert!(DiffOptions::default().values_differ("x_vector_", &old, &new));
        }

        #[test]
        fn equal_scalar_fields_never_change(n in any::<i64>(), s in "[a-z]{0,12}") {
            let a = Document::from_value(Value::Map(vec![
                ("_id".into(), Value::from(s.clone())),
                ("n".into(), Value::Integer(n)),
                ("s".into(), Value::Text(s)),
            ])).unwrap();
            prop_assert!(is_noop(&diff(&a, &a.clone(), &DiffOptions::default())));
        }
    }
}
