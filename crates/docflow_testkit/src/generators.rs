//! Property-based test generators using proptest.
//!
//! Provides strategies for documents, values and filters that keep the
//! invariants the engine relies on: maps have unique keys without dots and
//! every generated document carries an `_id`.

use docflow_document::{Document, Value, ID_FIELD};
use docflow_engine::Filter;
use proptest::prelude::*;

/// Strategy for field names: no dots, never `_id`.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,9}").expect("Invalid regex")
}

/// Strategy for scalar values. Floats are finite.
pub fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        (-1.0e9..1.0e9f64).prop_map(Value::Float),
        "[a-zA-Z0-9 ]{0,16}".prop_map(Value::Text),
    ]
}

/// Strategy for nested values up to three levels deep.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    scalar_strategy().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(field_name_strategy(), inner, 0..4)
                .prop_map(|map| Value::Map(map.into_iter().collect())),
        ]
    })
}

/// Strategy for numeric vectors of a fixed length.
pub fn vector_strategy(dimension: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e3..1.0e3f64, dimension)
}

/// Strategy for a document with the given id and up to six fields.
pub fn document_with_id_strategy(id: String) -> impl Strategy<Value = Document> {
    prop::collection::btree_map(field_name_strategy(), value_strategy(), 0..6).prop_map(
        move |fields| {
            let mut document = Document::with_id(id.clone());
            for (name, value) in fields {
                document.set(&name, value);
            }
            document
        },
    )
}

/// Strategy for a document with a random id.
pub fn document_strategy() -> impl Strategy<Value = Document> {
    "[a-z0-9]{1,12}".prop_flat_map(document_with_id_strategy)
}

/// Strategy for a batch of documents with distinct ids `doc-0`, `doc-1`, ...
pub fn documents_strategy(min: usize, max: usize) -> impl Strategy<Value = Vec<Document>> {
    (min..max).prop_flat_map(|n| {
        (0..n)
            .map(|i| document_with_id_strategy(format!("doc-{i}")))
            .collect::<Vec<_>>()
    })
}

/// Strategy for filters over the given field names.
pub fn filter_strategy(fields: Vec<String>) -> impl Strategy<Value = Filter> {
    let field = prop::sample::select(fields);
    prop_oneof![
        field.clone().prop_map(|f| Filter::exists(f)),
        (field.clone(), scalar_strategy()).prop_map(|(f, v)| Filter::equals(f, v)),
        (1u32..8)
            .prop_flat_map(|modulo| (Just(modulo), 0..modulo))
            .prop_map(|(modulo, value)| Filter::match_modulo(ID_FIELD, modulo, value)),
    ]
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
