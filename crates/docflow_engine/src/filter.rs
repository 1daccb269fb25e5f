//! Filter predicates over dataset documents.
//!
//! A filter list is an implicit AND. The JSON shapes match what the dataset
//! service accepts, e.g. `{"matchModulo": {"field": "_id", "modulo": 4,
//! "value": 1}}`.

use docflow_document::{Document, Value, ID_FIELD};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A single filter predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Filter {
    /// The field is present.
    Exists {
        /// Dotted field path.
        field: String,
    },
    /// The field equals a value.
    Equals {
        /// Dotted field path.
        field: String,
        /// Expected value.
        value: Value,
    },
    /// The field's numeric key modulo `modulo` equals `value`.
    MatchModulo {
        /// Dotted field path.
        field: String,
        /// Divisor, always positive.
        modulo: u32,
        /// Expected remainder.
        value: u32,
    },
}

impl Filter {
    /// Creates an exists filter.
    pub fn exists(field: impl Into<String>) -> Self {
        Filter::Exists {
            field: field.into(),
        }
    }

    /// Creates an equality filter.
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equals {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates a modulo filter.
    pub fn match_modulo(field: impl Into<String>, modulo: u32, value: u32) -> Self {
        Filter::MatchModulo {
            field: field.into(),
            modulo,
            value,
        }
    }

    /// Filter selecting the share of `_id` space owned by one worker.
    ///
    /// Workers are numbered from 1. Worker `n` of `total` owns ids whose key
    /// modulo `total` equals `n mod total`, so workers `1..=total` cover every
    /// id exactly once. Returns `None` when either number is zero.
    pub fn worker_partition(worker_number: u32, total_workers: u32) -> Option<Self> {
        if worker_number == 0 || total_workers == 0 {
            return None;
        }
        Some(Filter::match_modulo(
            ID_FIELD,
            total_workers,
            worker_number % total_workers,
        ))
    }

    /// Evaluates the predicate against a document.
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::Exists { field } => document.contains(field),
            Filter::Equals { field, value } => document.get(field) == Some(value),
            Filter::MatchModulo {
                field,
                modulo,
                value,
            } => {
                if *modulo == 0 {
                    return false;
                }
                document
                    .get(field)
                    .and_then(modulo_key)
                    .is_some_and(|key| key % u64::from(*modulo) == u64::from(*value))
            }
        }
    }
}

/// Returns true if the document passes every filter.
pub fn matches_all(filters: &[Filter], document: &Document) -> bool {
    filters.iter().all(|filter| filter.matches(document))
}

/// Maps a field value to the unsigned key used by modulo partitioning.
///
/// Integers and integer-like text use their numeric value; other text uses
/// the first eight bytes of its SHA-256 digest.
pub fn modulo_key(value: &Value) -> Option<u64> {
    match value {
        Value::Integer(n) => Some(n.unsigned_abs()),
        Value::Text(text) => match text.parse::<i64>() {
            Ok(n) => Some(n.unsigned_abs()),
            Err(_) => {
                let digest = Sha256::digest(text.as_bytes());
                let mut prefix = [0u8; 8];
                prefix.copy_from_slice(&digest[..8]);
                Some(u64::from_be_bytes(prefix))
            }
        },
        _ => None,
    }
}
