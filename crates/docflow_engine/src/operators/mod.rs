//! Operators bundled with the engine.
//!
//! None of these load a model. They cover the shapes real workflows take:
//! setting a field, scoring text, deriving a vector and labelling vectors
//! with a post-run hook.

mod centroid;
mod field_set;
mod normalize;
mod sentiment;

pub use centroid::CentroidOperator;
pub use field_set::FieldSetOperator;
pub use normalize::VectorNormalizeOperator;
pub use sentiment::{LexiconSentimentOperator, NO_SENTIMENT};

use crate::error::{OperatorError, OperatorResult};
use docflow_document::{Document, Value};

fn missing_field(document: &Document, field: &str) -> OperatorError {
    OperatorError::MissingField {
        field: field.to_string(),
        id: document.id(),
    }
}

/// Reads a required field from a document.
fn required<'a>(document: &'a Document, field: &str) -> OperatorResult<&'a Value> {
    document.get(field).ok_or_else(|| missing_field(document, field))
}

/// Reads a required numeric array from a document.
fn required_vector(document: &Document, field: &str) -> OperatorResult<Vec<f64>> {
    let value = required(document, field)?;
    value.as_vector().ok_or_else(|| OperatorError::InvalidValue {
        field: field.to_string(),
        message: format!("expected a numeric array, found {}", value.kind()),
    })
}
