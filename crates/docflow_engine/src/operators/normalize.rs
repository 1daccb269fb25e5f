use super::required_vector;
use crate::error::OperatorResult;
use crate::operator::Operator;
use docflow_document::{Document, Documents};

/// Writes the L2-normalised copy of a vector field.
///
/// The output lands in `<field>_normalized_vector_`, so re-running over
/// already processed documents produces no diff even when float rounding
/// differs slightly between runs. A zero vector is copied unchanged.
#[derive(Debug, Clone)]
pub struct VectorNormalizeOperator {
    input_fields: Vec<String>,
    output_fields: Vec<String>,
}

impl VectorNormalizeOperator {
    /// Creates an operator over `vector_field`.
    pub fn new(vector_field: impl Into<String>) -> Self {
        let vector_field = vector_field.into();
        let output = format!("{vector_field}_normalized_vector_");
        Self {
            input_fields: vec![vector_field],
            output_fields: vec![output],
        }
    }

    /// Path the normalised vector is written to.
    pub fn output_field(&self) -> &str {
        &self.output_fields[0]
    }
}

/// Scales a vector to unit length.
fn normalize(vector: &[f64]) -> Vec<f64> {
    let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|x| x / norm).collect()
}

impl Operator for VectorNormalizeOperator {
    fn name(&self) -> &str {
        "vector-normalize"
    }

    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    fn transform(&mut self, mut documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
        let normalized = documents
            .iter()
            .map(|document| required_vector(document, &self.input_fields[0]))
            .map(|vector| vector.map(|v| normalize(&v)))
            .collect::<OperatorResult<Vec<_>>>()?;
        documents.set_field_each(&self.output_fields[0], normalized)?;
        Ok(documents)
    }
}
