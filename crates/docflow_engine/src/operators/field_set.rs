use crate::error::OperatorResult;
use crate::operator::Operator;
use docflow_document::{Document, Documents, Value};

/// Sets a constant value at a path on every document.
#[derive(Debug, Clone)]
pub struct FieldSetOperator {
    output_fields: Vec<String>,
    value: Value,
}

impl FieldSetOperator {
    /// Creates an operator writing `value` at `path`.
    pub fn new(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            output_fields: vec![path.into()],
            value: value.into(),
        }
    }

    /// Path written by this operator.
    pub fn path(&self) -> &str {
        &self.output_fields[0]
    }
}

impl Operator for FieldSetOperator {
    fn name(&self) -> &str {
        "field-set"
    }

    fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    fn transform(&mut self, mut documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
        documents.set_field(&self.output_fields[0], self.value.clone());
        Ok(documents)
    }
}
