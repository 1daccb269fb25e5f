//! User-defined batch transforms.

use crate::dataset::Dataset;
use crate::error::{OperatorError, OperatorResult};
use docflow_document::{diff, is_noop, DiffOptions, Document};

/// A transform applied to each chunk of documents.
///
/// Only [`transform`](Operator::transform) is required. The hooks run once
/// per engine run, before the first fetch and after the last update.
pub trait Operator {
    /// Name used in logs.
    fn name(&self) -> &str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Fields the transform reads.
    fn input_fields(&self) -> &[String] {
        &[]
    }

    /// Fields the transform writes.
    fn output_fields(&self) -> &[String] {
        &[]
    }

    /// Transforms a batch. Must return one document per input, in order.
    fn transform(&mut self, documents: Vec<Document>) -> OperatorResult<Vec<Document>>;

    /// Runs before the first chunk is fetched.
    fn pre_hooks(&mut self, _dataset: &dyn Dataset) -> OperatorResult<()> {
        Ok(())
    }

    /// Runs after the last chunk was written.
    fn post_hooks(&mut self, _dataset: &dyn Dataset) -> OperatorResult<()> {
        Ok(())
    }
}

impl<O: Operator + ?Sized> Operator for Box<O> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn input_fields(&self) -> &[String] {
        (**self).input_fields()
    }

    fn output_fields(&self) -> &[String] {
        (**self).output_fields()
    }

    fn transform(&mut self, documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
        (**self).transform(documents)
    }

    fn pre_hooks(&mut self, dataset: &dyn Dataset) -> OperatorResult<()> {
        (**self).pre_hooks(dataset)
    }

    fn post_hooks(&mut self, dataset: &dyn Dataset) -> OperatorResult<()> {
        (**self).post_hooks(dataset)
    }
}

/// Runs the transform on a copy of `batch` and returns the field diffs.
///
/// Each transformed document is diffed against the original at the same
/// position. Diffs carrying nothing but `_id` are dropped.
pub fn apply<O: Operator + ?Sized>(
    operator: &mut O,
    batch: &[Document],
    options: &DiffOptions,
) -> OperatorResult<Vec<Document>> {
    let transformed = operator.transform(batch.to_vec())?;
    if transformed.len() != batch.len() {
        return Err(OperatorError::BatchSizeMismatch {
            expected: batch.len(),
            returned: transformed.len(),
        });
    }

    Ok(batch
        .iter()
        .zip(&transformed)
        .map(|(old, new)| diff(old, new, options))
        .filter(|d| !is_noop(d))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_document::Value;
    use serde_json::json;

    struct Touch {
        field: &'static str,
        only_even: bool,
    }

    impl Operator for Touch {
        fn transform(&mut self, mut documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
            for (i, document) in documents.iter_mut().enumerate() {
                if !self.only_even || i % 2 == 0 {
                    document.set(self.field, "touched");
                }
            }
            Ok(documents)
        }
    }

    struct DropLast;

    impl Operator for DropLast {
        fn transform(&mut self, mut documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
            documents.pop();
            Ok(documents)
        }
    }

    fn batch(n: usize) -> Vec<Document> {
        (0..n)
            .map(|i| Document::from_json(json!({"_id": i.to_string(), "text": "x"})).unwrap())
            .collect()
    }

    #[test]
    fn diffs_only_changed_documents() {
        let old = batch(4);
        let mut op = Touch {
            field: "label",
            only_even: true,
        };

        let diffs = apply(&mut op, &old, &DiffOptions::default()).unwrap();
        assert_eq!(diffs.len(), 2);
        assert_eq!(diffs[0].to_json(), json!({"_id": "0", "label": "touched"}));
        assert_eq!(diffs[1].id().as_deref(), Some("2"));

        // The input batch is untouched.
        assert!(old.iter().all(|d| !d.contains("label")));
    }

    #[test]
    fn unchanged_batch_yields_no_diffs() {
        let old = batch(3);
        let mut op = Touch {
            field: "text",
            only_even: false,
        };
        let once = apply(&mut op, &old, &DiffOptions::default()).unwrap();
        assert_eq!(once.len(), 3);

        let updated: Vec<Document> = old
            .iter()
            .map(|d| {
                let mut d = d.clone();
                d.set("text", "touched");
                d
            })
            .collect();
        let twice = apply(&mut op, &updated, &DiffOptions::default()).unwrap();
        assert!(twice.is_empty());
    }

    #[test]
    fn batch_size_change_is_an_error() {
        let err = apply(&mut DropLast, &batch(3), &DiffOptions::default()).unwrap_err();
        assert!(matches!(
            err,
            OperatorError::BatchSizeMismatch {
                expected: 3,
                returned: 2
            }
        ));
    }

    #[test]
    fn boxed_operator_delegates() {
        let mut op: Box<dyn Operator> = Box::new(Touch {
            field: "n",
            only_even: false,
        });
        assert_eq!(op.name(), "Touch");
        let out = op.transform(batch(1)).unwrap();
        assert_eq!(out[0].get("n"), Some(&Value::from("touched")));
    }
}
