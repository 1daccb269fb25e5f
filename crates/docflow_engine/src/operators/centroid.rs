use super::required_vector;
use crate::dataset::Dataset;
use crate::error::{OperatorError, OperatorResult};
use crate::operator::Operator;
use docflow_document::{Document, Documents, Value};
use tracing::debug;

/// Assigns each vector to the nearest of a fixed set of centroids.
///
/// Labels (`cluster_<n>`) are written under `_cluster_.<field>.<alias>`.
/// After the run the centroids themselves are stored on the dataset as
/// documents `{_id: "cluster_<n>", centroid_vector: [...]}`.
#[derive(Debug, Clone)]
pub struct CentroidOperator {
    input_fields: Vec<String>,
    output_fields: Vec<String>,
    alias: String,
    centroids: Vec<Vec<f64>>,
    counts: Vec<usize>,
}

impl CentroidOperator {
    /// Creates an operator over `vector_field`.
    ///
    /// Fails if there are no centroids or they differ in length.
    pub fn new(vector_field: impl Into<String>, centroids: Vec<Vec<f64>>) -> OperatorResult<Self> {
        let alias = format!("fixed-{}", centroids.len());
        Self::with_alias(vector_field, alias, centroids)
    }

    /// Creates an operator writing under the given alias.
    pub fn with_alias(
        vector_field: impl Into<String>,
        alias: impl Into<String>,
        centroids: Vec<Vec<f64>>,
    ) -> OperatorResult<Self> {
        let vector_field = vector_field.into();
        let alias = alias.into();
        let dimension = centroids.first().map(Vec::len).unwrap_or(0);
        if dimension == 0 || centroids.iter().any(|c| c.len() != dimension) {
            return Err(OperatorError::InvalidValue {
                field: vector_field,
                message: "centroids must be non-empty and share one dimension".into(),
            });
        }
        let output = format!("_cluster_.{vector_field}.{alias}");
        Ok(Self {
            input_fields: vec![vector_field],
            output_fields: vec![output],
            alias,
            counts: vec![0; centroids.len()],
            centroids,
        })
    }

    /// Path the cluster label is written to.
    pub fn output_field(&self) -> &str {
        &self.output_fields[0]
    }

    /// Documents assigned to each centroid so far.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Index of the nearest centroid. Ties go to the lowest index.
    pub fn nearest(&self, vector: &[f64]) -> Option<usize> {
        if vector.len() != self.centroids[0].len() {
            return None;
        }
        self.centroids
            .iter()
            .map(|c| c.iter().zip(vector).map(|(a, b)| (a - b) * (a - b)).sum::<f64>())
            .enumerate()
            .fold(None, |best: Option<(usize, f64)>, (i, d)| match best {
                Some((_, best_d)) if best_d <= d => best,
                _ => Some((i, d)),
            })
            .map(|(i, _)| i)
    }

    fn centroid_documents(&self) -> Vec<Document> {
        self.centroids
            .iter()
            .enumerate()
            .map(|(i, centroid)| {
                let mut document = Document::with_id(format!("cluster_{i}"));
                document.set("centroid_vector", Value::from(centroid.clone()));
                document
            })
            .collect()
    }
}

impl Operator for CentroidOperator {
    fn name(&self) -> &str {
        "centroid"
    }

    fn input_fields(&self) -> &[String] {
        &self.input_fields
    }

    fn output_fields(&self) -> &[String] {
        &self.output_fields
    }

    fn transform(&mut self, mut documents: Vec<Document>) -> OperatorResult<Vec<Document>> {
        let field = &self.input_fields[0];
        let mut labels = Vec::with_capacity(documents.len());
        for document in &documents {
            let vector = required_vector(document, field)?;
            let cluster = self
                .nearest(&vector)
                .ok_or_else(|| OperatorError::InvalidValue {
                    field: field.clone(),
                    message: format!(
                        "vector has {} dimensions, centroids have {}",
                        vector.len(),
                        self.centroids[0].len()
                    ),
                })?;
            self.counts[cluster] += 1;
            labels.push(format!("cluster_{cluster}"));
        }
        documents.set_field_each(&self.output_fields[0], labels)?;
        Ok(documents)
    }

    fn post_hooks(&mut self, dataset: &dyn Dataset) -> OperatorResult<()> {
        debug!(
            vector_field = %self.input_fields[0],
            alias = %self.alias,
            counts = ?self.counts,
            "inserting centroids"
        );
        dataset.insert_centroids(&self.input_fields[0], &self.alias, &self.centroid_documents())?;
        Ok(())
    }
}
