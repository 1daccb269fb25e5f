//! Benchmark utilities.

use docflow_document::Document;
use rand::Rng;

/// Generate a random vector of the given dimension.
pub fn random_vector(dimension: usize) -> Vec<f64> {
    let mut rng = rand::thread_rng();
    (0..dimension).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Generate a document with `fields` scalar fields, a nested map and a
/// vector field of the given dimension.
pub fn random_document(id: usize, fields: usize, dimension: usize) -> Document {
    let mut rng = rand::thread_rng();
    let mut document = Document::with_id(id.to_string());
    for i in 0..fields {
        document.set(&format!("field_{i}"), rng.gen_range(0..1000_i64));
    }
    document.set("meta.source", "bench");
    document.set("meta.score", rng.gen_range(0.0..1.0_f64));
    document.set("sample_vector_", random_vector(dimension));
    document
}

/// Generate `count` documents with ids `"0"`, `"1"`, ...
pub fn generate_documents(count: usize, fields: usize, dimension: usize) -> Vec<Document> {
    (0..count)
        .map(|i| random_document(i, fields, dimension))
        .collect()
}

/// Copy of `document` with `changed` fields rewritten and the vector
/// nudged below the default tolerance.
pub fn perturb(document: &Document, changed: usize) -> Document {
    let mut updated = document.clone();
    for i in 0..changed {
        updated.set(&format!("field_{i}"), -1);
    }
    if let Some(vector) = document.get("sample_vector_").and_then(|v| v.as_vector()) {
        let nudged: Vec<f64> = vector.iter().map(|x| x + 1e-9).collect();
        updated.set("sample_vector_", nudged);
    }
    updated
}
