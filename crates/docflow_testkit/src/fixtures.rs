//! Document fixtures and file-backed datasets.

use docflow_document::{Document, Value};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const WORDS: &[&str] = &[
    "great", "terrible", "service", "food", "arrived", "late", "love", "price", "quality",
    "broken", "fast", "shipping", "happy", "awful", "value", "again",
];

const SENTENCES: &[&str] = &[
    "I love this product, great value",
    "Terrible service and the box arrived broken",
    "It works",
    "Fast shipping, happy with the quality",
    "Awful. Would not buy again",
];

/// Dimension of the vectors in generated documents.
pub const VECTOR_DIMENSION: usize = 5;

/// Random documents with text, numeric, label and vector fields.
///
/// Ids are random UUIDs.
pub fn mock_documents(n: usize) -> Vec<Document> {
    let mut rng = rand::thread_rng();
    (0..n)
        .map(|_| {
            let mut document = Document::with_id(uuid::Uuid::new_v4().to_string());
            let words: Vec<&str> = (0..rng.gen_range(3..10))
                .filter_map(|_| WORDS.choose(&mut rng).copied())
                .collect();
            document.set("sample_1_description", words.join(" "));
            document.set("sample_1_label", WORDS.choose(&mut rng).copied().unwrap_or("none"));
            document.set("sample_1_value", rng.gen_range(0.0..100.0_f64));
            document.set(
                "sample_1_vector_",
                (0..VECTOR_DIMENSION)
                    .map(|_| rng.gen_range(-1.0..1.0))
                    .collect::<Vec<f64>>(),
            );
            document
        })
        .collect()
}

/// Deterministic documents with ids `"0"`, `"1"`, ...
///
/// Each has `text`, `numeric_field`, `sample_vector_` and `meta.index`.
pub fn static_documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let mut document = Document::with_id(i.to_string());
            document.set("text", SENTENCES[i % SENTENCES.len()]);
            document.set("numeric_field", i);
            let base = i as f64;
            document.set(
                "sample_vector_",
                (0..VECTOR_DIMENSION)
                    .map(|d| base + d as f64)
                    .collect::<Vec<f64>>(),
            );
            document.set("meta.index", i);
            document
        })
        .collect()
}

/// A document built from JSON. Panics on non-object input.
pub fn document(json: serde_json::Value) -> Document {
    Document::from_json(json).expect("fixture must be a JSON object")
}

/// Ids of the documents, in order.
pub fn ids(documents: &[Document]) -> Vec<String> {
    documents.iter().filter_map(Document::id).collect()
}

/// A JSON dataset file in a temporary directory.
///
/// The file holds a JSON array of documents and is removed on drop.
pub struct DatasetFile {
    path: PathBuf,
    _temp_dir: TempDir,
}

impl DatasetFile {
    /// Writes the documents to a fresh file.
    pub fn new(documents: &[Document]) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let path = temp_dir.path().join("dataset.json");
        let file = Self {
            path,
            _temp_dir: temp_dir,
        };
        file.write(documents);
        file
    }

    /// Path of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the file.
    pub fn dir(&self) -> &Path {
        self._temp_dir.path()
    }

    /// Replaces the file contents.
    pub fn write(&self, documents: &[Document]) {
        let json = serde_json::to_vec_pretty(documents).expect("Failed to encode documents");
        std::fs::write(&self.path, json).expect("Failed to write dataset file");
    }

    /// Reads the documents back.
    pub fn read(&self) -> Vec<Document> {
        let bytes = std::fs::read(&self.path).expect("Failed to read dataset file");
        serde_json::from_slice(&bytes).expect("Failed to decode dataset file")
    }
}

/// Reads a field as text, or panics.
pub fn text_at<'a>(document: &'a Document, path: &str) -> &'a str {
    document
        .get(path)
        .and_then(Value::as_text)
        .unwrap_or_else(|| panic!("{path} is not text in {:?}", document.id()))
}
