//! In-memory dataset.
//!
//! Behaves like the hosted service for the operations the engine uses:
//! stable insertion-order pagination with an `_id` cursor, filter
//! evaluation, field projection and partial updates merged by path.

use crate::dataset::{Chunk, Cursor, Dataset, FetchRequest, Schema, UpdateReport};
use crate::error::DatasetResult;
use crate::filter::{matches_all, Filter};
use docflow_document::{Document, ID_FIELD};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A dataset held in process memory.
pub struct MemoryDataset {
    dataset_id: String,
    documents: RwLock<Vec<Document>>,
    centroids: RwLock<BTreeMap<(String, String), Vec<Document>>>,
    fetch_calls: AtomicUsize,
    update_calls: AtomicUsize,
}

impl MemoryDataset {
    /// Creates an empty dataset.
    pub fn new(dataset_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            documents: RwLock::new(Vec::new()),
            centroids: RwLock::new(BTreeMap::new()),
            fetch_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
        }
    }

    /// Creates a dataset seeded with documents.
    ///
    /// Documents without an `_id` are given a random one.
    pub fn with_documents(
        dataset_id: impl Into<String>,
        documents: impl IntoIterator<Item = Document>,
    ) -> Self {
        let dataset = Self::new(dataset_id);
        {
            let mut store = dataset.documents.write();
            for document in documents {
                upsert(&mut store, document);
            }
        }
        dataset
    }

    /// Snapshot of every stored document in insertion order.
    pub fn documents(&self) -> Vec<Document> {
        self.documents.read().clone()
    }

    /// Looks up a document by id.
    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents
            .read()
            .iter()
            .find(|d| d.id().as_deref() == Some(id))
            .cloned()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    /// Returns true if no documents are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Centroids stored for a vector field and alias.
    pub fn centroids(&self, vector_field: &str, alias: &str) -> Option<Vec<Document>> {
        self.centroids
            .read()
            .get(&(vector_field.to_string(), alias.to_string()))
            .cloned()
    }

    /// Number of `get_documents` calls served.
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `update_documents` calls served.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

fn upsert(store: &mut Vec<Document>, mut document: Document) -> bool {
    let id = match document.id() {
        Some(id) => id,
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            document.set(ID_FIELD, id.as_str());
            id
        }
    };
    match store.iter_mut().find(|d| d.id().as_deref() == Some(id.as_str())) {
        Some(existing) => {
            *existing = document;
            false
        }
        None => {
            store.push(document);
            true
        }
    }
}

fn project(document: &Document, select_fields: Option<&[String]>) -> Document {
    let fields = match select_fields {
        Some(fields) if !fields.is_empty() => fields,
        _ => return document.clone(),
    };
    let mut projected = Document::new();
    if let Some(id) = document.id_value() {
        projected.set(ID_FIELD, id.clone());
    }
    for field in fields {
        if let Some(value) = document.get(field) {
            projected.set(field, value.clone());
        }
    }
    projected
}

impl Dataset for MemoryDataset {
    fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    fn schema(&self) -> DatasetResult<Schema> {
        Ok(Schema::infer(self.documents.read().iter()))
    }

    fn count(&self, filters: &[Filter]) -> DatasetResult<usize> {
        Ok(self
            .documents
            .read()
            .iter()
            .filter(|d| matches_all(filters, d))
            .count())
    }

    fn get_documents(&self, request: &FetchRequest) -> DatasetResult<Chunk> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let store = self.documents.read();

        let start = match request.after_id.as_ref().and_then(|c| c.0.first()) {
            Some(last) => store
                .iter()
                .position(|d| d.id_value() == Some(last))
                .map_or(store.len(), |index| index + 1),
            None => 0,
        };

        let documents: Vec<Document> = store[start..]
            .iter()
            .filter(|d| matches_all(&request.filters, d))
            .take(request.page_size)
            .map(|d| project(d, request.select_fields.as_deref()))
            .collect();

        let after_id = match documents.last().and_then(Document::id_value) {
            Some(id) => Some(Cursor::after(id.clone())),
            None => request.after_id.clone(),
        };

        Ok(Chunk {
            documents,
            after_id,
        })
    }

    fn update_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        let mut store = self.documents.write();
        let mut report = UpdateReport::default();

        for update in documents {
            let Some(id) = update.id() else {
                report.failed_documents.push(String::new());
                continue;
            };
            match store.iter_mut().find(|d| d.id().as_deref() == Some(id.as_str())) {
                Some(target) => {
                    for path in update.keys() {
                        if let Some(value) = update.get(&path) {
                            target.set(&path, value.clone());
                        }
                    }
                    report.updated += 1;
                }
                None => report.failed_documents.push(id),
            }
        }
        Ok(report)
    }

    fn insert_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        let mut store = self.documents.write();
        let mut report = UpdateReport::default();
        for document in documents {
            if upsert(&mut store, document.clone()) {
                report.inserted += 1;
            } else {
                report.updated += 1;
            }
        }
        Ok(report)
    }

    fn insert_centroids(
        &self,
        vector_field: &str,
        alias: &str,
        centroids: &[Document],
    ) -> DatasetResult<()> {
        self.centroids.write().insert(
            (vector_field.to_string(), alias.to_string()),
            centroids.to_vec(),
        );
        Ok(())
    }
}

impl std::fmt::Debug for MemoryDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDataset")
            .field("dataset_id", &self.dataset_id)
            .field("documents", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_document::Value;
    use serde_json::json;

    fn document_with(id: impl Into<Value>, field: &str, value: impl Into<Value>) -> Document {
        let mut document = Document::with_id(id);
        document.set(field, value);
        document
    }

    fn dataset(n: usize) -> MemoryDataset {
        MemoryDataset::with_documents(
            "test",
            (0..n).map(|i| document_with(format!("doc-{i}"), "n", i)),
        )
    }

    #[test]
    fn paginates_with_cursor() {
        let ds = dataset(5);
        let mut request = FetchRequest::new(2);

        let first = ds.get_documents(&request).unwrap();
        assert_eq!(first.documents.len(), 2);
        assert_eq!(first.after_id, Some(Cursor::after("doc-1")));

        request.after_id = first.after_id;
        let second = ds.get_documents(&request).unwrap();
        assert_eq!(second.documents[0].id().as_deref(), Some("doc-2"));

        request.after_id = Some(Cursor::after("doc-4"));
        let last = ds.get_documents(&request).unwrap();
        assert!(last.documents.is_empty());
        assert_eq!(last.after_id, Some(Cursor::after("doc-4")));
        assert_eq!(ds.fetch_calls(), 3);
    }

    #[test]
    fn filters_and_projection() {
        let ds = MemoryDataset::with_documents(
            "test",
            vec![
                Document::from_json(json!({"_id": "a", "text": "x", "other": 1})).unwrap(),
                Document::from_json(json!({"_id": "b", "other": 2})).unwrap(),
            ],
        );
        let mut request = FetchRequest::new(10);
        request.filters = vec![Filter::exists("text")];
        request.select_fields = Some(vec!["text".into()]);

        let chunk = ds.get_documents(&request).unwrap();
        assert_eq!(chunk.documents.len(), 1);
        assert_eq!(chunk.documents[0].to_json(), json!({"_id": "a", "text": "x"}));
        assert_eq!(ds.count(&request.filters).unwrap(), 1);
        assert_eq!(ds.count(&[]).unwrap(), 2);
    }

    #[test]
    fn partial_update_merges_paths() {
        let ds = MemoryDataset::with_documents(
            "test",
            vec![Document::from_json(json!({"_id": "a", "meta": {"x": 1, "y": 2}})).unwrap()],
        );
        let update = Document::from_json(json!({"_id": "a", "meta": {"x": 9}})).unwrap();
        let missing = Document::with_id("zzz");

        let report = ds.update_documents(&[update, missing]).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.failed_documents, vec!["zzz".to_string()]);
        assert_eq!(
            ds.get("a").unwrap().to_json(),
            json!({"_id": "a", "meta": {"x": 9, "y": 2}})
        );
    }

    #[test]
    fn insert_assigns_ids_and_upserts() {
        let ds = MemoryDataset::new("test");
        let report = ds
            .insert_documents(&[Document::new(), document_with("a", "n", 1)])
            .unwrap();
        assert_eq!(report.inserted, 2);
        assert!(ds.documents().iter().all(|d| d.id().is_some()));

        let report = ds.insert_documents(&[document_with("a", "n", 2)]).unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get("a").unwrap().get("n"), Some(&Value::Integer(2)));
    }

    #[test]
    fn stores_centroids() {
        let ds = MemoryDataset::new("test");
        ds.insert_centroids("v_vector_", "k2", &[Document::with_id("cluster_0")])
            .unwrap();
        assert_eq!(ds.centroids("v_vector_", "k2").unwrap().len(), 1);
        assert_eq!(ds.centroids("v_vector_", "other"), None);
    }
}
