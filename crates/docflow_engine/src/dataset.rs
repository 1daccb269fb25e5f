//! Dataset collaborator abstraction.
//!
//! The remote dataset service is reached through the [`Dataset`] trait so
//! the engine can run against the hosted API, an in-memory store or a test
//! double without change.

use crate::error::DatasetResult;
use crate::filter::Filter;
use docflow_document::{Document, Value, ID_FIELD, INSERT_DATE_FIELD, PATH_SEPARATOR};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Opaque pagination cursor returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub Vec<Value>);

impl Cursor {
    /// Cursor positioned after the document with the given id.
    pub fn after(id: impl Into<Value>) -> Self {
        Cursor(vec![id.into()])
    }
}

/// A page of documents request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchRequest {
    /// Maximum number of documents to return.
    pub page_size: usize,
    /// Filters combined with AND.
    pub filters: Vec<Filter>,
    /// Fields to project; `None` or empty returns whole documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select_fields: Option<Vec<String>>,
    /// Cursor from the previous page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_id: Option<Cursor>,
    /// Worker issuing the request, for server-side accounting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker_number: Option<u32>,
}

impl FetchRequest {
    /// Creates a request for the first page.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_size,
            filters: Vec::new(),
            select_fields: None,
            after_id: None,
            worker_number: None,
        }
    }
}

/// A page of documents and the cursor to continue from.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Chunk {
    /// Documents in this page.
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Cursor to pass to the next request.
    #[serde(default)]
    pub after_id: Option<Cursor>,
}

/// Acknowledgement of a bulk write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Documents newly inserted.
    #[serde(default)]
    pub inserted: usize,
    /// Documents updated in place.
    #[serde(default)]
    pub updated: usize,
    /// Ids of documents the service rejected.
    #[serde(default)]
    pub failed_documents: Vec<String>,
}

/// Field types of a dataset, keyed by dotted path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema(BTreeMap<String, String>);

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field.
    pub fn insert(&mut self, field: impl Into<String>, field_type: impl Into<String>) {
        self.0.insert(field.into(), field_type.into());
    }

    /// Type of a field, if known.
    pub fn field_type(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Returns true if the field exists, either as a leaf or as the parent
    /// of one. `_id` and `insert_date_` are always present.
    pub fn contains(&self, field: &str) -> bool {
        if field == ID_FIELD || field == INSERT_DATE_FIELD || self.0.contains_key(field) {
            return true;
        }
        let prefix = format!("{field}{PATH_SEPARATOR}");
        self.0
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(key, _)| key.starts_with(&prefix))
    }

    /// Iterates over fields and their types.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the schema has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Infers a schema from sample documents.
    ///
    /// The first non-null value seen for a path decides its type.
    pub fn infer<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut schema = Self::new();
        for document in documents {
            for path in document.keys() {
                if schema.0.contains_key(&path) {
                    continue;
                }
                if let Some(field_type) = document.get(&path).and_then(type_name) {
                    schema.0.insert(path, field_type.to_string());
                }
            }
        }
        schema
    }
}

impl FromIterator<(String, String)> for Schema {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Schema(iter.into_iter().collect())
    }
}

fn type_name(value: &Value) -> Option<&'static str> {
    match value {
        Value::Null => None,
        Value::Bool(_) => Some("bool"),
        Value::Integer(_) | Value::Float(_) => Some("numeric"),
        Value::Text(_) => Some("text"),
        Value::Array(items) if !items.is_empty() && value.as_vector().is_some() => Some("vector_"),
        Value::Array(_) => Some("array"),
        Value::Map(_) => Some("dict"),
    }
}

/// The remote dataset the engine reads from and writes to.
///
/// All methods take `&self`; implementations needing mutation use interior
/// mutability.
pub trait Dataset: Send + Sync {
    /// Identifier of the dataset.
    fn dataset_id(&self) -> &str;

    /// Field types currently known to the service.
    fn schema(&self) -> DatasetResult<Schema>;

    /// Approximate number of documents matching the filters.
    fn count(&self, filters: &[Filter]) -> DatasetResult<usize>;

    /// Fetches one page of documents.
    fn get_documents(&self, request: &FetchRequest) -> DatasetResult<Chunk>;

    /// Applies partial updates addressed by `_id`.
    fn update_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport>;

    /// Inserts or replaces whole documents.
    fn insert_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport>;

    /// Stores cluster centroids computed over a vector field.
    fn insert_centroids(
        &self,
        vector_field: &str,
        alias: &str,
        centroids: &[Document],
    ) -> DatasetResult<()>;
}

impl<T: Dataset + ?Sized> Dataset for &T {
    fn dataset_id(&self) -> &str {
        (**self).dataset_id()
    }

    fn schema(&self) -> DatasetResult<Schema> {
        (**self).schema()
    }

    fn count(&self, filters: &[Filter]) -> DatasetResult<usize> {
        (**self).count(filters)
    }

    fn get_documents(&self, request: &FetchRequest) -> DatasetResult<Chunk> {
        (**self).get_documents(request)
    }

    fn update_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        (**self).update_documents(documents)
    }

    fn insert_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        (**self).insert_documents(documents)
    }

    fn insert_centroids(
        &self,
        vector_field: &str,
        alias: &str,
        centroids: &[Document],
    ) -> DatasetResult<()> {
        (**self).insert_centroids(vector_field, alias, centroids)
    }
}

impl<T: Dataset + ?Sized> Dataset for Arc<T> {
    fn dataset_id(&self) -> &str {
        (**self).dataset_id()
    }

    fn schema(&self) -> DatasetResult<Schema> {
        (**self).schema()
    }

    fn count(&self, filters: &[Filter]) -> DatasetResult<usize> {
        (**self).count(filters)
    }

    fn get_documents(&self, request: &FetchRequest) -> DatasetResult<Chunk> {
        (**self).get_documents(request)
    }

    fn update_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        (**self).update_documents(documents)
    }

    fn insert_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        (**self).insert_documents(documents)
    }

    fn insert_centroids(
        &self,
        vector_field: &str,
        alias: &str,
        centroids: &[Document],
    ) -> DatasetResult<()> {
        (**self).insert_centroids(vector_field, alias, centroids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_inference() {
        let docs = vec![
            Document::from_json(json!({
                "_id": "1",
                "text": "hi",
                "score": 0.5,
                "title_vector_": [0.1, 0.2],
                "tags": [],
                "meta": {"lang": "en"},
            }))
            .unwrap(),
            Document::from_json(json!({"_id": "2", "maybe": null, "flag": true})).unwrap(),
        ];
        let schema = Schema::infer(&docs);

        assert_eq!(schema.field_type("text"), Some("text"));
        assert_eq!(schema.field_type("score"), Some("numeric"));
        assert_eq!(schema.field_type("title_vector_"), Some("vector_"));
        assert_eq!(schema.field_type("tags"), Some("array"));
        assert_eq!(schema.field_type("meta.lang"), Some("text"));
        assert_eq!(schema.field_type("flag"), Some("bool"));
        assert_eq!(schema.field_type("maybe"), None);
    }

    #[test]
    fn schema_contains_parents_and_reserved_fields() {
        let schema: Schema = vec![("meta.lang".to_string(), "text".to_string())]
            .into_iter()
            .collect();
        assert!(schema.contains("meta.lang"));
        assert!(schema.contains("meta"));
        assert!(!schema.contains("met"));
        assert!(!schema.contains("meta.lan"));
        assert!(schema.contains("_id"));
        assert!(schema.contains("insert_date_"));
    }

    #[test]
    fn fetch_request_wire_shape() {
        let mut request = FetchRequest::new(8);
        request.filters.push(Filter::exists("text"));
        request.after_id = Some(Cursor::after("doc-7"));
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "page_size": 8,
                "filters": [{"exists": {"field": "text"}}],
                "after_id": ["doc-7"],
            })
        );
    }

    #[test]
    fn chunk_defaults() {
        let chunk: Chunk = serde_json::from_value(json!({})).unwrap();
        assert!(chunk.documents.is_empty());
        assert_eq!(chunk.after_id, None);
    }
}
