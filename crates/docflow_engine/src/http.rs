//! JSON-over-HTTP dataset adapter.
//!
//! The HTTP library is left to the integrator: implement [`HttpClient`] with
//! whatever blocking client is at hand and wrap it in [`HttpDataset`].

use crate::dataset::{Chunk, Dataset, FetchRequest, Schema, UpdateReport};
use crate::error::{DatasetError, DatasetResult};
use crate::filter::Filter;
use docflow_document::Document;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure reported by an [`HttpClient`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// No response was received.
    #[error("connection failed: {0}")]
    Connection(String),
    /// The request timed out.
    #[error("request timed out")]
    Timeout,
    /// The server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body.
        body: String,
    },
}

impl From<HttpError> for DatasetError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Connection(message) => DatasetError::Connection(message),
            HttpError::Timeout => DatasetError::Timeout,
            HttpError::Status { status, body } => DatasetError::Server {
                status,
                message: body,
            },
        }
    }
}

/// Minimal blocking HTTP client.
pub trait HttpClient: Send + Sync {
    /// Sends a POST with a JSON body and returns the response body.
    fn post(&self, url: &str, authorization: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError>;
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn post(&self, url: &str, authorization: &str, body: Vec<u8>) -> Result<Vec<u8>, HttpError> {
        (**self).post(url, authorization, body)
    }
}

#[derive(Serialize)]
struct CountRequest<'a> {
    filters: &'a [Filter],
}

#[derive(Deserialize)]
struct CountResponse {
    count: usize,
}

#[derive(Serialize)]
struct BulkUpdateRequest<'a> {
    updates: &'a [Document],
}

#[derive(Serialize)]
struct BulkInsertRequest<'a> {
    documents: &'a [Document],
}

#[derive(Serialize)]
struct InsertCentroidsRequest<'a> {
    vector_fields: [&'a str; 1],
    alias: &'a str,
    cluster_centers: &'a [Document],
}

#[derive(Serialize)]
struct Empty {}

/// A dataset on the hosted service.
pub struct HttpDataset<C: HttpClient> {
    base_url: String,
    dataset_id: String,
    authorization: String,
    client: C,
}

impl<C: HttpClient> HttpDataset<C> {
    /// Creates an adapter for one dataset.
    pub fn new(
        base_url: impl Into<String>,
        dataset_id: impl Into<String>,
        authorization: impl Into<String>,
        client: C,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            dataset_id: dataset_id.into(),
            authorization: authorization.into(),
            client,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL of a dataset endpoint.
    pub fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/datasets/{}{}",
            self.base_url.trim_end_matches('/'),
            self.dataset_id,
            endpoint
        )
    }

    fn post_json<Req, Res>(&self, endpoint: &str, request: &Req) -> DatasetResult<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)
            .map_err(|e| DatasetError::Protocol(format!("failed to encode request: {e}")))?;
        let response = self
            .client
            .post(&self.url(endpoint), &self.authorization, body)?;
        serde_json::from_slice(&response)
            .map_err(|e| DatasetError::Protocol(format!("failed to decode response: {e}")))
    }
}

impl<C: HttpClient> Dataset for HttpDataset<C> {
    fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    fn schema(&self) -> DatasetResult<Schema> {
        self.post_json("/schema", &Empty {})
    }

    fn count(&self, filters: &[Filter]) -> DatasetResult<usize> {
        let response: CountResponse = self.post_json("/count", &CountRequest { filters })?;
        Ok(response.count)
    }

    fn get_documents(&self, request: &FetchRequest) -> DatasetResult<Chunk> {
        self.post_json("/documents/get_where", request)
    }

    fn update_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        self.post_json(
            "/documents/bulk_update",
            &BulkUpdateRequest { updates: documents },
        )
    }

    fn insert_documents(&self, documents: &[Document]) -> DatasetResult<UpdateReport> {
        self.post_json("/documents/bulk_insert", &BulkInsertRequest { documents })
    }

    fn insert_centroids(
        &self,
        vector_field: &str,
        alias: &str,
        centroids: &[Document],
    ) -> DatasetResult<()> {
        let _: serde_json::Value = self.post_json(
            "/centroids/insert",
            &InsertCentroidsRequest {
                vector_fields: [vector_field],
                alias,
                cluster_centers: centroids,
            },
        )?;
        Ok(())
    }
}

impl<C: HttpClient> std::fmt::Debug for HttpDataset<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDataset")
            .field("base_url", &self.base_url)
            .field("dataset_id", &self.dataset_id)
            .finish_non_exhaustive()
    }
}
