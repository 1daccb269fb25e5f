//! Workflow tokens.
//!
//! A token is a base64-encoded JSON object carrying credentials, the target
//! dataset and operator parameters. Padding is optional.

use crate::context::JobContext;
use crate::error::{TokenError, TokenResult};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use docflow_engine::{EngineConfig, Filter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const TOKEN_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const REQUIRED_KEYS: [&str; 2] = ["authorizationToken", "dataset_id"];

/// Configuration carried by a workflow token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Credentials for the dataset service.
    #[serde(rename = "authorizationToken")]
    pub authorization_token: String,
    /// Dataset to process.
    pub dataset_id: String,
    /// Alias for the operator's output fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// Filters restricting the documents processed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    /// Job id used for status reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Workflow definition id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<String>,
    /// This worker's number, counting from 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_number: Option<u32>,
    /// Number of workers sharing the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_workers: Option<u32>,
    /// Documents per chunk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunksize: Option<usize>,
    /// Operator-specific keys such as `text_fields` or `vector_field`.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WorkflowConfig {
    /// Creates a configuration with only the required keys.
    pub fn new(authorization_token: impl Into<String>, dataset_id: impl Into<String>) -> Self {
        Self {
            authorization_token: authorization_token.into(),
            dataset_id: dataset_id.into(),
            alias: None,
            filters: Vec::new(),
            job_id: None,
            workflow_id: None,
            worker_number: None,
            total_workers: None,
            chunksize: None,
            extra: serde_json::Map::new(),
        }
    }

    /// Decodes a token.
    pub fn decode(token: &str) -> TokenResult<Self> {
        let trimmed = token.trim().trim_end_matches('=');
        let bytes = TOKEN_ENGINE.decode(trimmed)?;
        let payload: serde_json::Value = serde_json::from_slice(&bytes)?;
        for key in REQUIRED_KEYS {
            if payload.get(key).map_or(true, serde_json::Value::is_null) {
                return Err(TokenError::MissingKey(key));
            }
        }
        Ok(serde_json::from_value(payload)?)
    }

    /// Encodes the configuration as a padded token.
    pub fn encode(&self) -> TokenResult<String> {
        Ok(TOKEN_ENGINE.encode(serde_json::to_vec(self)?))
    }

    /// Reads an operator-specific key.
    pub fn extra<T: DeserializeOwned>(&self, key: &str) -> TokenResult<Option<T>> {
        match self.extra.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Sets an operator-specific key.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Job context for this run. A random job id is used when the token
    /// carries none.
    pub fn job_context(&self) -> JobContext {
        let context = match &self.job_id {
            Some(job_id) => JobContext::with_job_id(job_id.clone()),
            None => JobContext::new(),
        };
        let context = context
            .with_dataset_id(self.dataset_id.clone())
            .with_worker_number(self.worker_number.unwrap_or(0));
        match &self.workflow_id {
            Some(workflow_id) => context.with_workflow_id(workflow_id.clone()),
            None => context,
        }
    }

    /// Engine configuration derived from the token: filters, chunk size and
    /// worker sharding. Everything else keeps its default.
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::new()
            .with_filters(self.filters.clone())
            .with_workers(
                self.worker_number.unwrap_or(0),
                self.total_workers.unwrap_or(0),
            );
        match self.chunksize {
            Some(chunksize) => config.with_chunksize(chunksize),
            None => config,
        }
    }
}

/// Decodes a workflow token.
pub fn decode_token(token: &str) -> TokenResult<WorkflowConfig> {
    WorkflowConfig::decode(token)
}
