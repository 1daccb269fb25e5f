//! Run command implementation.
//!
//! Loads a JSON array of documents into an in-memory dataset, runs one of
//! the bundled operators over it as a workflow and writes the documents
//! back.

use clap::Subcommand;
use docflow_document::{Document, Value};
use docflow_engine::operators::{
    CentroidOperator, FieldSetOperator, LexiconSentimentOperator, VectorNormalizeOperator,
};
use docflow_engine::{Engine, EngineConfig, MemoryDataset, Operator, RetryConfig};
use docflow_workflow::{decode_token, JobContext, NoopStatusReporter, Workflow, WorkflowConfig};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Operators the CLI can run.
#[derive(Debug, Clone, Subcommand)]
pub enum OperatorCommand {
    /// Label text with lexicon sentiment
    Sentiment {
        /// Text field to score (defaults to the token's `text_fields`)
        #[arg(long)]
        field: Option<String>,

        /// Output alias (defaults to the token's alias)
        #[arg(long)]
        alias: Option<String>,

        /// Minimum absolute score for a label
        #[arg(long, default_value = "0.1")]
        min_score: f64,
    },

    /// Scale a vector field to unit length
    Normalize {
        /// Vector field (defaults to the token's `vector_field`)
        #[arg(long)]
        field: Option<String>,
    },

    /// Set a field on every document
    Set {
        /// Dotted path to write
        #[arg(long)]
        path: String,

        /// Value to write, as JSON (plain text is taken as a string)
        #[arg(long)]
        value: String,
    },

    /// Assign vectors to the nearest of a fixed set of centroids
    Centroids {
        /// Vector field (defaults to the token's `vector_field`)
        #[arg(long)]
        field: Option<String>,

        /// Centroids as a JSON array of vectors
        #[arg(long)]
        centroids: String,

        /// Output alias (defaults to the token's alias, then `fixed-<k>`)
        #[arg(long)]
        alias: Option<String>,
    },
}

/// Options shared by every operator.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Dataset file to read.
    pub input: PathBuf,
    /// Dataset file to write, the input when absent.
    pub output: Option<PathBuf>,
    /// Workflow token.
    pub token: Option<String>,
    /// Chunk size override.
    pub chunksize: Option<usize>,
    /// Retries after a failed dataset call.
    pub max_retries: u32,
}

/// Outcome of a run.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    /// Dataset id used for the run.
    pub dataset: String,
    /// Job id used for the run.
    pub job_id: String,
    /// Operator name.
    pub operator: String,
    /// Documents in the dataset.
    pub documents: usize,
    /// Chunks processed.
    pub chunks: usize,
    /// Documents fetched.
    pub documents_fetched: usize,
    /// Documents with at least one changed field.
    pub documents_changed: usize,
    /// Ids the dataset rejected.
    pub failed_documents: Vec<String>,
    /// File the documents were written to.
    pub output: String,
    /// Centroids stored by the run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centroids: Option<Vec<Document>>,
}

/// Runs the run command.
pub fn run(
    options: &RunOptions,
    operator: &OperatorCommand,
    format: &str,
) -> Result<(), Box<dyn Error>> {
    let summary = execute(options, operator)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        _ => {
            print_text_output(&summary);
        }
    }

    Ok(())
}

/// Runs the workflow and writes the dataset back.
pub fn execute(
    options: &RunOptions,
    operator: &OperatorCommand,
) -> Result<RunSummary, Box<dyn Error>> {
    let token = options.token.as_deref().map(decode_token).transpose()?;
    let documents = read_documents(&options.input)?;
    let dataset_id = match &token {
        Some(token) => token.dataset_id.clone(),
        None => dataset_name(&options.input),
    };
    let dataset = MemoryDataset::with_documents(dataset_id.clone(), documents);
    debug!(dataset = %dataset_id, documents = dataset.len(), "dataset loaded");

    let mut config = token
        .as_ref()
        .map_or_else(EngineConfig::new, WorkflowConfig::engine_config)
        .with_retry(RetryConfig::new(options.max_retries));
    if let Some(chunksize) = options.chunksize {
        config = config.with_chunksize(chunksize);
    }
    let context = match &token {
        Some(token) => token.job_context(),
        None => JobContext::new().with_dataset_id(dataset_id.clone()),
    };
    let job_id = context.job_id.clone();

    let (operator, centroid_key) = build_operator(operator, token.as_ref())?;
    let name = operator.name().to_string();
    let engine = Engine::new(&dataset, operator, config)?;
    let report = Workflow::new(engine, NoopStatusReporter, context).call()?;

    let output = options.output.as_ref().unwrap_or(&options.input);
    let stored = dataset.documents();
    write_documents(output, &stored)?;
    info!(path = %output.display(), documents = stored.len(), "dataset written");

    Ok(RunSummary {
        dataset: dataset_id,
        job_id,
        operator: name,
        documents: stored.len(),
        chunks: report.chunks,
        documents_fetched: report.documents_fetched,
        documents_changed: report.documents_changed,
        failed_documents: report.failed_documents,
        output: output.display().to_string(),
        centroids: centroid_key.and_then(|(field, alias)| dataset.centroids(&field, &alias)),
    })
}

type BuiltOperator = (Box<dyn Operator>, Option<(String, String)>);

fn build_operator(
    command: &OperatorCommand,
    token: Option<&WorkflowConfig>,
) -> Result<BuiltOperator, Box<dyn Error>> {
    let alias_or_token =
        |alias: &Option<String>| alias.clone().or_else(|| token.and_then(|t| t.alias.clone()));

    Ok(match command {
        OperatorCommand::Sentiment {
            field,
            alias,
            min_score,
        } => {
            let field = resolve_field(field, token, "text_fields")?;
            let operator = match alias_or_token(alias) {
                Some(alias) => LexiconSentimentOperator::with_alias(field, &alias),
                None => LexiconSentimentOperator::new(field),
            };
            let operator: Box<dyn Operator> = Box::new(operator.with_min_score(*min_score));
            (operator, None)
        }
        OperatorCommand::Normalize { field } => {
            let field = resolve_field(field, token, "vector_field")?;
            let operator: Box<dyn Operator> = Box::new(VectorNormalizeOperator::new(field));
            (operator, None)
        }
        OperatorCommand::Set { path, value } => {
            let value = serde_json::from_str::<serde_json::Value>(value)
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(value.as_str()));
            let operator: Box<dyn Operator> = Box::new(FieldSetOperator::new(path.clone(), value));
            (operator, None)
        }
        OperatorCommand::Centroids {
            field,
            centroids,
            alias,
        } => {
            let field = resolve_field(field, token, "vector_field")?;
            let centroids: Vec<Vec<f64>> = serde_json::from_str(centroids)
                .map_err(|e| format!("Centroids must be a JSON array of vectors: {e}"))?;
            let alias =
                alias_or_token(alias).unwrap_or_else(|| format!("fixed-{}", centroids.len()));
            let operator: Box<dyn Operator> = Box::new(CentroidOperator::with_alias(
                field.clone(),
                alias.clone(),
                centroids,
            )?);
            (operator, Some((field, alias)))
        }
    })
}

/// Field from the command line, else from the token's `key`.
///
/// List-valued keys such as `text_fields` yield their first entry.
fn resolve_field(
    field: &Option<String>,
    token: Option<&WorkflowConfig>,
    key: &str,
) -> Result<String, Box<dyn Error>> {
    if let Some(field) = field {
        return Ok(field.clone());
    }
    let from_token = match token.and_then(|t| t.extra.get(key)) {
        Some(serde_json::Value::Array(items)) => {
            items.first().and_then(|v| v.as_str()).map(str::to_string)
        }
        Some(serde_json::Value::String(field)) => Some(field.clone()),
        _ => None,
    };
    from_token.ok_or_else(|| format!("No field given and the token has no {key}").into())
}

fn dataset_name(path: &Path) -> String {
    path.file_stem()
        .map_or_else(|| "dataset".to_string(), |s| s.to_string_lossy().into_owned())
}

fn read_documents(path: &Path) -> Result<Vec<Document>, Box<dyn Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("Failed to read {:?}: {e}", path))?;
    let documents = serde_json::from_slice(&bytes)
        .map_err(|e| format!("{:?} is not a JSON array of documents: {e}", path))?;
    Ok(documents)
}

fn write_documents(path: &Path, documents: &[Document]) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_vec_pretty(documents)?;
    std::fs::write(path, json)?;
    Ok(())
}

fn print_text_output(summary: &RunSummary) {
    println!("Workflow Run");
    println!("============");
    println!("Dataset:            {}", summary.dataset);
    println!("Job:                {}", summary.job_id);
    println!("Operator:           {}", summary.operator);
    println!("Documents:          {}", summary.documents);
    println!("Chunks:             {}", summary.chunks);
    println!("Documents fetched:  {}", summary.documents_fetched);
    println!("Documents changed:  {}", summary.documents_changed);
    println!("Output:             {}", summary.output);

    if !summary.failed_documents.is_empty() {
        println!();
        println!("Failed documents:");
        for id in &summary.failed_documents {
            println!("  {id}");
        }
    }

    if let Some(centroids) = &summary.centroids {
        println!();
        println!("Centroids:");
        for centroid in centroids {
            println!("  {}", centroid.to_json());
        }
    }
}
