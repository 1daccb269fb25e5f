//! Decode-token command implementation.

use docflow_workflow::{decode_token, WorkflowConfig};

const MASK: &str = "********";

/// Runs the decode-token command.
pub fn run(token: &str, show_secret: bool, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = decode(token, show_secret)?;

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        _ => {
            print_text_output(&config);
        }
    }

    Ok(())
}

/// Decodes a token, masking the credentials unless asked not to.
pub fn decode(
    token: &str,
    show_secret: bool,
) -> Result<WorkflowConfig, Box<dyn std::error::Error>> {
    let mut config = decode_token(token)?;
    if !show_secret {
        config.authorization_token = MASK.to_string();
    }
    Ok(config)
}

fn print_text_output(config: &WorkflowConfig) {
    println!("Workflow Token");
    println!("==============");
    println!("Dataset:        {}", config.dataset_id);
    println!("Authorization:  {}", config.authorization_token);
    if let Some(alias) = &config.alias {
        println!("Alias:          {alias}");
    }
    if let Some(job_id) = &config.job_id {
        println!("Job:            {job_id}");
    }
    if let Some(workflow_id) = &config.workflow_id {
        println!("Workflow:       {workflow_id}");
    }
    if let (Some(worker), Some(total)) = (config.worker_number, config.total_workers) {
        println!("Worker:         {worker} of {total}");
    }
    if let Some(chunksize) = config.chunksize {
        println!("Chunk size:     {chunksize}");
    }
    if !config.filters.is_empty() {
        println!();
        println!("Filters:");
        for filter in &config.filters {
            println!("  {}", serde_json::to_string(filter).unwrap_or_default());
        }
    }
    if !config.extra.is_empty() {
        println!();
        println!("Operator parameters:");
        for (key, value) in &config.extra {
            println!("  {key}: {value}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> String {
        WorkflowConfig::new("key:secret", "reviews")
            .with_extra("text_fields", serde_json::json!(["review"]))
            .encode()
            .unwrap()
    }

    #[test]
    fn masks_credentials_by_default() {
        let config = decode(&token(), false).unwrap();
        assert_eq!(config.authorization_token, MASK);
        assert_eq!(config.dataset_id, "reviews");

        let config = decode(&token(), true).unwrap();
        assert_eq!(config.authorization_token, "key:secret");
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode("not a token!", false).is_err());
        assert!(run("not a token!", false, "json").is_err());
    }
}
