//! docflow CLI
//!
//! Command-line tools for docflow workflows.
//!
//! # Commands
//!
//! - `decode-token` - Decode a workflow token and print its configuration
//! - `run` - Run a bundled operator over a JSON dataset file

mod commands;

use clap::{Parser, Subcommand};
use commands::run::{OperatorCommand, RunOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// docflow command-line workflow tools.
#[derive(Parser)]
#[command(name = "docflow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a workflow token and print its configuration
    DecodeToken {
        /// The base64 token
        token: String,

        /// Print the authorization token instead of masking it
        #[arg(long)]
        show_secret: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Run a bundled operator over a JSON dataset file
    Run {
        /// JSON file holding an array of documents
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the updated documents (defaults to the input file)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Workflow token supplying filters, chunk size, sharding and alias
        #[arg(short, long)]
        token: Option<String>,

        /// Documents per chunk (overrides the token)
        #[arg(short, long)]
        chunksize: Option<usize>,

        /// Retries after a failed dataset call
        #[arg(long, default_value = "3")]
        max_retries: u32,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,

        #[command(subcommand)]
        operator: OperatorCommand,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::DecodeToken {
            token,
            show_secret,
            format,
        } => {
            commands::decode_token::run(&token, show_secret, &format)?;
        }
        Commands::Run {
            input,
            output,
            token,
            chunksize,
            max_retries,
            format,
            operator,
        } => {
            let options = RunOptions {
                input,
                output,
                token,
                chunksize,
                max_retries,
            };
            commands::run::run(&options, &operator, &format)?;
        }
        Commands::Version => {
            println!("docflow CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
