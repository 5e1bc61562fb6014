//! Command line argument parsing for the sarissa-classify CLI using clap.

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// sarissa-classify - train and evaluate text classifiers over a sharded index
#[derive(Parser, Debug, Clone)]
#[command(name = "sarissa-classify")]
#[command(about = "Distributed text classification over sharded inverted indexes")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "Sarissa Contributors")]
#[command(long_about = None)]
pub struct SarissaArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SarissaArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Load documents into a local cluster and classify a text
    Classify(ClassifyArgs),

    /// Parse and validate a classify request body
    Validate(ValidateArgs),
}

/// Arguments for classifying
#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// Index definition file (JSON settings and mappings)
    #[arg(short, long, value_name = "MAPPING_FILE")]
    pub mapping: PathBuf,

    /// Documents to index, one JSON object per line
    #[arg(short, long, value_name = "DOCUMENTS_FILE")]
    pub documents: PathBuf,

    /// Classify request body (JSON or YAML)
    #[arg(short, long, value_name = "REQUEST_FILE")]
    pub request: PathBuf,

    /// Name of the index to create
    #[arg(long, default_value = "classify")]
    pub index: String,

    /// Document type of the indexed documents
    #[arg(long = "type", default_value = "doc")]
    pub doc_type: String,

    /// Number of nodes in the local cluster
    #[arg(long, default_value = "1")]
    pub nodes: usize,

    /// Override the number of shards of the mapping file
    #[arg(long)]
    pub shards: Option<u32>,

    /// Override the number of replicas of the mapping file
    #[arg(long)]
    pub replicas: Option<u32>,

    /// Coordinator configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Number of classes to return, overriding the request body
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Comma separated routing values restricting the shards visited
    #[arg(long)]
    pub routing: Option<String>,
}

/// Arguments for validating a request
#[derive(Parser, Debug, Clone)]
pub struct ValidateArgs {
    /// Classify request body (JSON or YAML)
    #[arg(value_name = "REQUEST_FILE")]
    pub request: PathBuf,

    /// Index the request would train on
    #[arg(long, default_value = "classify")]
    pub index: String,

    /// Document type the request would train on
    #[arg(long = "type", default_value = "doc")]
    pub doc_type: String,
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}
