//! Command line argument parsing for the fast-bayes CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::FeatureModel;

/// fast-bayes - train and query a Naive Bayes text classifier
#[derive(Parser, Debug, Clone)]
#[command(name = "fast-bayes")]
#[command(about = "Train and query a Naive Bayes text classifier")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct FastBayesArgs {
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

impl FastBayesArgs {
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
    /// Train documents for one label, creating the state file if needed
    Train(TrainArgs),

    /// Rank labels for a document
    Classify(ClassifyArgs),

    /// Show statistics of a state file
    Stats(StatsArgs),
}

/// Arguments for training
#[derive(Parser, Debug, Clone)]
pub struct TrainArgs {
    /// Training state file (JSON)
    #[arg(short, long, value_name = "STATE_FILE", env = "FAST_BAYES_STATE")]
    pub state: PathBuf,

    /// Label of the training documents
    #[arg(short, long)]
    pub label: String,

    /// Document text
    #[arg(short, long, conflicts_with = "file", required_unless_present = "file")]
    pub text: Option<String>,

    /// File with one document per line
    #[arg(long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Weight of each document
    #[arg(short, long, default_value = "1")]
    pub multiplicity: u64,

    /// Feature model for a new state file
    #[arg(long, default_value = "multinomial")]
    pub feature_model: FeatureModelArg,

    /// Smoothing parameter for a new state file
    #[arg(long, default_value = "1.0")]
    pub alpha: f64,
}

/// Arguments for classification
#[derive(Parser, Debug, Clone)]
pub struct ClassifyArgs {
    /// Training state file (JSON)
    #[arg(short, long, value_name = "STATE_FILE", env = "FAST_BAYES_STATE")]
    pub state: PathBuf,

    /// Document text
    #[arg(short, long)]
    pub text: String,

    /// Maximum number of labels to show
    #[arg(short = 'k', long, default_value = "10")]
    pub top: usize,

    /// Include normalized probabilities
    #[arg(short, long)]
    pub probabilities: bool,
}

/// Arguments for statistics
#[derive(Parser, Debug, Clone)]
pub struct StatsArgs {
    /// Training state file (JSON)
    #[arg(short, long, value_name = "STATE_FILE", env = "FAST_BAYES_STATE")]
    pub state: PathBuf,
}

/// Feature models selectable from the command line
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureModelArg {
    /// Term counts
    Multinomial,
    /// Term presence
    Bernoulli,
}

impl From<FeatureModelArg> for FeatureModel {
    fn from(arg: FeatureModelArg) -> Self {
        match arg {
            FeatureModelArg::Multinomial => FeatureModel::Multinomial,
            FeatureModelArg::Bernoulli => FeatureModel::Bernoulli,
        }
    }
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
