//! CLI argument parsing for Huella

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "huella")]
#[command(version)]
#[command(about = "Per-user behavioral biometric enrollment and authentication", long_about = None)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Store directory (overrides config and HUELLA_DATA_DIR)
    #[arg(long = "data-dir", value_name = "DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Record a sample for a user and retrain their model
    Enroll {
        username: String,
        #[command(flatten)]
        features: FeatureInput,
    },
    /// Score a sample against a user's model
    ///
    /// Exits 0 when authenticated, 2 when rejected, 1 on error.
    Authenticate {
        username: String,
        #[command(flatten)]
        features: FeatureInput,
    },
    /// List enrolled users with their sample counts
    Users,
    /// Feature vector length expected for a user
    ExpectedFeatures { username: Option<String> },
}

/// Feature vector given inline or from a JSON file
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub struct FeatureInput {
    /// Comma-separated values (e.g., -f 0.12,0.5,-1.3)
    #[arg(
        short = 'f',
        long = "features",
        value_name = "LIST",
        allow_hyphen_values = true
    )]
    pub list: Option<String>,

    /// File holding a JSON array of numbers
    #[arg(long = "features-file", value_name = "FILE")]
    pub file: Option<PathBuf>,
}

impl FeatureInput {
    pub fn load(&self) -> anyhow::Result<Vec<f64>> {
        match (&self.list, &self.file) {
            (Some(list), _) => crate::features::parse_feature_list(list),
            (None, Some(path)) => crate::features::read_feature_file(path),
            (None, None) => anyhow::bail!("no features given"),
        }
    }
}
