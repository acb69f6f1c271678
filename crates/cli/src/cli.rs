use std::path::PathBuf;

use clap::Parser;

/// Score a batch of transactions for fraud.
///
/// Prints the ensemble result as one JSON line, followed by one JSON line
/// per derived fraud alert.
#[derive(Parser, Debug)]
#[command(name = "fraudlens", version, about = "Unsupervised ensemble fraud detection")]
pub struct CliArgs {
    /// Batch file: a JSON array of numeric rows, or `{"features": [...]}`.
    /// Use `-` to read from stdin.
    #[arg(long, short, required_unless_present = "health")]
    pub input: Option<PathBuf>,

    /// Optional interpretation JSON used when deriving alerts.
    #[arg(long)]
    pub interpretation: Option<PathBuf>,

    /// TOML config file (defaults to environment variables).
    #[arg(long, env = "FRAUDLENS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Config profile for environment lookups (e.g. STRICT). Rejected with --config.
    #[arg(long, env = "FRAUDLENS_PROFILE")]
    pub profile: Option<String>,

    /// Write alerts to this file instead of stdout.
    #[arg(long)]
    pub alerts_out: Option<PathBuf>,

    /// Print engine health after processing.
    #[arg(long)]
    pub health: bool,

    /// Pretty-print the result and health JSON.
    #[arg(long)]
    pub pretty: bool,
}
