use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "docscore")]
#[command(author, version, about = "Document classification training and scoring service")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API
    Serve(ServeArgs),

    /// Split a one-document-per-line corpus into positive and negative pools
    Prepare(PrepareArgs),

    /// Print a summary of recorded training runs
    Report(ReportArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "docscore.yaml", env = "DOCSCORE_CONFIG")]
    pub config: PathBuf,

    /// Listen address
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Listen port
    #[arg(short = 'P', long)]
    pub port: Option<u16>,

    /// Directory for model artifacts
    #[arg(long)]
    pub models_dir: Option<PathBuf>,

    /// Directory for metrics artifacts
    #[arg(long)]
    pub logs_dir: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct PrepareArgs {
    /// Input corpus, one document per line
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output directory; pools are written to `positive/` and `negative/` under it
    #[arg(short, long, default_value = "data/train")]
    pub output: PathBuf,

    /// Maximum documents kept before splitting
    #[arg(long, default_value = "40000")]
    pub limit: usize,

    /// Documents need more than this many words to be kept
    #[arg(long, default_value = "10")]
    pub min_words: usize,

    /// Shuffle seed
    #[arg(long)]
    pub seed: Option<u64>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Directory holding metrics artifacts
    #[arg(long, default_value = "logs")]
    pub logs_dir: PathBuf,

    /// Report on the run that produced this model instead of the latest run
    #[arg(short, long)]
    pub model: Option<String>,

    /// List every recorded run
    #[arg(long)]
    pub history: bool,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LoggingArgs {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
