//! CLI Argument Structures
//!
//! Argument definitions and command structures used by the schaapi binary.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use schaapi_rs::core::config::SupportPolicy;
use schaapi_rs::io::reports::ReportFormat;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library usage pattern miner
#[derive(Parser)]
#[command(name = "schaapi")]
#[command(version = VERSION)]
#[command(about = "Schaapi - mine library usage idioms from client code")]
#[command(long_about = "
Mine recurring library usage patterns from the method bodies of many client
projects and export the most frequent ones as inputs for test generation.

Common Usage:

  # Mine java.util usage patterns that recur in at least 3 projects
  schaapi mine --corpus corpus.json --library java.util --min-support 3

  # Write the full report and the test generator records
  schaapi mine --corpus corpus.json --out report.json --export patterns.json

  # Start from a configuration file
  schaapi init-config --output schaapi.yml
  schaapi mine --corpus corpus.json --config schaapi.yml
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Mine usage patterns from a corpus file
    Mine(Box<MineArgs>),

    /// Print default configuration in YAML format
    #[command(name = "print-default-config")]
    PrintDefaultConfig,

    /// Initialize a configuration file with defaults
    #[command(name = "init-config")]
    InitConfig(InitConfigArgs),

    /// Validate a schaapi configuration file
    #[command(name = "validate-config")]
    ValidateConfig(ValidateConfigArgs),

    /// Summarize the results of running generated tests
    #[command(name = "summarize-tests")]
    SummarizeTests(SummarizeTestsArgs),
}

#[derive(Args)]
pub struct MineArgs {
    /// Corpus file (JSON, or YAML by extension) with projects and method bodies
    #[arg(short = 'i', long)]
    pub corpus: PathBuf,

    /// Library package prefix; repeat for several packages
    #[arg(short, long = "library")]
    pub library: Vec<String>,

    /// Configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Minimum support a pattern needs (at least 2)
    #[arg(long)]
    pub min_support: Option<usize>,

    /// Largest pattern size, in nodes
    #[arg(long)]
    pub max_pattern_size: Option<usize>,

    /// What a unit of support counts
    #[arg(long, value_enum)]
    pub support_policy: Option<SupportPolicyArg>,

    /// Wall-clock budget for pattern growth, in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Run on the calling thread only
    #[arg(long)]
    pub sequential: bool,

    /// Write the full mining report to this file
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Report format (defaults to the extension of --out, then JSON)
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormatArg>,

    /// Write test generator records (JSON) to this file
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Write one Graphviz DOT file per reported pattern into this directory
    #[arg(long, value_name = "DIR")]
    pub dot: Option<PathBuf>,

    /// Number of patterns shown in the console table
    #[arg(long, default_value_t = 20)]
    pub top: usize,

    /// Suppress progress bars and console tables
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct InitConfigArgs {
    /// Output configuration file name
    #[arg(short, long, default_value = "schaapi.yml")]
    pub output: PathBuf,

    /// Overwrite existing configuration file
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ValidateConfigArgs {
    /// Path to configuration file to validate
    #[arg(short, long, required = true)]
    pub config: PathBuf,

    /// Show detailed configuration breakdown
    #[arg(short, long)]
    pub detailed: bool,
}

#[derive(Args)]
pub struct SummarizeTestsArgs {
    /// JSON array of test case results produced by the test runner
    #[arg(short, long)]
    pub results: PathBuf,
}

/// Support policy selectable on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SupportPolicyArg {
    /// Count distinct projects
    Projects,
    /// Count distinct methods
    Graphs,
}

impl From<SupportPolicyArg> for SupportPolicy {
    fn from(value: SupportPolicyArg) -> Self {
        match value {
            SupportPolicyArg::Projects => SupportPolicy::Projects,
            SupportPolicyArg::Graphs => SupportPolicy::Graphs,
        }
    }
}

/// Report format selectable on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormatArg {
    /// Pretty JSON
    Json,
    /// YAML
    Yaml,
    /// Size histograms as CSV
    Csv,
}

impl From<ReportFormatArg> for ReportFormat {
    fn from(value: ReportFormatArg) -> Self {
        match value {
            ReportFormatArg::Json => ReportFormat::Json,
            ReportFormatArg::Yaml => ReportFormat::Yaml,
            ReportFormatArg::Csv => ReportFormat::Csv,
        }
    }
}
