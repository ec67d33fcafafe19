//! CLI argument definitions for the reporting pipeline.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "ptr",
    version,
    about = "Payment times reporting ingestion pipeline",
    long_about = "Stage supplier payment data into the canonical reporting schema,\n\
                  apply transformation rules, import small-business classification\n\
                  results, and compute the validation verdict that gates report\n\
                  generation."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(
        long = "log-format",
        value_enum,
        default_value = "pretty",
        global = true
    )]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow row-level values (identifiers, names, amounts) in logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the full pipeline over local files and print the gate verdict.
    Run(RunArgs),

    /// Preview how a column map resolves against a dataset's headers.
    Resolve(ResolveArgs),

    /// List the canonical reporting fields.
    Fields,
}

#[derive(Parser)]
pub struct RunArgs {
    /// Main transactions CSV.
    #[arg(value_name = "DATA_CSV")]
    pub data: PathBuf,

    /// Column-map configuration JSON.
    #[arg(long = "map", value_name = "PATH")]
    pub map: PathBuf,

    /// Classification export CSV to import after staging.
    #[arg(long = "classification", value_name = "PATH")]
    pub classification: Option<PathBuf>,

    /// Auxiliary dataset for join rules, as LABEL=PATH. Repeatable.
    #[arg(long = "aux", value_name = "LABEL=PATH")]
    pub aux: Vec<String>,

    /// Tenant the run is created under.
    #[arg(long = "tenant", default_value = "local")]
    pub tenant: String,

    /// Skip rule application even when the map defines rules.
    #[arg(long = "no-rules")]
    pub no_rules: bool,
}

#[derive(Parser)]
pub struct ResolveArgs {
    /// Dataset whose headers drive the preview.
    #[arg(value_name = "DATA_CSV")]
    pub data: PathBuf,

    /// Column-map configuration JSON.
    #[arg(long = "map", value_name = "PATH")]
    pub map: PathBuf,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}
