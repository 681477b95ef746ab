//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "clinical-ts",
    version,
    about = "Align clinical event tables onto a regular per-admission time grid",
    long_about = "Align irregular clinical event tables onto a regular time grid.\n\n\
                  Reads an admission folder (admission.csv plus one CSV per event source),\n\
                  projects every source onto hourly (or custom) bins and writes the\n\
                  aligned tables, a combined dynamic.csv and a diagnostics file."
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

    /// Allow clinical values (labels, identifiers) in log output.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Align one admission folder, or every admission below a folder with --batch.
    Align(AlignArgs),

    /// List the configured event sources.
    Sources(SourcesArgs),
}

#[derive(Parser)]
pub struct AlignArgs {
    /// Admission folder containing admission.csv and source CSV files.
    #[arg(value_name = "ADMISSION_FOLDER")]
    pub input: PathBuf,

    /// Output directory (default: <ADMISSION_FOLDER>/aligned).
    #[arg(long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Grid resolution in hours.
    #[arg(long = "resolution", value_name = "HOURS", default_value_t = 1.0)]
    pub resolution: f64,

    /// Cap the grid at this many hours after admission.
    #[arg(long = "window", value_name = "HOURS")]
    pub window: Option<f64>,

    /// TOML file with [[source]] descriptors (default: built-in MIMIC-IV sources).
    #[arg(long = "sources", value_name = "PATH")]
    pub sources: Option<PathBuf>,

    /// Treat ADMISSION_FOLDER as a directory of admission folders.
    #[arg(long = "batch")]
    pub batch: bool,

    /// Align and report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Parser)]
pub struct SourcesArgs {
    /// TOML file with [[source]] descriptors (default: built-in MIMIC-IV sources).
    #[arg(long = "sources", value_name = "PATH")]
    pub sources: Option<PathBuf>,

    /// Print descriptors as JSON instead of a table.
    #[arg(long = "json")]
    pub json: bool,
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
