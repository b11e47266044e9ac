//! CLI argument parsing for the curation workflow.
//!
//! The CLI only wires inputs to the engine; every selection rule lives in
//! the engine modules.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "dcur",
    version,
    about = "Validate and curate generated tumor descriptions against a curated store",
    after_help = "Commands:\n  curate --store <json>    Curate candidates into a new snapshot\n  generate --store <json>  Snapshot raw candidates from the LM command\n  report --store <json>    Print a validation report for one category\n  config                   Print the default configuration\n\nExamples:\n  dcur curate --store kb.json --candidates new.json\n  dcur curate --store kb.json --category ccRCC --lm 'llm -m gemini'\n  dcur report --store kb.json --candidates new.json --category ccRCC",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Emit debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Curate(CurateArgs),
    Generate(GenerateArgs),
    Report(ReportArgs),
    /// Print the default configuration
    Config,
}

/// Inputs shared by the batch commands.
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Store JSON mapping category to descriptions
    #[arg(long, value_name = "PATH")]
    pub store: PathBuf,

    /// Category to process (repeatable; default: every stored category)
    #[arg(long = "category", value_name = "NAME")]
    pub categories: Vec<String>,

    /// LM command that reads a prompt on stdin and prints JSON
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Configuration JSON
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for snapshots and history (default: the store's directory)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Emit machine-readable JSON summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Curate generated candidates against the store into a new snapshot")]
pub struct CurateArgs {
    #[command(flatten)]
    pub batch: BatchArgs,

    /// Candidate JSON with the same shape as the store
    #[arg(long, value_name = "PATH", conflicts_with = "lm")]
    pub candidates: Option<PathBuf>,

    /// Similarity threshold for overlap, in [0, 1]
    #[arg(long, value_name = "T")]
    pub threshold: Option<f64>,
}

#[derive(Parser, Debug)]
#[command(about = "Generate candidates for stored categories without curating")]
pub struct GenerateArgs {
    #[command(flatten)]
    pub batch: BatchArgs,
}

#[derive(Parser, Debug)]
#[command(about = "Print a validation report for a single category")]
pub struct ReportArgs {
    /// Store JSON mapping category to descriptions
    #[arg(long, value_name = "PATH")]
    pub store: PathBuf,

    /// Candidate JSON with the same shape as the store
    #[arg(long, value_name = "PATH")]
    pub candidates: PathBuf,

    /// Category to report on
    #[arg(long, value_name = "NAME")]
    pub category: String,

    /// Configuration JSON
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Similarity threshold for overlap, in [0, 1]
    #[arg(long, value_name = "T")]
    pub threshold: Option<f64>,

    /// Emit the report as JSON instead of markdown
    #[arg(long)]
    pub json: bool,
}
