use anyhow::{anyhow, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod batch;
mod candidates;
mod cli;
mod config;
mod curator;
mod error;
mod history;
mod quality;
mod reconcile;
mod report;
mod store;
mod text;
mod types;
mod util;

use batch::{run_batch, BatchOptions, BatchOutcome, CategoryStatus, Mode};
use candidates::{CandidateSupplier, CommandSupplier, FileSupplier};
use cli::{BatchArgs, Command, CurateArgs, GenerateArgs, ReportArgs, RootArgs};
use config::{
    config_stub, load_config, resolve_lm_command, resolve_output_dir, validate_threshold,
    CurateConfig,
};
use error::CurateError;
use util::display_path;

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    match args.command {
        Command::Curate(args) => cmd_curate(args),
        Command::Generate(args) => cmd_generate(args),
        Command::Report(args) => cmd_report(args),
        Command::Config => cmd_config(),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn cmd_curate(args: CurateArgs) -> Result<()> {
    let config = load_config(args.batch.config.as_deref())?;
    let threshold = args.threshold.unwrap_or(config.threshold);
    validate_threshold(threshold)?;

    let mut supplier: Box<dyn CandidateSupplier> = match &args.candidates {
        Some(path) => Box::new(FileSupplier::load(path)?),
        None => Box::new(command_supplier(&args.batch, &config)?),
    };
    run_and_print(&args.batch, &config, Mode::Validation, threshold, supplier.as_mut())
}

fn cmd_generate(args: GenerateArgs) -> Result<()> {
    let config = load_config(args.batch.config.as_deref())?;
    let mut supplier = command_supplier(&args.batch, &config)?;
    run_and_print(
        &args.batch,
        &config,
        Mode::Generation,
        config.threshold,
        &mut supplier,
    )
}

fn cmd_report(args: ReportArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let threshold = args.threshold.unwrap_or(config.threshold);
    validate_threshold(threshold)?;

    let store = store::load_store(&args.store)?;
    let existing = store
        .get(&args.category)
        .ok_or_else(|| CurateError::CategoryNotFound {
            category: args.category.clone(),
            available: store.keys().cloned().collect(),
        })?;
    let mut supplier = FileSupplier::load(&args.candidates)?;
    let candidate = supplier.candidates(&args.category, existing)?;
    let report = report::build_report(&args.category, existing, &candidate, threshold);

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{text}");
    } else {
        print!("{}", report::render_markdown(&report));
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    println!("{}", config_stub()?);
    Ok(())
}

fn command_supplier(args: &BatchArgs, config: &CurateConfig) -> Result<CommandSupplier> {
    let command = resolve_lm_command(args.lm.as_deref(), config).ok_or_else(|| {
        anyhow!(
            "no candidate source: pass --candidates, --lm, set lm_command in config, or set {}",
            config::LM_COMMAND_ENV
        )
    })?;
    CommandSupplier::new(&command)
}

fn run_and_print(
    args: &BatchArgs,
    config: &CurateConfig,
    mode: Mode,
    threshold: f64,
    supplier: &mut dyn CandidateSupplier,
) -> Result<()> {
    let out_dir = resolve_output_dir(args.out_dir.as_deref(), config, &args.store);
    let options = BatchOptions {
        mode,
        threshold,
        out_dir,
    };
    let outcome = run_batch(&args.store, &args.categories, supplier, &options)?;

    if args.json {
        let text =
            serde_json::to_string_pretty(&outcome.run.summary).context("serialize summary")?;
        println!("{text}");
    } else {
        print_summary(&outcome);
    }
    Ok(())
}

fn print_summary(outcome: &BatchOutcome) {
    let out_dir = Some(outcome.out_dir.as_path());
    let summary = &outcome.run.summary;
    println!(
        "Processed {} categories: {} succeeded, {} fell back, {} failed.",
        summary.categories_processed, summary.succeeded, summary.fallback, summary.failed
    );
    println!(
        "Descriptions: {} original, {} selected.",
        summary.total_original, summary.total_selected
    );
    for (category, status) in &summary.statuses {
        let detail = match status {
            CategoryStatus::Curated { dropped } => format!("curated (dropped {dropped})"),
            CategoryStatus::Generated { count } => format!("generated {count}"),
            CategoryStatus::Fallback { reason } => format!("fallback: {reason}"),
            CategoryStatus::Failed { reason } => format!("failed: {reason}"),
        };
        println!("  {category}: {detail}");
    }
    println!(
        "Wrote snapshot to {}",
        display_path(&outcome.snapshot_path, out_dir)
    );
    println!(
        "Wrote summary to {}",
        display_path(&outcome.summary_path, out_dir)
    );
}
