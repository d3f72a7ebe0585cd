use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};
use polars::prelude::{AnyValue, DataFrame};
use pondocc_core::config::PipelineConfig;
use pondocc_core::io;
use pondocc_core::pipelines::{self, StageReport};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Pond occupancy preprocessing and naive estimation", long_about = None)]
struct Cli {
    /// TOML config file (falls back to PONDOCC_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean surveys and agreements and tag each site-year with its region
    Preprocess,
    /// Estimate naive occupancy from the cleaned survey table
    Estimate,
    /// Run preprocessing then estimation
    Run,
    /// Print a results table to the terminal
    Show(ShowArgs),
    /// List pipeline stages in execution order
    Stages,
}

#[derive(Args, Debug, Default)]
struct ShowArgs {
    /// Table to print (defaults to the configured occupancy output)
    path: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();
    let config = PipelineConfig::resolve(cli.config.as_deref())
        .context("failed to load pipeline configuration")?;

    match cli.command {
        Command::Preprocess => {
            let report = pipelines::run_preprocess(&config).context("preprocessing failed")?;
            print_report(&report)
        }
        Command::Estimate => {
            let report = pipelines::run_estimator(&config).context("estimation failed")?;
            print_report(&report)
        }
        Command::Run => {
            for report in pipelines::run_all(&config).context("pipeline run failed")? {
                print_report(&report)?;
            }
            Ok(())
        }
        Command::Show(args) => {
            let path = args
                .path
                .unwrap_or_else(|| config.outputs.naive_occupancy.clone());
            show_table(&path)
        }
        Command::Stages => {
            for stage in pipelines::all_stages() {
                println!("{:<16} {}", stage.code_identifier(), stage.description());
            }
            Ok(())
        }
    }
}

fn print_report(report: &StageReport) -> Result<()> {
    info!(stage = report.stage, fingerprint = %report.input_fingerprint, "stage finished");
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

fn show_table(path: &Path) -> Result<()> {
    let df = io::read_table(path).with_context(|| format!("failed to read {}", path.display()))?;
    println!("{}", render(&df)?);
    Ok(())
}

fn render(df: &DataFrame) -> Result<Table> {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(
        df.get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect::<Vec<_>>(),
    );

    for idx in 0..df.height() {
        let mut row = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let cell = match column.get(idx)? {
                AnyValue::Null => String::new(),
                AnyValue::String(text) => text.to_string(),
                AnyValue::StringOwned(text) => text.to_string(),
                other => other.to_string(),
            };
            row.push(cell);
        }
        table.add_row(row);
    }

    Ok(table)
}
