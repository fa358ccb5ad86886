//! CLI entry points: run collection, run training, run the server.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use homeworth::collector::{self, Collector, CollectorConfig};
use homeworth::serving::http::{self, ServerConfig};
use homeworth::training::{self, TrainConfig};
use homeworth::{Cleaner, PredictorService};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "homeworth", version, about = "Property-price prediction pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape listing pages and write the raw batch as CSV
    Collect(CollectArgs),
    /// Clean a collected batch, train both candidates and write the artifact
    Train(TrainArgs),
    /// Serve predictions from a trained artifact
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
struct CollectArgs {
    /// Listing site root
    #[arg(long, env = "HOMEWORTH_BASE_URL")]
    base_url: String,

    /// Output CSV path
    #[arg(long, default_value = "listings.csv")]
    out: PathBuf,

    /// Page cap per property type
    #[arg(long, default_value = "50")]
    max_pages: usize,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Collected listings CSV
    #[arg(long, default_value = "listings.csv")]
    data: PathBuf,

    /// Artifact output path
    #[arg(long, default_value = "homeworth-model.bin")]
    artifact: PathBuf,

    /// Train/validation shuffle seed
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Fraction of rows held out for validation
    #[arg(long, default_value = "0.2")]
    validation_fraction: f64,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Trained artifact to serve
    #[arg(long, default_value = "homeworth-model.bin", env = "HOMEWORTH_ARTIFACT")]
    artifact: PathBuf,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value = "8080")]
    port: u16,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Collect(args) => run_collect(args),
        Command::Train(args) => run_train(args),
        Command::Serve(args) => run_serve(args),
    }
}

fn run_collect(args: CollectArgs) -> Result<()> {
    let mut config = CollectorConfig::new(args.base_url);
    config.max_pages_per_type = args.max_pages;

    let listings = Collector::new(config)?.run()?;
    collector::write_csv(&args.out, &listings)
        .with_context(|| format!("writing {}", args.out.display()))?;
    info!(
        listings = listings.len(),
        path = %args.out.display(),
        "collection complete"
    );
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    let raw = collector::read_csv(&args.data)
        .with_context(|| format!("reading {}", args.data.display()))?;
    let (records, summary) = Cleaner::default().clean(&raw)?;
    info!(
        rows_in = summary.rows_in,
        rows_out = summary.rows_out,
        "dataset cleaned"
    );

    let config = TrainConfig {
        seed: args.seed,
        validation_fraction: args.validation_fraction,
        ..TrainConfig::default()
    };
    let (artifact, report) = training::train(&records, &config)?;
    artifact
        .save(&args.artifact)
        .with_context(|| format!("writing {}", args.artifact.display()))?;

    info!(
        selected = %report.selected,
        mse = artifact.validation.mse,
        rmse = artifact.validation.rmse,
        r_squared = artifact.validation.r_squared,
        path = %args.artifact.display(),
        "artifact written"
    );
    Ok(())
}

fn run_serve(args: ServeArgs) -> Result<()> {
    let service = PredictorService::load(&args.artifact)
        .with_context(|| format!("loading {}", args.artifact.display()))?;
    let config = ServerConfig {
        host: args.host,
        port: args.port,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(http::serve(service, &config))?;
    Ok(())
}
