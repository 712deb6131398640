//! House Price Pipeline CLI
//!
//! Runs the pipeline stages locally (ingest, validate-split, train, predict)
//! and talks to a running prediction API.

mod client;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{pipeline, predict, remote};
use pricing_lib::PipelineConfig;
use std::path::{Path, PathBuf};
use tracing::Level;

/// House Price Pipeline CLI
#[derive(Parser)]
#[command(name = "hpp")]
#[command(author, version, about = "CLI for the House Price Pipeline", long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (can also be set via HOUSING_CONFIG env var)
    #[arg(long, env = "HOUSING_CONFIG", default_value = pricing_lib::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Prediction API URL (can also be set via HPP_API_URL env var)
    #[arg(long, env = "HPP_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy the source dataset into the raw data directory
    Ingest {
        /// CSV file to ingest (overrides data.source_path)
        #[arg(long)]
        source: Option<PathBuf>,
    },

    /// Validate the raw dataset and write train/test splits
    ValidateSplit,

    /// Fit the pipeline and write model, descriptor and metrics
    Train,

    /// Predict with the locally saved model
    Predict(PayloadSource),

    /// Call a running prediction API
    #[command(subcommand)]
    Remote(RemoteCommands),
}

#[derive(Subcommand)]
pub enum RemoteCommands {
    /// Request a prediction
    Predict(PayloadSource),

    /// Show the features the served model expects
    Schema,

    /// Show service health
    Health,

    /// Show training metrics of the served model
    Metrics,
}

/// Where the prediction payload comes from
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct PayloadSource {
    /// Use a built-in example district
    #[arg(long)]
    pub sample: bool,

    /// JSON file with one object of feature name to value
    #[arg(long)]
    pub file: Option<PathBuf>,
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    PipelineConfig::load(path).with_context(|| format!("Failed to load config {}", path.display()))
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Ingest { source } => {
            let cfg = load_config(&cli.config)?;
            pipeline::ingest(&cfg, source.as_deref(), cli.format)?;
        }
        Commands::ValidateSplit => {
            let cfg = load_config(&cli.config)?;
            pipeline::validate_split(&cfg, cli.format)?;
        }
        Commands::Train => {
            let cfg = load_config(&cli.config)?;
            pipeline::train(&cfg, cli.format)?;
        }
        Commands::Predict(source) => {
            let cfg = load_config(&cli.config)?;
            predict::predict_local(&cfg, &source, cli.format)?;
        }
        Commands::Remote(remote_cmd) => {
            let client = client::ApiClient::new(&cli.api_url)?;
            match remote_cmd {
                RemoteCommands::Predict(source) => {
                    remote::predict(&client, &source, cli.format).await?;
                }
                RemoteCommands::Schema => remote::schema(&client, cli.format).await?,
                RemoteCommands::Health => remote::health(&client, cli.format).await?,
                RemoteCommands::Metrics => remote::metrics(&client, cli.format).await?,
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        output::print_error(&format!("{err:#}"));
        std::process::exit(1);
    }
}
