// Character Designer - Main Entry Point
//
// Serves the single-page character designer, or runs one operation from
// the command line against the same quota state file.

use anyhow::{Context, Result};
use character_designer::config::Config;
use character_designer::generator::GeminiGenerator;
use character_designer::orchestrator::{RequestOrchestrator, UNLOCK_SUCCESS_MESSAGE};
use character_designer::quota::{FileQuotaStore, QuotaGate, ResetOutcome};
use character_designer::server::{self, UNLOCK_REJECTED_MESSAGE};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// Character Designer: generate fictional characters from a list of traits
#[derive(Parser, Debug)]
#[command(name = "character-designer")]
#[command(version)]
#[command(about = "Design fictional characters from traits with a generative text service", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to the TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the quota state file location
    #[arg(long, global = true)]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the web UI (default)
    Serve {
        /// Interface to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Generate one character and print it
    Generate {
        /// Character traits, e.g. "brave, one-eyed, loves cats"
        traits: String,
    },
    /// Show quota usage for the current window
    Status {
        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reset the quota with the override password
    Unlock {
        /// Override password
        #[arg(long)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // API_KEY, NUM_REQUESTS and PASSWORD may live in .env
    let _ = dotenvy::dotenv();

    let mut config = match &args.config {
        Some(path) => Config::load_from_path(path),
        None => Config::load(),
    }
    .context("Failed to load configuration")?;

    if let Some(state_file) = &args.state_file {
        config.quota.state_file = state_file.clone();
    }

    init_tracing(&config, args.verbose)?;

    info!("Character Designer v{} starting...", env!("CARGO_PKG_VERSION"));
    if config.generator.api_key.is_none() {
        tracing::warn!("No API key configured; generations will fail");
    }

    let orchestrator = Arc::new(build_orchestrator(&config)?);

    match args.command {
        None => serve(orchestrator, &config, None, None).await?,
        Some(Commands::Serve { host, port }) => serve(orchestrator, &config, host, port).await?,
        Some(Commands::Generate { traits }) => {
            let generation = orchestrator.generate(&traits).await;
            println!("{}", generation.message());
        }
        Some(Commands::Status { json }) => {
            let status = orchestrator.status().await;
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&status).context("Failed to encode status")?
                );
            } else {
                println!(
                    "Quota: {}/{} used ({}), window resets at {}",
                    status.count,
                    status.limit,
                    if status.open { "open" } else { "closed" },
                    status.resets_at.to_rfc3339()
                );
            }
        }
        Some(Commands::Unlock { password }) => match orchestrator.unlock(&password).await {
            ResetOutcome::Success => println!("{}", UNLOCK_SUCCESS_MESSAGE),
            ResetOutcome::Rejected => anyhow::bail!(UNLOCK_REJECTED_MESSAGE),
        },
    }

    Ok(())
}

/// Initialize tracing from the logging config; `--verbose` forces DEBUG
fn init_tracing(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose {
        Level::DEBUG
    } else {
        config.log_level()?
    };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match config.logging.format.to_lowercase().as_str() {
        "json" => builder.json().init(),
        "pretty" => builder.pretty().init(),
        _ => builder.compact().init(),
    }

    Ok(())
}

fn build_orchestrator(config: &Config) -> Result<RequestOrchestrator> {
    let store = FileQuotaStore::new(&config.quota.state_file);
    let gate = QuotaGate::new(Box::new(store), config.quota.policy());

    let generator =
        GeminiGenerator::new(config.generator.clone()).context("Failed to create generator")?;
    info!(model = generator.model(), "Generator ready");

    Ok(RequestOrchestrator::new(gate, Arc::new(generator)))
}

async fn serve(
    orchestrator: Arc<RequestOrchestrator>,
    config: &Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

    server::serve(orchestrator, addr, config.metrics.enabled).await
}
