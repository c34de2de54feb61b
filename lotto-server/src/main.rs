mod config;
mod proto;
mod session;

use anyhow::Result;
use clap::Parser;
use config::ServerConfig;
use lotto_core::{ExtractionScheduler, LottoEngine};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lotto-server")]
#[command(about = "Multiplayer lotto game server")]
#[command(version)]
struct Cli {
    /// TCP port to listen on
    port: u16,

    /// Minutes between extractions
    period: Option<u64>,

    /// Configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data directory for game state
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(period) = cli.period {
        config.extraction_period_minutes = period;
    }
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }
    config.verbose |= cli.verbose;

    // Initialize logging
    let log_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "lotto={}",
            log_level
        )))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let period = config.extraction_period()?;

    let engine = Arc::new(LottoEngine::new(&config.data_dir)?);

    ExtractionScheduler::new(Arc::clone(&engine), period).spawn();
    tracing::info!(
        "extraction scheduled every {} minute(s)",
        config.extraction_period_minutes
    );

    let listener = TcpListener::bind(("0.0.0.0", cli.port)).await?;
    tracing::info!("listening on port {}", cli.port);

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!("client {}: connected", peer);
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            if let Err(e) = session::handle_connection(engine, stream, peer).await {
                tracing::warn!("client {}: connection error: {}", peer, e);
            }
        });
    }
}
