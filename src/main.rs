use anyhow::Result;
use catalog::config::Config;
use catalog::server::Server;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Catalog search service
#[derive(Debug, Parser)]
#[command(name = "catalog", version, about)]
struct Cli {
    /// Address to bind, overrides BIND_ADDR
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Log level, overrides LOG_LEVEL
    #[arg(long)]
    log_level: Option<String>,

    /// Seed file with initial documents, overrides SEED_PATH
    #[arg(long)]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let mut config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if let Some(seed) = cli.seed {
        config.seed_path = seed.display().to_string();
    }
    config
        .check()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("catalog={},tower_http=debug", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting catalog service");
    tracing::info!(
        "Configuration: bind_addr={}, rate_limit={}/s burst={}, max_limit={}",
        config.bind_addr,
        config.rate_limit_per_second,
        config.rate_limit_burst,
        config.search_max_limit
    );

    let server = Server::new(config)
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
