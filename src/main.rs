use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use storefront_proxy::config::Config;
use storefront_proxy::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line overrides; everything else comes from the environment
#[derive(Debug, Parser)]
#[command(name = "storefront-proxy", version, about)]
struct Cli {
    /// Address to listen on (overrides BIND_ADDR)
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Commerce backend base URL (overrides UPSTREAM_BASE_URL)
    #[arg(long)]
    upstream: Option<String>,

    /// Redis URL for shared caches (overrides REDIS_URL)
    #[arg(long)]
    redis_url: Option<String>,
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
    if let Some(upstream) = cli.upstream {
        config.upstream_base_url = upstream;
    }
    if cli.redis_url.is_some() {
        config.redis_url = cli.redis_url;
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("storefront_proxy={},tower_http=debug", config.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting storefront proxy");
    tracing::info!(
        "Configuration: bind_addr={}, upstream={}, shared_cache={}",
        config.bind_addr,
        config.upstream_base_url,
        config.shared_cache_url().is_some()
    );

    // Create and run the server
    let server = Server::new(config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to create server: {}", e))?;

    server
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
