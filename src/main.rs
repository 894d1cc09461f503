use anyhow::Result;
use cinescope::config::ServerConfig;
use dotenvy::dotenv;
use std::env;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn check_env() -> Result<()> {
    let has_key = ["TMDB_API_KEY", "VITE_TMDB_API_KEY"]
        .iter()
        .any(|key| env::var(key).is_ok_and(|v| !v.trim().is_empty()));
    if !has_key {
        anyhow::bail!("Missing required environment variable: TMDB_API_KEY");
    }
    info!("All required environment variables are set");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let loaded = dotenv();
    init_tracing();
    match loaded {
        Ok(path) => info!("Loaded environment from {:?}", path),
        Err(e) => warn!("No .env file loaded ({}) - relying on environment", e),
    }
    check_env()?;
    let config = ServerConfig::from_env()?;
    cinescope::server::run_server(config).await
}
