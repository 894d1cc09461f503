use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use tracing::warn;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive.org";
pub const DEFAULT_STATE_FILE: &str = "cinescope_state.json";
pub const DEFAULT_TMDB_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://cinescope.db";
const DEV_SECRET: &str = "your-secret-key-for-dev";

/// Where the client sends requests and keeps its persisted state.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub archive_url: String,
    pub state_file: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            state_file: DEFAULT_STATE_FILE.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self {
            backend_url: env_or("CINESCOPE_BACKEND_URL", DEFAULT_BACKEND_URL),
            archive_url: env_or("CINESCOPE_ARCHIVE_URL", DEFAULT_ARCHIVE_URL),
            state_file: env_or("CINESCOPE_STATE_FILE", DEFAULT_STATE_FILE),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub secret_key: String,
    pub database_url: String,
    pub bind: SocketAddr,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let tmdb_api_key = non_empty("TMDB_API_KEY")
            .or_else(|| non_empty("VITE_TMDB_API_KEY"))
            .context("TMDB_API_KEY not set")?;
        let secret_key = match non_empty("SECRET_KEY") {
            Some(s) => s,
            None => {
                warn!("SECRET_KEY not set, using the development secret");
                DEV_SECRET.to_string()
            }
        };
        let bind = env_or("CINESCOPE_BIND", "0.0.0.0:8000")
            .parse()
            .context("CINESCOPE_BIND is not a socket address")?;
        Ok(Self {
            tmdb_api_key,
            tmdb_base_url: env_or("TMDB_BASE_URL", DEFAULT_TMDB_BASE),
            secret_key,
            database_url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
            bind,
        })
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    non_empty(key).unwrap_or_else(|| default.to_string())
}
