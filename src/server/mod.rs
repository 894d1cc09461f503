//! The proxy backend: accounts, watchlists and a pass-through to the catalog
//! provider.

use anyhow::Result;
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::Router;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;

pub mod auth;
pub mod db;
pub mod error;
mod handlers;
pub mod upstream;

pub use db::Db;
pub use error::ServerError;
pub use upstream::{TmdbUpstream, UpstreamApi};

const MAX_BODY_BYTES: usize = 1024 * 1024;
const PER_IP_LIMIT: u32 = 30; // auth attempts per minute
const PER_IP_BURST: u32 = 10;
const MAX_TRACKED_CLIENTS: usize = 10_000;

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamApi>,
    pub db: Db,
    pub secret_key: String,
    /// bcrypt work factor for new password hashes.
    pub password_cost: u32,
    pub rate_limits: Arc<Mutex<HashMap<String, AttemptWindow>>>,
}

#[derive(Clone, Debug)]
pub struct AttemptWindow {
    pub window: u64,
    pub attempts: u32,
}

impl AppState {
    pub fn new(upstream: Arc<dyn UpstreamApi>, db: Db, secret_key: impl Into<String>) -> Self {
        Self {
            upstream,
            db,
            secret_key: secret_key.into(),
            password_cost: bcrypt::DEFAULT_COST,
            rate_limits: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_password_cost(mut self, cost: u32) -> Self {
        self.password_cost = cost;
        self
    }
}

pub async fn run_server(config: ServerConfig) -> Result<()> {
    let upstream: Arc<dyn UpstreamApi> = Arc::new(TmdbUpstream::new(
        &config.tmdb_base_url,
        &config.tmdb_api_key,
    )?);
    info!("Forwarding catalog requests to {}", config.tmdb_base_url);
    let db = Db::connect(&config.database_url).await?;

    let app = build_router(AppState::new(upstream, db, config.secret_key));

    info!("Listening on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/token", post(handlers::token))
        .route("/users/me", get(handlers::me))
        .route("/api/tmdb/*path", get(handlers::tmdb_proxy))
        .route(
            "/api/favorites",
            get(handlers::list_favorites).post(handlers::add_favorite),
        )
        .route("/api/favorites/:tmdb_id", delete(handlers::remove_favorite))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}

/// Client address as reported by the fronting proxy.
pub(crate) fn extract_ip(headers: &HeaderMap) -> String {
    headers
        .get("cf-connecting-ip")
        .or_else(|| headers.get("x-real-ip"))
        .or_else(|| headers.get("x-forwarded-for"))
        .and_then(|v| v.to_str().ok())
        .map(|s| s.split(',').next().unwrap_or(s).trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Fixed one-minute window per client address for the credential endpoints.
pub(crate) async fn check_rate_limit(state: &AppState, ip: &str) -> bool {
    let window = Utc::now().timestamp().div_euclid(60) as u64;
    let mut counters = state.rate_limits.lock().await;
    if counters.len() > MAX_TRACKED_CLIENTS {
        counters.retain(|_, v| v.window == window);
    }
    let entry = counters
        .entry(ip.to_string())
        .or_insert(AttemptWindow {
            window,
            attempts: 0,
        });
    if entry.window != window {
        entry.window = window;
        entry.attempts = 0;
    }
    if entry.attempts >= PER_IP_LIMIT + PER_IP_BURST {
        return false;
    }
    entry.attempts += 1;
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(extract_ip(&headers), "203.0.113.7");
        assert_eq!(extract_ip(&HeaderMap::new()), "unknown");
    }
}
