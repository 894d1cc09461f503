use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Catalog provider the proxy forwards to.
#[async_trait]
pub trait UpstreamApi: Send + Sync {
    /// GETs `path` with `query` and returns the upstream status and JSON body.
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<(u16, Value)>;
}

#[derive(Debug, Clone)]
pub struct TmdbUpstream {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TmdbUpstream {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building upstream client failed")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl UpstreamApi for TmdbUpstream {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<(u16, Value)> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!("Upstream GET {}", url);
        let res = self
            .client
            .get(&url)
            .query(query)
            .query(&[("api_key", self.api_key.as_str())])
            .send()
            .await
            .context("request failed")?;
        let status = res.status().as_u16();
        let text = res.text().await.context("reading body failed")?;
        let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "detail": text }));
        Ok((status, body))
    }
}
