//! Audio resource fetching
//!
//! Downloads a whole resource into memory. `http(s)` goes through reqwest;
//! `file://` URLs are read from disk so local files can be queued too.

use crate::error::{AudioError, Result};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches audio bytes by URL
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    /// Create a fetcher with sensible timeouts
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("Tune/{} (Desktop)", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Use an existing client (shared connection pool, custom TLS, ...)
    pub fn with_client(http: Client) -> Self {
        Self { http }
    }

    /// Download the resource behind `url`
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let parsed = Url::parse(url).map_err(|e| AudioError::InvalidUrl(format!("{url}: {e}")))?;

        match parsed.scheme() {
            "http" | "https" => {
                debug!(%url, "Fetching audio");
                let response = self.http.get(parsed).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AudioError::Status {
                        status: status.as_u16(),
                        url: url.to_string(),
                    });
                }
                let bytes = response.bytes().await?;
                debug!(%url, bytes = bytes.len(), "Fetched audio");
                Ok(bytes.to_vec())
            }
            "file" => {
                let path = parsed
                    .to_file_path()
                    .map_err(|()| AudioError::InvalidUrl(format!("{url}: not a local path")))?;
                Ok(tokio::fs::read(path).await?)
            }
            other => Err(AudioError::InvalidUrl(format!("unsupported scheme {other}"))),
        }
    }
}

/// File extension of the URL path, used as a format hint
pub fn extension_hint(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last = parsed.path_segments()?.next_back()?;
    let (_, ext) = last.rsplit_once('.')?;
    (!ext.is_empty()).then(|| ext.to_ascii_lowercase())
}
