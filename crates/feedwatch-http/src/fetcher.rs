use async_trait::async_trait;
use feedwatch_core::traits::Fetcher;
use feedwatch_core::{Error, Result};
use reqwest::{StatusCode, Url};
use std::time::Duration;

use crate::USER_AGENT;

/// Connect timeout applied below the per-request timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum number of redirects to follow
const MAX_REDIRECTS: usize = 5;

/// Largest document accepted, in bytes
const MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Fetches feed documents over HTTP(S)
///
/// Owns one connection pool for its whole lifetime. Clones share it.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher with its own client
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Create a fetcher around an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Parse a feed URL, accepting only http and https
fn parse_feed_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::invalid_url(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::invalid_url(format!(
            "{}: unsupported scheme '{}'",
            url, other
        ))),
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else if e.is_builder() {
        Error::invalid_url(e.to_string())
    } else {
        Error::http(e.to_string())
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String> {
        let url = parse_feed_url(url)?;

        tracing::debug!("GET {}", url);

        let mut response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(Error::BadStatus(status.as_u16()));
        }

        if let Some(length) = response.content_length()
            && length > MAX_DOCUMENT_BYTES
        {
            return Err(too_large(length));
        }

        // Chunked or header-less bodies are bounded while reading.
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_error)? {
            if (body.len() + chunk.len()) as u64 > MAX_DOCUMENT_BYTES {
                return Err(too_large((body.len() + chunk.len()) as u64));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

fn too_large(length: u64) -> Error {
    Error::http(format!(
        "Document too large: at least {} bytes (max {})",
        length, MAX_DOCUMENT_BYTES
    ))
}
