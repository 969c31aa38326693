use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feedwatch_core::model::{DestinationId, FeedEntry};
use feedwatch_core::traits::NotificationSink;
use feedwatch_core::{Error, Result};
use reqwest::StatusCode;
use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Duration;

use crate::USER_AGENT;

/// Timeout for a single webhook call
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Platform limits for embed fields, in characters
const MAX_TITLE_CHARS: usize = 256;
const MAX_DESCRIPTION_CHARS: usize = 4096;

#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    embeds: [Embed<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Embed<'a> {
    title: Cow<'a, str>,
    description: Cow<'a, str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<String>,
}

impl<'a> Embed<'a> {
    fn from_entry(entry: &'a FeedEntry) -> Self {
        Self {
            title: truncate(&entry.title, MAX_TITLE_CHARS),
            description: truncate(&entry.summary, MAX_DESCRIPTION_CHARS),
            timestamp: entry.updated_time.as_ref().and_then(day_timestamp),
        }
    }
}

/// Embed timestamps carry the entry's date only
fn day_timestamp(time: &DateTime<Utc>) -> Option<String> {
    time.date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc().to_rfc3339())
}

fn truncate(text: &str, max_chars: usize) -> Cow<'_, str> {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(text[..cut].to_string()),
        None => Cow::Borrowed(text),
    }
}

/// Posts entries as embeds to per-destination webhooks
///
/// # Errors
///
/// - Unknown destination, or the webhook answers 404/410:
///   `Error::InvalidDestination`
/// - Any other non-success status or transport failure: `Error::Http`
///   (timeouts map to `Error::Timeout`)
///
/// # Security
///
/// Webhook URLs embed their token. The Debug implementation lists
/// destinations only.
pub struct WebhookSink {
    webhooks: HashMap<DestinationId, String>,
    client: reqwest::Client,
}

// Custom Debug implementation that hides webhook URLs
impl std::fmt::Debug for WebhookSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut destinations: Vec<_> = self.webhooks.keys().copied().collect();
        destinations.sort();
        f.debug_struct("WebhookSink")
            .field("destinations", &destinations)
            .field("webhooks", &"<REDACTED>")
            .finish()
    }
}

impl WebhookSink {
    /// Create a sink for the given destination → webhook URL map
    pub fn new(webhooks: HashMap<DestinationId, String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self::with_client(webhooks, client))
    }

    /// Create a sink around an existing client
    pub fn with_client(webhooks: HashMap<DestinationId, String>, client: reqwest::Client) -> Self {
        Self { webhooks, client }
    }

    /// Whether a webhook is configured for `destination`
    pub fn knows(&self, destination: DestinationId) -> bool {
        self.webhooks.contains_key(&destination)
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn post(&self, entry: &FeedEntry, destination: DestinationId) -> Result<()> {
        let Some(webhook) = self.webhooks.get(&destination) else {
            return Err(Error::InvalidDestination(destination));
        };

        let message = WebhookMessage {
            embeds: [Embed::from_entry(entry)],
        };

        let response = self
            .client
            .post(webhook.as_str())
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout
                } else {
                    // Strip the URL: it carries the webhook token.
                    Error::http(format!("Webhook request failed: {}", e.without_url()))
                }
            })?;

        let status = response.status();
        match status {
            s if s.is_success() => {
                tracing::debug!("Posted entry '{}' to destination {}", entry.id, destination);
                Ok(())
            }
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                Err(Error::InvalidDestination(destination))
            }
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::http(format!(
                    "Webhook for destination {} answered {}: {}",
                    destination, status, body
                )))
            }
        }
    }
}
