//! Environment configuration for feedwatchd

use anyhow::{Context, Result};
use feedwatch_core::model::DestinationId;
use feedwatch_core::WatchConfig;
use std::collections::HashMap;
use std::env;
use std::str::FromStr;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub poll_interval_secs: Option<u64>,
    pub fetch_timeout_secs: Option<u64>,
    pub restart_delay_secs: Option<u64>,
    pub owner_id: Option<u64>,
    /// Destination → webhook URL
    pub webhooks: HashMap<DestinationId, String>,
    pub default_destination: Option<DestinationId>,
    pub feed_url: Option<String>,
    pub autostart: bool,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            database_path: var("FEEDWATCH_DATABASE").unwrap_or_else(|| "feedwatch.db".to_string()),
            poll_interval_secs: parse_opt(var("FEEDWATCH_POLL_INTERVAL"), "FEEDWATCH_POLL_INTERVAL")?,
            fetch_timeout_secs: parse_opt(var("FEEDWATCH_FETCH_TIMEOUT"), "FEEDWATCH_FETCH_TIMEOUT")?,
            restart_delay_secs: parse_opt(var("FEEDWATCH_RESTART_DELAY"), "FEEDWATCH_RESTART_DELAY")?,
            owner_id: parse_opt(var("FEEDWATCH_OWNER_ID"), "FEEDWATCH_OWNER_ID")?,
            webhooks: var("FEEDWATCH_WEBHOOKS")
                .map(|spec| parse_webhooks(&spec))
                .transpose()?
                .unwrap_or_default(),
            default_destination: parse_opt::<u64>(
                var("FEEDWATCH_DEFAULT_DESTINATION"),
                "FEEDWATCH_DEFAULT_DESTINATION",
            )?
            .map(DestinationId),
            feed_url: var("FEEDWATCH_FEED_URL"),
            autostart: parse_opt(var("FEEDWATCH_AUTOSTART"), "FEEDWATCH_AUTOSTART")?.unwrap_or(true),
            log_level: var("FEEDWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(interval) = self.poll_interval_secs
            && !(1..=86_400).contains(&interval)
        {
            anyhow::bail!(
                "FEEDWATCH_POLL_INTERVAL must be between 1 and 86400 seconds. Got: {}",
                interval
            );
        }

        if let Some(timeout) = self.fetch_timeout_secs
            && !(1..=600).contains(&timeout)
        {
            anyhow::bail!(
                "FEEDWATCH_FETCH_TIMEOUT must be between 1 and 600 seconds. Got: {}",
                timeout
            );
        }

        for (destination, url) in &self.webhooks {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                anyhow::bail!(
                    "Webhook for destination {} must use HTTP or HTTPS",
                    destination
                );
            }
        }

        if let Some(url) = &self.feed_url
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            anyhow::bail!("FEEDWATCH_FEED_URL must use HTTP or HTTPS. Got: {}", url);
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "FEEDWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.watch_config().validate()?;
        Ok(())
    }

    /// Core configuration derived from the environment
    pub fn watch_config(&self) -> WatchConfig {
        let mut config = WatchConfig::new();
        if let Some(secs) = self.poll_interval_secs {
            config.poll_interval_secs = secs;
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config.fetch_timeout_secs = secs;
        }
        if let Some(secs) = self.restart_delay_secs {
            config.restart_delay_secs = secs;
        }
        config.owner_id = self.owner_id;
        config.default_destination = self.default_destination;
        config.default_feed_url = self.feed_url.clone();
        config
    }
}

fn parse_opt<T>(value: Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .map(|v| {
            v.trim()
                .parse::<T>()
                .with_context(|| format!("{} has an invalid value: '{}'", key, v))
        })
        .transpose()
}

/// Parse `destination=url` pairs separated by commas
fn parse_webhooks(spec: &str) -> Result<HashMap<DestinationId, String>> {
    let mut webhooks = HashMap::new();

    for pair in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (destination, url) = pair
            .split_once('=')
            .with_context(|| format!("FEEDWATCH_WEBHOOKS entry '{}' is not destination=url", pair))?;

        let destination: u64 = destination
            .trim()
            .parse()
            .with_context(|| format!("FEEDWATCH_WEBHOOKS destination '{}' is not a number", destination))?;

        if webhooks
            .insert(DestinationId(destination), url.trim().to_string())
            .is_some()
        {
            anyhow::bail!("FEEDWATCH_WEBHOOKS lists destination {} twice", destination);
        }
    }

    Ok(webhooks)
}
