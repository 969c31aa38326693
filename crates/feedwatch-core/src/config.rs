//! Configuration types for the feedwatch system
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::DestinationId;

/// Main watcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Delay between poll cycles (in seconds)
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Per-request fetch timeout (in seconds)
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Pause before a failed execution is replaced (in seconds)
    ///
    /// A feed that fails on every fetch aborts every cycle; without a pause the
    /// supervisor would restart in a tight loop. Set to 0 to restart immediately.
    #[serde(default = "default_restart_delay_secs")]
    pub restart_delay_secs: u64,

    /// Capacity of the event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Operator allowed to run control commands (`None` = anyone)
    #[serde(default)]
    pub owner_id: Option<u64>,

    /// Destination used by single-feed legacy mode
    #[serde(default)]
    pub default_destination: Option<DestinationId>,

    /// Feed URL used by single-feed legacy mode
    #[serde(default)]
    pub default_feed_url: Option<String>,
}

impl WatchConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            restart_delay_secs: default_restart_delay_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            owner_id: None,
            default_destination: None,
            default_feed_url: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.poll_interval_secs == 0 {
            return Err(crate::Error::config("Poll interval must be > 0"));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(crate::Error::config("Fetch timeout must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        match (&self.default_destination, &self.default_feed_url) {
            (Some(_), None) => Err(crate::Error::config(
                "Legacy mode requires a feed URL alongside the default destination",
            )),
            (None, Some(_)) => Err(crate::Error::config(
                "Legacy mode requires a default destination alongside the feed URL",
            )),
            (_, Some(url)) if url.is_empty() => {
                Err(crate::Error::config("Legacy feed URL cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Delay between poll cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Per-request fetch timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Pause before restarting a failed execution
    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }

    /// The legacy single feed, when both halves are configured
    pub fn legacy_feed(&self) -> Option<(DestinationId, &str)> {
        match (self.default_destination, self.default_feed_url.as_deref()) {
            (Some(destination), Some(url)) => Some((destination, url)),
            _ => None,
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_restart_delay_secs() -> u64 {
    5
}

fn default_event_channel_capacity() -> usize {
    1000
}
