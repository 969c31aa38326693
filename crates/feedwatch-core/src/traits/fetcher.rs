// # Fetcher Trait
//
// Defines the interface for retrieving a feed document.
//
// ## Implementations
//
// - HTTP: `feedwatch-http` crate (`HttpFetcher`)
//
// ## Usage
//
// ```rust,ignore
// use feedwatch_core::Fetcher;
// use std::time::Duration;
//
// let text = fetcher.fetch("https://example.com/feed.xml", Duration::from_secs(60)).await?;
// ```

use async_trait::async_trait;
use std::time::Duration;

/// Trait for feed document fetchers
///
/// A fetcher owns its network session. It is handed to the poller and the
/// command surface at construction time and is never looked up at runtime.
///
/// # Errors
///
/// - [`Error::InvalidUrl`](crate::Error::InvalidUrl): the URL cannot be requested
/// - [`Error::BadStatus`](crate::Error::BadStatus): the server answered with anything but 200
/// - [`Error::Timeout`](crate::Error::Timeout): no complete response within `timeout`
///
/// Implementations must not retry. A failed fetch aborts the poll cycle and
/// recovery is owned by the `Supervisor`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the document at `url` as text
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, crate::Error>;
}
