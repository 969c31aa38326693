// # Notification Sink Trait
//
// Delivers a single feed entry to a messaging destination.
//
// ## Implementations
//
// - Webhook: `feedwatch-http` crate (`WebhookSink`)

use async_trait::async_trait;

use crate::model::{DestinationId, FeedEntry};

/// Trait for notification sinks
///
/// # Errors
///
/// Sinks must report a destination that cannot receive messages as
/// [`Error::InvalidDestination`](crate::Error::InvalidDestination). The poller
/// logs that class of failure and moves on to the next entry without writing a
/// ledger record. Any other error aborts the cycle.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Post one entry to one destination
    async fn post(&self, entry: &FeedEntry, destination: DestinationId)
    -> Result<(), crate::Error>;
}
