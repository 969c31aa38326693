// # Feed Registry Trait
//
// Durable catalog of watched feeds, one per destination.
//
// ## Implementations
//
// - SQLite: `SqliteStore`
// - In-memory: `MemoryStore`

use async_trait::async_trait;

use crate::model::{DestinationId, Feed};

/// Trait for feed registry implementations
///
/// # Invariants
///
/// - At most one feed per `destination_id`, enforced when writing
/// - Feeds are never updated in place
///
/// # Concurrency
///
/// Registration commands may interleave with a running poll cycle. Every
/// method must complete as a short, self-contained operation and must not
/// hold a lock across an await point owned by the caller.
#[async_trait]
pub trait FeedRegistry: Send + Sync {
    /// Register a feed
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The feed was stored
    /// - `Err(Error::DuplicateDestination)`: The destination already has a feed;
    ///   the existing registration is untouched
    /// - `Err(Error)`: Storage error
    async fn add(&self, feed: &Feed) -> Result<(), crate::Error>;

    /// Remove the feed bound to `destination_id`
    ///
    /// Idempotent: removing an absent destination is not an error.
    async fn remove(&self, destination_id: DestinationId) -> Result<(), crate::Error>;

    /// Find the feed bound to `destination_id`
    async fn find_by_destination(
        &self,
        destination_id: DestinationId,
    ) -> Result<Option<Feed>, crate::Error>;

    /// List every registered feed
    ///
    /// The order only determines the poll order within a cycle.
    async fn list_all(&self) -> Result<Vec<Feed>, crate::Error>;
}
