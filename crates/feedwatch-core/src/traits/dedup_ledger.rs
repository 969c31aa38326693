// # Dedup Ledger Trait
//
// Durable record of the last delivered version of every
// (feed, destination, entry) triple.
//
// ## Purpose
//
// The ledger is the only state that survives a restart. It prevents entries
// from being posted again after the process comes back, and its
// `updated_marker` column lets a changed entry be detected and redelivered.
//
// ## Implementations
//
// - SQLite: `SqliteStore`
// - In-memory: `MemoryStore`

use async_trait::async_trait;

use crate::model::{DestinationId, SeenEntry};

/// Trait for dedup ledger implementations
///
/// The ledger only stores; deciding whether an entry is new or changed is
/// owned by the `Poller`.
///
/// # Growth
///
/// Records are never deleted. Removing a feed leaves its records in place so
/// that registering it again does not replay its history.
#[async_trait]
pub trait DedupLedger: Send + Sync {
    /// Snapshot of every `(entry_id, updated_marker)` stored for a feed/destination
    async fn records_for(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
    ) -> Result<Vec<SeenEntry>, crate::Error>;

    /// Upsert a record; an existing key has its marker overwritten
    async fn mark_seen(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
        entry_id: &str,
        updated_marker: &str,
    ) -> Result<(), crate::Error>;
}
