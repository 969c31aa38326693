// # Memory Store
//
// In-memory implementation of FeedRegistry and DedupLedger.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for tests and for embedding the engine where durability is
// handled elsewhere.
//
// ## Crash Behavior
//
// - All state is lost on restart/crash
// - The first cycle after a restart redelivers every entry of every feed

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::model::{DestinationId, Feed, SeenEntry};
use crate::traits::{DedupLedger, FeedRegistry};
use crate::{Error, Result};

type LedgerKey = (String, DestinationId, String);

/// In-memory feed registry and dedup ledger
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    feeds: Arc<RwLock<Vec<Feed>>>,
    ledger: Arc<RwLock<HashMap<LedgerKey, String>>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ledger records across all feeds
    pub async fn ledger_len(&self) -> usize {
        self.ledger.read().await.len()
    }

    /// Stored marker for one entry, if any
    pub async fn marker(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
        entry_id: &str,
    ) -> Option<String> {
        let key = (feed_name.to_string(), destination_id, entry_id.to_string());
        self.ledger.read().await.get(&key).cloned()
    }
}

#[async_trait]
impl FeedRegistry for MemoryStore {
    async fn add(&self, feed: &Feed) -> Result<()> {
        let mut feeds = self.feeds.write().await;
        if feeds.iter().any(|f| f.destination_id == feed.destination_id) {
            return Err(Error::duplicate_destination(feed.destination_id));
        }
        feeds.push(feed.clone());
        Ok(())
    }

    async fn remove(&self, destination_id: DestinationId) -> Result<()> {
        self.feeds
            .write()
            .await
            .retain(|f| f.destination_id != destination_id);
        Ok(())
    }

    async fn find_by_destination(&self, destination_id: DestinationId) -> Result<Option<Feed>> {
        let feeds = self.feeds.read().await;
        Ok(feeds
            .iter()
            .find(|f| f.destination_id == destination_id)
            .cloned())
    }

    async fn list_all(&self) -> Result<Vec<Feed>> {
        Ok(self.feeds.read().await.clone())
    }
}

#[async_trait]
impl DedupLedger for MemoryStore {
    async fn records_for(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
    ) -> Result<Vec<SeenEntry>> {
        let ledger = self.ledger.read().await;
        Ok(ledger
            .iter()
            .filter(|((name, dest, _), _)| name == feed_name && *dest == destination_id)
            .map(|((_, _, entry_id), marker)| SeenEntry::new(entry_id.clone(), marker.clone()))
            .collect())
    }

    async fn mark_seen(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
        entry_id: &str,
        updated_marker: &str,
    ) -> Result<()> {
        let key = (feed_name.to_string(), destination_id, entry_id.to_string());
        self.ledger
            .write()
            .await
            .insert(key, updated_marker.to_string());
        Ok(())
    }
}
