//! Contract Test: Restart Persistence
//!
//! Verifies that the SQLite-backed registry and ledger survive a process
//! restart, so nothing is delivered twice.

mod common;

use common::*;
use feedwatch_core::model::{DestinationId, Feed, GroupId};
use feedwatch_core::traits::FeedRegistry;
use feedwatch_core::{Collaborators, EventEmitter, Poller, SqliteStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn sqlite_poller(
    fetcher: &Arc<ScriptedFetcher>,
    sink: &Arc<RecordingSink>,
    store: &Arc<SqliteStore>,
) -> Poller {
    let (events, _rx) = EventEmitter::channel(16);
    let collaborators = Collaborators {
        fetcher: fetcher.clone(),
        parser: Arc::new(LineParser),
        sink: sink.clone(),
        registry: store.clone(),
        ledger: store.clone(),
    };
    Poller::new(collaborators, &test_config(), events)
}

#[tokio::test]
async fn reopened_store_suppresses_redelivery() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feedwatch.db");
    let url = "https://daily.example/rss";

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_document(url, document("Daily", &[("e2", "t1"), ("e1", "t0")]));

    {
        let store = Arc::new(SqliteStore::open(&path).await.unwrap());
        store
            .add(&Feed::new("Daily", DestinationId(9), GroupId(1), url))
            .await
            .unwrap();

        let sink = Arc::new(RecordingSink::new());
        sqlite_poller(&fetcher, &sink, &store)
            .run_cycle(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(sink.posted_ids(DestinationId(9)), vec!["e1", "e2"]);
        store.close().await;
    }

    let store = Arc::new(SqliteStore::open(&path).await.unwrap());
    assert_eq!(store.list_all().await.unwrap().len(), 1);
    assert_eq!(store.ledger_len().await.unwrap(), 2);

    let sink = Arc::new(RecordingSink::new());
    sqlite_poller(&fetcher, &sink, &store)
        .run_cycle(&CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(sink.post_count(), 0, "nothing is redelivered after a restart");
}

#[tokio::test]
async fn removed_and_readded_feed_keeps_its_history() {
    let store = Arc::new(SqliteStore::open_in_memory().await.unwrap());
    let url = "https://daily.example/rss";
    let feed = Feed::new("Daily", DestinationId(9), GroupId(1), url);

    let fetcher = Arc::new(ScriptedFetcher::new());
    fetcher.set_document(url, document("Daily", &[("e1", "t0")]));
    let sink = Arc::new(RecordingSink::new());
    let poller = sqlite_poller(&fetcher, &sink, &store);
    let cancel = CancellationToken::new();

    store.add(&feed).await.unwrap();
    poller.run_cycle(&cancel).await.unwrap();

    store.remove(DestinationId(9)).await.unwrap();
    store.add(&feed).await.unwrap();
    poller.run_cycle(&cancel).await.unwrap();

    assert_eq!(sink.post_count(), 1);
}
