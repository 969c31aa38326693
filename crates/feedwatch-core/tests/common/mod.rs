//! Test doubles and common utilities for feedwatch contract tests
//!
//! Feed documents are plain text so tests can script them without a real
//! syndication parser: the first line is the feed title and every following
//! line is `entry_id<TAB>updated_marker`, newest first.

#![allow(dead_code)]

use feedwatch_core::error::{Error, Result};
use feedwatch_core::model::{DestinationId, FeedEntry, ParsedFeed, SeenEntry};
use feedwatch_core::traits::{DedupLedger, FeedParser, Fetcher, NotificationSink};
use feedwatch_core::{
    Collaborators, EventEmitter, FeedWatch, MemoryStore, Poller, WatchBuilder, WatchConfig,
    WatchEvent,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

/// Interval used by every test that runs the supervisor
pub const TEST_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Upper bound for anything a test waits on
pub const TEST_DEADLINE: Duration = Duration::from_secs(5);

/// Render a feed document; `entries` are `(id, marker)` pairs, newest first
pub fn document(title: &str, entries: &[(&str, &str)]) -> String {
    let mut text = title.to_string();
    for (id, marker) in entries {
        text.push('\n');
        text.push_str(id);
        text.push('\t');
        text.push_str(marker);
    }
    text
}

/// Scripted fetch failure
#[derive(Debug, Clone, Copy)]
pub enum FetchFailure {
    Timeout,
    BadStatus(u16),
    /// Never completes
    Hang,
}

/// A Fetcher serving in-memory documents keyed by URL
///
/// Unknown URLs answer with status 404.
#[derive(Default)]
pub struct ScriptedFetcher {
    documents: Mutex<HashMap<String, String>>,
    failures: Mutex<HashMap<String, VecDeque<FetchFailure>>>,
    fetch_count: AtomicUsize,
    fetched_urls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `raw` for `url` from now on
    pub fn set_document(&self, url: &str, raw: impl Into<String>) {
        self.documents
            .lock()
            .unwrap()
            .insert(url.to_string(), raw.into());
    }

    /// Make the next `times` fetches of `url` fail
    pub fn fail_next(&self, url: &str, failure: FetchFailure, times: usize) {
        let mut failures = self.failures.lock().unwrap();
        let queue = failures.entry(url.to_string()).or_default();
        for _ in 0..times {
            queue.push_back(failure);
        }
    }

    /// Number of fetches started
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// URLs in the order they were fetched
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetched_urls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String> {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        self.fetched_urls.lock().unwrap().push(url.to_string());

        let failure = self
            .failures
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());

        match failure {
            Some(FetchFailure::Timeout) => return Err(Error::Timeout),
            Some(FetchFailure::BadStatus(code)) => return Err(Error::BadStatus(code)),
            Some(FetchFailure::Hang) => return std::future::pending().await,
            None => {}
        }

        self.documents
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or(Error::BadStatus(404))
    }
}

/// Parser for the line-based documents produced by [`document`]
pub struct LineParser;

impl FeedParser for LineParser {
    fn parse(&self, raw: &str) -> Result<ParsedFeed> {
        let mut lines = raw.lines();
        let title = lines
            .next()
            .ok_or_else(|| Error::malformed_feed("empty document"))?
            .trim()
            .to_string();

        let entries = lines
            .map(|line| {
                let (id, marker) = line
                    .split_once('\t')
                    .ok_or_else(|| Error::malformed_feed(format!("bad entry line '{}'", line)))?;
                Ok(FeedEntry::new(id, format!("Entry {}", id), marker))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ParsedFeed {
            well_formed: !title.is_empty(),
            title,
            entries,
        })
    }
}

/// One successful post
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    pub destination: DestinationId,
    pub entry_id: String,
    pub updated_marker: String,
}

/// A NotificationSink that records every post
///
/// Destinations can be marked as rejected, and the sink can be switched to
/// fail every post with a transport error.
#[derive(Default)]
pub struct RecordingSink {
    posts: Mutex<Vec<Post>>,
    rejected: Mutex<HashSet<DestinationId>>,
    rejected_count: AtomicUsize,
    broken: AtomicBool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every successful post, in order
    pub fn posts(&self) -> Vec<Post> {
        self.posts.lock().unwrap().clone()
    }

    /// Entry ids posted to one destination, in order
    pub fn posted_ids(&self, destination: DestinationId) -> Vec<String> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.destination == destination)
            .map(|p| p.entry_id.clone())
            .collect()
    }

    pub fn post_count(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    /// Number of posts refused with `InvalidDestination`
    pub fn rejected_count(&self) -> usize {
        self.rejected_count.load(Ordering::SeqCst)
    }

    pub fn reject(&self, destination: DestinationId) {
        self.rejected.lock().unwrap().insert(destination);
    }

    pub fn accept(&self, destination: DestinationId) {
        self.rejected.lock().unwrap().remove(&destination);
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl NotificationSink for RecordingSink {
    async fn post(&self, entry: &FeedEntry, destination: DestinationId) -> Result<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(Error::http("connection reset"));
        }
        if self.rejected.lock().unwrap().contains(&destination) {
            self.rejected_count.fetch_add(1, Ordering::SeqCst);
            return Err(Error::InvalidDestination(destination));
        }

        self.posts.lock().unwrap().push(Post {
            destination,
            entry_id: entry.id.clone(),
            updated_marker: entry.updated_marker.clone(),
        });
        Ok(())
    }
}

/// Ledger over a memory store whose writes can be made to fail
pub struct FlakyLedger {
    store: Arc<MemoryStore>,
    failures_left: AtomicUsize,
}

impl FlakyLedger {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self {
            store,
            failures_left: AtomicUsize::new(0),
        }
    }

    /// Fail the next `times` calls to `mark_seen`
    pub fn fail_next_writes(&self, times: usize) {
        self.failures_left.store(times, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl DedupLedger for FlakyLedger {
    async fn records_for(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
    ) -> Result<Vec<SeenEntry>> {
        self.store.records_for(feed_name, destination_id).await
    }

    async fn mark_seen(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
        entry_id: &str,
        updated_marker: &str,
    ) -> Result<()> {
        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(Error::store("disk full"));
        }
        self.store
            .mark_seen(feed_name, destination_id, entry_id, updated_marker)
            .await
    }
}

/// Configuration with immediate restarts
pub fn test_config() -> WatchConfig {
    WatchConfig {
        restart_delay_secs: 0,
        event_channel_capacity: 1000,
        ..WatchConfig::default()
    }
}

/// A poller over a memory store, for driving single cycles
pub fn poller_with(
    fetcher: &Arc<ScriptedFetcher>,
    sink: &Arc<RecordingSink>,
    store: &Arc<MemoryStore>,
) -> (Poller, mpsc::Receiver<WatchEvent>) {
    let (events, rx) = EventEmitter::channel(1000);
    let collaborators = Collaborators {
        fetcher: fetcher.clone(),
        parser: Arc::new(LineParser),
        sink: sink.clone(),
        registry: store.clone(),
        ledger: store.clone(),
    };
    (Poller::new(collaborators, &test_config(), events), rx)
}

/// A fully wired watcher over a memory store
pub fn watch_with(
    config: WatchConfig,
    fetcher: &Arc<ScriptedFetcher>,
    sink: &Arc<RecordingSink>,
    store: &Arc<MemoryStore>,
) -> (FeedWatch, mpsc::Receiver<WatchEvent>) {
    WatchBuilder::new(config)
        .fetcher(fetcher.clone())
        .parser(Arc::new(LineParser))
        .sink(sink.clone())
        .store(store.clone())
        .poll_interval(TEST_POLL_INTERVAL)
        .build()
        .expect("watcher construction succeeds")
}

/// Receive events until one matches, panicking after [`TEST_DEADLINE`]
pub async fn wait_for_event(
    rx: &mut mpsc::Receiver<WatchEvent>,
    matches: impl Fn(&WatchEvent) -> bool,
) -> WatchEvent {
    let result = tokio::time::timeout(TEST_DEADLINE, async {
        while let Some(event) = rx.recv().await {
            if matches(&event) {
                return Some(event);
            }
        }
        None
    })
    .await;

    match result {
        Ok(Some(event)) => event,
        Ok(None) => panic!("event channel closed before the expected event"),
        Err(_) => panic!("timed out waiting for event"),
    }
}

/// Poll `condition` until it holds, panicking after [`TEST_DEADLINE`]
pub async fn wait_until(condition: impl Fn() -> bool) {
    let result = tokio::time::timeout(TEST_DEADLINE, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    assert!(result.is_ok(), "condition not reached within deadline");
}
