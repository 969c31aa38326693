//! Feed poller
//!
//! The Poller is responsible for:
//! - Loading every registered feed
//! - Fetching and parsing each feed document
//! - Diffing entries against the dedup ledger
//! - Posting new or changed entries, then recording them
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ FeedRegistry │─── list_all ───┐
//! └──────────────┘                │
//!                                 ▼
//!                          ┌────────────┐
//!                          │   Poller   │
//!                          └────────────┘
//!                                 │
//!       ┌──────────────┬──────────┴────────┬──────────────────┐
//!       ▼              ▼                   ▼                  ▼
//! ┌──────────┐  ┌────────────┐    ┌──────────────┐   ┌──────────────────┐
//! │ Fetcher  │  │ FeedParser │    │ DedupLedger  │   │ NotificationSink │
//! │ (fetch)  │  │ (parse)    │    │ (diff/mark)  │   │ (post)           │
//! └──────────┘  └────────────┘    └──────────────┘   └──────────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Load all feeds
//! 2. For each feed in registry order: fetch, parse, reverse to oldest-first
//! 3. For each entry whose `(id, updated_marker)` is not in the ledger:
//!    post, then write the ledger record
//! 4. Sleep for the poll interval, repeat
//!
//! ## Failure Handling
//!
//! - A fetch or parse failure aborts the rest of the cycle and ends the
//!   execution with [`Completion::Failed`]; the `Supervisor` restarts it.
//! - [`Error::InvalidDestination`] from the sink is logged per entry; the
//!   entry is not recorded and is retried every cycle.
//! - Cancellation is observed only while fetching and while sleeping. Work
//!   already committed is never rolled back.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::WatchConfig;
use crate::error::{Error, Result};
use crate::event::{EventEmitter, WatchEvent};
use crate::model::{Feed, FeedEntry, SeenEntry};
use crate::traits::{DedupLedger, FeedParser, FeedRegistry, Fetcher, NotificationSink};

/// Every dependency of the poll loop, supplied at construction
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn Fetcher>,
    pub parser: Arc<dyn FeedParser>,
    pub sink: Arc<dyn NotificationSink>,
    pub registry: Arc<dyn FeedRegistry>,
    pub ledger: Arc<dyn DedupLedger>,
}

/// How a poll execution ended
///
/// A running execution loops forever, so it only ends when cancelled or when
/// an unhandled failure escapes a cycle.
#[derive(Debug)]
pub enum Completion {
    /// Cancellation was observed at a suspension point
    Cancelled,
    /// A cycle failed; the payload is the error that aborted it
    Failed(Error),
}

/// Result of a single cycle that was not aborted by a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every feed was processed
    Completed(CycleReport),
    /// Cancellation was observed before the cycle finished
    Cancelled,
}

/// Counters for one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Feeds fetched and diffed
    pub feeds_polled: usize,
    /// Entries posted and recorded
    pub delivered: usize,
    /// Entries whose destination was rejected by the sink
    pub rejected: usize,
    /// Entries already present in the ledger at the same version
    pub unchanged: usize,
}

/// The periodic poll cycle
pub struct Poller {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn FeedParser>,
    sink: Arc<dyn NotificationSink>,
    registry: Arc<dyn FeedRegistry>,
    ledger: Arc<dyn DedupLedger>,

    /// Sleep between cycles
    poll_interval: Duration,

    /// Timeout handed to every fetch
    fetch_timeout: Duration,

    /// Event sender for external monitoring
    events: EventEmitter,
}

impl Poller {
    /// Create a new poller
    pub fn new(collaborators: Collaborators, config: &WatchConfig, events: EventEmitter) -> Self {
        Self {
            fetcher: collaborators.fetcher,
            parser: collaborators.parser,
            sink: collaborators.sink,
            registry: collaborators.registry,
            ledger: collaborators.ledger,
            poll_interval: config.poll_interval(),
            fetch_timeout: config.fetch_timeout(),
            events,
        }
    }

    /// Override the sleep between cycles
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Run cycles until cancelled or until a cycle fails
    pub async fn run(&self, cancel: &CancellationToken) -> Completion {
        info!("Starting to poll (interval: {:?})", self.poll_interval);

        loop {
            match self.run_cycle(cancel).await {
                Ok(CycleOutcome::Completed(report)) => {
                    debug!(
                        "Cycle complete: {} feed(s), {} delivered, {} rejected, {} unchanged",
                        report.feeds_polled, report.delivered, report.rejected, report.unchanged
                    );
                }
                Ok(CycleOutcome::Cancelled) => return Completion::Cancelled,
                Err(e) => return Completion::Failed(e),
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Completion::Cancelled,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Run one pass over every registered feed
    ///
    /// # Returns
    ///
    /// - `Ok(CycleOutcome::Completed)`: Every feed was processed
    /// - `Ok(CycleOutcome::Cancelled)`: Cancellation was observed during a fetch
    /// - `Err(Error)`: A fetch, parse, ledger, or non-destination sink failure
    ///   aborted the remaining feeds
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleOutcome> {
        let feeds = self.registry.list_all().await?;
        self.events.emit(WatchEvent::CycleStarted {
            feeds_count: feeds.len(),
        });

        let mut report = CycleReport::default();

        for feed in &feeds {
            debug!("Fetching feed '{}' ({})", feed.name, feed.url);

            let raw = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(CycleOutcome::Cancelled),
                raw = self.fetcher.fetch(&feed.url, self.fetch_timeout) => raw?,
            };

            let parsed = self.parser.parse(&raw)?;
            self.check_entries(feed, &parsed.entries, &mut report).await?;
            report.feeds_polled += 1;
        }

        self.events.emit(WatchEvent::CycleCompleted {
            feeds_count: report.feeds_polled,
            delivered: report.delivered,
        });

        Ok(CycleOutcome::Completed(report))
    }

    /// Diff one feed's entries against the ledger and deliver what changed
    ///
    /// `entries` arrive newest-first and are walked oldest-first so that
    /// notifications go out in chronological order.
    async fn check_entries(
        &self,
        feed: &Feed,
        entries: &[FeedEntry],
        report: &mut CycleReport,
    ) -> Result<()> {
        let mut seen = self
            .ledger
            .records_for(&feed.name, feed.destination_id)
            .await?;

        for entry in entries.iter().rev() {
            if entry.is_seen_in(&seen) {
                report.unchanged += 1;
                continue;
            }

            info!("Found updated entry '{}' in feed '{}'", entry.title, feed.name);

            match self.sink.post(entry, feed.destination_id).await {
                Ok(()) => {}
                Err(e) if e.is_invalid_destination() => {
                    warn!(
                        "Could not post entry '{}' of feed '{}': {}. Will retry next cycle.",
                        entry.id, feed.name, e
                    );
                    self.events.emit(WatchEvent::DeliveryRejected {
                        feed_name: feed.name.clone(),
                        destination_id: feed.destination_id,
                        entry_id: entry.id.clone(),
                    });
                    report.rejected += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }

            // Posted but not yet recorded: a crash here redelivers the entry.
            self.ledger
                .mark_seen(
                    &feed.name,
                    feed.destination_id,
                    &entry.id,
                    &entry.updated_marker,
                )
                .await?;

            seen.retain(|s| s.entry_id != entry.id);
            seen.push(SeenEntry::new(entry.id.clone(), entry.updated_marker.clone()));

            self.events.emit(WatchEvent::EntryDelivered {
                feed_name: feed.name.clone(),
                destination_id: feed.destination_id,
                entry_id: entry.id.clone(),
            });
            report.delivered += 1;
        }

        Ok(())
    }
}
