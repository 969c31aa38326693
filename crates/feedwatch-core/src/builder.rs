//! Construction of a fully wired watcher
//!
//! Every collaborator is supplied here, once. Nothing is looked up at
//! runtime, so a missing piece is reported by [`WatchBuilder::build`] instead
//! of surfacing as a failure deep inside a poll cycle.
//!
//! ```rust,ignore
//! let store = Arc::new(SqliteStore::open("feedwatch.db").await?);
//!
//! let (watch, events) = WatchBuilder::new(config)
//!     .fetcher(Arc::new(HttpFetcher::new()?))
//!     .parser(Arc::new(SyndicationParser::new()))
//!     .sink(Arc::new(sink))
//!     .store(store)
//!     .build()?;
//!
//! watch.supervisor().start().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::command::CommandSurface;
use crate::config::WatchConfig;
use crate::error::{Error, Result};
use crate::event::{EventEmitter, WatchEvent};
use crate::poller::{Collaborators, Poller};
use crate::supervisor::Supervisor;
use crate::traits::{DedupLedger, FeedParser, FeedRegistry, Fetcher, NotificationSink};

/// Collects collaborators and configuration for a [`FeedWatch`]
pub struct WatchBuilder {
    config: WatchConfig,
    fetcher: Option<Arc<dyn Fetcher>>,
    parser: Option<Arc<dyn FeedParser>>,
    sink: Option<Arc<dyn NotificationSink>>,
    registry: Option<Arc<dyn FeedRegistry>>,
    ledger: Option<Arc<dyn DedupLedger>>,
    poll_interval: Option<Duration>,
}

impl WatchBuilder {
    pub fn new(config: WatchConfig) -> Self {
        Self {
            config,
            fetcher: None,
            parser: None,
            sink: None,
            registry: None,
            ledger: None,
            poll_interval: None,
        }
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn FeedParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn registry(mut self, registry: Arc<dyn FeedRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn DedupLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Use one store as both registry and ledger
    pub fn store<S>(self, store: Arc<S>) -> Self
    where
        S: FeedRegistry + DedupLedger + 'static,
    {
        let registry: Arc<dyn FeedRegistry> = store.clone();
        let ledger: Arc<dyn DedupLedger> = store;
        self.registry(registry).ledger(ledger)
    }

    /// Override the configured poll interval
    ///
    /// Sub-second intervals are only reachable this way.
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = Some(poll_interval);
        self
    }

    /// Validate and wire everything together
    ///
    /// # Returns
    ///
    /// The watcher plus the receiving end of its event channel.
    ///
    /// # Errors
    ///
    /// - `Error::Config`: The configuration failed validation
    /// - `Error::MissingCollaborator`: A collaborator was never supplied
    pub fn build(self) -> Result<(FeedWatch, mpsc::Receiver<WatchEvent>)> {
        self.config.validate()?;

        let collaborators = Collaborators {
            fetcher: self.fetcher.ok_or(Error::MissingCollaborator("fetcher"))?,
            parser: self.parser.ok_or(Error::MissingCollaborator("parser"))?,
            sink: self.sink.ok_or(Error::MissingCollaborator("sink"))?,
            registry: self.registry.ok_or(Error::MissingCollaborator("registry"))?,
            ledger: self.ledger.ok_or(Error::MissingCollaborator("ledger"))?,
        };

        let (events, rx) = EventEmitter::channel(self.config.event_channel_capacity);

        let mut poller = Poller::new(collaborators.clone(), &self.config, events.clone());
        if let Some(poll_interval) = self.poll_interval {
            poller = poller.with_poll_interval(poll_interval);
        }

        let supervisor = Arc::new(Supervisor::new(
            Arc::new(poller),
            self.config.restart_delay(),
            events,
        ));

        let commands = CommandSurface::new(
            Arc::clone(&supervisor),
            collaborators.registry,
            collaborators.fetcher,
            collaborators.parser,
            self.config.fetch_timeout(),
            self.config.owner_id,
        );

        Ok((
            FeedWatch {
                supervisor,
                commands,
            },
            rx,
        ))
    }
}

/// A wired watcher: the supervisor plus the command surface that drives it
pub struct FeedWatch {
    supervisor: Arc<Supervisor>,
    commands: CommandSurface,
}

impl FeedWatch {
    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    pub fn commands(&self) -> &CommandSurface {
        &self.commands
    }
}
