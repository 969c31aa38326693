// # feedwatch-core
//
// Core library for watching web feeds and relaying new or changed entries to
// messaging destinations.
//
// ## Architecture Overview
//
// - **Fetcher / FeedParser**: Traits for retrieving and parsing feed documents
// - **NotificationSink**: Trait for posting one entry to one destination
// - **FeedRegistry / DedupLedger**: Traits for the durable catalog and the
//   delivered-version ledger
// - **Poller**: One periodic cycle over every registered feed
// - **Supervisor**: Owns the single poll execution and restarts it on failure
// - **CommandSurface**: Operator commands (start, stop, new, remove)
//
// ## Design Principles
//
// 1. **Explicit wiring**: Collaborators are passed in at construction
// 2. **Exactly one execution**: The supervisor holds the only handle to it
// 3. **At-least-once delivery**: Post first, then record in the ledger
// 4. **Library-First**: The daemon is a thin shell over this crate

pub mod builder;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod model;
pub mod poller;
pub mod store;
pub mod supervisor;
pub mod traits;

// Re-export core types for convenience
pub use builder::{FeedWatch, WatchBuilder};
pub use command::{Command, CommandContext, CommandSurface, Reply};
pub use config::WatchConfig;
pub use error::{Error, Result};
pub use event::{EventEmitter, WatchEvent};
pub use model::{DedupRecord, DestinationId, Feed, FeedEntry, GroupId, ParsedFeed, SeenEntry};
pub use poller::{Collaborators, Completion, CycleOutcome, CycleReport, Poller};
pub use store::{MemoryStore, SqliteStore};
pub use supervisor::{StartOutcome, StopOutcome, Supervisor, SupervisorState, SupervisorStatus};
pub use traits::{DedupLedger, FeedParser, FeedRegistry, Fetcher, NotificationSink};
