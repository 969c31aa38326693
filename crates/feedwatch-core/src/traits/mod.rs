//! Core traits for the feedwatch system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`Fetcher`]: Retrieve a feed document over the network
//! - [`FeedParser`]: Turn raw document text into a [`ParsedFeed`](crate::model::ParsedFeed)
//! - [`NotificationSink`]: Post one entry to one destination
//! - [`FeedRegistry`]: Durable catalog of watched feeds
//! - [`DedupLedger`]: Durable record of delivered entry versions

pub mod dedup_ledger;
pub mod feed_parser;
pub mod feed_registry;
pub mod fetcher;
pub mod notification_sink;

pub use dedup_ledger::DedupLedger;
pub use feed_parser::FeedParser;
pub use feed_registry::FeedRegistry;
pub use fetcher::Fetcher;
pub use notification_sink::NotificationSink;
