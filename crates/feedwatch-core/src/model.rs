// # Data Model
//
// Durable and transient records shared by every feedwatch component.
//
// - `Feed`: one watched document bound to exactly one destination
// - `DedupRecord`: the last delivered version of one entry for one feed/destination
// - `ParsedFeed` / `FeedEntry`: parser output consumed by the poller

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Messaging-platform target that receives notifications (e.g. a channel id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for DestinationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Group (e.g. a guild or workspace) a feed was registered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A registered feed
///
/// At most one feed exists per `destination_id`. Feeds are never mutated in
/// place; replacing one means remove followed by add.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feed {
    /// Feed title at registration time; also the ledger's feed key
    pub name: String,
    /// Where new entries are posted
    pub destination_id: DestinationId,
    /// Group the feed was registered from
    pub group_id: GroupId,
    /// Document URL
    pub url: String,
}

impl Feed {
    /// Create a new feed record
    pub fn new(
        name: impl Into<String>,
        destination_id: DestinationId,
        group_id: GroupId,
        url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            destination_id,
            group_id,
            url: url.into(),
        }
    }
}

/// Last delivered version of one entry
///
/// Keyed by `(feed_name, destination_id, entry_id)`. Writing an existing key
/// overwrites `updated_marker`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupRecord {
    pub feed_name: String,
    pub destination_id: DestinationId,
    pub entry_id: String,
    /// Opaque, feed-supplied version token
    pub updated_marker: String,
}

/// One `(entry_id, updated_marker)` pair from a ledger snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeenEntry {
    pub entry_id: String,
    pub updated_marker: String,
}

impl SeenEntry {
    pub fn new(entry_id: impl Into<String>, updated_marker: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            updated_marker: updated_marker.into(),
        }
    }
}

/// One item within a parsed feed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    pub id: String,
    pub title: String,
    pub summary: String,
    /// Opaque version token used for change detection
    pub updated_marker: String,
    /// Parsed timestamp, when the document carries one
    pub updated_time: Option<DateTime<Utc>>,
}

impl FeedEntry {
    /// Create an entry with an empty summary and no timestamp
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        updated_marker: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            updated_marker: updated_marker.into(),
            updated_time: None,
        }
    }

    /// Set the summary text
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set the parsed timestamp
    pub fn with_updated_time(mut self, updated_time: DateTime<Utc>) -> Self {
        self.updated_time = Some(updated_time);
        self
    }

    /// Whether the ledger snapshot already holds this exact version
    pub fn is_seen_in<'a>(&self, seen: impl IntoIterator<Item = &'a SeenEntry>) -> bool {
        seen.into_iter()
            .any(|s| s.entry_id == self.id && s.updated_marker == self.updated_marker)
    }
}

/// Structured output of a [`FeedParser`](crate::traits::FeedParser)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeed {
    pub title: String,
    /// Entries in document order (newest-first by platform convention)
    pub entries: Vec<FeedEntry>,
    /// Result of the parser's well-formedness check; only consulted at registration
    pub well_formed: bool,
}
