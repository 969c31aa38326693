// # Syndication Parser
//
// This crate provides the `FeedParser` implementation for real-world feed
// documents. RSS, Atom and JSON Feed are detected automatically.
//
// ## Entry Mapping
//
// | Entry field      | Source                                           |
// |------------------|--------------------------------------------------|
// | `id`             | entry id (feed-generated when the document has none) |
// | `title`          | entry title, or empty                            |
// | `summary`        | summary, else content body, with markup removed  |
// | `updated_marker` | RFC 3339 of `updated`, else `published`, else "" |
// | `updated_time`   | `updated`, else `published`                      |
//
// A document is well-formed when it has a non-empty title, since that title
// becomes the feed's name at registration.

use chrono::{DateTime, SecondsFormat, Utc};
use feed_rs::model::Entry;
use feed_rs::parser;
use feedwatch_core::model::{FeedEntry, ParsedFeed};
use feedwatch_core::traits::FeedParser;
use feedwatch_core::{Error, Result};

/// Parses RSS, Atom and JSON Feed documents
#[derive(Debug, Clone, Copy, Default)]
pub struct SyndicationParser;

impl SyndicationParser {
    pub fn new() -> Self {
        Self
    }
}

impl FeedParser for SyndicationParser {
    fn parse(&self, raw: &str) -> Result<ParsedFeed> {
        let feed = parser::parse(raw.as_bytes())
            .map_err(|e| Error::malformed_feed(format!("Failed to parse feed: {}", e)))?;

        let title = feed
            .title
            .map(|t| t.content.trim().to_string())
            .unwrap_or_default();

        let entries: Vec<FeedEntry> = feed.entries.into_iter().map(convert_entry).collect();

        tracing::trace!("Parsed feed '{}' with {} entries", title, entries.len());

        Ok(ParsedFeed {
            well_formed: !title.is_empty(),
            title,
            entries,
        })
    }
}

fn convert_entry(entry: Entry) -> FeedEntry {
    let title = entry.title.map(|t| t.content).unwrap_or_default();
    let summary = entry
        .summary
        .map(|t| t.content)
        .or(entry.content.and_then(|c| c.body))
        .map(|text| strip_html(&text))
        .unwrap_or_default();

    let updated_time = entry.updated.or(entry.published);
    let updated_marker = updated_time.as_ref().map(marker).unwrap_or_default();

    let mut converted = FeedEntry::new(entry.id, title, updated_marker).with_summary(summary);
    if let Some(time) = updated_time {
        converted = converted.with_updated_time(time);
    }
    converted
}

fn marker(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Remove tags and decode the handful of entities feeds commonly escape
fn strip_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .trim()
        .to_string()
}
