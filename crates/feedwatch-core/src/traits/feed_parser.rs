// # Feed Parser Trait
//
// Converts fetched document text into structured entries.
//
// ## Implementations
//
// - RSS/Atom/JSON Feed: `feedwatch-syndication` crate (`SyndicationParser`)

use crate::model::ParsedFeed;

/// Trait for feed document parsers
///
/// Parsing is synchronous and side-effect free.
///
/// Structural failure (the text is not a feed at all) is an error. A document
/// that parses but fails the parser's well-formedness check is returned with
/// `well_formed == false`; callers decide whether that matters.
pub trait FeedParser: Send + Sync {
    /// Parse raw document text
    ///
    /// Entries are returned in document order.
    fn parse(&self, raw: &str) -> Result<ParsedFeed, crate::Error>;
}
