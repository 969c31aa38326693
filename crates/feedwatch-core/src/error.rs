//! Error types for the feedwatch system
//!
//! This module defines all error types used throughout the crate.

use crate::model::DestinationId;
use thiserror::Error;

/// Result type alias for feedwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the feedwatch system
#[derive(Error, Debug)]
pub enum Error {
    /// A feed is already registered for this destination
    #[error("Destination {destination_id} already has a feed")]
    DuplicateDestination {
        /// The destination that is already bound
        destination_id: DestinationId,
    },

    /// The feed URL could not be parsed or has an unsupported scheme
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The feed host answered with a non-200 status
    #[error("Got status code {0}")]
    BadStatus(u16),

    /// The fetch did not complete within its timeout
    #[error("Connection timed out")]
    Timeout,

    /// The fetched document could not be parsed, or failed the well-formedness check
    #[error("Malformed feed: {0}")]
    MalformedFeed(String),

    /// The destination can no longer receive messages
    #[error("Invalid destination: {0}")]
    InvalidDestination(DestinationId),

    /// A required collaborator was never supplied at construction time
    #[error("Missing collaborator: {0}")]
    MissingCollaborator(&'static str),

    /// Malformed operator input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Durable store errors
    #[error("Store error: {0}")]
    Store(String),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a duplicate destination error
    pub fn duplicate_destination(destination_id: DestinationId) -> Self {
        Self::DuplicateDestination { destination_id }
    }

    /// Create an invalid URL error
    pub fn invalid_url(msg: impl Into<String>) -> Self {
        Self::InvalidUrl(msg.into())
    }

    /// Create a malformed feed error
    pub fn malformed_feed(msg: impl Into<String>) -> Self {
        Self::MalformedFeed(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a store error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this error means the destination cannot receive messages.
    ///
    /// The poller isolates these per entry instead of aborting the cycle.
    pub fn is_invalid_destination(&self) -> bool {
        matches!(self, Self::InvalidDestination(_))
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Store(err.to_string())
    }
}
