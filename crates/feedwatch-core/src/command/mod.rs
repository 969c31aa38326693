//! Operator command surface
//!
//! Translates operator commands into Supervisor and FeedRegistry calls and
//! turns every outcome into a user-visible [`Reply`]. Registration errors are
//! caught here and never reach the poller.
//!
//! ## Commands
//!
//! | Command | Effect |
//! |---|---|
//! | `start` | begin polling; notice if already running |
//! | `stop` | cancel polling; notice if already stopped |
//! | `new <destination> <url>` | fetch once, parse, check well-formedness, register |
//! | `remove <destination>` | unregister (idempotent) |
//!
//! Every command is owner-only when an owner is configured.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::model::{DestinationId, Feed, GroupId};
use crate::supervisor::{StartOutcome, StopOutcome, Supervisor};
use crate::traits::{FeedParser, FeedRegistry, Fetcher};

/// Acknowledgement marker (green checkmark)
pub const SUCCESS_EMOJI: &str = "\u{2705}";

/// A parsed operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    New {
        destination: DestinationId,
        url: String,
    },
    Remove {
        destination: DestinationId,
    },
}

impl Command {
    /// Parse a whitespace-separated command line
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let name = words
            .next()
            .ok_or_else(|| Error::invalid_input("empty command"))?;

        let command = match name {
            "start" => Command::Start,
            "stop" => Command::Stop,
            "new" => {
                let destination = parse_destination(words.next(), "new <destination> <url>")?;
                let url = words
                    .next()
                    .ok_or_else(|| Error::invalid_input("usage: new <destination> <url>"))?
                    .to_string();
                Command::New { destination, url }
            }
            "remove" => Command::Remove {
                destination: parse_destination(words.next(), "remove <destination>")?,
            },
            other => return Err(Error::invalid_input(format!("unknown command '{}'", other))),
        };

        if let Some(extra) = words.next() {
            return Err(Error::invalid_input(format!("unexpected argument '{}'", extra)));
        }

        Ok(command)
    }
}

fn parse_destination(word: Option<&str>, usage: &str) -> Result<DestinationId> {
    let word = word.ok_or_else(|| Error::invalid_input(format!("usage: {}", usage)))?;
    // Accept channel mentions like <#1234> as well as bare ids.
    let digits = word.trim_start_matches("<#").trim_end_matches('>');
    digits
        .parse::<u64>()
        .map(DestinationId)
        .map_err(|_| Error::invalid_input(format!("'{}' is not a destination id", word)))
}

/// Who issued a command, and from where
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandContext {
    pub caller_id: u64,
    pub group_id: GroupId,
}

/// What the operator sees after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The command succeeded
    Ack,
    /// The command was handled but something needs saying
    Notice(String),
    /// The caller is not the owner
    Denied,
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ack => write!(f, "{}", SUCCESS_EMOJI),
            Reply::Notice(message) => write!(f, "{}", message),
            Reply::Denied => write!(f, "Only the bot owner can do that."),
        }
    }
}

/// Command handlers wired to the running system
pub struct CommandSurface {
    supervisor: Arc<Supervisor>,
    registry: Arc<dyn FeedRegistry>,
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn FeedParser>,
    fetch_timeout: Duration,
    owner_id: Option<u64>,
}

impl CommandSurface {
    pub fn new(
        supervisor: Arc<Supervisor>,
        registry: Arc<dyn FeedRegistry>,
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn FeedParser>,
        fetch_timeout: Duration,
        owner_id: Option<u64>,
    ) -> Self {
        Self {
            supervisor,
            registry,
            fetcher,
            parser,
            fetch_timeout,
            owner_id,
        }
    }

    /// Authorize and run a command
    pub async fn dispatch(&self, ctx: CommandContext, command: Command) -> Reply {
        if let Some(owner) = self.owner_id
            && ctx.caller_id != owner
        {
            warn!("Rejected {:?} from non-owner {}", command, ctx.caller_id);
            return Reply::Denied;
        }

        match command {
            Command::Start => match self.supervisor.start().await {
                StartOutcome::Started => Reply::Ack,
                StartOutcome::AlreadyRunning => Reply::Notice("Already running!".to_string()),
            },
            Command::Stop => match self.supervisor.stop().await {
                StopOutcome::Stopped => Reply::Ack,
                StopOutcome::AlreadyStopped => Reply::Notice("Already stopped!".to_string()),
            },
            Command::New { destination, url } => {
                match self.register(destination, ctx.group_id, &url).await {
                    Ok(feed) => {
                        info!("Registered feed '{}' ({}) for destination {}", feed.name, feed.url, destination);
                        Reply::Ack
                    }
                    Err(e) => registration_reply(e),
                }
            }
            Command::Remove { destination } => match self.registry.remove(destination).await {
                Ok(()) => Reply::Ack,
                Err(e) => {
                    error!("Failed to remove feed for destination {}: {}", destination, e);
                    Reply::Notice("There was an error processing your request.".to_string())
                }
            },
        }
    }

    /// Fetch, parse, check, and store a new feed
    ///
    /// The feed's name is the document title at registration time.
    pub async fn register(
        &self,
        destination: DestinationId,
        group_id: GroupId,
        url: &str,
    ) -> Result<Feed> {
        let raw = self.fetcher.fetch(url, self.fetch_timeout).await?;
        let parsed = self.parser.parse(&raw)?;

        if !parsed.well_formed {
            return Err(Error::malformed_feed("document failed the well-formedness check"));
        }

        let feed = Feed::new(parsed.title, destination, group_id, url);
        self.registry.add(&feed).await?;
        Ok(feed)
    }
}

/// Map a registration failure to the message shown to the operator
fn registration_reply(error: Error) -> Reply {
    let message = match &error {
        Error::BadStatus(code) => format!("Error: Got status code {}!", code),
        Error::InvalidUrl(_) => "Error: Invalid URL!".to_string(),
        Error::Timeout => "Error: Connection timed out!".to_string(),
        Error::MalformedFeed(_) => "Feed is not well-formed.".to_string(),
        Error::DuplicateDestination { destination_id } => {
            format!("Error: destination {} already has a feed!", destination_id)
        }
        other => {
            error!("Feed registration failed: {}", other);
            "There was an error processing your request.".to_string()
        }
    };
    Reply::Notice(message)
}
