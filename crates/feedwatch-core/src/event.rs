//! Events emitted by the poller and supervisor
//!
//! Events are best-effort: they travel over a bounded channel and are dropped
//! (with a warning) when the consumer falls behind. They never influence
//! delivery or dedup decisions.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

use crate::model::DestinationId;

/// Events emitted while watching feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// A poll execution was created
    ExecutionStarted {
        /// 0 for the first execution after `start()`, incremented per restart
        restart: u64,
    },

    /// A cycle began over `feeds_count` feeds
    CycleStarted { feeds_count: usize },

    /// An entry was posted and its ledger record written
    EntryDelivered {
        feed_name: String,
        destination_id: DestinationId,
        entry_id: String,
    },

    /// The sink rejected the destination; the entry stays unledgered
    DeliveryRejected {
        feed_name: String,
        destination_id: DestinationId,
        entry_id: String,
    },

    /// Every feed was processed
    CycleCompleted { feeds_count: usize, delivered: usize },

    /// An execution ended with an unhandled failure and will be replaced
    ExecutionFailed { error: String, restart: u64 },

    /// The execution observed cancellation and exited cleanly
    Stopped,
}

/// Cloneable handle for emitting [`WatchEvent`]s
#[derive(Debug, Clone)]
pub struct EventEmitter {
    tx: mpsc::Sender<WatchEvent>,
}

impl EventEmitter {
    /// Create an emitter and its receiving end
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<WatchEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Emit an event without waiting
    pub fn emit(&self, event: WatchEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event. Consider increasing event_channel_capacity.");
            }
            // Nobody is listening; events are optional.
            Err(TrySendError::Closed(_)) => {}
        }
    }
}
