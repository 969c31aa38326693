//! Poll execution supervisor
//!
//! The Supervisor owns the single active poll execution. All lifecycle
//! transitions go through its methods:
//!
//! ```text
//!            start()                 failure
//! Stopped ───────────▶ Running ─────────────▶ Restarting
//!    ▲                   │  ▲                     │
//!    │      stop()       │  └─────────────────────┘
//!    └───────────────────┘      new execution
//! ```
//!
//! ## Rules
//! - At most one poll execution is alive at any time
//! - `start()` while running reports [`StartOutcome::AlreadyRunning`]
//! - `stop()` while stopped reports [`StopOutcome::AlreadyStopped`]
//! - An execution that ends with [`Completion::Cancelled`] is a clean stop
//! - An execution that ends with [`Completion::Failed`] (or panics) is logged,
//!   counted in [`SupervisorStatus`], emitted as [`WatchEvent::ExecutionFailed`],
//!   and replaced by a fresh execution after the restart delay

use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::Error;
use crate::event::{EventEmitter, WatchEvent};
use crate::poller::{Completion, Poller};

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Stopped,
    Running,
}

/// Result of [`Supervisor::start`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Result of [`Supervisor::stop`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    AlreadyStopped,
}

/// Snapshot of supervisor health
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorStatus {
    pub state: SupervisorState,
    /// Executions replaced after a failure since this supervisor was created
    pub restarts: u64,
    /// The failure that triggered the most recent restart
    pub last_failure: Option<String>,
}

/// Owned handle of the live execution
enum Execution {
    Stopped,
    Running {
        cancel: CancellationToken,
        handle: JoinHandle<()>,
    },
}

/// Failure bookkeeping shared with the supervision task
#[derive(Debug, Default)]
struct Health {
    restarts: AtomicU64,
    last_failure: StdMutex<Option<String>>,
}

impl Health {
    fn record_failure(&self, error: &Error) {
        *self
            .last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(error.to_string());
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn last_failure(&self) -> Option<String> {
        self.last_failure
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Owner of the single poll execution
pub struct Supervisor {
    poller: Arc<Poller>,

    /// Pause before a failed execution is replaced
    restart_delay: Duration,

    events: EventEmitter,

    execution: Mutex<Execution>,

    health: Arc<Health>,
}

impl Supervisor {
    /// Create a stopped supervisor
    pub fn new(poller: Arc<Poller>, restart_delay: Duration, events: EventEmitter) -> Self {
        Self {
            poller,
            restart_delay,
            events,
            execution: Mutex::new(Execution::Stopped),
            health: Arc::new(Health::default()),
        }
    }

    /// Begin polling
    ///
    /// Creates a new execution unless one is already alive.
    pub async fn start(&self) -> StartOutcome {
        let mut execution = self.execution.lock().await;

        if let Execution::Running { handle, .. } = &*execution
            && !handle.is_finished()
        {
            return StartOutcome::AlreadyRunning;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(supervise(
            Arc::clone(&self.poller),
            cancel.clone(),
            self.restart_delay,
            self.events.clone(),
            Arc::clone(&self.health),
        ));

        *execution = Execution::Running { cancel, handle };
        info!("Polling started");
        StartOutcome::Started
    }

    /// Cancel polling
    ///
    /// Returns once the execution has observed cancellation at its next
    /// suspension point. Notifications already sent and ledger writes
    /// already committed stay committed.
    pub async fn stop(&self) -> StopOutcome {
        let mut execution = self.execution.lock().await;

        match std::mem::replace(&mut *execution, Execution::Stopped) {
            Execution::Stopped => StopOutcome::AlreadyStopped,
            Execution::Running { cancel, handle } => {
                cancel.cancel();
                // The lock is held until the execution is gone so that a
                // concurrent start() cannot overlap with it.
                if let Err(e) = handle.await {
                    error!("Supervision task ended abnormally: {}", e);
                }
                info!("Polling stopped");
                StopOutcome::Stopped
            }
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> SupervisorState {
        match &*self.execution.lock().await {
            Execution::Running { handle, .. } if !handle.is_finished() => SupervisorState::Running,
            _ => SupervisorState::Stopped,
        }
    }

    /// Current state plus failure history
    pub async fn status(&self) -> SupervisorStatus {
        SupervisorStatus {
            state: self.state().await,
            restarts: self.health.restarts.load(Ordering::SeqCst),
            last_failure: self.health.last_failure(),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Execution::Running { cancel, .. } = self.execution.get_mut() {
            cancel.cancel();
        }
    }
}

/// Completion observer: runs one execution at a time and replaces it on failure
async fn supervise(
    poller: Arc<Poller>,
    cancel: CancellationToken,
    restart_delay: Duration,
    events: EventEmitter,
    health: Arc<Health>,
) {
    let mut restart = 0;

    loop {
        events.emit(WatchEvent::ExecutionStarted { restart });

        let execution = tokio::spawn({
            let poller = Arc::clone(&poller);
            let cancel = cancel.clone();
            async move { poller.run(&cancel).await }
        });

        let completion = match execution.await {
            Ok(completion) => completion,
            Err(e) => Completion::Failed(Error::Other(format!("Poll execution aborted: {}", e))),
        };

        match completion {
            Completion::Cancelled => {
                info!("Stopped polling");
                events.emit(WatchEvent::Stopped);
                return;
            }
            Completion::Failed(e) => {
                restart += 1;
                health.record_failure(&e);
                error!("Poll execution failed: {}. Restarting (restart #{})", e, restart);
                events.emit(WatchEvent::ExecutionFailed {
                    error: e.to_string(),
                    restart,
                });
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Stopped polling");
                events.emit(WatchEvent::Stopped);
                return;
            }
            _ = tokio::time::sleep(restart_delay) => {}
        }
    }
}
