// # feedwatchd - Feed Notification Daemon
//
// A thin integration layer: everything about polling, dedup and supervision
// lives in feedwatch-core. This binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring the store, fetcher, parser and webhook sink into a watcher
// 4. Serving operator commands from stdin until a shutdown signal
//
// ## Configuration
//
// ### Storage
// - `FEEDWATCH_DATABASE`: SQLite database path (default: feedwatch.db)
//
// ### Polling
// - `FEEDWATCH_POLL_INTERVAL`: Seconds between poll cycles (default: 300)
// - `FEEDWATCH_FETCH_TIMEOUT`: Per-request fetch timeout in seconds (default: 60)
// - `FEEDWATCH_RESTART_DELAY`: Seconds before a failed poll execution is replaced (default: 5)
// - `FEEDWATCH_AUTOSTART`: Start polling at launch (default: true)
//
// ### Delivery
// - `FEEDWATCH_WEBHOOKS`: Comma-separated `destination=webhook_url` pairs
//
// ### Commands
// - `FEEDWATCH_OWNER_ID`: Operator id allowed to run commands
//
// ### Single-feed mode
// - `FEEDWATCH_DEFAULT_DESTINATION`: Destination for the startup feed
// - `FEEDWATCH_FEED_URL`: Feed registered at startup if the destination is free
//
// ### Logging
// - `FEEDWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export FEEDWATCH_DATABASE=/var/lib/feedwatch/feedwatch.db
// export FEEDWATCH_WEBHOOKS=1234=https://discord.com/api/webhooks/1234/token
// export FEEDWATCH_DEFAULT_DESTINATION=1234
// export FEEDWATCH_FEED_URL=https://blog.example.com/rss
//
// feedwatchd
// ```

mod config;

use anyhow::{Context, Result};
use config::Config;
use feedwatch_core::model::GroupId;
use feedwatch_core::traits::FeedRegistry;
use feedwatch_core::{
    Command, CommandContext, FeedWatch, SqliteStore, WatchBuilder, WatchEvent,
};
use feedwatch_http::{HttpFetcher, WebhookSink};
use feedwatch_syndication::SyndicationParser;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::{LinesStream, ReceiverStream};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long runtime shutdown waits for blocking work
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum FeedwatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<FeedwatchExitCode> for ExitCode {
    fn from(code: FeedwatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return FeedwatchExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return FeedwatchExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FeedwatchExitCode::ConfigError.into();
    }

    info!("Starting feedwatchd");
    info!(
        "Configuration loaded: database {}, {} webhook(s)",
        config.database_path,
        config.webhooks.len()
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FeedwatchExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => FeedwatchExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                FeedwatchExitCode::RuntimeError
            }
        }
    });

    // A pending stdin read occupies a blocking thread that never finishes.
    rt.shutdown_timeout(SHUTDOWN_GRACE);

    code.into()
}

/// Run the daemon until a shutdown signal arrives
async fn run_daemon(config: Config) -> Result<()> {
    let store = Arc::new(
        SqliteStore::open(&config.database_path)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_path))?,
    );

    if config.webhooks.is_empty() {
        warn!("No webhooks configured; every delivery will be rejected");
    }

    let watch_config = config.watch_config();
    let (watch, events) = WatchBuilder::new(watch_config.clone())
        .fetcher(Arc::new(HttpFetcher::new()?))
        .parser(Arc::new(SyndicationParser::new()))
        .sink(Arc::new(WebhookSink::new(config.webhooks.clone())?))
        .store(Arc::clone(&store))
        .build()?;
    let watch = Arc::new(watch);

    let event_logger = tokio::spawn(log_events(ReceiverStream::new(events)));

    // The local operator acts as the owner.
    let operator = CommandContext {
        caller_id: config.owner_id.unwrap_or_default(),
        group_id: GroupId::default(),
    };

    if let Some((destination, url)) = watch_config.legacy_feed()
        && store.find_by_destination(destination).await?.is_none()
    {
        info!("Registering startup feed {} for destination {}", url, destination);
        let command = Command::New {
            destination,
            url: url.to_string(),
        };
        let reply = watch.commands().dispatch(operator, command).await;
        info!("Startup feed registration: {}", reply);
    }

    if config.autostart {
        let reply = watch.commands().dispatch(operator, Command::Start).await;
        debug!("Autostart: {}", reply);
    }

    let console = tokio::spawn(serve_console(Arc::clone(&watch), operator));

    let signal = wait_for_shutdown().await?;
    info!("Received shutdown signal: {}", signal);
    info!("Shutting down daemon");

    console.abort();
    watch.supervisor().stop().await;
    store.close().await;
    event_logger.abort();

    Ok(())
}

/// Log watcher events until the channel closes
async fn log_events(mut events: ReceiverStream<WatchEvent>) {
    while let Some(event) = events.next().await {
        match event {
            WatchEvent::ExecutionStarted { restart: 0 } => info!("Poll execution started"),
            WatchEvent::ExecutionStarted { restart } => {
                info!("Poll execution started (restart #{})", restart)
            }
            WatchEvent::CycleStarted { feeds_count } => debug!("Polling {} feed(s)", feeds_count),
            WatchEvent::EntryDelivered {
                feed_name,
                destination_id,
                entry_id,
            } => info!("Delivered '{}' from '{}' to {}", entry_id, feed_name, destination_id),
            WatchEvent::DeliveryRejected {
                feed_name,
                destination_id,
                entry_id,
            } => warn!(
                "Destination {} rejected '{}' from '{}'",
                destination_id, entry_id, feed_name
            ),
            WatchEvent::CycleCompleted {
                feeds_count,
                delivered,
            } => debug!("Cycle over {} feed(s) delivered {}", feeds_count, delivered),
            WatchEvent::ExecutionFailed { error, restart } => {
                warn!("Poll execution failed ({}), restart #{} scheduled", error, restart)
            }
            WatchEvent::Stopped => info!("Poll execution stopped"),
        }
    }
}

/// Read operator commands from stdin and print the replies
async fn serve_console(watch: Arc<FeedWatch>, operator: CommandContext) {
    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to read from stdin: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        match Command::parse(&line) {
            Ok(command) => println!("{}", watch.commands().dispatch(operator, command).await),
            Err(e) => println!("{}", e),
        }
    }

    debug!("Console input closed");
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
