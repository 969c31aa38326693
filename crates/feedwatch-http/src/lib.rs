// # HTTP Collaborators
//
// This crate provides the network-facing collaborators for feedwatch:
//
// - `HttpFetcher`: retrieves feed documents (implements `Fetcher`)
// - `WebhookSink`: posts entries to per-destination webhooks
//   (implements `NotificationSink`)
//
// ## Constraints
//
// - One request per call. No retry, backoff, or caching; recovery is owned
//   by the Supervisor.
// - No background tasks.
// - Webhook URLs carry credentials and never appear in logs.

mod fetcher;
mod webhook;

pub use fetcher::HttpFetcher;
pub use webhook::WebhookSink;

/// User agent sent with every request
pub const USER_AGENT: &str = concat!("feedwatch/", env!("CARGO_PKG_VERSION"));
