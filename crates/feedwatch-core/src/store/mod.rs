// # Store Implementations
//
// This module provides implementations of the FeedRegistry and DedupLedger
// traits for different persistence strategies. Each store implements both
// traits so a single handle can be shared by the poller and the command surface.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
