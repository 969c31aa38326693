// # SQLite Store
//
// Relational implementation of FeedRegistry and DedupLedger.
//
// ## Schema
//
// ```sql
// feeds(name, destination_id UNIQUE, group_id, url)
// entries(feed_name, destination_id, entry_id, updated_marker)
//   PRIMARY KEY (feed_name, destination_id, entry_id)
// ```
//
// ## Transactions
//
// Every operation is a single statement run on a pooled connection and
// committed immediately. Nothing spans an await point owned by the caller,
// so registration commands and a running poll cycle never block each other
// for longer than one statement.
//
// ## Crash Behavior
//
// A notification and its ledger write are not atomic. A crash between the
// two redelivers the entry on the next successful cycle.

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::model::{DestinationId, Feed, GroupId, SeenEntry};
use crate::traits::{DedupLedger, FeedRegistry};
use crate::{Error, Result};

/// Schema statements, applied idempotently on open
const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS feeds (
        name TEXT NOT NULL,
        destination_id INTEGER NOT NULL UNIQUE,
        group_id INTEGER NOT NULL,
        url TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS entries (
        feed_name TEXT NOT NULL,
        destination_id INTEGER NOT NULL,
        entry_id TEXT NOT NULL,
        updated_marker TEXT NOT NULL,
        PRIMARY KEY (feed_name, destination_id, entry_id)
    )",
];

/// Busy timeout applied to every pooled connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Row type for the `feeds` table
#[derive(Debug, Clone, sqlx::FromRow)]
struct FeedRow {
    name: String,
    destination_id: i64,
    group_id: i64,
    url: String,
}

impl From<FeedRow> for Feed {
    fn from(row: FeedRow) -> Self {
        Feed {
            name: row.name,
            destination_id: DestinationId(row.destination_id as u64),
            group_id: GroupId(row.group_id as u64),
            url: row.url,
        }
    }
}

/// Row type for a ledger snapshot
#[derive(Debug, Clone, sqlx::FromRow)]
struct SeenRow {
    entry_id: String,
    updated_marker: String,
}

/// SQLite-backed feed registry and dedup ledger
///
/// # Example
///
/// ```rust,no_run
/// use feedwatch_core::store::SqliteStore;
/// use feedwatch_core::traits::DedupLedger;
/// use feedwatch_core::model::DestinationId;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteStore::open("/var/lib/feedwatch/feedwatch.db").await?;
///
///     store.mark_seen("Daily", DestinationId(9), "e1", "t0").await?;
///     let seen = store.records_for("Daily", DestinationId(9)).await?;
///     assert_eq!(seen.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a database file and apply the schema
    ///
    /// Parent directories are created if needed.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        tracing::info!("Opened feed database at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Open a private in-memory database
    ///
    /// The pool is pinned to a single connection that never expires, since
    /// every SQLite in-memory connection is its own database.
    pub async fn open_in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        tracing::debug!("Opened in-memory feed database");
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, applying the schema
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Total number of ledger records across all feeds
    pub async fn ledger_len(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl FeedRegistry for SqliteStore {
    async fn add(&self, feed: &Feed) -> Result<()> {
        let result = sqlx::query(
            "INSERT INTO feeds (name, destination_id, group_id, url) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&feed.name)
        .bind(feed.destination_id.0 as i64)
        .bind(feed.group_id.0 as i64)
        .bind(&feed.url)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                tracing::debug!(
                    "Registered feed '{}' for destination {}",
                    feed.name,
                    feed.destination_id
                );
                Ok(())
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(Error::duplicate_destination(feed.destination_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, destination_id: DestinationId) -> Result<()> {
        let result = sqlx::query("DELETE FROM feeds WHERE destination_id = ?1")
            .bind(destination_id.0 as i64)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Removed {} feed(s) for destination {}",
            result.rows_affected(),
            destination_id
        );
        Ok(())
    }

    async fn find_by_destination(&self, destination_id: DestinationId) -> Result<Option<Feed>> {
        let row = sqlx::query_as::<_, FeedRow>(
            "SELECT name, destination_id, group_id, url FROM feeds WHERE destination_id = ?1",
        )
        .bind(destination_id.0 as i64)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Feed::from))
    }

    async fn list_all(&self) -> Result<Vec<Feed>> {
        let rows = sqlx::query_as::<_, FeedRow>(
            "SELECT name, destination_id, group_id, url FROM feeds ORDER BY rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Feed::from).collect())
    }
}

#[async_trait]
impl DedupLedger for SqliteStore {
    async fn records_for(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
    ) -> Result<Vec<SeenEntry>> {
        let rows = sqlx::query_as::<_, SeenRow>(
            "SELECT entry_id, updated_marker FROM entries
             WHERE feed_name = ?1 AND destination_id = ?2",
        )
        .bind(feed_name)
        .bind(destination_id.0 as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| SeenEntry::new(row.entry_id, row.updated_marker))
            .collect())
    }

    async fn mark_seen(
        &self,
        feed_name: &str,
        destination_id: DestinationId,
        entry_id: &str,
        updated_marker: &str,
    ) -> Result<()> {
        sqlx::query(
            "INSERT INTO entries (feed_name, destination_id, entry_id, updated_marker)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (feed_name, destination_id, entry_id)
             DO UPDATE SET updated_marker = excluded.updated_marker",
        )
        .bind(feed_name)
        .bind(destination_id.0 as i64)
        .bind(entry_id)
        .bind(updated_marker)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn daily() -> Feed {
        Feed::new("Daily", DestinationId(9), GroupId(1), "https://example.com/daily.xml")
    }

    #[tokio::test]
    async fn test_sqlite_registry_basic() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        assert!(store.list_all().await.unwrap().is_empty());

        store.add(&daily()).await.unwrap();

        let found = store.find_by_destination(DestinationId(9)).await.unwrap();
        assert_eq!(found, Some(daily()));
        assert_eq!(store.list_all().await.unwrap(), vec![daily()]);

        store.remove(DestinationId(9)).await.unwrap();
        assert!(store.find_by_destination(DestinationId(9)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_duplicate_destination_rejected() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.add(&daily()).await.unwrap();

        let other = Feed::new("Weekly", DestinationId(9), GroupId(2), "https://example.com/weekly.xml");
        let err = store.add(&other).await.unwrap_err();
        assert!(matches!(
            err,
            Error::DuplicateDestination { destination_id } if destination_id == DestinationId(9)
        ));

        // First registration is untouched
        let found = store.find_by_destination(DestinationId(9)).await.unwrap();
        assert_eq!(found, Some(daily()));
    }

    #[tokio::test]
    async fn test_sqlite_remove_is_idempotent() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        store.remove(DestinationId(404)).await.unwrap();
        store.remove(DestinationId(404)).await.unwrap();
    }

    #[tokio::test]
    async fn test_sqlite_list_preserves_registration_order() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        for id in [30u64, 10, 20] {
            let feed = Feed::new(format!("feed-{}", id), DestinationId(id), GroupId(1), "https://example.com");
            store.add(&feed).await.unwrap();
        }

        let order: Vec<u64> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.destination_id.0)
            .collect();
        assert_eq!(order, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_sqlite_mark_seen_upserts() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store.mark_seen("Daily", DestinationId(9), "e1", "t0").await.unwrap();
        store.mark_seen("Daily", DestinationId(9), "e2", "t1").await.unwrap();
        store.mark_seen("Daily", DestinationId(9), "e2", "t2").await.unwrap();

        let mut seen = store.records_for("Daily", DestinationId(9)).await.unwrap();
        seen.sort();
        assert_eq!(
            seen,
            vec![SeenEntry::new("e1", "t0"), SeenEntry::new("e2", "t2")]
        );
        assert_eq!(store.ledger_len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_sqlite_ledger_is_scoped_by_destination() {
        let store = SqliteStore::open_in_memory().await.unwrap();

        store.mark_seen("Daily", DestinationId(9), "e1", "t0").await.unwrap();
        store.mark_seen("Daily", DestinationId(10), "e1", "t5").await.unwrap();

        let nine = store.records_for("Daily", DestinationId(9)).await.unwrap();
        let ten = store.records_for("Daily", DestinationId(10)).await.unwrap();
        assert_eq!(nine, vec![SeenEntry::new("e1", "t0")]);
        assert_eq!(ten, vec![SeenEntry::new("e1", "t5")]);
    }

    #[tokio::test]
    async fn test_sqlite_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("feedwatch.db");

        {
            let store = SqliteStore::open(&path).await.unwrap();
            store.add(&daily()).await.unwrap();
            store.mark_seen("Daily", DestinationId(9), "e1", "t0").await.unwrap();
            store.close().await;
        }

        assert!(path.exists());

        let reopened = SqliteStore::open(&path).await.unwrap();
        assert_eq!(reopened.list_all().await.unwrap(), vec![daily()]);
        assert_eq!(
            reopened.records_for("Daily", DestinationId(9)).await.unwrap(),
            vec![SeenEntry::new("e1", "t0")]
        );
    }

    #[tokio::test]
    async fn test_sqlite_large_destination_ids_round_trip() {
        let store = SqliteStore::open_in_memory().await.unwrap();
        let id = DestinationId(1_234_567_890_123_456_789);
        let feed = Feed::new("Snowflake", id, GroupId(987_654_321_987_654_321), "https://example.com");

        store.add(&feed).await.unwrap();
        assert_eq!(store.find_by_destination(id).await.unwrap(), Some(feed));
    }
}
