//! Swipe History Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    history::{HistoryFilter, HistoryStore, SwipeHistoryRecord},
};
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePool, sqlite::SqliteRow, Row};
use std::path::Path;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{connect_pool, memory_pool};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS swipe_history (
        id TEXT PRIMARY KEY,
        track_id TEXT NOT NULL,
        title TEXT NOT NULL,
        artist TEXT NOT NULL,
        album_cover_url TEXT,
        timestamp_ms INTEGER NOT NULL,
        was_added INTEGER NOT NULL,
        was_liked INTEGER NOT NULL,
        was_disliked INTEGER NOT NULL
    )
"#;

const INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_swipe_history_timestamp ON swipe_history (timestamp_ms DESC)";

/// SQLite-backed swipe history.
///
/// Timestamps are stored as Unix milliseconds so ordering is a plain
/// integer comparison.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    pub async fn new(db_path: &Path) -> Result<Self> {
        let pool = connect_pool(db_path).await?;
        let store = Self::from_pool(pool).await?;
        debug!(path = ?db_path, "Initialized history store");
        Ok(store)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::from_pool(memory_pool().await?).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        for statement in [SCHEMA, INDEX] {
            sqlx::query(statement)
                .execute(&pool)
                .await
                .map_err(|e| {
                    BridgeError::DatabaseError(format!("Failed to create history table: {}", e))
                })?;
        }
        Ok(Self { pool })
    }

    fn from_row(row: &SqliteRow) -> Result<SwipeHistoryRecord> {
        let id: String = row.get("id");
        let id = Uuid::parse_str(&id)
            .map_err(|e| BridgeError::DatabaseError(format!("Corrupt history id {}: {}", id, e)))?;

        let millis: i64 = row.get("timestamp_ms");
        let timestamp = DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
            BridgeError::DatabaseError(format!("Corrupt history timestamp {}", millis))
        })?;

        Ok(SwipeHistoryRecord {
            id,
            track_id: row.get("track_id"),
            title: row.get("title"),
            artist: row.get("artist"),
            album_cover_url: row.get("album_cover_url"),
            timestamp,
            was_added: row.get("was_added"),
            was_liked: row.get("was_liked"),
            was_disliked: row.get("was_disliked"),
        })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    #[instrument(skip(self, record), fields(track_id = %record.track_id))]
    async fn record(&self, record: SwipeHistoryRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO swipe_history
                (id, track_id, title, artist, album_cover_url, timestamp_ms,
                 was_added, was_liked, was_disliked)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.track_id)
        .bind(&record.title)
        .bind(&record.artist)
        .bind(&record.album_cover_url)
        .bind(record.timestamp.timestamp_millis())
        .bind(record.was_added)
        .bind(record.was_liked)
        .bind(record.was_disliked)
        .execute(&self.pool)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to record swipe: {}", e)))?;

        debug!("Recorded swipe");
        Ok(())
    }

    async fn list(&self, filter: HistoryFilter) -> Result<Vec<SwipeHistoryRecord>> {
        let sql = match filter {
            HistoryFilter::All => "SELECT * FROM swipe_history ORDER BY timestamp_ms DESC",
            HistoryFilter::Added => {
                "SELECT * FROM swipe_history WHERE was_added = 1 ORDER BY timestamp_ms DESC"
            }
            HistoryFilter::NotAdded => {
                "SELECT * FROM swipe_history WHERE was_added = 0 ORDER BY timestamp_ms DESC"
            }
        };

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to list history: {}", e)))?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM swipe_history WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to delete record: {}", e)))?;

        debug!(%id, "Deleted history record");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM swipe_history")
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::DatabaseError(format!("Failed to clear history: {}", e)))?;

        debug!("Cleared swipe history");
        Ok(())
    }
}
