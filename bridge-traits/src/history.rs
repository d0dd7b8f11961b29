//! Swipe history persistence.
//!
//! Every resolved swipe leaves one durable record. The store is the only
//! place those records live; the core writes them and the history screen
//! reads them back.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// One resolved swipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwipeHistoryRecord {
    pub id: Uuid,
    pub track_id: String,
    pub title: String,
    pub artist: String,
    pub album_cover_url: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub was_added: bool,
    pub was_liked: bool,
    pub was_disliked: bool,
}

/// Which records `HistoryStore::list` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryFilter {
    #[default]
    All,
    Added,
    NotAdded,
}

impl HistoryFilter {
    pub fn matches(&self, record: &SwipeHistoryRecord) -> bool {
        match self {
            HistoryFilter::All => true,
            HistoryFilter::Added => record.was_added,
            HistoryFilter::NotAdded => !record.was_added,
        }
    }
}

/// Durable store for swipe history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, record: SwipeHistoryRecord) -> Result<()>;

    /// Records matching `filter`, newest first.
    async fn list(&self, filter: HistoryFilter) -> Result<Vec<SwipeHistoryRecord>>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn clear(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(was_added: bool) -> SwipeHistoryRecord {
        SwipeHistoryRecord {
            id: Uuid::new_v4(),
            track_id: "1440857781".to_string(),
            title: "Song".to_string(),
            artist: "Artist".to_string(),
            album_cover_url: None,
            timestamp: Utc::now(),
            was_added,
            was_liked: was_added,
            was_disliked: false,
        }
    }

    #[test]
    fn test_history_filter_matches() {
        let added = record(true);
        let skipped = record(false);

        assert!(HistoryFilter::All.matches(&added));
        assert!(HistoryFilter::All.matches(&skipped));
        assert!(HistoryFilter::Added.matches(&added));
        assert!(!HistoryFilter::Added.matches(&skipped));
        assert!(HistoryFilter::NotAdded.matches(&skipped));
        assert!(!HistoryFilter::NotAdded.matches(&added));
    }
}
