//! # Swipe Handling
//!
//! Turns a swipe decision on the active card into its side effects:
//!
//! | Action    | Library write | History (added, liked, disliked) |
//! |-----------|---------------|----------------------------------|
//! | `Like`    | yes           | (true, true, false)              |
//! | `Dislike` | no            | (false, false, true)             |
//! | `Pass`    | no            | (false, false, false)            |
//!
//! Every swipe then skips the entry. The library write runs in the
//! background and history write failures are logged, so neither can hold up
//! the next card.

use crate::engine::PlaybackEngine;
use crate::entry::QueueEntry;
use crate::error::Result;
use bridge_traits::{Clock, HistoryStore, SwipeHistoryRecord};
use core_catalog::{Destination, LibraryWriter};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent, SwipeEvent};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Cover size stored with history records.
const HISTORY_COVER_SIZE: u32 = 600;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwipeAction {
    Like,
    Dislike,
    /// Neutral dismissal.
    Pass,
}

impl SwipeAction {
    /// `(was_added, was_liked, was_disliked)`
    fn flags(&self) -> (bool, bool, bool) {
        match self {
            SwipeAction::Like => (true, true, false),
            SwipeAction::Dislike => (false, false, true),
            SwipeAction::Pass => (false, false, false),
        }
    }
}

/// Applies swipe decisions to the queue head.
pub struct SwipeController {
    engine: PlaybackEngine,
    writer: Arc<dyn LibraryWriter>,
    history: Arc<dyn HistoryStore>,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl SwipeController {
    pub fn new(
        engine: PlaybackEngine,
        writer: Arc<dyn LibraryWriter>,
        history: Arc<dyn HistoryStore>,
        events: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            engine,
            writer,
            history,
            events,
            clock,
        }
    }

    /// Resolve a swipe on the current queue head.
    ///
    /// Returns the history record written, or `None` when the queue was
    /// empty. An empty queue is still skipped so a stalled replenishment gets
    /// another chance.
    #[instrument(skip(self))]
    pub async fn swipe(&self, action: SwipeAction) -> Result<Option<SwipeHistoryRecord>> {
        let Some(entry) = self.engine.current().await? else {
            debug!("Swipe on an empty queue");
            self.engine.skip().await?;
            return Ok(None);
        };

        if action == SwipeAction::Like {
            let destination = self
                .engine
                .context()
                .await?
                .map(|context| context.destination)
                .unwrap_or_default();
            self.spawn_library_write(entry.track().id.clone(), destination);
        }

        let record = self.history_record(&entry, action);
        if let Err(err) = self.history.record(record.clone()).await {
            warn!(track_id = %record.track_id, error = %err, "Failed to record swipe history");
        }
        let _ = self.events.emit(CoreEvent::Swipe(SwipeEvent::Recorded {
            track_id: record.track_id.clone(),
            was_added: record.was_added,
            was_liked: record.was_liked,
            was_disliked: record.was_disliked,
        }));

        self.engine.skip_entry(entry.id()).await?;
        Ok(Some(record))
    }

    fn history_record(&self, entry: &QueueEntry, action: SwipeAction) -> SwipeHistoryRecord {
        let (was_added, was_liked, was_disliked) = action.flags();
        let track = entry.track();
        let album_cover_url = track.cover_url(HISTORY_COVER_SIZE).or_else(|| {
            entry
                .extended_metadata()
                .and_then(|m| m.artwork.as_ref())
                .map(|a| a.url(HISTORY_COVER_SIZE, HISTORY_COVER_SIZE, "jpg"))
        });

        SwipeHistoryRecord {
            id: Uuid::new_v4(),
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist_name.clone(),
            album_cover_url,
            timestamp: self.clock.now(),
            was_added,
            was_liked,
            was_disliked,
        }
    }

    fn spawn_library_write(&self, track_id: String, destination: Destination) {
        let writer = self.writer.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let event = match writer.add_to_destination(&track_id, &destination).await {
                Ok(()) => {
                    info!(track_id = %track_id, destination = %destination, "Liked track saved");
                    LibraryEvent::TrackAdded {
                        track_id,
                        destination: match destination {
                            Destination::Library => "library".to_string(),
                            Destination::Playlist { id, .. } => id,
                        },
                    }
                }
                Err(err) => {
                    warn!(track_id = %track_id, error = %err, "Failed to save liked track");
                    LibraryEvent::AddFailed {
                        track_id,
                        message: err.to_string(),
                    }
                }
            };
            let _ = events.emit(CoreEvent::Library(event));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_flags() {
        assert_eq!(SwipeAction::Like.flags(), (true, true, false));
        assert_eq!(SwipeAction::Dislike.flags(), (false, false, true));
        assert_eq!(SwipeAction::Pass.flags(), (false, false, false));
    }
}
