//! # Queue Entries
//!
//! A [`QueueEntry`] is one playable unit in the queue: the catalog track, its
//! resolved preview stream, enrichment data that may arrive later and live
//! telemetry published while the entry is the player's current item.
//!
//! Entries are cheap handles. The engine owns the authoritative ordered list;
//! callers get clones that stay readable after the entry leaves the queue but
//! stop receiving telemetry at that point.

use crate::engine::Command;
use crate::error::{PlaybackError, Result};
use bridge_traits::PlayerItemId;
use core_catalog::{ExtendedMetadata, Track};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Identity of a queue entry. Never reused.
///
/// The matching player item carries the same UUID, so player events map back
/// to entries without a lookup table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn player_item_id(&self) -> PlayerItemId {
        PlayerItemId::from_uuid(self.0)
    }

    pub fn from_player_item(item: PlayerItemId) -> Self {
        Self(*item.as_uuid())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Live playback state of an entry.
///
/// Only meaningful while `is_active` is true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTelemetry {
    pub is_active: bool,
    pub progress: Duration,
    pub duration: Option<Duration>,
    /// `None` until the player reports a definite transport state.
    pub is_playing: Option<bool>,
}

impl EntryTelemetry {
    pub fn progress_seconds(&self) -> f64 {
        self.progress.as_secs_f64()
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration.map(|d| d.as_secs_f64())
    }
}

/// Handle to one queue entry.
#[derive(Clone)]
pub struct QueueEntry {
    inner: Arc<EntryInner>,
}

struct EntryInner {
    id: EntryId,
    preview_locator: String,
    track: Track,
    extended: OnceLock<ExtendedMetadata>,
    telemetry: watch::Sender<EntryTelemetry>,
    /// Non-owning link back to the engine.
    engine: mpsc::WeakUnboundedSender<Command>,
    /// Cancelled when the entry leaves the queue.
    lifetime: CancellationToken,
}

impl QueueEntry {
    pub(crate) fn new(
        preview_locator: String,
        track: Track,
        engine: mpsc::WeakUnboundedSender<Command>,
        lifetime: CancellationToken,
    ) -> Self {
        let (telemetry, _) = watch::channel(EntryTelemetry::default());
        Self {
            inner: Arc::new(EntryInner {
                id: EntryId::new(),
                preview_locator,
                track,
                extended: OnceLock::new(),
                telemetry,
                engine,
                lifetime,
            }),
        }
    }

    pub fn id(&self) -> EntryId {
        self.inner.id
    }

    pub fn preview_locator(&self) -> &str {
        &self.inner.preview_locator
    }

    pub fn track(&self) -> &Track {
        &self.inner.track
    }

    /// Enrichment data, once it has arrived.
    pub fn extended_metadata(&self) -> Option<&ExtendedMetadata> {
        self.inner.extended.get()
    }

    pub fn telemetry(&self) -> watch::Receiver<EntryTelemetry> {
        self.inner.telemetry.subscribe()
    }

    pub fn snapshot(&self) -> EntryTelemetry {
        *self.inner.telemetry.borrow()
    }

    /// Whether the entry still belongs to the queue.
    pub fn is_queued(&self) -> bool {
        !self.inner.lifetime.is_cancelled()
    }

    /// Move the player head within this entry.
    ///
    /// # Errors
    ///
    /// - `EntryNotActive` unless this entry is the queue head
    /// - `InvalidSeek` for negative or non-finite positions
    /// - `EngineStopped` when the engine is gone
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        let engine = self
            .inner
            .engine
            .upgrade()
            .ok_or(PlaybackError::EngineStopped)?;
        let (reply, response) = oneshot::channel();
        engine
            .send(Command::Seek {
                entry_id: self.id(),
                seconds,
                reply,
            })
            .map_err(|_| PlaybackError::EngineStopped)?;
        response.await.map_err(|_| PlaybackError::EngineStopped)?
    }

    /// Attach enrichment data. Returns `false` if data was already attached.
    pub(crate) fn attach_metadata(&self, metadata: ExtendedMetadata) -> bool {
        self.inner.extended.set(metadata).is_ok()
    }

    pub(crate) fn update_telemetry(&self, update: impl FnOnce(&mut EntryTelemetry)) {
        self.inner.telemetry.send_modify(update);
    }

    pub(crate) fn lifetime(&self) -> CancellationToken {
        self.inner.lifetime.clone()
    }
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for QueueEntry {}

impl fmt::Debug for QueueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueEntry")
            .field("id", &self.inner.id)
            .field("track_id", &self.inner.track.id)
            .field("enriched", &self.inner.extended.get().is_some())
            .field("queued", &self.is_queued())
            .finish()
    }
}
