//! Sequential player bridge trait and supporting types.
//!
//! The host owns a native queue player (AVQueuePlayer on iOS) that plays an
//! ordered list of remote items back to back. The core drives it through
//! [`SequentialPlayer`] and listens to [`PlayerEvent`]s to keep its own queue
//! and per-item telemetry in step with the native one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::Result;

/// Identifier of one item in the native player's list.
///
/// The core mints these; the host only echoes them back in events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerItemId(Uuid);

impl PlayerItemId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlayerItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PlayerItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A streamable item handed to the native player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerItem {
    pub id: PlayerItemId,
    /// Remote URI of the audio asset.
    pub locator: String,
}

impl PlayerItem {
    pub fn new(id: PlayerItemId, locator: impl Into<String>) -> Self {
        Self {
            id,
            locator: locator.into(),
        }
    }
}

/// Raw transport state as reported by the native player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportStatus {
    Paused,
    /// Play was requested but the player is buffering or stalled.
    WaitingToPlay,
    Playing,
}

impl TransportStatus {
    /// Collapse to the simple playing flag shown in the UI.
    ///
    /// `WaitingToPlay` carries no information about intent, so it maps to `None`
    /// and callers keep their last known value.
    pub fn as_playing_flag(&self) -> Option<bool> {
        match self {
            TransportStatus::Playing => Some(true),
            TransportStatus::Paused => Some(false),
            TransportStatus::WaitingToPlay => None,
        }
    }
}

/// Notifications pushed by the native player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The "now playing" slot changed. `None` once the list runs dry.
    CurrentItemChanged(Option<PlayerItemId>),
    /// Transport state of the player changed.
    TransportChanged(TransportStatus),
    /// The item reached its natural end. The player advances on its own
    /// right after this.
    PlayedToEnd(PlayerItemId),
}

/// Native sequential player.
///
/// Mutating calls must be applied in the order they are issued. The core
/// guarantees it is the only caller.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::player::{PlayerItem, PlayerItemId, SequentialPlayer};
///
/// async fn enqueue(player: &dyn SequentialPlayer, url: &str) -> Result<PlayerItemId> {
///     let id = PlayerItemId::new();
///     player.insert_after_tail(PlayerItem::new(id, url)).await?;
///     Ok(id)
/// }
/// ```
#[async_trait]
pub trait SequentialPlayer: Send + Sync {
    /// Insert `item` right after the last item currently in the list.
    async fn insert_after_tail(&self, item: PlayerItem) -> Result<()>;

    /// Drop the current item and move to the next one, if any.
    async fn advance_to_next_item(&self) -> Result<()>;

    /// Remove every item from the list.
    async fn remove_all_items(&self) -> Result<()>;

    async fn play(&self) -> Result<()>;

    async fn pause(&self) -> Result<()>;

    /// Move the playback head of the current item.
    async fn seek(&self, position: Duration) -> Result<()>;

    /// Item ids in playback order, current item first.
    fn items(&self) -> Vec<PlayerItemId>;

    fn current_item(&self) -> Option<PlayerItemId>;

    /// Playback position inside the current item.
    fn current_time(&self) -> Duration;

    /// Duration of the current item, once the asset has loaded.
    fn current_duration(&self) -> Option<Duration>;

    fn transport_status(&self) -> TransportStatus;

    /// Subscribe to player notifications. Each receiver sees every event sent
    /// after it subscribed.
    fn subscribe(&self) -> broadcast::Receiver<PlayerEvent>;
}

/// Host audio session.
#[async_trait]
pub trait AudioSession: Send + Sync {
    /// Switch the session to background-capable playback that ignores the
    /// hardware mute switch.
    async fn activate_for_playback(&self) -> Result<()>;
}

/// Session that does nothing, for hosts without a session concept.
#[derive(Debug, Clone, Default)]
pub struct NoopAudioSession;

#[async_trait]
impl AudioSession for NoopAudioSession {
    async fn activate_for_playback(&self) -> Result<()> {
        Ok(())
    }
}
