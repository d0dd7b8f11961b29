//! # Playback Error Types

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Errors returned by the queue engine and the swipe controller.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Engine Lifecycle
    // ========================================================================
    /// The engine task has exited; the handle is no longer usable.
    #[error("Playback engine is not running")]
    EngineStopped,

    /// The engine did not answer within the configured command timeout.
    #[error("Playback engine did not respond in time")]
    Timeout,

    // ========================================================================
    // Queue Errors
    // ========================================================================
    /// Seek requested for an entry that is not the queue head.
    #[error("Entry {0} is not the active entry")]
    EntryNotActive(String),

    #[error("Invalid seek position: {0}")]
    InvalidSeek(String),

    /// An append from a replenishment started before the last clear.
    #[error("Append belongs to a cleared queue generation")]
    StaleGeneration,

    // ========================================================================
    // Bridge Errors
    // ========================================================================
    /// The host player rejected a command.
    #[error("Player command failed: {0}")]
    Player(#[source] BridgeError),

    /// Reading or writing the listening context failed.
    #[error("Settings store failed: {0}")]
    Settings(#[source] BridgeError),
}

impl PlaybackError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, PlaybackError::Timeout | PlaybackError::Player(_))
    }
}

pub type Result<T> = std::result::Result<T, PlaybackError>;
