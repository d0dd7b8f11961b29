//! # Event Bus System
//!
//! Decoupled notifications between the playback core and its host, built on
//! `tokio::sync::broadcast`.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ AuthManager  ├──────────────>│           │
//! └──────────────┘               │           │
//!                                │ EventBus  │     subscribe    ┌────────────┐
//! ┌──────────────┐     emit      │ (broadcast├─────────────────>│ Host UI    │
//! │PlaybackEngine├──────────────>│  channel) │                  └────────────┘
//! └──────────────┘               │           │
//! ┌──────────────┐     emit      │           │     subscribe    ┌────────────┐
//! │SwipeControl. ├──────────────>│           ├─────────────────>│ Analytics  │
//! └──────────────┘               └───────────┘                  └────────────┘
//! ```
//!
//! Queue snapshots for rendering are published separately through a
//! `watch` channel on the engine; the bus carries discrete happenings
//! (entry appended, swipe recorded, token refreshed, ...).
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, QueueEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Queue(QueueEvent::Cleared { removed: 4 }))
//!     .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Queue cleared");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events and can keep reading.
//! - **`RecvError::Closed`**: every sender is gone; treat as shutdown.
//!
//! `emit` fails only when nobody is subscribed. Producers ignore that case.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authorization and token negotiation
    Auth(AuthEvent),
    /// Queue membership changes and replenishment
    Queue(QueueEvent),
    /// Transport changes on the active entry
    Playback(PlaybackEvent),
    /// Resolved swipe decisions
    Swipe(SwipeEvent),
    /// Writes to the user's library or playlists
    Library(LibraryEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Queue(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Swipe(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Queue(QueueEvent::ReplenishFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Library(LibraryEvent::AddFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Playback(PlaybackEvent::SessionDegraded { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Swipe(_) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::TrackAdded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Steps of the music-service token negotiation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// Consent prompt requested.
    Authorizing,
    /// Consent granted and capabilities checked.
    Authorized {
        /// Whether the account has iCloud Music Library enabled.
        cloud_library_enabled: bool,
    },
    /// A fresh developer token was fetched from the token service and stored.
    DeveloperTokenRefreshed,
    /// Both tokens are available; catalog calls can start.
    SignedIn,
    /// Stored credentials were discarded.
    SignedOut,
    /// The workflow stopped at an unrecoverable step.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether retrying on next launch may succeed.
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::Authorizing => "Requesting music authorization",
            AuthEvent::Authorized { .. } => "Music authorization granted",
            AuthEvent::DeveloperTokenRefreshed => "Developer token refreshed",
            AuthEvent::SignedIn => "Music service tokens ready",
            AuthEvent::SignedOut => "Music service tokens cleared",
            AuthEvent::AuthError { .. } => "Authorization error",
        }
    }
}

// ============================================================================
// Queue Events
// ============================================================================

/// Why an entry left the queue head.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RemovalReason {
    /// Explicit skip (including every swipe).
    Skipped,
    /// The player reached the end of the preview.
    PlayedToEnd,
}

/// Queue membership changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum QueueEvent {
    /// An entry was appended at the tail.
    EntryAppended {
        entry_id: String,
        track_id: String,
        /// Queue length after the append.
        queue_len: usize,
    },
    /// The head entry was removed.
    EntryRemoved {
        entry_id: String,
        track_id: String,
        reason: RemovalReason,
    },
    /// Extended metadata arrived for an entry still in the queue.
    EntryEnriched { entry_id: String },
    /// All entries were dropped.
    Cleared {
        /// Number of entries removed.
        removed: usize,
    },
    /// A replenishment batch was requested.
    ReplenishStarted {
        /// Queue generation the batch will append to.
        generation: u64,
        queue_len: usize,
    },
    /// A replenishment batch finished.
    ReplenishCompleted { appended: usize },
    /// A replenishment batch failed; the queue keeps its current length.
    ReplenishFailed { message: String },
}

impl QueueEvent {
    fn description(&self) -> &str {
        match self {
            QueueEvent::EntryAppended { .. } => "Queue entry appended",
            QueueEvent::EntryRemoved { .. } => "Queue entry removed",
            QueueEvent::EntryEnriched { .. } => "Queue entry enriched",
            QueueEvent::Cleared { .. } => "Queue cleared",
            QueueEvent::ReplenishStarted { .. } => "Queue replenishment started",
            QueueEvent::ReplenishCompleted { .. } => "Queue replenishment completed",
            QueueEvent::ReplenishFailed { .. } => "Queue replenishment failed",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Transport changes on the player.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// Play requested.
    Started { entry_id: Option<String> },
    /// Pause requested.
    Paused { entry_id: Option<String> },
    /// The player's now-playing slot moved.
    Advanced { entry_id: Option<String> },
    /// The active entry was repositioned.
    Seeked { entry_id: String, position_ms: u64 },
    /// The audio session could not be configured; playback continues without
    /// mute-switch override.
    SessionDegraded { message: String },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Advanced { .. } => "Player advanced",
            PlaybackEvent::Seeked { .. } => "Playback position changed",
            PlaybackEvent::SessionDegraded { .. } => "Audio session degraded",
        }
    }
}

// ============================================================================
// Swipe & Library Events
// ============================================================================

/// Resolved swipe decisions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SwipeEvent {
    Recorded {
        track_id: String,
        was_added: bool,
        was_liked: bool,
        was_disliked: bool,
    },
}

impl SwipeEvent {
    fn description(&self) -> &str {
        match self {
            SwipeEvent::Recorded { .. } => "Swipe recorded",
        }
    }
}

/// Writes to the user's library.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    TrackAdded {
        track_id: String,
        /// `"library"` or the playlist id.
        destination: String,
    },
    AddFailed { track_id: String, message: String },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::TrackAdded { .. } => "Track added to library",
            LibraryEvent::AddFailed { .. } => "Library write failed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every clone publishes to the same
/// subscribers.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events buffered per subscriber before
    ///   it starts receiving `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` that skips events rejected by a predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let event_bus = EventBus::new(100);
/// let swipes = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Swipe(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv). `None` when nothing matching is buffered.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
