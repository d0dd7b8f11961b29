//! # Playback Queue Engine
//!
//! Keeps a lazily replenished queue of preview tracks in lock-step with the
//! host's sequential player.
//!
//! ## Overview
//!
//! - [`PlaybackEngine`] owns the queue and the player, drives replenishment
//!   from a [`TrackSource`](core_catalog::TrackSource) and exposes transport
//!   controls plus a [`QueueSnapshot`] watch channel.
//! - [`QueueEntry`] is one playable unit with enrichment data that may arrive
//!   later and live [`EntryTelemetry`] while it is the active item.
//! - [`ContextStore`] persists the listening context (mode and destination).
//! - [`SwipeController`] applies swipe decisions: library writes, history
//!   records and the skip.
//!
//! ## Usage
//!
//! ```ignore
//! use core_playback::{ContextStore, PlaybackEngine, SwipeAction, SwipeController};
//!
//! let engine = PlaybackEngine::new(
//!     player,
//!     session,
//!     catalog.clone(),
//!     catalog.clone(),
//!     ContextStore::new(settings),
//!     event_bus.clone(),
//!     PlaybackConfig::default(),
//! );
//! engine.initialize().await?;
//! engine.play().await?;
//!
//! let swipes = SwipeController::new(engine.clone(), catalog, history, event_bus, clock);
//! swipes.swipe(SwipeAction::Like).await?;
//! ```

pub mod context;
pub mod engine;
pub mod entry;
pub mod error;
pub mod swipe;
mod telemetry;

pub use context::ContextStore;
pub use core_runtime::config::PlaybackConfig;
pub use engine::{PlaybackEngine, QueueSnapshot};
pub use entry::{EntryId, EntryTelemetry, QueueEntry};
pub use error::{PlaybackError, Result};
pub use swipe::{SwipeAction, SwipeController};
