//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the playback core and the host
//! application. Each trait represents a capability the core needs but that is
//! implemented differently per platform (iOS, desktop, tests).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP used by the catalog client and token service
//!
//! ### Playback
//! - [`SequentialPlayer`](player::SequentialPlayer) - Native queue player the engine mirrors
//! - [`AudioSession`](player::AudioSession) - Background-safe audio session setup
//!
//! ### Authorization
//! - [`MusicAuthorizer`](auth::MusicAuthorizer) - Consent prompt and user-token exchange
//!
//! ### Storage
//! - [`SecureStore`](storage::SecureStore) - Developer token persistence (Keychain)
//! - [`SettingsStore`](storage::SettingsStore) - Listening context preferences
//! - [`HistoryStore`](history::HistoryStore) - Swipe history records
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ HTTP, settings, keyring, history |
//! | iOS      | Swift host          | 📋 Player, session, authorizer |
//!
//! ## Fail-Fast Strategy
//!
//! The core fails fast with descriptive errors when a required capability is
//! missing:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so implementations can be shared
//! across tasks behind `Arc<dyn Trait>`.

pub mod auth;
pub mod error;
pub mod history;
pub mod http;
pub mod player;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use auth::{AuthorizationStatus, MusicAuthorizer, MusicCapabilities};
pub use history::{HistoryFilter, HistoryStore, SwipeHistoryRecord};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use player::{
    AudioSession, NoopAudioSession, PlayerEvent, PlayerItem, PlayerItemId, SequentialPlayer,
    TransportStatus,
};
pub use storage::{SecureStore, SettingsStore};
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
