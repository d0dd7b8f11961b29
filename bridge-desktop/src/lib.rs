//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux) and for integration tests.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest`
//! - `SecureStore` using the `keyring` crate
//! - `SettingsStore` using a SQLite-backed key-value table
//! - `HistoryStore` using a SQLite swipe-history table
//!
//! The player, audio session and authorizer have no desktop counterpart;
//! those stay with the host application.
//!
//! ## Feature Flags
//!
//! - `secure-store`: Enable OS keychain integration (default)
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteHistoryStore, SqliteSettingsStore};
//!
//! let data_dir = bridge_desktop::default_data_dir()?;
//! let http = ReqwestHttpClient::new()?;
//! let settings = SqliteSettingsStore::new(&data_dir.join("settings.db")).await?;
//! let history = SqliteHistoryStore::new(&data_dir.join("history.db")).await?;
//! ```

mod history;
mod http;
mod settings;

#[cfg(feature = "secure-store")]
mod secure_store;

pub use history::SqliteHistoryStore;
pub use http::ReqwestHttpClient;
pub use settings::SqliteSettingsStore;

#[cfg(feature = "secure-store")]
pub use secure_store::KeyringSecureStore;

use bridge_traits::error::{BridgeError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};

/// Per-user data directory for the desktop stores.
pub fn default_data_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|dir| dir.join("musicmate"))
        .ok_or_else(|| BridgeError::NotAvailable("No user data directory".to_string()))
}

pub(crate) async fn connect_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(BridgeError::Io)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true);

    SqlitePool::connect_with(options)
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))
}

/// Every connection to `sqlite::memory:` opens a fresh database, so the pool
/// is pinned to one connection.
pub(crate) async fn memory_pool() -> Result<SqlitePool> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .map_err(|e| BridgeError::DatabaseError(format!("Failed to connect to DB: {}", e)))
}
