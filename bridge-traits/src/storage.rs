//! Credential and Preference Storage
//!
//! Two small key-value traits: one backed by the platform keychain for the
//! catalog developer token, one backed by plain preferences for the listening
//! context (recommendation mode and liked-song destination).

use async_trait::async_trait;

use crate::error::Result;

/// Secure credential storage trait
///
/// Abstracts secure storage mechanisms:
/// - macOS/iOS: Keychain
/// - Windows: Credential Manager
/// - Linux: Secret Service
///
/// Implementations must never log stored values.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SecureStore;
///
/// async fn remember(store: &dyn SecureStore, token: &str) -> Result<()> {
///     store.set_secret("MUSICKIT_API_DEVTOKEN", token.as_bytes()).await
/// }
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Store a secret value, replacing any previous value under `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Retrieve a secret value
    ///
    /// # Returns
    ///
    /// Returns `Ok(None)` if the key doesn't exist.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a secret. Deleting a missing key is not an error.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

/// Key-value settings storage trait
///
/// - iOS: UserDefaults
/// - Desktop: SQLite-backed preferences table
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn save_mode(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("recommendationModeSelection", "\"personal\"").await
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    async fn set_bool(&self, key: &str, value: bool) -> Result<()>;

    async fn get_bool(&self, key: &str) -> Result<Option<bool>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get_string(key).await?.is_some())
    }
}
