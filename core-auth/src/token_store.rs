//! Developer Token Storage
//!
//! Persists the catalog developer token in the platform secure store so the
//! token service is only contacted when the stored token stops working.
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{DeveloperToken, DeveloperTokenStore};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let store = DeveloperTokenStore::new(secure_store);
//!
//! store.store(&DeveloperToken::new("eyJ...")).await?;
//! let token = store.load().await?;
//! store.delete().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::DeveloperToken;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Secure store key under which the developer token lives.
pub const DEVELOPER_TOKEN_KEY: &str = "MUSICKIT_API_DEVTOKEN";

/// Secure storage for the developer token.
///
/// The value is stored as raw UTF-8. It is never logged.
#[derive(Clone)]
pub struct DeveloperTokenStore {
    secure_store: Arc<dyn SecureStore>,
}

impl DeveloperTokenStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self { secure_store }
    }

    /// Store the developer token, replacing any previous one.
    pub async fn store(&self, token: &DeveloperToken) -> Result<()> {
        self.secure_store
            .set_secret(DEVELOPER_TOKEN_KEY, token.expose().as_bytes())
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store developer token");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Developer token stored");
        Ok(())
    }

    /// Load the stored developer token
    ///
    /// # Returns
    ///
    /// - `Ok(Some(token))` when a usable token is stored
    /// - `Ok(None)` when nothing is stored, or the stored bytes were not
    ///   valid UTF-8 (the corrupted entry is removed)
    pub async fn load(&self) -> Result<Option<DeveloperToken>> {
        let data = self
            .secure_store
            .get_secret(DEVELOPER_TOKEN_KEY)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to read developer token");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        let Some(data) = data else {
            debug!("No developer token stored");
            return Ok(None);
        };

        match String::from_utf8(data) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(DeveloperToken::new(value.trim()))),
            Ok(_) => {
                debug!("Stored developer token is empty");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "Stored developer token is corrupted, removing it");
                if let Err(delete_err) = self.secure_store.delete_secret(DEVELOPER_TOKEN_KEY).await {
                    warn!(error = %delete_err, "Failed to delete corrupted developer token");
                }
                Ok(None)
            }
        }
    }

    /// Remove the stored token. Idempotent.
    pub async fn delete(&self) -> Result<()> {
        self.secure_store
            .delete_secret(DEVELOPER_TOKEN_KEY)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))?;

        info!("Developer token deleted");
        Ok(())
    }
}
