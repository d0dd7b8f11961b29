//! Persisted listening context.
//!
//! The mode and destination survive restarts through the host
//! [`SettingsStore`]. Unknown or missing values fall back to
//! personal recommendations saved to the library.

use crate::error::{PlaybackError, Result};
use bridge_traits::SettingsStore;
use core_catalog::{Destination, RecommendationMode, SelectionContext};
use std::sync::Arc;
use tracing::{debug, warn};

pub const MODE_KEY: &str = "recommendationModeSelection";
pub const DESTINATION_KEY: &str = "destinationSelection";
pub const PLAYLIST_ID_KEY: &str = "destinationPlaylistId";
pub const PLAYLIST_NAME_KEY: &str = "destinationPlaylistName";

/// Reads and writes the [`SelectionContext`].
#[derive(Clone)]
pub struct ContextStore {
    settings: Arc<dyn SettingsStore>,
}

impl ContextStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Stored context, or the default when nothing usable is stored.
    ///
    /// Read failures are logged and treated as "nothing stored".
    pub async fn load(&self) -> SelectionContext {
        let mode = match self.read(MODE_KEY).await {
            Some(value) => RecommendationMode::from_setting_value(&value).unwrap_or_else(|| {
                warn!(value = %value, "Unknown recommendation mode stored, using default");
                RecommendationMode::default()
            }),
            None => RecommendationMode::default(),
        };

        let destination = match self.read(DESTINATION_KEY).await.as_deref() {
            Some("playlistMode") => match self.read(PLAYLIST_ID_KEY).await {
                Some(id) => {
                    let name = self.read(PLAYLIST_NAME_KEY).await.unwrap_or_default();
                    Destination::Playlist { id, name }
                }
                None => {
                    warn!("Playlist destination stored without a playlist id, using library");
                    Destination::Library
                }
            },
            _ => Destination::Library,
        };

        let context = SelectionContext::new(mode, destination);
        debug!(mode = %context.mode, destination = %context.destination, "Loaded listening context");
        context
    }

    pub async fn save(&self, context: &SelectionContext) -> Result<()> {
        self.write(MODE_KEY, context.mode.as_setting_value()).await?;
        self.write(DESTINATION_KEY, context.destination.as_setting_value())
            .await?;

        match &context.destination {
            Destination::Playlist { id, name } => {
                self.write(PLAYLIST_ID_KEY, id).await?;
                self.write(PLAYLIST_NAME_KEY, name).await?;
            }
            Destination::Library => {
                self.settings
                    .delete(PLAYLIST_ID_KEY)
                    .await
                    .map_err(PlaybackError::Settings)?;
                self.settings
                    .delete(PLAYLIST_NAME_KEY)
                    .await
                    .map_err(PlaybackError::Settings)?;
            }
        }
        Ok(())
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.settings.get_string(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(err) => {
                warn!(key, error = %err, "Failed to read setting");
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) -> Result<()> {
        self.settings
            .set_string(key, value)
            .await
            .map_err(PlaybackError::Settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemorySettings {
        values: Mutex<HashMap<String, String>>,
        broken: bool,
    }

    #[async_trait]
    impl SettingsStore for MemorySettings {
        async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
            if self.broken {
                return Err(BridgeError::DatabaseError("locked".into()));
            }
            Ok(self.values.lock().unwrap().get(key).cloned())
        }

        async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
            self.set_string(key, &value.to_string()).await
        }

        async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
            Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
        }

        async fn delete(&self, key: &str) -> BridgeResult<()> {
            self.values.lock().unwrap().remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn empty_store_yields_default_context() {
        let store = ContextStore::new(Arc::new(MemorySettings::default()));
        assert_eq!(store.load().await, SelectionContext::default());
    }

    #[tokio::test]
    async fn playlist_destination_roundtrips() {
        let settings = Arc::new(MemorySettings::default());
        let store = ContextStore::new(settings.clone());
        let context = SelectionContext::new(
            RecommendationMode::Public,
            Destination::playlist("p.42", "Fresh Finds"),
        );

        store.save(&context).await.unwrap();
        assert_eq!(store.load().await, context);
        assert_eq!(
            settings.values.lock().unwrap().get(DESTINATION_KEY).map(String::as_str),
            Some("playlistMode")
        );

        store.save(&SelectionContext::default()).await.unwrap();
        assert!(!settings.values.lock().unwrap().contains_key(PLAYLIST_ID_KEY));
    }

    #[tokio::test]
    async fn playlist_mode_without_id_falls_back_to_library() {
        let settings = Arc::new(MemorySettings::default());
        settings.set_string(DESTINATION_KEY, "playlistMode").await.unwrap();
        settings.set_string(MODE_KEY, "somethingElse").await.unwrap();

        let context = ContextStore::new(settings).load().await;
        assert_eq!(context, SelectionContext::default());
    }

    #[tokio::test]
    async fn read_failures_fall_back_to_default() {
        let settings = MemorySettings {
            broken: true,
            ..Default::default()
        };
        let context = ContextStore::new(Arc::new(settings)).load().await;
        assert_eq!(context, SelectionContext::default());
    }
}
