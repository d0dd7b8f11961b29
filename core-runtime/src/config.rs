//! # Core Configuration Module
//!
//! Builder-based configuration for the playback core.
//!
//! ## Overview
//!
//! `CoreConfig` carries every host bridge the core needs plus the catalog
//! service settings. The builder fails fast: a missing bridge is reported as
//! [`Error::CapabilityMissing`] with a hint on how to provide it, and invalid
//! catalog settings are reported as [`Error::Config`].
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - catalog, token service and library writes
//! - `SecureStore` - developer token persistence
//! - `SettingsStore` - listening context (mode and destination)
//! - `HistoryStore` - swipe history
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::{CatalogConfig, CoreConfig};
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .http_client(Arc::new(ReqwestHttpClient::new()))
//!     .secure_store(Arc::new(KeyringSecureStore::new()))
//!     .settings_store(Arc::new(settings))
//!     .history_store(Arc::new(history))
//!     .catalog(CatalogConfig::new().with_storefront("us"))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HistoryStore, HttpClient, SecureStore, SettingsStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default public catalog API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.music.apple.com";
/// Default web-player API, used for extended album metadata.
pub const DEFAULT_AMP_BASE_URL: &str = "https://amp-api.music.apple.com";
/// Origin the web-player API expects.
pub const DEFAULT_WEB_ORIGIN: &str = "https://music.apple.com";
/// Default developer-token service.
pub const DEFAULT_TOKEN_SERVICE_URL: &str = "https://api.musicmate.schnettler.dev/token";
/// Tracks requested per replenishment batch.
pub const DEFAULT_BATCH_LIMIT: u32 = 10;
/// Queue length below which the engine tops the queue up.
pub const DEFAULT_LOW_WATER_MARK: usize = 3;

/// Core configuration.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    pub http_client: Arc<dyn HttpClient>,

    /// Secure credential storage
    pub secure_store: Arc<dyn SecureStore>,

    /// Listening context preferences
    pub settings_store: Arc<dyn SettingsStore>,

    pub history_store: Arc<dyn HistoryStore>,

    /// Catalog service endpoints and station settings
    pub catalog: CatalogConfig,

    pub playback: PlaybackConfig,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("history_store", &"HistoryStore { ... }")
            .field("catalog", &self.catalog)
            .field("playback", &self.playback)
            .finish()
    }
}

/// Catalog service configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub api_base_url: String,
    pub amp_base_url: String,
    /// Sent as `Origin` on web-player API requests.
    pub web_origin: String,
    /// Two-letter storefront. Looked up from the account when `None`.
    pub storefront: Option<String>,
    pub token_service_url: String,
    /// Value of the `Authorization` header sent to the token service.
    pub token_service_api_key: Option<String>,
    /// Station used in public discovery mode.
    pub public_station_id: Option<String>,
    pub batch_limit: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            amp_base_url: DEFAULT_AMP_BASE_URL.to_string(),
            web_origin: DEFAULT_WEB_ORIGIN.to_string(),
            storefront: None,
            token_service_url: DEFAULT_TOKEN_SERVICE_URL.to_string(),
            token_service_api_key: None,
            public_station_id: None,
            batch_limit: DEFAULT_BATCH_LIMIT,
        }
    }
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("api_base_url", &self.api_base_url)
            .field("amp_base_url", &self.amp_base_url)
            .field("storefront", &self.storefront)
            .field("token_service_url", &self.token_service_url)
            .field(
                "token_service_api_key",
                &self.token_service_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_station_id", &self.public_station_id)
            .field("batch_limit", &self.batch_limit)
            .finish()
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_amp_base_url(mut self, url: impl Into<String>) -> Self {
        self.amp_base_url = url.into();
        self
    }

    pub fn with_storefront(mut self, storefront: impl Into<String>) -> Self {
        self.storefront = Some(storefront.into());
        self
    }

    pub fn with_token_service(mut self, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.token_service_url = url.into();
        self.token_service_api_key = Some(api_key.into());
        self
    }

    pub fn with_public_station_id(mut self, station_id: impl Into<String>) -> Self {
        self.public_station_id = Some(station_id.into());
        self
    }

    pub fn with_batch_limit(mut self, limit: u32) -> Self {
        self.batch_limit = limit;
        self
    }

    /// Validates the catalog configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if:
    /// - a base URL is not http(s)
    /// - the storefront is not a two-letter code
    /// - the batch limit is outside 1..=100
    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("amp_base_url", &self.amp_base_url),
            ("token_service_url", &self.token_service_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got '{}'",
                    name, url
                )));
            }
        }

        if let Some(storefront) = &self.storefront {
            if storefront.len() != 2 || !storefront.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(Error::Config(format!(
                    "Storefront must be a two-letter country code, got '{}'",
                    storefront
                )));
            }
        }

        if self.batch_limit == 0 || self.batch_limit > 100 {
            return Err(Error::Config(
                "Batch limit must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }
}

/// Queue engine tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Replenishment starts when the queue holds fewer entries than this.
    ///
    /// Default: 3.
    #[serde(default = "default_low_water_mark")]
    pub low_water_mark: usize,

    /// How often the active entry samples player position.
    ///
    /// Default: 500 ms.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: Duration,

    /// Maximum time a caller waits for the engine to answer a command.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            low_water_mark: default_low_water_mark(),
            progress_interval: default_progress_interval(),
            command_timeout: default_command_timeout(),
        }
    }
}

fn default_low_water_mark() -> usize {
    DEFAULT_LOW_WATER_MARK
}

fn default_progress_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_command_timeout() -> Duration {
    Duration::from_secs(10)
}

impl PlaybackConfig {
    pub fn with_low_water_mark(mut self, mark: usize) -> Self {
        self.low_water_mark = mark;
        self
    }

    pub fn with_progress_interval(mut self, interval: Duration) -> Self {
        self.progress_interval = interval;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// # Errors
    ///
    /// Returns `Error::Config` if the low-water mark, the progress interval or
    /// the command timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.low_water_mark == 0 {
            return Err(Error::Config(
                "Low-water mark must be at least 1".to_string(),
            ));
        }
        if self.progress_interval.is_zero() {
            return Err(Error::Config(
                "Progress interval must be non-zero".to_string(),
            ));
        }
        if self.command_timeout.is_zero() {
            return Err(Error::Config("Command timeout must be non-zero".to_string()));
        }
        Ok(())
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

fn capability_missing(capability: &str, message: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: message.to_string(),
    }
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    history_store: Option<Arc<dyn HistoryStore>>,
    catalog: CatalogConfig,
    playback: PlaybackConfig,
}

impl CoreConfigBuilder {
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history_store = Some(store);
        self
    }

    pub fn catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// - `CapabilityMissing` when a required bridge was not provided
    /// - `Config` when the catalog or playback settings are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let http_client = self.http_client.ok_or_else(|| {
            capability_missing(
                "HttpClient",
                "HttpClient implementation is required for catalog requests. \
                 Desktop: use bridge_desktop::ReqwestHttpClient. \
                 iOS: inject a URLSession-backed adapter.",
            )
        })?;
        let secure_store = self.secure_store.ok_or_else(|| {
            capability_missing(
                "SecureStore",
                "SecureStore implementation is required for developer token persistence. \
                 Desktop: use bridge_desktop::KeyringSecureStore. iOS: inject a Keychain adapter.",
            )
        })?;
        let settings_store = self.settings_store.ok_or_else(|| {
            capability_missing(
                "SettingsStore",
                "SettingsStore implementation is required to persist the listening context. \
                 Desktop: use bridge_desktop::SqliteSettingsStore. iOS: inject a UserDefaults adapter.",
            )
        })?;
        let history_store = self.history_store.ok_or_else(|| {
            capability_missing(
                "HistoryStore",
                "HistoryStore implementation is required to record swipes. \
                 Desktop: use bridge_desktop::SqliteHistoryStore.",
            )
        })?;

        self.catalog.validate()?;
        self.playback.validate()?;

        Ok(CoreConfig {
            http_client,
            secure_store,
            settings_store,
            history_store,
            catalog: self.catalog,
            playback: self.playback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{HistoryFilter, HttpRequest, HttpResponse, SwipeHistoryRecord};
    use uuid::Uuid;

    struct StubHttp;

    #[async_trait]
    impl HttpClient for StubHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            unimplemented!()
        }
    }

    struct StubSecure;

    #[async_trait]
    impl SecureStore for StubSecure {
        async fn set_secret(&self, _key: &str, _value: &[u8]) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_secret(&self, _key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(None)
        }

        async fn delete_secret(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct StubSettings;

    #[async_trait]
    impl SettingsStore for StubSettings {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }

        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }

        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }

        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    struct StubHistory;

    #[async_trait]
    impl HistoryStore for StubHistory {
        async fn record(&self, _record: SwipeHistoryRecord) -> BridgeResult<()> {
            Ok(())
        }

        async fn list(&self, _filter: HistoryFilter) -> BridgeResult<Vec<SwipeHistoryRecord>> {
            Ok(Vec::new())
        }

        async fn delete(&self, _id: Uuid) -> BridgeResult<()> {
            Ok(())
        }

        async fn clear(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        CoreConfig::builder()
            .http_client(Arc::new(StubHttp))
            .secure_store(Arc::new(StubSecure))
            .settings_store(Arc::new(StubSettings))
            .history_store(Arc::new(StubHistory))
    }

    #[test]
    fn test_builder_with_all_required_bridges() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.catalog.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.catalog.batch_limit, DEFAULT_BATCH_LIMIT);
    }

    #[test]
    fn test_builder_requires_http_client() {
        let result = CoreConfig::builder()
            .secure_store(Arc::new(StubSecure))
            .settings_store(Arc::new(StubSettings))
            .history_store(Arc::new(StubHistory))
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "HttpClient")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_builder_requires_history_store() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(StubHttp))
            .secure_store(Arc::new(StubSecure))
            .settings_store(Arc::new(StubSettings))
            .build();

        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { ref capability, .. }) if capability == "HistoryStore"
        ));
    }

    #[test]
    fn test_catalog_validation() {
        assert!(CatalogConfig::new().validate().is_ok());
        assert!(CatalogConfig::new().with_storefront("us").validate().is_ok());
        assert!(CatalogConfig::new().with_storefront("usa").validate().is_err());
        assert!(CatalogConfig::new().with_batch_limit(0).validate().is_err());
        assert!(CatalogConfig::new()
            .with_api_base_url("ftp://example.com")
            .validate()
            .is_err());

        let result = complete_builder()
            .catalog(CatalogConfig::new().with_batch_limit(500))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_playback_defaults_and_validation() {
        let playback = PlaybackConfig::default();
        assert_eq!(playback.low_water_mark, DEFAULT_LOW_WATER_MARK);
        assert_eq!(playback.progress_interval, Duration::from_millis(500));
        assert!(playback.validate().is_ok());

        assert!(PlaybackConfig::default()
            .with_low_water_mark(0)
            .validate()
            .is_err());

        let result = complete_builder()
            .playback(PlaybackConfig::default().with_progress_interval(Duration::ZERO))
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_debug_redacts_token_service_key() {
        let catalog = CatalogConfig::new().with_token_service("https://token.example", "s3cret");
        let rendered = format!("{:?}", catalog);
        assert!(!rendered.contains("s3cret"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
