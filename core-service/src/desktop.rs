//! Desktop bootstrap on top of `bridge-desktop`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bridge_desktop::{
    KeyringSecureStore, ReqwestHttpClient, SqliteHistoryStore, SqliteSettingsStore,
};
use core_runtime::config::{CatalogConfig, CoreConfig, PlaybackConfig};
use tracing::info;

const SETTINGS_DB: &str = "settings.db";
const HISTORY_DB: &str = "history.db";

/// Build a [`CoreConfig`] from the desktop bridges, keeping both SQLite
/// databases under `data_dir`.
///
/// ```ignore
/// let data_dir = bridge_desktop::default_data_dir()?;
/// let config = core_service::desktop::desktop_config(&data_dir, catalog, Default::default()).await?;
/// ```
pub async fn desktop_config(
    data_dir: &Path,
    catalog: CatalogConfig,
    playback: PlaybackConfig,
) -> anyhow::Result<CoreConfig> {
    let http = ReqwestHttpClient::new().context("creating HTTP client")?;
    let settings = SqliteSettingsStore::new(&data_dir.join(SETTINGS_DB))
        .await
        .context("opening settings database")?;
    let history = SqliteHistoryStore::new(&data_dir.join(HISTORY_DB))
        .await
        .context("opening history database")?;

    let config = CoreConfig::builder()
        .http_client(Arc::new(http))
        .secure_store(Arc::new(KeyringSecureStore::new()))
        .settings_store(Arc::new(settings))
        .history_store(Arc::new(history))
        .catalog(catalog)
        .playback(playback)
        .build()
        .context("validating core configuration")?;

    info!(data_dir = ?data_dir, "Desktop bridges ready");
    Ok(config)
}
