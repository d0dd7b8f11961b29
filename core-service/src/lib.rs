//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations into the playback
//! core. A host builds a [`CoreConfig`] (HTTP, secure storage, settings,
//! history), adds the platform pieces that only it can provide (player,
//! audio session, authorizer, clock) and gets back one [`CoreService`].
//!
//! Desktop apps and tests typically enable the `desktop-shims` feature,
//! which provides [`desktop::desktop_config`] on top of `bridge-desktop`.
//!
//! ```ignore
//! use core_service::{CoreService, HostBridges};
//!
//! let core = CoreService::new(config, HostBridges::new(player, authorizer));
//! core.start().await?;
//! core.engine().play().await?;
//! core.swipe(SwipeAction::Like).await?;
//! ```

pub mod error;

#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub mod desktop;

pub use error::{Result, ServiceError};

pub use core_runtime::config::{CatalogConfig, CoreConfig, PlaybackConfig};
pub use core_runtime::events::{CoreEvent, EventBus, Receiver};

use std::sync::Arc;

use bridge_traits::{
    AudioSession, Clock, HistoryFilter, HistoryStore, MusicAuthorizer, NoopAudioSession,
    SequentialPlayer, SwipeHistoryRecord, SystemClock,
};
use core_auth::{AuthManager, AuthState, TokenServiceClient};
use core_catalog::{CatalogClient, Destination, Playlist, RecommendationMode, TokenProvider};
use core_playback::{ContextStore, PlaybackEngine, SwipeAction, SwipeController};
use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Platform pieces that only the host application can provide.
pub struct HostBridges {
    pub player: Arc<dyn SequentialPlayer>,
    pub session: Arc<dyn AudioSession>,
    pub authorizer: Arc<dyn MusicAuthorizer>,
    pub clock: Arc<dyn Clock>,
}

impl HostBridges {
    /// Bridges with a no-op audio session and the system clock.
    pub fn new(player: Arc<dyn SequentialPlayer>, authorizer: Arc<dyn MusicAuthorizer>) -> Self {
        Self {
            player,
            session: Arc::new(NoopAudioSession),
            authorizer,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_session(mut self, session: Arc<dyn AudioSession>) -> Self {
        self.session = session;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Primary façade exposed to host applications.
///
/// Cloning is cheap; every clone drives the same engine.
#[derive(Clone)]
pub struct CoreService {
    events: EventBus,
    auth: Arc<AuthManager>,
    catalog: Arc<CatalogClient>,
    engine: PlaybackEngine,
    swipes: Arc<SwipeController>,
    history: Arc<dyn HistoryStore>,
}

impl CoreService {
    /// Wire the core together and start the engine task.
    ///
    /// Must be called from within a Tokio runtime. Nothing talks to the
    /// network until [`start`](Self::start).
    pub fn new(config: CoreConfig, host: HostBridges) -> Self {
        let events = EventBus::new(DEFAULT_EVENT_BUFFER_SIZE);

        let token_service = TokenServiceClient::new(
            Arc::clone(&config.http_client),
            config.catalog.token_service_url.clone(),
            config.catalog.token_service_api_key.clone(),
        );
        let auth = Arc::new(AuthManager::new(
            host.authorizer,
            Arc::clone(&config.secure_store),
            token_service,
            events.clone(),
        ));

        let tokens: Arc<dyn TokenProvider> = auth.clone();
        let catalog = Arc::new(CatalogClient::new(
            Arc::clone(&config.http_client),
            tokens,
            config.catalog.clone(),
        ));

        let engine = PlaybackEngine::new(
            host.player,
            host.session,
            catalog.clone(),
            catalog.clone(),
            ContextStore::new(Arc::clone(&config.settings_store)),
            events.clone(),
            config.playback.clone(),
        );

        let swipes = Arc::new(SwipeController::new(
            engine.clone(),
            catalog.clone(),
            Arc::clone(&config.history_store),
            events.clone(),
            host.clock,
        ));

        Self {
            events,
            auth,
            catalog,
            engine,
            swipes,
            history: config.history_store,
        }
    }

    /// Negotiate music-service tokens, then initialize the engine, which
    /// loads the listening context and fills the queue.
    ///
    /// # Errors
    ///
    /// Returns `Auth` when the token workflow stops; the engine stays idle
    /// and `start` may be called again.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        self.auth.authenticate().await?;
        self.engine.initialize().await?;
        info!("Core service started");
        Ok(())
    }

    pub async fn auth_state(&self) -> AuthState {
        self.auth.state().await
    }

    /// Forget the negotiated credentials and empty the queue.
    ///
    /// Credentials go first so the refill that follows the clear cannot
    /// reach the catalog.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await?;
        if let Err(err) = self.engine.clear_queue().await {
            warn!(error = %err, "Could not clear queue after sign-out");
        }
        Ok(())
    }

    /// Stop the engine. The service is unusable afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        self.engine.shutdown().await?;
        Ok(())
    }

    pub fn engine(&self) -> &PlaybackEngine {
        &self.engine
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    // ========================================================================
    // Swipes and context
    // ========================================================================

    /// Resolve a swipe on the current track. `None` when the queue was empty.
    pub async fn swipe(&self, action: SwipeAction) -> Result<Option<SwipeHistoryRecord>> {
        Ok(self.swipes.swipe(action).await?)
    }

    pub async fn set_recommendation_mode(&self, mode: RecommendationMode) -> Result<()> {
        Ok(self.engine.set_recommendation_mode(mode).await?)
    }

    pub async fn set_destination(&self, destination: Destination) -> Result<()> {
        Ok(self.engine.set_destination(destination).await?)
    }

    /// Playlists the user can pick as a destination.
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        Ok(self.catalog.list_playlists().await?)
    }

    // ========================================================================
    // History
    // ========================================================================

    /// Swipe history, newest first.
    pub async fn history(&self, filter: HistoryFilter) -> Result<Vec<SwipeHistoryRecord>> {
        self.history
            .list(filter)
            .await
            .map_err(ServiceError::History)
    }

    pub async fn delete_history_record(&self, id: Uuid) -> Result<()> {
        self.history.delete(id).await.map_err(ServiceError::History)
    }

    pub async fn clear_history(&self) -> Result<()> {
        self.history.clear().await.map_err(ServiceError::History)
    }
}
