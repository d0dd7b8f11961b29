//! # Authentication Manager
//!
//! Runs the music-service token negotiation as one linear async workflow:
//!
//! 1. request authorization from the host
//! 2. check the account can play catalog content
//! 3. load the stored developer token (fetch one if none is stored)
//! 4. exchange it for a user token; on failure fetch a fresh developer token,
//!    store it and retry the exchange once
//!
//! Each step either yields the input for the next one or stops the workflow
//! with a typed [`AuthError`]. A failed run leaves the manager in
//! [`AuthState::Failed`]; the host retries on next launch by calling
//! [`AuthManager::authenticate`] again.
//!
//! ## Usage
//!
//! ```ignore
//! use core_auth::AuthManager;
//!
//! let manager = AuthManager::new(authorizer, secure_store, token_service, event_bus);
//! let credentials = manager.authenticate().await?;
//! ```

use crate::error::{AuthError, Result};
use crate::token_service::TokenServiceClient;
use crate::token_store::DeveloperTokenStore;
use crate::types::{AuthState, Credentials, DeveloperToken, UserToken};
use bridge_traits::{AuthorizationStatus, MusicAuthorizer, MusicCapabilities, SecureStore};
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

/// Orchestrates authorization and token negotiation.
pub struct AuthManager {
    authorizer: Arc<dyn MusicAuthorizer>,
    token_store: DeveloperTokenStore,
    token_service: TokenServiceClient,
    event_bus: EventBus,
    state: RwLock<AuthState>,
    credentials: RwLock<Option<Credentials>>,
    /// Serializes concurrent `authenticate` calls.
    workflow_lock: Mutex<()>,
}

impl AuthManager {
    pub fn new(
        authorizer: Arc<dyn MusicAuthorizer>,
        secure_store: Arc<dyn SecureStore>,
        token_service: TokenServiceClient,
        event_bus: EventBus,
    ) -> Self {
        Self {
            authorizer,
            token_store: DeveloperTokenStore::new(secure_store),
            token_service,
            event_bus,
            state: RwLock::new(AuthState::Unauthenticated),
            credentials: RwLock::new(None),
            workflow_lock: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> AuthState {
        *self.state.read().await
    }

    /// Credentials from the last successful run.
    pub async fn credentials(&self) -> Result<Credentials> {
        self.credentials
            .read()
            .await
            .clone()
            .ok_or(AuthError::NotAuthenticated)
    }

    /// Run the negotiation workflow.
    ///
    /// Returns cached credentials when a previous run already succeeded.
    ///
    /// # Errors
    ///
    /// - `AuthorizationDenied` when consent was not granted
    /// - `CatalogPlaybackUnavailable` when the account has no catalog playback
    /// - `TokenServiceFailed` / `TokenServiceUnreachable` when a fresh developer
    ///   token was needed but could not be fetched
    /// - `UserTokenRejected` when the exchange failed even with a fresh token
    #[instrument(skip(self))]
    pub async fn authenticate(&self) -> Result<Credentials> {
        let _guard = self.workflow_lock.lock().await;

        if let Some(credentials) = self.credentials.read().await.clone() {
            debug!("Reusing negotiated credentials");
            return Ok(credentials);
        }

        *self.state.write().await = AuthState::Authorizing;
        self.emit(AuthEvent::Authorizing);

        match self.run_workflow().await {
            Ok(credentials) => {
                *self.credentials.write().await = Some(credentials.clone());
                *self.state.write().await = AuthState::SignedIn;
                self.emit(AuthEvent::SignedIn);
                info!(
                    cloud_library = credentials.capabilities.has_cloud_library_enabled,
                    "Music service tokens ready"
                );
                Ok(credentials)
            }
            Err(err) => {
                *self.state.write().await = AuthState::Failed;
                warn!(error = %err, recoverable = err.is_recoverable(), "Authorization workflow stopped");
                self.emit(AuthEvent::AuthError {
                    message: err.to_string(),
                    recoverable: err.is_recoverable(),
                });
                Err(err)
            }
        }
    }

    /// Discard stored and in-memory credentials.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<()> {
        let _guard = self.workflow_lock.lock().await;

        self.token_store.delete().await?;
        *self.credentials.write().await = None;
        *self.state.write().await = AuthState::Unauthenticated;
        self.emit(AuthEvent::SignedOut);
        info!("Signed out of music service");
        Ok(())
    }

    async fn run_workflow(&self) -> Result<Credentials> {
        self.authorize().await?;
        let capabilities = self.check_capabilities().await?;
        let developer_token = self.load_or_fetch_developer_token().await?;
        let (developer_token, user_token) = self.exchange_user_token(developer_token).await?;

        Ok(Credentials {
            developer_token,
            user_token,
            capabilities,
        })
    }

    async fn authorize(&self) -> Result<()> {
        let status = self.authorizer.request_authorization().await?;
        if status != AuthorizationStatus::Authorized {
            return Err(AuthError::AuthorizationDenied(status));
        }
        debug!("Music authorization granted");
        Ok(())
    }

    async fn check_capabilities(&self) -> Result<MusicCapabilities> {
        let capabilities = self.authorizer.capabilities().await?;
        if !capabilities.can_play_catalog_content {
            return Err(AuthError::CatalogPlaybackUnavailable);
        }
        self.emit(AuthEvent::Authorized {
            cloud_library_enabled: capabilities.has_cloud_library_enabled,
        });
        Ok(capabilities)
    }

    async fn load_or_fetch_developer_token(&self) -> Result<DeveloperToken> {
        if let Some(token) = self.token_store.load().await? {
            return Ok(token);
        }
        debug!("No stored developer token, fetching one");
        self.refresh_developer_token().await
    }

    async fn refresh_developer_token(&self) -> Result<DeveloperToken> {
        let token = self.token_service.fetch_developer_token().await?;
        self.token_store.store(&token).await?;
        self.emit(AuthEvent::DeveloperTokenRefreshed);
        Ok(token)
    }

    /// Exchange, and on failure retry exactly once with a fresh developer token.
    async fn exchange_user_token(
        &self,
        developer_token: DeveloperToken,
    ) -> Result<(DeveloperToken, UserToken)> {
        match self
            .authorizer
            .request_user_token(developer_token.expose())
            .await
        {
            Ok(user_token) => return Ok((developer_token, UserToken::new(user_token))),
            Err(e) => {
                warn!(error = %e, "User token request failed, refreshing developer token");
            }
        }

        let fresh = self.refresh_developer_token().await?;
        let user_token = self
            .authorizer
            .request_user_token(fresh.expose())
            .await
            .map_err(|e| AuthError::UserTokenRejected(e.to_string()))?;

        Ok((fresh, UserToken::new(user_token)))
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.event_bus.emit(CoreEvent::Auth(event));
    }
}
