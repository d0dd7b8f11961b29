//! Music service authorization bridge.
//!
//! The host platform owns the user-facing consent prompt and the exchange of a
//! developer token for a per-user music token. Both are exposed here as plain
//! async calls so the core can run the negotiation as a linear workflow.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Outcome of the platform consent prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationStatus {
    Authorized,
    Denied,
    Restricted,
    NotDetermined,
}

/// What the signed-in account is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MusicCapabilities {
    pub can_play_catalog_content: bool,
    pub has_cloud_library_enabled: bool,
}

/// Platform music authorization.
#[async_trait]
pub trait MusicAuthorizer: Send + Sync {
    /// Show (or reuse) the consent prompt.
    async fn request_authorization(&self) -> Result<AuthorizationStatus>;

    /// Query the capabilities of the current account.
    async fn capabilities(&self) -> Result<MusicCapabilities>;

    /// Exchange a developer token for a user token.
    ///
    /// Fails when the developer token is expired or revoked.
    async fn request_user_token(&self, developer_token: &str) -> Result<String>;
}
