//! Seams between the playback engine and the catalog service.
//!
//! The engine only ever sees these traits. [`CatalogClient`](crate::CatalogClient)
//! implements all of them over HTTP; tests substitute scripted fakes.

use crate::context::{Destination, SelectionContext};
use crate::error::Result;
use crate::models::{ExtendedMetadata, Track};
use async_trait::async_trait;
use core_auth::AuthManager;

/// Supplies candidate tracks for the queue.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Next batch of candidates for `context`. May be empty.
    ///
    /// Library filtering is left to the service; callers do not re-filter.
    async fn fetch_next_tracks(&self, context: &SelectionContext) -> Result<Vec<Track>>;

    /// Playable preview for `track`. `None` means the track is skipped.
    async fn resolve_preview_locator(&self, track: &Track) -> Option<String> {
        track.preview_urls.first().cloned()
    }
}

/// Fetches extended album metadata for a track.
#[async_trait]
pub trait MetadataEnricher: Send + Sync {
    async fn fetch_album_metadata(&self, track_id: &str) -> Result<ExtendedMetadata>;
}

/// Writes liked tracks to the user's library or a playlist.
#[async_trait]
pub trait LibraryWriter: Send + Sync {
    async fn add_to_destination(&self, track_id: &str, destination: &Destination) -> Result<()>;
}

/// Tokens attached to every catalog request.
#[derive(Clone)]
pub struct CatalogTokens {
    pub developer_token: String,
    pub user_token: String,
}

impl std::fmt::Debug for CatalogTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogTokens")
            .field("developer_token", &"***")
            .field("user_token", &"***")
            .finish()
    }
}

/// Source of request credentials.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn tokens(&self) -> Result<CatalogTokens>;
}

#[async_trait]
impl TokenProvider for AuthManager {
    async fn tokens(&self) -> Result<CatalogTokens> {
        let credentials = self.credentials().await?;
        Ok(CatalogTokens {
            developer_token: credentials.developer_token.expose().to_string(),
            user_token: credentials.user_token.expose().to_string(),
        })
    }
}

/// Fixed tokens, for hosts that negotiate credentials themselves.
pub struct StaticTokens(pub CatalogTokens);

#[async_trait]
impl TokenProvider for StaticTokens {
    async fn tokens(&self) -> Result<CatalogTokens> {
        Ok(self.0.clone())
    }
}
