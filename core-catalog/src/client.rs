//! Catalog Service Client
//!
//! HTTP implementation of [`TrackSource`], [`MetadataEnricher`] and
//! [`LibraryWriter`] on top of the host [`HttpClient`].
//!
//! ## API Endpoints
//!
//! - **Recommendations**: `GET {api}/v1/me/recommendations/`
//! - **Next tracks**: `POST {api}/v1/me/stations/next-tracks/{station}?limit={n}&include=albums&extend=editorialVideo`
//! - **Album metadata**: `GET {amp}/v1/catalog/{storefront}/songs/{id}/albums?extend=...`
//! - **Library add**: `POST {api}/v1/me/library?ids[songs]={id}`
//! - **Playlist add**: `POST {api}/v1/me/library/playlists/{id}/tracks`
//! - **Playlists**: `GET {api}/v1/me/library/playlists`
//! - **Storefront**: `GET {api}/v1/me/storefront`
//!
//! Every request carries the developer token as a bearer token and the user
//! token as `Music-User-Token`. The web-player API used for album metadata
//! also expects `Origin` set to the web player and the user token under
//! `Media-User-Token`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_catalog::CatalogClient;
//!
//! let client = CatalogClient::new(http_client, auth_manager, config.catalog.clone());
//! let tracks = client.fetch_next_tracks(&context).await?;
//! ```

use crate::context::{Destination, RecommendationMode, SelectionContext};
use crate::dto::{
    collect_station_ids, AlbumResource, DataResponse, PlaylistResource, SongResource,
    StorefrontResource,
};
use crate::error::{CatalogError, Result};
use crate::models::{ExtendedMetadata, Playlist, Track};
use crate::source::{CatalogTokens, LibraryWriter, MetadataEnricher, TokenProvider, TrackSource};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
use core_runtime::config::CatalogConfig;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

/// Personal discovery stations follow this id shape.
const PERSONAL_STATION_PATTERN: &str = r"^ra\.q-GAI6I[a-zA-Z0-9]{22}xYWJiNzBmZjc1N2FhOTVm$";

const ALBUM_EXTENSIONS: &str = "editorialArtwork,editorialVideo,extendedAssetUrls,offers";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Catalog service client.
pub struct CatalogClient {
    http: Arc<dyn HttpClient>,
    tokens: Arc<dyn TokenProvider>,
    config: CatalogConfig,
    personal_station: OnceCell<String>,
    storefront: OnceCell<String>,
}

impl CatalogClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        tokens: Arc<dyn TokenProvider>,
        config: CatalogConfig,
    ) -> Self {
        let storefront = match &config.storefront {
            Some(code) => OnceCell::new_with(Some(code.to_lowercase())),
            None => OnceCell::new(),
        };
        Self {
            http,
            tokens,
            config,
            personal_station: OnceCell::new(),
            storefront,
        }
    }

    /// Station id the queue should be filled from in `mode`.
    ///
    /// The personal station is discovered once and cached for the session.
    pub async fn station_for(&self, mode: RecommendationMode) -> Result<String> {
        match mode {
            RecommendationMode::Personal => self
                .personal_station
                .get_or_try_init(|| self.discover_personal_station())
                .await
                .cloned(),
            RecommendationMode::Public => self
                .config
                .public_station_id
                .clone()
                .ok_or(CatalogError::NoPublicStation),
        }
    }

    /// Account storefront, from configuration or the service.
    pub async fn storefront(&self) -> Result<String> {
        self.storefront
            .get_or_try_init(|| self.fetch_storefront())
            .await
            .cloned()
    }

    /// Playlists in the user's library, for the destination picker.
    #[instrument(skip(self))]
    pub async fn list_playlists(&self) -> Result<Vec<Playlist>> {
        let tokens = self.tokens.tokens().await?;
        let url = format!("{}/v1/me/library/playlists", self.config.api_base_url);
        let response = self.send(self.api_request(HttpRequest::get(url), &tokens)).await?;
        let playlists: DataResponse<PlaylistResource> = decode(&response)?;
        let playlists: Vec<Playlist> = playlists.data.into_iter().map(Playlist::from).collect();
        debug!(count = playlists.len(), "Fetched library playlists");
        Ok(playlists)
    }

    // ========================================================================
    // Requests
    // ========================================================================

    async fn discover_personal_station(&self) -> Result<String> {
        let tokens = self.tokens.tokens().await?;
        let url = format!("{}/v1/me/recommendations/", self.config.api_base_url);
        let response = self.send(self.api_request(HttpRequest::get(url), &tokens)).await?;

        let payload: serde_json::Value = decode(&response)?;
        let pattern = Regex::new(PERSONAL_STATION_PATTERN)
            .map_err(|e| CatalogError::Decode(format!("station pattern: {}", e)))?;

        let mut station_ids = Vec::new();
        collect_station_ids(&payload, &mut station_ids);
        debug!(candidates = station_ids.len(), "Scanning recommendations for personal station");

        let station = station_ids
            .into_iter()
            .find(|id| pattern.is_match(id))
            .ok_or(CatalogError::NoPersonalStation)?;
        info!(station_id = %station, "Discovered personal station");
        Ok(station)
    }

    async fn fetch_storefront(&self) -> Result<String> {
        let tokens = self.tokens.tokens().await?;
        let url = format!("{}/v1/me/storefront", self.config.api_base_url);
        let response = self.send(self.api_request(HttpRequest::get(url), &tokens)).await?;
        let storefronts: DataResponse<StorefrontResource> = decode(&response)?;
        let storefront = storefronts
            .data
            .into_iter()
            .next()
            .map(|s| s.id)
            .ok_or(CatalogError::Empty("storefront"))?;
        debug!(storefront = %storefront, "Resolved account storefront");
        Ok(storefront)
    }

    fn api_request(&self, request: HttpRequest, tokens: &CatalogTokens) -> HttpRequest {
        request
            .bearer_token(&tokens.developer_token)
            .header("Music-User-Token", &tokens.user_token)
            .timeout(REQUEST_TIMEOUT)
    }

    fn web_player_request(&self, request: HttpRequest, tokens: &CatalogTokens) -> HttpRequest {
        request
            .bearer_token(&tokens.developer_token)
            .header("Media-User-Token", &tokens.user_token)
            .header("Origin", &self.config.web_origin)
            .timeout(REQUEST_TIMEOUT)
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let method = request.method.as_str();
        let url = request.url.clone();
        let response = self.http.execute(request).await?;

        if response.is_success() {
            return Ok(response);
        }

        let status = response.status;
        warn!(method, url = %url, status, "Catalog request failed");
        if status == 401 || status == 403 {
            return Err(CatalogError::NotAuthorized { status });
        }
        Err(CatalogError::Status {
            status,
            body: response.text().unwrap_or_default(),
        })
    }
}

fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<T> {
    serde_json::from_slice(&response.body).map_err(|e| CatalogError::Decode(e.to_string()))
}

// ============================================================================
// Trait implementations
// ============================================================================

#[async_trait]
impl TrackSource for CatalogClient {
    #[instrument(skip(self, context), fields(mode = %context.mode))]
    async fn fetch_next_tracks(&self, context: &SelectionContext) -> Result<Vec<Track>> {
        let station = self.station_for(context.mode).await?;
        let tokens = self.tokens.tokens().await?;
        let url = format!(
            "{}/v1/me/stations/next-tracks/{}",
            self.config.api_base_url, station
        );
        let request = HttpRequest::post(url)
            .query("limit", self.config.batch_limit.to_string())
            .query("include", "albums")
            .query("extend", "editorialVideo");

        let response = self.send(self.api_request(request, &tokens)).await?;
        let songs: DataResponse<SongResource> = decode(&response)?;
        let tracks: Vec<Track> = songs.data.into_iter().map(Track::from).collect();

        debug!(station_id = %station, count = tracks.len(), "Fetched next station tracks");
        Ok(tracks)
    }
}

#[async_trait]
impl MetadataEnricher for CatalogClient {
    #[instrument(skip(self))]
    async fn fetch_album_metadata(&self, track_id: &str) -> Result<ExtendedMetadata> {
        let storefront = self.storefront().await?;
        let tokens = self.tokens.tokens().await?;
        let url = format!(
            "{}/v1/catalog/{}/songs/{}/albums",
            self.config.amp_base_url, storefront, track_id
        );
        let request = HttpRequest::get(url).query("extend", ALBUM_EXTENSIONS);

        let response = self.send(self.web_player_request(request, &tokens)).await?;
        let albums: DataResponse<AlbumResource> = decode(&response)?;
        let album = albums
            .data
            .into_iter()
            .next()
            .ok_or(CatalogError::Empty("album"))?;

        debug!(album_id = %album.id, "Fetched extended album metadata");
        Ok(ExtendedMetadata::from(album))
    }
}

#[async_trait]
impl LibraryWriter for CatalogClient {
    #[instrument(skip(self, destination), fields(destination = %destination))]
    async fn add_to_destination(&self, track_id: &str, destination: &Destination) -> Result<()> {
        let tokens = self.tokens.tokens().await?;
        let request = match destination {
            Destination::Library => {
                let url = format!("{}/v1/me/library", self.config.api_base_url);
                HttpRequest::post(url).query("ids[songs]", track_id)
            }
            Destination::Playlist { id, .. } => {
                let url = format!(
                    "{}/v1/me/library/playlists/{}/tracks",
                    self.config.api_base_url, id
                );
                HttpRequest::post(url).json(&json!({
                    "data": [{ "id": track_id, "type": "songs" }]
                }))?
            }
        };

        self.send(self.api_request(request, &tokens)).await?;
        info!(track_id, "Track added to destination");
        Ok(())
    }
}
