//! Wire formats of the catalog service.
//!
//! Only the fields the core reads are modelled; everything else is ignored.

use crate::models::{
    Artwork, EditorialArtwork, ExtendedMetadata, MotionArtwork, MotionVideo, Offer, Playlist,
    Track,
};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub(crate) struct DataResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

// ============================================================================
// Songs
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct SongResource {
    pub id: String,
    #[serde(default)]
    pub attributes: Option<SongAttributes>,
    #[serde(default)]
    pub relationships: Option<SongRelationships>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SongAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist_name: String,
    pub album_name: Option<String>,
    pub duration_in_millis: Option<u64>,
    pub url: Option<String>,
    pub artwork: Option<ArtworkDto>,
    #[serde(default)]
    pub previews: Vec<PreviewDto>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PreviewDto {
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SongRelationships {
    pub albums: Option<DataResponse<ResourceRef>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResourceRef {
    pub id: String,
}

impl From<SongResource> for Track {
    fn from(song: SongResource) -> Self {
        let album_ids = song
            .relationships
            .and_then(|r| r.albums)
            .map(|albums| albums.data.into_iter().map(|a| a.id).collect())
            .unwrap_or_default();

        let mut track = Track::new(song.id, "", "");
        track.album_ids = album_ids;

        if let Some(attributes) = song.attributes {
            track.title = attributes.name;
            track.artist_name = attributes.artist_name;
            track.album_name = attributes.album_name;
            track.duration = attributes.duration_in_millis.map(Duration::from_millis);
            track.url = attributes.url;
            track.artwork = attributes.artwork.map(Artwork::from);
            track.preview_urls = attributes
                .previews
                .into_iter()
                .filter_map(|p| p.url)
                .filter(|url| !url.is_empty())
                .collect();
        }
        track
    }
}

// ============================================================================
// Artwork
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArtworkDto {
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bg_color: Option<String>,
    pub text_color1: Option<String>,
    pub text_color2: Option<String>,
    pub text_color3: Option<String>,
    pub text_color4: Option<String>,
}

impl From<ArtworkDto> for Artwork {
    fn from(dto: ArtworkDto) -> Self {
        Artwork {
            url_template: dto.url,
            width: dto.width,
            height: dto.height,
            bg_color: dto.bg_color,
            text_colors: [dto.text_color1, dto.text_color2, dto.text_color3, dto.text_color4]
                .into_iter()
                .flatten()
                .collect(),
        }
    }
}

// ============================================================================
// Albums
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct AlbumResource {
    pub id: String,
    pub attributes: AlbumAttributes,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlbumAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artist_name: String,
    pub record_label: Option<String>,
    #[serde(default)]
    pub genre_names: Vec<String>,
    pub release_date: Option<String>,
    pub copyright: Option<String>,
    pub url: Option<String>,
    pub artwork: Option<ArtworkDto>,
    pub editorial_artwork: Option<EditorialArtworkDto>,
    pub editorial_video: Option<EditorialVideoDto>,
    #[serde(default)]
    pub offers: Vec<OfferDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EditorialArtworkDto {
    pub static_detail_tall: Option<ArtworkDto>,
    pub static_detail_square: Option<ArtworkDto>,
    pub subscription_hero: Option<ArtworkDto>,
    pub store_flowcase: Option<ArtworkDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EditorialVideoDto {
    pub motion_square_video1x1: Option<VideoDetailDto>,
    pub motion_detail_tall: Option<VideoDetailDto>,
    pub motion_detail_square: Option<VideoDetailDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoDetailDto {
    pub video: String,
    pub preview_frame: Option<ArtworkDto>,
}

impl From<VideoDetailDto> for MotionVideo {
    fn from(dto: VideoDetailDto) -> Self {
        MotionVideo {
            video_url: dto.video,
            preview_frame: dto.preview_frame.map(Artwork::from),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct OfferDto {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub price_formatted: Option<String>,
    pub price: Option<f64>,
    pub buy_params: Option<String>,
}

impl From<AlbumResource> for ExtendedMetadata {
    fn from(album: AlbumResource) -> Self {
        let attributes = album.attributes;
        let editorial_artwork = attributes
            .editorial_artwork
            .map(|e| EditorialArtwork {
                static_detail_tall: e.static_detail_tall.map(Artwork::from),
                static_detail_square: e.static_detail_square.map(Artwork::from),
                subscription_hero: e.subscription_hero.map(Artwork::from),
                store_flowcase: e.store_flowcase.map(Artwork::from),
            })
            .unwrap_or_default();
        let motion = attributes
            .editorial_video
            .map(|v| MotionArtwork {
                square_1x1: v.motion_square_video1x1.map(MotionVideo::from),
                detail_tall: v.motion_detail_tall.map(MotionVideo::from),
                detail_square: v.motion_detail_square.map(MotionVideo::from),
            })
            .unwrap_or_default();

        ExtendedMetadata {
            album_id: album.id,
            name: attributes.name,
            artist_name: attributes.artist_name,
            record_label: attributes.record_label,
            genre_names: attributes.genre_names,
            release_date: attributes.release_date,
            copyright: attributes.copyright,
            url: attributes.url,
            artwork: attributes.artwork.map(Artwork::from),
            editorial_artwork,
            motion,
            offers: attributes
                .offers
                .into_iter()
                .map(|o| Offer {
                    kind: o.kind,
                    price_formatted: o.price_formatted,
                    price: o.price,
                    buy_params: o.buy_params,
                })
                .collect(),
        }
    }
}

// ============================================================================
// Library
// ============================================================================

#[derive(Debug, Deserialize)]
pub(crate) struct PlaylistResource {
    pub id: String,
    pub attributes: Option<PlaylistAttributes>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PlaylistAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub can_edit: bool,
}

impl From<PlaylistResource> for Playlist {
    fn from(resource: PlaylistResource) -> Self {
        let (name, can_edit) = resource
            .attributes
            .map(|a| (a.name, a.can_edit))
            .unwrap_or_default();
        Playlist {
            id: resource.id,
            name,
            can_edit,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StorefrontResource {
    pub id: String,
}

/// Every station id referenced anywhere in a recommendations payload.
///
/// Recommendation groups nest stations at varying depths, so the payload is
/// walked rather than decoded into a fixed shape.
pub(crate) fn collect_station_ids(value: &serde_json::Value, out: &mut Vec<String>) {
    match value {
        serde_json::Value::Object(map) => {
            let is_station = map
                .get("type")
                .and_then(|t| t.as_str())
                .map_or(false, |t| t == "stations");
            if is_station {
                if let Some(id) = map.get("id").and_then(|id| id.as_str()) {
                    out.push(id.to_string());
                }
            }
            for child in map.values() {
                collect_station_ids(child, out);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items {
                collect_station_ids(item, out);
            }
        }
        _ => {}
    }
}
