//! Catalog domain models.
//!
//! These are the shapes the rest of the core works with. Wire formats live in
//! `dto` and are converted into these types at the client boundary.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A catalog song as returned by a station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist_name: String,
    pub album_name: Option<String>,
    /// Duration hint from the catalog. The player's own duration wins once
    /// the item is loaded.
    pub duration: Option<Duration>,
    /// Canonical catalog page.
    pub url: Option<String>,
    pub artwork: Option<Artwork>,
    /// Short, time-limited preview streams in catalog order.
    pub preview_urls: Vec<String>,
    pub album_ids: Vec<String>,
}

impl Track {
    /// Minimal track, mostly useful for tests and host-side fixtures.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        artist_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist_name: artist_name.into(),
            album_name: None,
            duration: None,
            url: None,
            artwork: None,
            preview_urls: Vec::new(),
            album_ids: Vec::new(),
        }
    }

    pub fn with_preview(mut self, url: impl Into<String>) -> Self {
        self.preview_urls.push(url.into());
        self
    }

    pub fn with_artwork(mut self, artwork: Artwork) -> Self {
        self.artwork = Some(artwork);
        self
    }

    /// Cover URL used for history records.
    pub fn cover_url(&self, size: u32) -> Option<String> {
        self.artwork
            .as_ref()
            .map(|artwork| artwork.url(size, size, "jpg"))
    }
}

/// Artwork URL template with `{w}`, `{h}` and `{f}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artwork {
    pub url_template: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub bg_color: Option<String>,
    pub text_colors: Vec<String>,
}

impl Artwork {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            width: None,
            height: None,
            bg_color: None,
            text_colors: Vec::new(),
        }
    }

    /// Concrete URL for the requested size and image format.
    pub fn url(&self, width: u32, height: u32, format: &str) -> String {
        self.url_template
            .replace("{w}", &width.to_string())
            .replace("{h}", &height.to_string())
            .replace("{f}", format)
    }
}

/// Extended album presentation data attached to a queue entry after the fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtendedMetadata {
    pub album_id: String,
    pub name: String,
    pub artist_name: String,
    pub record_label: Option<String>,
    pub genre_names: Vec<String>,
    pub release_date: Option<String>,
    pub copyright: Option<String>,
    pub url: Option<String>,
    pub artwork: Option<Artwork>,
    pub editorial_artwork: EditorialArtwork,
    pub motion: MotionArtwork,
    pub offers: Vec<Offer>,
}

impl ExtendedMetadata {
    /// Best motion video for a full-height card, falling back to the square
    /// variants.
    pub fn preferred_motion_video(&self) -> Option<&MotionVideo> {
        self.motion
            .detail_tall
            .as_ref()
            .or(self.motion.detail_square.as_ref())
            .or(self.motion.square_1x1.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorialArtwork {
    pub static_detail_tall: Option<Artwork>,
    pub static_detail_square: Option<Artwork>,
    pub subscription_hero: Option<Artwork>,
    pub store_flowcase: Option<Artwork>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionArtwork {
    pub square_1x1: Option<MotionVideo>,
    pub detail_tall: Option<MotionVideo>,
    pub detail_square: Option<MotionVideo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionVideo {
    pub video_url: String,
    pub preview_frame: Option<Artwork>,
}

/// Licensing offer attached to an album.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub kind: String,
    pub price_formatted: Option<String>,
    pub price: Option<f64>,
    pub buy_params: Option<String>,
}

/// A user library playlist, used as a destination for liked tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Playlist {
    pub id: String,
    pub name: String,
    pub can_edit: bool,
}
