//! # Catalog Service
//!
//! Everything the playback core needs from the remote music catalog:
//!
//! - [`TrackSource`] supplies candidate tracks for the current listening context
//! - [`MetadataEnricher`] backfills extended album presentation data
//! - [`LibraryWriter`] saves liked tracks to the library or a playlist
//!
//! [`CatalogClient`] implements all three over the host [`HttpClient`](bridge_traits::HttpClient).
//! The engine depends only on the traits.

pub mod client;
pub mod context;
mod dto;
pub mod error;
pub mod models;
pub mod source;

pub use client::CatalogClient;
pub use context::{Destination, RecommendationMode, SelectionContext};
pub use error::{CatalogError, Result};
pub use models::{
    Artwork, EditorialArtwork, ExtendedMetadata, MotionArtwork, MotionVideo, Offer, Playlist,
    Track,
};
pub use source::{
    CatalogTokens, LibraryWriter, MetadataEnricher, StaticTokens, TokenProvider, TrackSource,
};
