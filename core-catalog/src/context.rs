//! Listening context: which station feeds the queue and where liked tracks go.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which station the queue is filled from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecommendationMode {
    /// The user's personal discovery station.
    #[default]
    Personal,
    /// A shared discovery station configured for every user.
    Public,
}

impl RecommendationMode {
    pub fn as_setting_value(&self) -> &'static str {
        match self {
            RecommendationMode::Personal => "personalMode",
            RecommendationMode::Public => "publicMode",
        }
    }

    pub fn from_setting_value(value: &str) -> Option<Self> {
        match value {
            "personalMode" => Some(RecommendationMode::Personal),
            "publicMode" => Some(RecommendationMode::Public),
            _ => None,
        }
    }
}

impl fmt::Display for RecommendationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationMode::Personal => write!(f, "personal"),
            RecommendationMode::Public => write!(f, "public"),
        }
    }
}

/// Where a positive swipe writes the track.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Destination {
    #[default]
    Library,
    Playlist { id: String, name: String },
}

impl Destination {
    pub fn playlist(id: impl Into<String>, name: impl Into<String>) -> Self {
        Destination::Playlist {
            id: id.into(),
            name: name.into(),
        }
    }

    pub fn as_setting_value(&self) -> &'static str {
        match self {
            Destination::Library => "libraryMode",
            Destination::Playlist { .. } => "playlistMode",
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Library => write!(f, "library"),
            Destination::Playlist { name, .. } => write!(f, "playlist:{}", name),
        }
    }
}

/// The (mode, destination) pair the queue is built for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionContext {
    pub mode: RecommendationMode,
    pub destination: Destination,
}

impl SelectionContext {
    pub fn new(mode: RecommendationMode, destination: Destination) -> Self {
        Self { mode, destination }
    }
}
