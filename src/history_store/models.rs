//! Data models for the listening history database.

use serde::{Deserialize, Serialize};

/// A completed play. `played_at` is unique per user.
///
/// `image_id` is not stored with the play; it is forwarded to the track
/// details when the scrobble is merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scrobble {
    pub artist: String,
    pub song: String,
    pub album: Option<String>,
    pub played_at: i64,
    pub display_datetime: Option<String>,
    #[serde(default)]
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Love {
    pub artist: String,
    pub song: String,
    pub loved_at: i64,
    pub display_datetime: Option<String>,
}

/// Stored artist row. `id` is the lowercased name; `name` keeps the casing
/// of the first write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistDetails {
    pub id: String,
    pub name: String,
    pub discovered: Option<i64>,
    pub last_listened: Option<i64>,
    pub last_updated: Option<i64>,
    pub image_id: Option<String>,
    pub url: Option<String>,
    pub wiki: Option<String>,
    pub summary: Option<String>,
}

/// Metadata refresh for an artist. Empty or missing fields never replace
/// stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistMetadata {
    pub name: String,
    pub image_id: Option<String>,
    pub url: Option<String>,
    pub wiki: Option<String>,
    pub summary: Option<String>,
}

impl ArtistMetadata {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }
}

/// Stored album row, keyed by the lowercased (album, artist) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumDetails {
    pub id: String,
    pub artist_id: String,
    pub name: String,
    pub artist: String,
    pub discovered: Option<i64>,
    pub last_listened: Option<i64>,
    pub last_updated: Option<i64>,
    pub image_id: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumMetadata {
    pub name: String,
    pub artist: String,
    pub image_id: Option<String>,
    pub url: Option<String>,
}

/// Stored track row, keyed by (name, artist) exactly as scrobbled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDetails {
    pub name: String,
    pub artist: String,
    pub discovered: Option<i64>,
    pub last_listened: Option<i64>,
    pub image_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtistTag {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarArtist {
    pub id: String,
    pub similar_id: String,
    pub position: i64,
}

/// Row counts of the history database.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryStats {
    pub scrobbles: usize,
    pub loves: usize,
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}
