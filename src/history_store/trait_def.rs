//! HistoryStore trait definition.

use super::models::{
    AlbumDetails, AlbumMetadata, ArtistDetails, ArtistMetadata, ArtistTag, HistoryStats, Love,
    Scrobble, SimilarArtist, Tag, TrackDetails,
};
use anyhow::Result;

/// Storage backend for the mirrored listening history.
///
/// Every merge is an upsert by primary key and applying the same input twice
/// leaves the same state as applying it once.
pub trait HistoryStore: Send + Sync {
    // =========================================================================
    // Listen events
    // =========================================================================

    /// Store a scrobble, then merge its listen into the artist, track and
    /// album details, and its image into the track details.
    fn merge_scrobble(&self, scrobble: &Scrobble) -> Result<()>;

    fn merge_love(&self, love: &Love) -> Result<()>;

    /// Widen the artist's discovered/last_listened window to include `timestamp`.
    fn merge_artist_listen(&self, artist: &str, timestamp: i64) -> Result<()>;

    fn merge_track_listen(&self, track: &str, artist: &str, timestamp: i64) -> Result<()>;

    /// No-op for an empty `image_id`.
    fn merge_track_image(&self, track: &str, artist: &str, image_id: &str) -> Result<()>;

    fn merge_album_listen(&self, album: &str, artist: &str, timestamp: i64) -> Result<()>;

    // =========================================================================
    // Metadata
    // =========================================================================

    /// Non-empty fields replace stored ones; `last_updated` is always set to
    /// `timestamp`, even when it is `None`.
    fn merge_artist_metadata(&self, metadata: &ArtistMetadata, timestamp: Option<i64>)
        -> Result<()>;

    fn merge_album_metadata(&self, metadata: &AlbumMetadata, timestamp: Option<i64>) -> Result<()>;

    /// Upsert each tag; tags missing from `tags` are kept.
    fn merge_artist_tags(&self, artist: &str, tags: &[Tag]) -> Result<()>;

    /// Store `similar` (most similar first) as the artist's ranked list.
    fn merge_similar_artists(&self, artist: &str, similar: &[String]) -> Result<()>;

    // =========================================================================
    // Refresh candidates
    // =========================================================================

    /// Artists with `last_updated` before `cutoff` (all when `None`), the
    /// ones refreshed longest before their last listen first.
    fn fetch_artists_to_update(
        &self,
        cutoff: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<ArtistDetails>>;

    fn fetch_albums_to_update(
        &self,
        cutoff: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<AlbumDetails>>;

    // =========================================================================
    // Lookups
    // =========================================================================

    fn get_scrobble(&self, played_at: i64) -> Result<Option<Scrobble>>;

    fn get_love(&self, loved_at: i64) -> Result<Option<Love>>;

    /// Case-insensitive lookup by name.
    fn get_artist(&self, name: &str) -> Result<Option<ArtistDetails>>;

    fn get_album(&self, album: &str, artist: &str) -> Result<Option<AlbumDetails>>;

    fn get_track(&self, track: &str, artist: &str) -> Result<Option<TrackDetails>>;

    fn get_artist_tags(&self, artist: &str) -> Result<Vec<ArtistTag>>;

    /// Ordered by position.
    fn get_similar_artists(&self, artist: &str) -> Result<Vec<SimilarArtist>>;

    fn get_stats(&self) -> Result<HistoryStats>;
}
