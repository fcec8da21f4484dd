//! Listening history storage.
//!
//! Mirrors scrobbles and loves, plus the per-artist, per-album and per-track
//! details derived from them, into a SQLite database.

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    AlbumDetails, AlbumMetadata, ArtistDetails, ArtistMetadata, ArtistTag, HistoryStats, Love,
    Scrobble, SimilarArtist, Tag, TrackDetails,
};
pub use store::{entity_id, SqliteHistoryStore};
pub use trait_def::HistoryStore;
