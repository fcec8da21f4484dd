//! SQLite schema definitions for the listening history database.
//!
//! Table and column names are read by the reporting queries, keep them
//! stable.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// One row per scrobble, keyed by play time.
const PLAYLIST_TABLE: Table = Table {
    name: "playlist",
    columns: &[
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("song", &SqlType::Text, non_null = true),
        sqlite_column!("album", &SqlType::Text),
        sqlite_column!("uts_timestamp", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("datetime", &SqlType::Text),
    ],
    indices: &[
        ("idx_playlist_artist", "artist"),
        ("idx_playlist_artist_song", "artist, song"),
        ("idx_playlist_artist_album", "artist, album"),
    ],
};

const LOVES_TABLE: Table = Table {
    name: "loves",
    columns: &[
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("song", &SqlType::Text, non_null = true),
        sqlite_column!("uts_timestamp", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("datetime", &SqlType::Text),
    ],
    indices: &[],
};

const ARTIST_DETAILS_TABLE: Table = Table {
    name: "artist_details",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("discovered", &SqlType::Integer),
        sqlite_column!("last_listened", &SqlType::Integer),
        sqlite_column!("last_updated", &SqlType::Integer, default_value = Some("0")),
        sqlite_column!("image_id", &SqlType::Text),
        sqlite_column!("url", &SqlType::Text),
        sqlite_column!("wiki", &SqlType::Text),
        sqlite_column!("summary", &SqlType::Text),
    ],
    indices: &[],
};

const TRACK_DETAILS_TABLE: Table = Table {
    name: "track_details",
    columns: &[
        sqlite_column!("name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("artist", &SqlType::Text, is_primary_key = true),
        sqlite_column!("discovered", &SqlType::Integer),
        sqlite_column!("last_listened", &SqlType::Integer),
        sqlite_column!("image_id", &SqlType::Text),
    ],
    indices: &[],
};

const ALBUM_DETAILS_TABLE: Table = Table {
    name: "album_details",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("artist_id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("artist", &SqlType::Text, non_null = true),
        sqlite_column!("discovered", &SqlType::Integer),
        sqlite_column!("last_listened", &SqlType::Integer),
        sqlite_column!("last_updated", &SqlType::Integer, default_value = Some("0")),
        sqlite_column!("image_id", &SqlType::Text),
        sqlite_column!("url", &SqlType::Text),
    ],
    indices: &[("idx_album_details_name_artist", "name, artist")],
};

const ARTIST_TAGS_TABLE: Table = Table {
    name: "artist_tags",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, is_primary_key = true),
        sqlite_column!("url", &SqlType::Text),
    ],
    indices: &[("idx_artist_tags_name", "name")],
};

const SIMILAR_ARTISTS_TABLE: Table = Table {
    name: "similar_artists",
    columns: &[
        sqlite_column!("id", &SqlType::Text, is_primary_key = true),
        sqlite_column!("similar_id", &SqlType::Text, non_null = true),
        sqlite_column!("position", &SqlType::Integer, is_primary_key = true),
    ],
    indices: &[],
};

pub const HISTORY_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        PLAYLIST_TABLE,
        LOVES_TABLE,
        ARTIST_DETAILS_TABLE,
        TRACK_DETAILS_TABLE,
        ALBUM_DETAILS_TABLE,
        ARTIST_TAGS_TABLE,
        SIMILAR_ARTISTS_TABLE,
    ],
    migration: None,
}];
