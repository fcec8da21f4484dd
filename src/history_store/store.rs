//! SQLite-backed history store implementation.

use super::models::{
    AlbumDetails, AlbumMetadata, ArtistDetails, ArtistMetadata, ArtistTag, HistoryStats, Love,
    Scrobble, SimilarArtist, Tag, TrackDetails,
};
use super::schema::HISTORY_VERSIONED_SCHEMAS;
use super::trait_def::HistoryStore;
use crate::sqlite_persistence::BASE_DB_VERSION;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// SQLite-backed history store.
#[derive(Clone)]
pub struct SqliteHistoryStore {
    conn: Arc<Mutex<Connection>>,
}

/// Ids of artists and albums are their case-folded names.
pub fn entity_id(name: &str) -> String {
    name.to_lowercase()
}

fn non_empty(value: &str) -> bool {
    !value.is_empty()
}

const ARTIST_COLUMNS: &str =
    "id, name, discovered, last_listened, last_updated, image_id, url, wiki, summary";

const ALBUM_COLUMNS: &str =
    "id, artist_id, name, artist, discovered, last_listened, last_updated, image_id, url";

fn artist_from_row(row: &Row) -> rusqlite::Result<ArtistDetails> {
    Ok(ArtistDetails {
        id: row.get(0)?,
        name: row.get(1)?,
        discovered: row.get(2)?,
        last_listened: row.get(3)?,
        last_updated: row.get(4)?,
        image_id: row.get(5)?,
        url: row.get(6)?,
        wiki: row.get(7)?,
        summary: row.get(8)?,
    })
}

fn album_from_row(row: &Row) -> rusqlite::Result<AlbumDetails> {
    Ok(AlbumDetails {
        id: row.get(0)?,
        artist_id: row.get(1)?,
        name: row.get(2)?,
        artist: row.get(3)?,
        discovered: row.get(4)?,
        last_listened: row.get(5)?,
        last_updated: row.get(6)?,
        image_id: row.get(7)?,
        url: row.get(8)?,
    })
}

/// SQLite treats a negative LIMIT as no limit.
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|l| l.min(i64::MAX as usize) as i64).unwrap_or(-1)
}

impl SqliteHistoryStore {
    /// Open (or create) the history database at `db_path`.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref();
        let conn = if db_path.exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open history database {:?}", db_path))?
        } else {
            let conn = Connection::open(db_path)
                .with_context(|| format!("Failed to create history database {:?}", db_path))?;
            HISTORY_VERSIONED_SCHEMAS
                .last()
                .context("No schemas defined")?
                .create(&conn)?;
            info!("Created new history database at {:?}", db_path);
            conn
        };

        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "History database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        let schema_count = HISTORY_VERSIONED_SCHEMAS.len();
        if version >= schema_count {
            bail!(
                "History database version {} is too new (max supported: {})",
                version,
                schema_count - 1
            );
        }

        Self::migrate_if_needed(&conn, version)?;
        HISTORY_VERSIONED_SCHEMAS[schema_count - 1].validate(&conn)?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .context("Failed to set WAL mode on history database")?;

        let store = SqliteHistoryStore {
            conn: Arc::new(Mutex::new(conn)),
        };
        let stats = store.get_stats()?;
        info!(
            "History store ready: {} scrobbles, {} loves, {} artists, {} albums, {} tracks",
            stats.scrobbles, stats.loves, stats.artists, stats.albums, stats.tracks
        );
        Ok(store)
    }

    /// Fresh store held in memory, used by tests.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        HISTORY_VERSIONED_SCHEMAS
            .last()
            .context("No schemas defined")?
            .create(&conn)?;

        Ok(SqliteHistoryStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, current_version: usize) -> Result<()> {
        let target_version = HISTORY_VERSIONED_SCHEMAS.len() - 1;

        if current_version >= target_version {
            return Ok(());
        }

        info!(
            "Migrating history database from version {} to {}",
            current_version, target_version
        );

        for schema in HISTORY_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!("Running history migration to version {}", schema.version);
                migration_fn(conn)?;
            }
        }

        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + target_version),
            [],
        )?;
        Ok(())
    }

    fn artist_listen(conn: &Connection, artist: &str, timestamp: i64) -> Result<()> {
        conn.prepare_cached(
            "INSERT INTO artist_details (id, name, discovered, last_listened)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
                discovered = min(coalesce(discovered, excluded.discovered), excluded.discovered),
                last_listened = max(coalesce(last_listened, excluded.last_listened), excluded.last_listened)",
        )?
        .execute(params![entity_id(artist), artist, timestamp])?;
        Ok(())
    }

    fn track_listen(conn: &Connection, track: &str, artist: &str, timestamp: i64) -> Result<()> {
        conn.prepare_cached(
            "INSERT INTO track_details (name, artist, discovered, last_listened)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(name, artist) DO UPDATE SET
                discovered = min(coalesce(discovered, excluded.discovered), excluded.discovered),
                last_listened = max(coalesce(last_listened, excluded.last_listened), excluded.last_listened)",
        )?
        .execute(params![track, artist, timestamp])?;
        Ok(())
    }

    fn track_image(conn: &Connection, track: &str, artist: &str, image_id: &str) -> Result<()> {
        if !non_empty(image_id) {
            return Ok(());
        }
        conn.prepare_cached(
            "INSERT INTO track_details (name, artist, image_id)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(name, artist) DO UPDATE SET image_id = excluded.image_id",
        )?
        .execute(params![track, artist, image_id])?;
        Ok(())
    }

    fn album_listen(conn: &Connection, album: &str, artist: &str, timestamp: i64) -> Result<()> {
        conn.prepare_cached(
            "INSERT INTO album_details (id, artist_id, name, artist, discovered, last_listened)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(id, artist_id) DO UPDATE SET
                discovered = min(coalesce(discovered, excluded.discovered), excluded.discovered),
                last_listened = max(coalesce(last_listened, excluded.last_listened), excluded.last_listened)",
        )?
        .execute(params![
            entity_id(album),
            entity_id(artist),
            album,
            artist,
            timestamp
        ])?;
        Ok(())
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn merge_scrobble(&self, scrobble: &Scrobble) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.prepare_cached(
            "INSERT INTO playlist (artist, song, album, uts_timestamp, datetime)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(uts_timestamp) DO UPDATE SET
                artist = excluded.artist,
                song = excluded.song,
                album = excluded.album,
                datetime = excluded.datetime",
        )?
        .execute(params![
            scrobble.artist,
            scrobble.song,
            scrobble.album,
            scrobble.played_at,
            scrobble.display_datetime,
        ])?;

        // Each statement is atomic on its own; a failure past this point
        // is repaired by merging the same scrobble again.
        Self::artist_listen(&conn, &scrobble.artist, scrobble.played_at)?;
        Self::track_listen(&conn, &scrobble.song, &scrobble.artist, scrobble.played_at)?;
        if let Some(image_id) = scrobble.image_id.as_deref() {
            Self::track_image(&conn, &scrobble.song, &scrobble.artist, image_id)?;
        }
        if let Some(album) = scrobble.album.as_deref().filter(|a| non_empty(a)) {
            Self::album_listen(&conn, album, &scrobble.artist, scrobble.played_at)?;
        }
        debug!("Merged scrobble {} {} - {}", scrobble.played_at, scrobble.artist, scrobble.song);
        Ok(())
    }

    fn merge_love(&self, love: &Love) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.prepare_cached(
            "INSERT INTO loves (artist, song, uts_timestamp, datetime)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(uts_timestamp) DO UPDATE SET
                artist = excluded.artist,
                song = excluded.song,
                datetime = excluded.datetime",
        )?
        .execute(params![
            love.artist,
            love.song,
            love.loved_at,
            love.display_datetime
        ])?;
        Ok(())
    }

    fn merge_artist_listen(&self, artist: &str, timestamp: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::artist_listen(&conn, artist, timestamp)
    }

    fn merge_track_listen(&self, track: &str, artist: &str, timestamp: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::track_listen(&conn, track, artist, timestamp)
    }

    fn merge_track_image(&self, track: &str, artist: &str, image_id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::track_image(&conn, track, artist, image_id)
    }

    fn merge_album_listen(&self, album: &str, artist: &str, timestamp: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        Self::album_listen(&conn, album, artist, timestamp)
    }

    fn merge_artist_metadata(
        &self,
        metadata: &ArtistMetadata,
        timestamp: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.prepare_cached(
            "INSERT INTO artist_details (id, name, image_id, url, wiki, summary, last_updated)
             VALUES (?1, ?2, nullif(?3, ''), nullif(?4, ''), nullif(?5, ''), nullif(?6, ''), ?7)
             ON CONFLICT(id) DO UPDATE SET
                image_id = coalesce(excluded.image_id, image_id),
                url = coalesce(excluded.url, url),
                wiki = coalesce(excluded.wiki, wiki),
                summary = coalesce(excluded.summary, summary),
                last_updated = excluded.last_updated",
        )?
        .execute(params![
            entity_id(&metadata.name),
            metadata.name,
            metadata.image_id,
            metadata.url,
            metadata.wiki,
            metadata.summary,
            timestamp,
        ])?;
        Ok(())
    }

    fn merge_album_metadata(&self, metadata: &AlbumMetadata, timestamp: Option<i64>) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.prepare_cached(
            "INSERT INTO album_details (id, artist_id, name, artist, image_id, url, last_updated)
             VALUES (?1, ?2, ?3, ?4, nullif(?5, ''), nullif(?6, ''), ?7)
             ON CONFLICT(id, artist_id) DO UPDATE SET
                image_id = coalesce(excluded.image_id, image_id),
                url = coalesce(excluded.url, url),
                last_updated = excluded.last_updated",
        )?
        .execute(params![
            entity_id(&metadata.name),
            entity_id(&metadata.artist),
            metadata.name,
            metadata.artist,
            metadata.image_id,
            metadata.url,
            timestamp,
        ])?;
        Ok(())
    }

    fn merge_artist_tags(&self, artist: &str, tags: &[Tag]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO artist_tags (id, name, url) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id, name) DO UPDATE SET url = excluded.url",
            )?;
            let id = entity_id(artist);
            for tag in tags {
                stmt.execute(params![id, tag.name.to_lowercase(), tag.url])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn merge_similar_artists(&self, artist: &str, similar: &[String]) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let id = entity_id(artist);
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO similar_artists (id, similar_id, position) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id, position) DO UPDATE SET similar_id = excluded.similar_id",
            )?;
            for (index, name) in similar.iter().enumerate() {
                stmt.execute(params![id, entity_id(name), index as i64 + 1])?;
            }
        }
        // A shorter list than the stored one drops the stale tail.
        tx.execute(
            "DELETE FROM similar_artists WHERE id = ?1 AND position > ?2",
            params![id, similar.len() as i64],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn fetch_artists_to_update(
        &self,
        cutoff: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<ArtistDetails>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM artist_details
             WHERE last_updated IS NULL OR last_updated < ?1
             ORDER BY (last_updated - last_listened) ASC, rowid ASC
             LIMIT ?2",
            ARTIST_COLUMNS
        ))?;
        let artists = stmt
            .query_map(
                params![cutoff.unwrap_or(i64::MAX), sql_limit(limit)],
                artist_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artists)
    }

    fn fetch_albums_to_update(
        &self,
        cutoff: Option<i64>,
        limit: Option<usize>,
    ) -> Result<Vec<AlbumDetails>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM album_details
             WHERE last_updated IS NULL OR last_updated < ?1
             ORDER BY (last_updated - last_listened) ASC, rowid ASC
             LIMIT ?2",
            ALBUM_COLUMNS
        ))?;
        let albums = stmt
            .query_map(
                params![cutoff.unwrap_or(i64::MAX), sql_limit(limit)],
                album_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(albums)
    }

    fn get_scrobble(&self, played_at: i64) -> Result<Option<Scrobble>> {
        let conn = self.conn.lock().unwrap();
        let scrobble = conn
            .prepare_cached(
                "SELECT artist, song, album, uts_timestamp, datetime FROM playlist
                 WHERE uts_timestamp = ?1",
            )?
            .query_row(params![played_at], |row| {
                Ok(Scrobble {
                    artist: row.get(0)?,
                    song: row.get(1)?,
                    album: row.get(2)?,
                    played_at: row.get(3)?,
                    display_datetime: row.get(4)?,
                    image_id: None,
                })
            })
            .optional()?;
        Ok(scrobble)
    }

    fn get_love(&self, loved_at: i64) -> Result<Option<Love>> {
        let conn = self.conn.lock().unwrap();
        let love = conn
            .prepare_cached(
                "SELECT artist, song, uts_timestamp, datetime FROM loves WHERE uts_timestamp = ?1",
            )?
            .query_row(params![loved_at], |row| {
                Ok(Love {
                    artist: row.get(0)?,
                    song: row.get(1)?,
                    loved_at: row.get(2)?,
                    display_datetime: row.get(3)?,
                })
            })
            .optional()?;
        Ok(love)
    }

    fn get_artist(&self, name: &str) -> Result<Option<ArtistDetails>> {
        let conn = self.conn.lock().unwrap();
        let artist = conn
            .prepare_cached(&format!(
                "SELECT {} FROM artist_details WHERE id = ?1",
                ARTIST_COLUMNS
            ))?
            .query_row(params![entity_id(name)], artist_from_row)
            .optional()?;
        Ok(artist)
    }

    fn get_album(&self, album: &str, artist: &str) -> Result<Option<AlbumDetails>> {
        let conn = self.conn.lock().unwrap();
        let album = conn
            .prepare_cached(&format!(
                "SELECT {} FROM album_details WHERE id = ?1 AND artist_id = ?2",
                ALBUM_COLUMNS
            ))?
            .query_row(params![entity_id(album), entity_id(artist)], album_from_row)
            .optional()?;
        Ok(album)
    }

    fn get_track(&self, track: &str, artist: &str) -> Result<Option<TrackDetails>> {
        let conn = self.conn.lock().unwrap();
        let track = conn
            .prepare_cached(
                "SELECT name, artist, discovered, last_listened, image_id FROM track_details
                 WHERE name = ?1 AND artist = ?2",
            )?
            .query_row(params![track, artist], |row| {
                Ok(TrackDetails {
                    name: row.get(0)?,
                    artist: row.get(1)?,
                    discovered: row.get(2)?,
                    last_listened: row.get(3)?,
                    image_id: row.get(4)?,
                })
            })
            .optional()?;
        Ok(track)
    }

    fn get_artist_tags(&self, artist: &str) -> Result<Vec<ArtistTag>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare_cached("SELECT id, name, url FROM artist_tags WHERE id = ?1 ORDER BY rowid")?;
        let tags = stmt
            .query_map(params![entity_id(artist)], |row| {
                Ok(ArtistTag {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn get_similar_artists(&self, artist: &str) -> Result<Vec<SimilarArtist>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, similar_id, position FROM similar_artists WHERE id = ?1 ORDER BY position",
        )?;
        let similar = stmt
            .query_map(params![entity_id(artist)], |row| {
                Ok(SimilarArtist {
                    id: row.get(0)?,
                    similar_id: row.get(1)?,
                    position: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(similar)
    }

    fn get_stats(&self) -> Result<HistoryStats> {
        let conn = self.conn.lock().unwrap();
        let count = |table: &str| -> Result<usize> {
            let count: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(count as usize)
        };
        Ok(HistoryStats {
            scrobbles: count("playlist")?,
            loves: count("loves")?,
            artists: count("artist_details")?,
            albums: count("album_details")?,
            tracks: count("track_details")?,
        })
    }
}
