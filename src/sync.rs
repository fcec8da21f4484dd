//! Drives the Last.fm API into the history store.
//!
//! `sync_*` walk a paginated listing and merge every record; `refresh_*`
//! pick the stalest artists or albums and merge their details.

use crate::history_store::{AlbumMetadata, ArtistMetadata, HistoryStore, Love, Scrobble, Tag};
use crate::lastfm::{
    process_tracks_response, FetchError, LastFmClient, Pages, RequestParams, TrackRecord,
    DEFAULT_PAGE_SIZE,
};
use anyhow::{Context, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const RECENT_TRACKS_METHOD: &str = "user.getrecenttracks";
pub const LOVED_TRACKS_METHOD: &str = "user.getlovedtracks";

/// Receives progress of a long running operation.
pub trait SyncProgress {
    /// Called once the size of the work is known, if it ever is.
    fn start(&self, label: &str, total: Option<u64>);
    fn advance(&self, count: u64);
    fn finish(&self);
}

pub struct NoOpProgress;

impl SyncProgress for NoOpProgress {
    fn start(&self, _label: &str, _total: Option<u64>) {}
    fn advance(&self, _count: u64) {}
    fn finish(&self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub page_size: u32,
    pub first_page: u32,
    pub delay: Option<Duration>,
    /// Inclusive lower bound in epoch seconds, sent as `from`.
    pub from: Option<i64>,
    /// Upper bound in epoch seconds, sent as `to`.
    pub to: Option<i64>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            first_page: 1,
            delay: None,
            from: None,
            to: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub pages: usize,
    /// Records returned by the API, now-playing entries excluded.
    pub fetched: usize,
    pub merged: usize,
    /// Records without a timestamp.
    pub skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOptions {
    /// Only entities last refreshed before this instant are considered.
    pub cutoff: Option<i64>,
    pub limit: Option<usize>,
    pub delay: Option<Duration>,
    /// Value written to `last_updated`.
    pub now: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshStats {
    pub candidates: usize,
    pub refreshed: usize,
    /// Entities Last.fm does not know, or answered without details for.
    pub not_found: usize,
    /// Entities left untouched after a transport, HTTP or service error.
    pub failed: usize,
}

/// Walks `method` page by page, handing each normalized record to `merge`.
fn sync_tracks<F>(
    client: &LastFmClient,
    method: &str,
    params: RequestParams,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
    mut merge: F,
) -> Result<SyncStats>
where
    F: FnMut(TrackRecord, i64) -> Result<()>,
{
    let mut stats = SyncStats::default();
    let pages = Pages::new(client, method, params)
        .starting_at(options.first_page)
        .page_size(options.page_size)
        .delay(options.delay);

    for page in pages {
        let page = page.with_context(|| format!("Failed to fetch {}", method))?;
        if stats.pages == 0 {
            progress.start(method, page.metadata.as_ref().map(|m| m.total));
        }
        stats.pages += 1;

        let items = page.items.unwrap_or_default();
        for record in process_tracks_response(&items) {
            stats.fetched += 1;
            let timestamp = match record.uts_timestamp {
                Some(timestamp) => timestamp,
                None => {
                    warn!(
                        "Skipping {} - {} from {}: no timestamp",
                        record.artist, record.song, method
                    );
                    stats.skipped += 1;
                    continue;
                }
            };
            merge(record, timestamp)?;
            stats.merged += 1;
            progress.advance(1);
        }
    }
    progress.finish();

    info!(
        "{}: merged {} of {} records over {} pages",
        method, stats.merged, stats.fetched, stats.pages
    );
    Ok(stats)
}

/// Mirrors the user's scrobbles between `options.from` and `options.to`.
pub fn sync_scrobbles(
    client: &LastFmClient,
    store: &dyn HistoryStore,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncStats> {
    let mut params = RequestParams::new();
    params.set_opt("from", options.from);
    params.set_opt("to", options.to);

    sync_tracks(
        client,
        RECENT_TRACKS_METHOD,
        params,
        options,
        progress,
        |record, played_at| {
            store.merge_scrobble(&Scrobble {
                artist: record.artist,
                song: record.song,
                album: record.album,
                played_at,
                display_datetime: record.display_datetime,
                image_id: record.image_id,
            })
        },
    )
}

/// Mirrors the user's loved tracks. Date bounds do not apply to loves.
pub fn sync_loves(
    client: &LastFmClient,
    store: &dyn HistoryStore,
    options: &SyncOptions,
    progress: &dyn SyncProgress,
) -> Result<SyncStats> {
    sync_tracks(
        client,
        LOVED_TRACKS_METHOD,
        RequestParams::new(),
        options,
        progress,
        |record, loved_at| {
            store.merge_love(&Love {
                artist: record.artist,
                song: record.song,
                loved_at,
                display_datetime: record.display_datetime,
            })
        },
    )
}

fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        thread::sleep(delay);
    }
}

/// Lookup failures that will not change on retry: the entity is unknown to
/// Last.fm, or its answer carries no usable details. Rate limits, outages
/// and transport errors are retried on the next run instead.
fn settles_lookup(error: &FetchError) -> bool {
    error.is_not_found() || matches!(error, FetchError::MalformedResponse(_))
}

/// Fetches details for the stalest artists and merges them, together with
/// their tags and similar artists.
pub fn refresh_artists(
    client: &LastFmClient,
    store: &dyn HistoryStore,
    options: &RefreshOptions,
    progress: &dyn SyncProgress,
) -> Result<RefreshStats> {
    let candidates = store.fetch_artists_to_update(options.cutoff, options.limit)?;
    let mut stats = RefreshStats {
        candidates: candidates.len(),
        ..Default::default()
    };
    progress.start("artist.getinfo", Some(candidates.len() as u64));

    for artist in candidates {
        pause(options.delay);
        match client.fetch_artist(&artist.name, &RequestParams::new()) {
            Ok(info) => {
                let metadata = ArtistMetadata {
                    name: artist.name.clone(),
                    image_id: info.image_id,
                    url: info.url,
                    wiki: info.wiki,
                    summary: info.summary,
                };
                store.merge_artist_metadata(&metadata, Some(options.now))?;

                let tags: Vec<Tag> = info
                    .tags
                    .into_iter()
                    .map(|tag| Tag {
                        name: tag.name,
                        url: tag.url,
                    })
                    .collect();
                store.merge_artist_tags(&artist.name, &tags)?;

                let similar: Vec<String> = info.similar.into_iter().map(|s| s.name).collect();
                store.merge_similar_artists(&artist.name, &similar)?;

                debug!(
                    "Refreshed artist {} ({} tags, {} similar)",
                    artist.name,
                    tags.len(),
                    similar.len()
                );
                stats.refreshed += 1;
            }
            Err(e) if settles_lookup(&e) => {
                warn!("Last.fm has no details for artist {}: {}", artist.name, e);
                // Mark as refreshed so it stops sorting first.
                store.merge_artist_metadata(&ArtistMetadata::named(&artist.name), Some(options.now))?;
                stats.not_found += 1;
            }
            Err(e) => {
                warn!("Failed to refresh artist {}: {}", artist.name, e);
                stats.failed += 1;
            }
        }
        progress.advance(1);
    }
    progress.finish();

    info!(
        "Artists: {} refreshed, {} not found, {} failed out of {}",
        stats.refreshed, stats.not_found, stats.failed, stats.candidates
    );
    Ok(stats)
}

/// Fetches details for the stalest albums and merges them.
pub fn refresh_albums(
    client: &LastFmClient,
    store: &dyn HistoryStore,
    options: &RefreshOptions,
    progress: &dyn SyncProgress,
) -> Result<RefreshStats> {
    let candidates = store.fetch_albums_to_update(options.cutoff, options.limit)?;
    let mut stats = RefreshStats {
        candidates: candidates.len(),
        ..Default::default()
    };
    progress.start("album.getinfo", Some(candidates.len() as u64));

    for album in candidates {
        pause(options.delay);
        let blank = AlbumMetadata {
            name: album.name.clone(),
            artist: album.artist.clone(),
            ..Default::default()
        };
        match client.fetch_album(&album.name, &album.artist, &RequestParams::new()) {
            Ok(info) => {
                let metadata = AlbumMetadata {
                    image_id: info.image_id,
                    url: info.url,
                    ..blank
                };
                store.merge_album_metadata(&metadata, Some(options.now))?;
                stats.refreshed += 1;
            }
            Err(e) if settles_lookup(&e) => {
                warn!(
                    "Last.fm has no details for album {} by {}: {}",
                    album.name, album.artist, e
                );
                store.merge_album_metadata(&blank, Some(options.now))?;
                stats.not_found += 1;
            }
            Err(e) => {
                warn!("Failed to refresh album {} by {}: {}", album.name, album.artist, e);
                stats.failed += 1;
            }
        }
        progress.advance(1);
    }
    progress.finish();

    info!(
        "Albums: {} refreshed, {} not found, {} failed out of {}",
        stats.refreshed, stats.not_found, stats.failed, stats.candidates
    );
    Ok(stats)
}
