//! Incremental mirror of a Last.fm listening history into SQLite.
//!
//! The library exposes the API client, the history store and the sync
//! driver tying them together; the `scrobble-mirror` binary is a thin CLI
//! over [`sync`].

pub mod config;
pub mod history_store;
pub mod lastfm;
pub mod sqlite_persistence;
pub mod sync;
pub mod timestamp;

// Re-export commonly used types for convenience
pub use history_store::{HistoryStore, SqliteHistoryStore};
pub use lastfm::{FetchError, LastFmClient};
pub use sync::{NoOpProgress, SyncProgress};
