//! Shared constants for integration tests

#![allow(dead_code)]

/// Well-formed API key, never sent anywhere.
pub const TEST_API_KEY: &str = "0123456789abcdef0123456789abcdef";

/// User whose history the fixtures describe
pub const TEST_USER: &str = "jammus";

/// Scripted API base URL
pub const TEST_BASE_URL: &str = "http://lastfm.test/2.0";

// ============================================================================
// Recent tracks fixture (3 pages)
// ============================================================================

/// Raw items across the three pages, now-playing entry included
pub const RECENT_TRACKS_RAW_ITEMS: usize = 7;

/// Timestamped scrobbles across the three pages
pub const RECENT_TRACKS_SCROBBLES: usize = 6;

/// Play time of Lera Lynn's "Lately" on page 1
pub const LERA_LYNN_PLAYED_AT: i64 = 1603622207;

/// Image of Lera Lynn's "Lately"
pub const LERA_LYNN_IMAGE_ID: &str = "fb0529f082462f505cd0902734c174c8";

// ============================================================================
// Loved tracks fixture
// ============================================================================

pub const SYNTHFLOOD_LOVED_AT: i64 = 1725597832;

// ============================================================================
// Detail fixtures
// ============================================================================

pub const MELT_BANANA_IMAGE_ID: &str = "d93fb932f7a34434bed332cbeb1b3ae6";

pub const FETCH_ALBUM_IMAGE_ID: &str = "ca2f75a0958349d2803f5afd9aba6936";
