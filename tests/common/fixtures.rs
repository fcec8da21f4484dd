//! JSON fixtures and builders for paginated bodies

#![allow(dead_code)]

use serde_json::{json, Value};
use std::path::PathBuf;

/// Loads `tests/fixtures/<name>`.
pub fn load_fixture(name: &str) -> Value {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    let content = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {:?}: {}", path, e));
    serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {:?}: {}", path, e))
}

/// A paginated body the way Last.fm shapes it.
pub fn paged_body(
    root: &str,
    item_key: &str,
    items: Vec<Value>,
    page: u32,
    total_pages: u32,
    total: u64,
) -> Value {
    json!({
        root: {
            item_key: items,
            "@attr": {
                "user": "jammus",
                "page": page.to_string(),
                "perPage": "200",
                "totalPages": total_pages.to_string(),
                "total": total.to_string(),
            }
        }
    })
}

/// A recent-tracks item played at `uts`.
pub fn track_item(artist: &str, song: &str, album: &str, uts: i64) -> Value {
    json!({
        "artist": {"name": artist, "url": format!("https://www.last.fm/music/{}", artist)},
        "name": song,
        "album": {"mbid": "", "#text": album},
        "image": [],
        "date": {"uts": uts.to_string(), "#text": ""}
    })
}
