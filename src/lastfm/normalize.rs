//! Flattening of raw track items (recent tracks, loved tracks) into
//! [`TrackRecord`]s.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

lazy_static! {
    /// `scheme://host/any/path/<id>.<ext>`, capturing `<id>`.
    static ref IMAGE_ID_PATTERN: Regex =
        Regex::new(r"^[A-Za-z][A-Za-z0-9+.-]*://[^/]+/(?:[^/]*/)*([^/.]+)\.[A-Za-z0-9]+$")
            .expect("image id pattern is valid");
}

/// Canonical shape of one track event, regardless of the method it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRecord {
    pub artist: String,
    pub song: String,
    /// `None` is distinct from `Some("")`: only the former means the source
    /// did not carry an album at all.
    pub album: Option<String>,
    pub uts_timestamp: Option<i64>,
    pub display_datetime: Option<String>,
    pub image_id: Option<String>,
}

/// Extracts the image identifier from a Last.fm image URL.
pub fn image_id_from_url(url: &str) -> Option<String> {
    IMAGE_ID_PATTERN
        .captures(url)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().to_string())
}

/// Image identifier of the first entry of an `image` list.
pub fn first_image_id(item: &Value) -> Option<String> {
    item.get("image")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .and_then(|image| image.get("#text"))
        .and_then(Value::as_str)
        .and_then(image_id_from_url)
}

fn is_now_playing(item: &Value) -> bool {
    match item.get("@attr").and_then(|attr| attr.get("nowplaying")) {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty() && s != "false",
        Some(_) => true,
    }
}

fn text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

fn non_empty_text<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    text(value, key).filter(|s| !s.is_empty())
}

fn parse_uts(date: &Value) -> Option<i64> {
    match date.get("uts")? {
        Value::String(s) => s.trim().parse().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    }
}

/// Maps one raw item to a record, or `None` for a track that is still
/// playing.
pub fn normalize_track(item: &Value) -> Option<TrackRecord> {
    if is_now_playing(item) {
        return None;
    }

    let artist = item
        .get("artist")
        .and_then(|artist| non_empty_text(artist, "name").or_else(|| non_empty_text(artist, "#text")))
        .unwrap_or_default()
        .to_string();
    let song = text(item, "name").unwrap_or_default().to_string();

    let date = item.get("date").filter(|d| d.is_object());
    let uts_timestamp = date.and_then(parse_uts);
    let display_datetime = date.and_then(|d| text(d, "#text")).map(str::to_string);

    let album = item
        .get("album")
        .and_then(|album| text(album, "#text"))
        .map(str::to_string);

    Some(TrackRecord {
        artist,
        song,
        album,
        uts_timestamp,
        display_datetime,
        image_id: first_image_id(item),
    })
}

/// Lazily normalizes a page of raw items, dropping now-playing entries.
pub fn process_tracks_response(page: &[Value]) -> impl Iterator<Item = TrackRecord> + '_ {
    page.iter().filter_map(normalize_track)
}
