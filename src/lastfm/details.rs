//! Artist and album detail lookups (`artist.getinfo`, `album.getinfo`).

use super::client::{FetchError, LastFmClient, RequestParams};
use super::normalize::first_image_id;
use super::pages::as_list;
use serde_json::Value;

/// A tag or related artist reference: a name and its Last.fm page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedLink {
    pub name: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtistInfo {
    pub name: String,
    pub url: Option<String>,
    pub image_id: Option<String>,
    pub wiki: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<NamedLink>,
    /// Ordered by similarity, most similar first.
    pub similar: Vec<NamedLink>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AlbumInfo {
    pub name: String,
    pub artist: String,
    pub url: Option<String>,
    pub image_id: Option<String>,
    pub tags: Vec<NamedLink>,
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads `container.<list_key>` as a list of named links, tolerating the
/// single object and empty string shapes.
fn named_links(container: Option<&Value>, list_key: &str) -> Vec<NamedLink> {
    container
        .and_then(|c| c.get(list_key))
        .and_then(as_list)
        .unwrap_or_default()
        .iter()
        .filter_map(|entry| {
            Some(NamedLink {
                name: string_field(entry, "name")?,
                url: string_field(entry, "url"),
            })
        })
        .collect()
}

fn root<'a>(body: &'a Value, key: &str) -> Result<&'a Value, FetchError> {
    body.get(key)
        .filter(|v| v.is_object())
        .ok_or_else(|| FetchError::MalformedResponse(format!("missing '{}' object", key)))
}

/// Parses an `artist.getinfo` body.
pub fn parse_artist_info(body: &Value) -> Result<ArtistInfo, FetchError> {
    let artist = root(body, "artist")?;
    let bio = artist.get("bio");
    Ok(ArtistInfo {
        name: string_field(artist, "name").unwrap_or_default(),
        url: string_field(artist, "url"),
        image_id: first_image_id(artist),
        wiki: bio.and_then(|b| string_field(b, "content")),
        summary: bio.and_then(|b| string_field(b, "summary")),
        tags: named_links(artist.get("tags"), "tag"),
        similar: named_links(artist.get("similar"), "artist"),
    })
}

/// Parses an `album.getinfo` body.
pub fn parse_album_info(body: &Value) -> Result<AlbumInfo, FetchError> {
    let album = root(body, "album")?;
    // `artist` is a plain string here, but an object on some mirrors.
    let artist = match album.get("artist") {
        Some(Value::String(s)) => s.clone(),
        Some(artist @ Value::Object(_)) => string_field(artist, "name").unwrap_or_default(),
        _ => String::new(),
    };
    Ok(AlbumInfo {
        name: string_field(album, "name").unwrap_or_default(),
        artist,
        url: string_field(album, "url"),
        image_id: first_image_id(album),
        tags: named_links(album.get("tags"), "tag"),
    })
}

impl LastFmClient {
    /// Looks up `artist` without autocorrection. `params` are applied last.
    pub fn fetch_artist(&self, artist: &str, params: &RequestParams) -> Result<ArtistInfo, FetchError> {
        let mut query = RequestParams::new()
            .with("artist", artist)
            .with("autocorrect", 0);
        query.overlay(params);
        let body = self.fetch_page("artist.getinfo", &query)?;
        parse_artist_info(&body)
    }

    /// Looks up the (`album`, `artist`) pair without autocorrection.
    pub fn fetch_album(
        &self,
        album: &str,
        artist: &str,
        params: &RequestParams,
    ) -> Result<AlbumInfo, FetchError> {
        let mut query = RequestParams::new()
            .with("album", album)
            .with("artist", artist)
            .with("autocorrect", 0);
        query.overlay(params);
        let body = self.fetch_page("album.getinfo", &query)?;
        parse_album_info(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_artist_info() {
        let body = json!({
            "artist": {
                "name": "Melt-Banana",
                "url": "https://www.last.fm/music/Melt-Banana",
                "image": [{"#text": "https://lastfm.freetls.fastly.net/i/u/34s/d93fb932f7a34434bed332cbeb1b3ae6.png", "size": "small"}],
                "similar": {"artist": [
                    {"name": "Lightning Bolt", "url": "https://www.last.fm/music/Lightning+Bolt"},
                    {"name": "Boredoms", "url": "https://www.last.fm/music/Boredoms"}
                ]},
                "tags": {"tag": [
                    {"name": "noise rock", "url": "https://www.last.fm/tag/noise+rock"},
                    {"name": "japanese", "url": "https://www.last.fm/tag/japanese"}
                ]},
                "bio": {"summary": "Noise rock from Tokyo.", "content": "Melt-Banana is a noise rock band from Tokyo."}
            }
        });
        let info = parse_artist_info(&body).unwrap();

        assert_eq!(info.name, "Melt-Banana");
        assert_eq!(info.url.as_deref(), Some("https://www.last.fm/music/Melt-Banana"));
        assert_eq!(info.image_id.as_deref(), Some("d93fb932f7a34434bed332cbeb1b3ae6"));
        assert_eq!(info.summary.as_deref(), Some("Noise rock from Tokyo."));
        assert_eq!(info.tags.len(), 2);
        assert_eq!(info.similar[0].name, "Lightning Bolt");
        assert_eq!(info.similar[1].name, "Boredoms");
    }

    #[test]
    fn test_artist_info_tolerates_missing_sections() {
        let body = json!({"artist": {"name": "El Huervo", "tags": "", "similar": {"artist": {"name": "Perturbator"}}}});
        let info = parse_artist_info(&body).unwrap();

        assert!(info.tags.is_empty());
        assert_eq!(info.similar, vec![NamedLink { name: "Perturbator".to_string(), url: None }]);
        assert_eq!(info.wiki, None);
        assert_eq!(info.image_id, None);
    }

    #[test]
    fn test_parses_album_info() {
        let body = json!({
            "album": {
                "name": "Fetch",
                "artist": "Melt-Banana",
                "url": "https://www.last.fm/music/Melt-Banana/Fetch",
                "image": [{"#text": "https://lastfm.freetls.fastly.net/i/u/34s/ca2f75a0958349d2803f5afd9aba6936.png", "size": "small"}],
                "tags": {"tag": {"name": "noise", "url": "https://www.last.fm/tag/noise"}}
            }
        });
        let info = parse_album_info(&body).unwrap();

        assert_eq!(info.name, "Fetch");
        assert_eq!(info.artist, "Melt-Banana");
        assert_eq!(info.url.as_deref(), Some("https://www.last.fm/music/Melt-Banana/Fetch"));
        assert_eq!(info.image_id.as_deref(), Some("ca2f75a0958349d2803f5afd9aba6936"));
        assert_eq!(info.tags.len(), 1);
    }

    #[test]
    fn test_missing_root_is_malformed() {
        assert!(matches!(
            parse_artist_info(&json!({})),
            Err(FetchError::MalformedResponse(_))
        ));
        assert!(matches!(
            parse_album_info(&json!({"artist": {}})),
            Err(FetchError::MalformedResponse(_))
        ));
    }
}
