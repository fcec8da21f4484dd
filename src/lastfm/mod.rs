//! Last.fm API access: the request client, page iteration, response
//! normalization and detail lookups.

mod client;
mod details;
mod normalize;
mod pages;

pub use client::{
    FetchError, HttpResponse, HttpTransport, LastFmClient, RequestParams, ReqwestTransport,
    INVALID_PARAMETERS_ERROR, LASTFM_API_BASE, MAX_ATTEMPTS,
};
pub use details::{parse_album_info, parse_artist_info, AlbumInfo, ArtistInfo, NamedLink};
pub use normalize::{
    first_image_id, image_id_from_url, normalize_track, process_tracks_response, TrackRecord,
};
pub use pages::{as_list, split_page, Page, PageMetadata, Pages, DEFAULT_PAGE_SIZE};
