//! End-to-end tests for page sequencing against a scripted API
//!
//! Covers request counts, the parameters sent with every page, retry
//! exhaustion and the shapes a listing can come back in.

mod common;

use common::{
    load_fixture, paged_body, track_item, ScriptedApi, RECENT_TRACKS_RAW_ITEMS, TEST_API_KEY,
    TEST_BASE_URL, TEST_USER,
};
use scrobble_mirror::lastfm::{FetchError, Pages, RequestParams, MAX_ATTEMPTS};
use serde_json::json;
use std::time::{Duration, Instant};

const RECENT: &str = "user.getrecenttracks";

fn three_page_api() -> ScriptedApi {
    ScriptedApi::new()
        .respond(RECENT, &[("page", "1")], load_fixture("recenttracks_page1.json"))
        .respond(RECENT, &[("page", "2")], load_fixture("recenttracks_page2.json"))
        .respond(RECENT, &[("page", "3")], load_fixture("recenttracks_page3.json"))
}

// =============================================================================
// Request sequencing
// =============================================================================

#[test]
fn test_fetches_each_declared_page_once() {
    let api = three_page_api();
    let client = api.client();

    let pages: Vec<_> = Pages::new(&client, RECENT, RequestParams::new())
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(pages.len(), 3);
    let numbers: Vec<u32> = pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);

    let sent: Vec<String> = api
        .requests_for(RECENT)
        .iter()
        .map(|r| r.param("page").unwrap().to_string())
        .collect();
    assert_eq!(sent, vec!["1", "2", "3"]);
}

#[test]
fn test_flattens_items_across_pages() {
    let api = three_page_api();
    let client = api.client();

    let items: Vec<_> = Pages::new(&client, RECENT, RequestParams::new())
        .flat_map(|page| page.unwrap().items.unwrap_or_default())
        .collect();

    assert_eq!(items.len(), RECENT_TRACKS_RAW_ITEMS);
    // The last page carries a single track collapsed into an object.
    assert_eq!(items.last().unwrap()["name"], "Candy Gun");
}

#[test]
fn test_request_count_follows_total_pages() {
    let mut api = ScriptedApi::new();
    for page in 1..=7u32 {
        let body = paged_body(
            "recenttracks",
            "track",
            vec![track_item("Nyos", "Fast Hands", "Waves", 1_000 + page as i64)],
            page,
            7,
            7,
        );
        let page_param = page.to_string();
        api = api.respond(RECENT, &[("page", page_param.as_str())], body);
    }
    let client = api.client();

    let count = Pages::new(&client, RECENT, RequestParams::new())
        .inspect(|page| assert!(page.is_ok()))
        .count();

    assert_eq!(count, 7);
    assert_eq!(api.requests().len(), 7);
}

#[test]
fn test_sends_base_and_paging_parameters() {
    let api = three_page_api();
    let client = api.client();
    let params = RequestParams::new().with("from", 1603584000);

    Pages::new(&client, RECENT, params)
        .page_size(3)
        .for_each(|page| assert!(page.is_ok()));

    for request in api.requests() {
        assert_eq!(request.url, TEST_BASE_URL);
        assert_eq!(request.param("method"), Some(RECENT));
        assert_eq!(request.param("api_key"), Some(TEST_API_KEY));
        assert_eq!(request.param("user"), Some(TEST_USER));
        assert_eq!(request.param("extended"), Some("1"));
        assert_eq!(request.param("format"), Some("json"));
        assert_eq!(request.param("limit"), Some("3"));
        assert_eq!(request.param("from"), Some("1603584000"));
    }
}

#[test]
fn test_default_page_size_is_200() {
    let api = three_page_api();
    let client = api.client();

    Pages::new(&client, RECENT, RequestParams::new()).for_each(drop);

    assert_eq!(api.requests()[0].param("limit"), Some("200"));
}

#[test]
fn test_can_resume_from_a_later_page() {
    let api = three_page_api();
    let client = api.client();

    let numbers: Vec<u32> = Pages::new(&client, RECENT, RequestParams::new())
        .starting_at(2)
        .map(|page| page.unwrap().number)
        .collect();

    assert_eq!(numbers, vec![2, 3]);
    assert_eq!(api.requests().len(), 2);
}

#[test]
fn test_waits_before_every_request() {
    let api = three_page_api();
    let client = api.client();
    let started = Instant::now();

    Pages::new(&client, RECENT, RequestParams::new())
        .delay(Some(Duration::from_millis(20)))
        .for_each(drop);

    assert!(started.elapsed() >= Duration::from_millis(60));
}

// =============================================================================
// Termination
// =============================================================================

#[test]
fn test_page_without_metadata_ends_the_sequence() {
    let api = ScriptedApi::new().respond(
        RECENT,
        &[],
        json!({"recenttracks": {"track": [track_item("Nyos", "Fast Hands", "Waves", 1)]}}),
    );
    let client = api.client();

    let pages: Vec<_> = Pages::new(&client, RECENT, RequestParams::new()).collect();

    assert_eq!(pages.len(), 1);
    let page = pages[0].as_ref().unwrap();
    assert_eq!(page.items.as_ref().map(Vec::len), Some(1));
    assert!(page.metadata.is_none());
}

#[test]
fn test_page_without_metadata_mid_sequence_keeps_declared_count() {
    let api = ScriptedApi::new()
        .respond(RECENT, &[("page", "1")], load_fixture("recenttracks_page1.json"))
        .respond(RECENT, &[("page", "2")], json!({"recenttracks": {"track": []}}))
        .respond(RECENT, &[("page", "3")], load_fixture("recenttracks_page3.json"));
    let client = api.client();

    let pages: Vec<_> = Pages::new(&client, RECENT, RequestParams::new())
        .collect::<Result<_, _>>()
        .unwrap();

    let numbers: Vec<u32> = pages.iter().map(|p| p.number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert!(pages[1].metadata.is_none());
    assert_eq!(api.requests_for(RECENT).len(), 3);
}

#[test]
fn test_missing_item_list_is_none() {
    let api = ScriptedApi::new().respond(
        RECENT,
        &[],
        json!({"recenttracks": {"track": null, "@attr": {"page": "1", "perPage": "200", "totalPages": "1", "total": "0"}}}),
    );
    let client = api.client();

    let pages: Vec<_> = Pages::new(&client, RECENT, RequestParams::new()).collect();

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].as_ref().unwrap().items, None);
}

#[test]
fn test_retries_then_surfaces_the_failure() {
    let api = ScriptedApi::new().otherwise(500, "");
    let client = api.client();

    let mut pages = Pages::new(&client, RECENT, RequestParams::new());
    let first = pages.next().unwrap();

    assert!(matches!(first, Err(FetchError::Http { status: 500, attempts }) if attempts == MAX_ATTEMPTS));
    assert!(pages.next().is_none());
    assert_eq!(api.requests().len(), 5);
}

#[test]
fn test_failure_mid_sequence_keeps_earlier_pages() {
    let api = ScriptedApi::new()
        .respond(RECENT, &[("page", "1")], load_fixture("recenttracks_page1.json"))
        .otherwise(503, "Service Unavailable");
    let client = api.client();

    let results: Vec<_> = Pages::new(&client, RECENT, RequestParams::new()).collect();

    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert_eq!(api.requests().len(), 1 + MAX_ATTEMPTS);
}

#[test]
fn test_ambiguous_root_is_malformed() {
    let api = ScriptedApi::new().respond(
        RECENT,
        &[],
        json!({"recenttracks": {"track": []}, "lovedtracks": {"track": []}}),
    );
    let client = api.client();

    let first = Pages::new(&client, RECENT, RequestParams::new()).next().unwrap();
    assert!(matches!(first, Err(FetchError::MalformedResponse(_))));
}
