//! Lazy iteration over every page of a paginated Last.fm resource.
//!
//! Paginated responses look like `{"<root>": {"<items>": [...], "@attr": {...}}}`
//! where both key names depend on the method, so they are discovered from
//! the shape of each response.

use super::client::{FetchError, LastFmClient, RequestParams};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 200;
const ATTR_KEY: &str = "@attr";

/// The `@attr` block of a paginated response. The API sends every number
/// as a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageMetadata {
    #[serde(deserialize_with = "number_from_string")]
    pub page: u64,
    #[serde(rename = "perPage", deserialize_with = "number_from_string")]
    pub per_page: u64,
    #[serde(deserialize_with = "number_from_string")]
    pub total: u64,
    #[serde(rename = "totalPages", deserialize_with = "number_from_string")]
    pub total_pages: u64,
    #[serde(default)]
    pub user: Option<String>,
}

fn number_from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        String(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// One fetched page. `items` is `None` when the page carries no item list,
/// `metadata` is `None` when it carries no usable `@attr` block.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub number: u32,
    pub items: Option<Vec<Value>>,
    pub metadata: Option<PageMetadata>,
}

/// Splits a paginated body into its item list and `@attr` block.
///
/// The root is the sole top-level key and the item list is the sole
/// non-`@attr` key within it. A missing key yields `None`; more than one
/// candidate is a [`FetchError::MalformedResponse`].
pub fn split_page(body: &Value) -> Result<(Option<Vec<Value>>, Option<PageMetadata>), FetchError> {
    let root = match sole_entry(body.as_object(), |_| true, "root")? {
        Some((_, root)) => root,
        None => return Ok((None, None)),
    };
    let root = match root.as_object() {
        Some(root) => root,
        None => return Ok((None, None)),
    };

    let metadata = root
        .get(ATTR_KEY)
        .and_then(|attr| serde_json::from_value::<PageMetadata>(attr.clone()).ok());

    let items = sole_entry(Some(root), |key| key != ATTR_KEY, "item list")?
        .and_then(|(_, items)| as_list(items));

    Ok((items, metadata))
}

fn sole_entry<'a>(
    object: Option<&'a Map<String, Value>>,
    accept: impl Fn(&str) -> bool,
    what: &str,
) -> Result<Option<(&'a String, &'a Value)>, FetchError> {
    let object = match object {
        Some(object) => object,
        None => return Ok(None),
    };
    let mut candidates = object.iter().filter(|(key, _)| accept(key));
    let first = candidates.next();
    if candidates.next().is_some() {
        let keys: Vec<&str> = object.keys().map(String::as_str).collect();
        return Err(FetchError::MalformedResponse(format!(
            "ambiguous {} key among [{}]",
            what,
            keys.join(", ")
        )));
    }
    Ok(first)
}

/// Normalizes list-ish values: the API collapses single element lists into
/// a bare object and sends empty lists as `null` or an empty string.
pub fn as_list(value: &Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items.clone()),
        Value::Object(_) => Some(vec![value.clone()]),
        Value::String(s) if s.trim().is_empty() => Some(Vec::new()),
        _ => None,
    }
}

/// Pull based sequence of pages, consumed once from the first page to the
/// last one declared by the API. A fetch failure ends the sequence.
///
/// A page without `@attr` ends the sequence only when no earlier page
/// declared a page count.
pub struct Pages<'a> {
    client: &'a LastFmClient,
    method: String,
    params: RequestParams,
    next_page: u32,
    page_size: u32,
    delay: Option<Duration>,
    total_pages: Option<u64>,
    done: bool,
}

impl<'a> Pages<'a> {
    pub fn new(client: &'a LastFmClient, method: &str, params: RequestParams) -> Self {
        Self {
            client,
            method: method.to_string(),
            params,
            next_page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            delay: None,
            total_pages: None,
            done: false,
        }
    }

    pub fn starting_at(mut self, page: u32) -> Self {
        self.next_page = page.max(1);
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Sleeps for `delay` before every request, the first one included.
    pub fn delay(mut self, delay: Option<Duration>) -> Self {
        self.delay = delay.filter(|d| !d.is_zero());
        self
    }

    fn fetch(&self, page: u32) -> Result<Page, FetchError> {
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }
        let mut params = self.params.clone();
        params.set("page", page);
        params.set("limit", self.page_size);

        let body = self.client.fetch_page(&self.method, &params)?;
        let (items, metadata) = split_page(&body)?;
        debug!(
            "{} page {}/{}: {} items",
            self.method,
            page,
            metadata
                .as_ref()
                .map(|m| m.total_pages.to_string())
                .unwrap_or_else(|| "?".to_string()),
            items.as_ref().map(Vec::len).unwrap_or(0)
        );
        Ok(Page {
            number: page,
            items,
            metadata,
        })
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Page, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let page = self.next_page;
        match self.fetch(page) {
            Ok(fetched) => {
                match &fetched.metadata {
                    Some(metadata) => self.total_pages = Some(metadata.total_pages),
                    None => {
                        if let Some(total) = self.total_pages {
                            warn!(
                                "{} page {} has no page metadata, continuing up to page {}",
                                self.method, page, total
                            );
                        }
                    }
                }
                match self.total_pages {
                    Some(total) if u64::from(page) < total => self.next_page = page + 1,
                    _ => self.done = true,
                }
                Some(Ok(fetched))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Pages<'_> {}
