//! Scripted stand-in for the Last.fm API
//!
//! Responses are matched on the `method` parameter plus any extra
//! parameters given when scripting; the first matching rule wins. Every
//! request is recorded so tests can assert on what was sent.

#![allow(dead_code)]

use super::constants::{TEST_API_KEY, TEST_BASE_URL, TEST_USER};
use scrobble_mirror::lastfm::{HttpResponse, HttpTransport, LastFmClient};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// One recorded request.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub params: BTreeMap<String, String>,
}

impl Request {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

struct Rule {
    method: String,
    params: Vec<(String, String)>,
    status: u16,
    body: String,
}

impl Rule {
    fn matches(&self, params: &BTreeMap<String, String>) -> bool {
        params.get("method") == Some(&self.method)
            && self
                .params
                .iter()
                .all(|(key, value)| params.get(key) == Some(value))
    }
}

#[derive(Default)]
struct State {
    rules: Vec<Rule>,
    fallback: Option<(u16, String)>,
    requests: Vec<Request>,
}

#[derive(Clone, Default)]
pub struct ScriptedApi {
    state: Arc<Mutex<State>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers `method` requests carrying all of `params` with `body`.
    pub fn respond(self, method: &str, params: &[(&str, &str)], body: Value) -> Self {
        self.respond_with(method, params, 200, &body.to_string())
    }

    pub fn respond_with(self, method: &str, params: &[(&str, &str)], status: u16, body: &str) -> Self {
        self.state.lock().unwrap().rules.push(Rule {
            method: method.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            status,
            body: body.to_string(),
        });
        self
    }

    /// Response for requests no rule matches. Without one they get a 404.
    pub fn otherwise(self, status: u16, body: &str) -> Self {
        self.state.lock().unwrap().fallback = Some((status, body.to_string()));
        self
    }

    /// A client for the test user talking to this API.
    pub fn client(&self) -> LastFmClient {
        LastFmClient::new(TEST_BASE_URL, TEST_API_KEY, TEST_USER, Box::new(self.clone()))
    }

    pub fn requests(&self) -> Vec<Request> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn requests_for(&self, method: &str) -> Vec<Request> {
        self.requests()
            .into_iter()
            .filter(|r| r.param("method") == Some(method))
            .collect()
    }
}

impl HttpTransport for ScriptedApi {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, String> {
        let params: BTreeMap<String, String> = query.iter().cloned().collect();
        let mut state = self.state.lock().unwrap();
        state.requests.push(Request {
            url: url.to_string(),
            params: params.clone(),
        });

        let (status, body) = state
            .rules
            .iter()
            .find(|rule| rule.matches(&params))
            .map(|rule| (rule.status, rule.body.clone()))
            .or_else(|| state.fallback.clone())
            .unwrap_or((404, String::new()));
        Ok(HttpResponse { status, body })
    }
}
