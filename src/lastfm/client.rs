//! Last.fm API client.
//!
//! Every request carries the same base parameters (method, key, user,
//! extended responses, JSON format); callers overlay their own on top.
//! Non-success responses are retried in place, with no backoff, up to
//! [`MAX_ATTEMPTS`] times.

use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const LASTFM_API_BASE: &str = "http://ws.audioscrobbler.com/2.0";
pub const MAX_ATTEMPTS: usize = 5;

/// API error code for an artist, album or track Last.fm does not know.
pub const INVALID_PARAMETERS_ERROR: i64 = 6;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Last.fm request failed with status {status} after {attempts} attempts")]
    Http { status: u16, attempts: usize },

    #[error("Last.fm request could not be sent after {attempts} attempts: {message}")]
    Transport { message: String, attempts: usize },

    #[error("Last.fm API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Malformed Last.fm response: {0}")]
    MalformedResponse(String),
}

impl FetchError {
    /// True when Last.fm answered that the requested entity does not exist.
    /// Rate limits and outages report other codes.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Api { code, .. } if *code == INVALID_PARAMETERS_ERROR)
    }
}

/// Raw response handed back by an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests. Errors are connection level failures, a response
/// with any status is not an error at this layer.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, String>;
}

pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, String> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| e.to_string())?;
        Ok(HttpResponse { status, body })
    }
}

/// Query parameters of a single request.
///
/// Later inserts replace earlier ones, so the client builds the defaults
/// first and then applies the caller's parameters over them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.0.insert(key.to_string(), value.to_string());
    }

    /// Sets `key` only when a value is present.
    pub fn set_opt<T: ToString>(&mut self, key: &str, value: Option<T>) {
        if let Some(value) = value {
            self.set(key, value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn overlay(&mut self, other: &RequestParams) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    fn to_query(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Immutable client configuration plus the transport used to reach the API.
pub struct LastFmClient {
    base_url: String,
    api_key: String,
    username: String,
    transport: Box<dyn HttpTransport>,
}

impl LastFmClient {
    pub fn new(
        base_url: &str,
        api_key: &str,
        username: &str,
        transport: Box<dyn HttpTransport>,
    ) -> Self {
        Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            username: username.to_string(),
            transport,
        }
    }

    /// Client talking to the public API through reqwest.
    pub fn with_reqwest(
        base_url: &str,
        api_key: &str,
        username: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(timeout)?;
        Ok(Self::new(base_url, api_key, username, Box::new(transport)))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    fn default_params(&self, method: &str) -> RequestParams {
        RequestParams::new()
            .with("method", method)
            .with("api_key", &self.api_key)
            .with("user", &self.username)
            .with("extended", 1)
            .with("format", "json")
    }

    /// Fetches one page of `method` and returns the parsed JSON body.
    ///
    /// An error document (`{"error": .., "message": ..}`) in a successful
    /// response is surfaced as [`FetchError::Api`].
    pub fn fetch_page(&self, method: &str, params: &RequestParams) -> Result<Value, FetchError> {
        let mut query = self.default_params(method);
        query.overlay(params);
        let query = query.to_query();

        let mut last_failure = None;
        for attempt in 1..=MAX_ATTEMPTS {
            debug!("GET {} {} (attempt {})", self.base_url, method, attempt);
            match self.transport.get(&self.base_url, &query) {
                Ok(response) if response.is_success() => return parse_body(&response.body),
                Ok(response) => {
                    warn!(
                        "Last.fm {} returned status {} (attempt {}/{})",
                        method, response.status, attempt, MAX_ATTEMPTS
                    );
                    last_failure = Some(FetchError::Http {
                        status: response.status,
                        attempts: attempt,
                    });
                }
                Err(message) => {
                    warn!(
                        "Last.fm {} request failed: {} (attempt {}/{})",
                        method, message, attempt, MAX_ATTEMPTS
                    );
                    last_failure = Some(FetchError::Transport {
                        message,
                        attempts: attempt,
                    });
                }
            }
        }
        Err(last_failure.unwrap_or(FetchError::Transport {
            message: "no attempt was made".to_string(),
            attempts: 0,
        }))
    }
}

fn parse_body(body: &str) -> Result<Value, FetchError> {
    // An empty body is treated like an empty document rather than garbage.
    if body.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| FetchError::MalformedResponse(format!("invalid JSON: {}", e)))?;
    if let Some(code) = value.get("error").and_then(Value::as_i64) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(FetchError::Api { code, message });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct ScriptedTransport {
        status: u16,
        body: String,
        requests: Arc<Mutex<Vec<(String, Vec<(String, String)>)>>>,
    }

    impl ScriptedTransport {
        fn new(status: u16, body: &str) -> Self {
            Self {
                status,
                body: body.to_string(),
                requests: Default::default(),
            }
        }

        fn last_param(&self, key: &str) -> Option<String> {
            let requests = self.requests.lock().unwrap();
            let (_, query) = requests.last()?;
            query
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn get(&self, url: &str, query: &[(String, String)]) -> Result<HttpResponse, String> {
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), query.to_vec()));
            Ok(HttpResponse {
                status: self.status,
                body: self.body.clone(),
            })
        }
    }

    struct FailingTransport {
        calls: Arc<Mutex<usize>>,
    }

    impl HttpTransport for FailingTransport {
        fn get(&self, _url: &str, _query: &[(String, String)]) -> Result<HttpResponse, String> {
            *self.calls.lock().unwrap() += 1;
            Err("connection refused".to_string())
        }
    }

    fn client(transport: &ScriptedTransport) -> LastFmClient {
        LastFmClient::new(
            LASTFM_API_BASE,
            "abcdefg",
            "jammus",
            Box::new(transport.clone()),
        )
    }

    #[test]
    fn test_requests_go_to_base_url() {
        let transport = ScriptedTransport::new(200, "{}");
        client(&transport)
            .fetch_page("user.getrecenttracks", &RequestParams::new())
            .unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, "http://ws.audioscrobbler.com/2.0");
    }

    #[test]
    fn test_sends_default_parameters() {
        let transport = ScriptedTransport::new(200, "{}");
        client(&transport)
            .fetch_page("user.getrecenttracks", &RequestParams::new())
            .unwrap();

        assert_eq!(
            transport.last_param("method").as_deref(),
            Some("user.getrecenttracks")
        );
        assert_eq!(transport.last_param("api_key").as_deref(), Some("abcdefg"));
        assert_eq!(transport.last_param("user").as_deref(), Some("jammus"));
        assert_eq!(transport.last_param("extended").as_deref(), Some("1"));
        assert_eq!(transport.last_param("format").as_deref(), Some("json"));
    }

    #[test]
    fn test_caller_parameters_extend_and_override_defaults() {
        let transport = ScriptedTransport::new(200, "{}");
        let params = RequestParams::new().with("page", 20).with("user", "rj");
        client(&transport)
            .fetch_page("user.getrecenttracks", &params)
            .unwrap();

        assert_eq!(transport.last_param("page").as_deref(), Some("20"));
        assert_eq!(transport.last_param("user").as_deref(), Some("rj"));
    }

    #[test]
    fn test_returns_parsed_json() {
        let transport = ScriptedTransport::new(200, r#"{"success": true}"#);
        let body = client(&transport)
            .fetch_page("user.getrecenttracks", &RequestParams::new())
            .unwrap();
        assert_eq!(body["success"], Value::Bool(true));
    }

    #[test]
    fn test_empty_body_is_an_empty_document() {
        let transport = ScriptedTransport::new(200, "");
        let body = client(&transport)
            .fetch_page("user.getrecenttracks", &RequestParams::new())
            .unwrap();
        assert_eq!(body, serde_json::json!({}));
    }

    #[test]
    fn test_retries_failed_requests_five_times() {
        let transport = ScriptedTransport::new(500, "");
        let result = client(&transport).fetch_page("user.getrecenttracks", &RequestParams::new());

        assert!(matches!(
            result,
            Err(FetchError::Http {
                status: 500,
                attempts: 5
            })
        ));
        assert_eq!(transport.request_count(), 5);
    }

    #[test]
    fn test_transport_failures_are_retried() {
        let calls = Arc::new(Mutex::new(0));
        let client = LastFmClient::new(
            LASTFM_API_BASE,
            "abcdefg",
            "jammus",
            Box::new(FailingTransport {
                calls: calls.clone(),
            }),
        );
        let result = client.fetch_page("user.getrecenttracks", &RequestParams::new());

        assert!(matches!(result, Err(FetchError::Transport { attempts: 5, .. })));
        assert_eq!(*calls.lock().unwrap(), 5);
    }

    #[test]
    fn test_error_document_is_an_api_error() {
        let transport = ScriptedTransport::new(
            200,
            r#"{"error": 6, "message": "The artist you supplied could not be found"}"#,
        );
        let result = client(&transport).fetch_page("artist.getinfo", &RequestParams::new());

        match result {
            Err(FetchError::Api { code, message }) => {
                assert_eq!(code, 6);
                assert!(message.contains("could not be found"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_only_invalid_parameters_error_means_not_found() {
        let not_found = FetchError::Api {
            code: 6,
            message: "The artist you supplied could not be found".to_string(),
        };
        let rate_limited = FetchError::Api {
            code: 29,
            message: "Rate Limit Exceeded".to_string(),
        };
        let http = FetchError::Http {
            status: 404,
            attempts: 5,
        };

        assert!(not_found.is_not_found());
        assert!(!rate_limited.is_not_found());
        assert!(!http.is_not_found());
    }

    #[test]
    fn test_invalid_json_is_malformed() {
        let transport = ScriptedTransport::new(200, "<html>oops</html>");
        let result = client(&transport).fetch_page("user.getrecenttracks", &RequestParams::new());
        assert!(matches!(result, Err(FetchError::MalformedResponse(_))));
    }

    #[test]
    fn test_set_opt_skips_missing_values() {
        let mut params = RequestParams::new();
        params.set_opt("from", Some(1234));
        params.set_opt::<i64>("to", None);
        assert_eq!(params.get("from"), Some("1234"));
        assert_eq!(params.get("to"), None);
    }
}
