// API client module: a small blocking HTTP client that talks to the trading
// bot's admin service. Every call is a single attempt; failures come back as a
// tagged `Failure` instead of being printed at the call site.

use anyhow::{Context, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::blocking::Client;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Failure;
use crate::model::{
    AccountSnapshot, Cleared, CollectionList, CollectionStats, DocumentPage, Notice, Reply,
    SettingsGroups,
};

/// Per-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Sentinel the health endpoint reports when the bot is up.
pub const HEALTHY: &str = "healthy";

const HEALTH_PATH: &str = "/api/health";

/// Bytes escaped inside one path segment. `/` and `\` would split the
/// segment, `?` and `#` would end the path, `%` would start an escape.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Base URL of the admin service plus the timeout applied to every request.
/// Immutable: changing server builds a new one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base_url: String,
    timeout: Duration,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim().trim_end_matches('/').to_string();
        Endpoint { base_url, timeout }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join `path` onto the base URL with exactly one slash between them.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

/// Blocking client for the bot's admin API. Owns its endpoint; use
/// [`ApiClient::reconfigure`] to point it at another server.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoint: Endpoint,
}

impl ApiClient {
    /// Build a client whose transport enforces the endpoint's timeout.
    pub fn new(endpoint: Endpoint) -> Result<Self> {
        let client = Client::builder()
            .timeout(endpoint.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient { client, endpoint })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Replace the base URL, keeping the configured timeout.
    pub fn reconfigure(&mut self, base_url: impl Into<String>) {
        self.endpoint = Endpoint::new(base_url, self.endpoint.timeout());
        info!(server = %self.endpoint.base_url(), "server changed");
    }

    /// Send one request and decode the JSON body of a 200 response.
    pub fn request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, Failure> {
        let url = self.endpoint.url(path);
        debug!(%method, %url, "sending request");

        let mut req = self.client.request(method.clone(), &url);
        if let Some(body) = body {
            req = req.json(body);
        }

        let res = req.send().map_err(|e| {
            warn!(%method, %url, error = %e, "request failed");
            Failure::Connection(e.to_string())
        })?;
        let status = res.status();
        let text = res
            .text()
            .map_err(|e| Failure::Connection(format!("failed to read response body: {}", e)))?;

        if status != StatusCode::OK {
            warn!(%method, %url, status = status.as_u16(), "server returned an error status");
            return Err(Failure::Http {
                status: status.as_u16(),
                message: server_message(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| {
            warn!(%method, %url, error = %e, "response body is not JSON");
            Failure::MalformedResponse(e.to_string())
        })
    }

    /// True only when the health endpoint answers `{"status": "healthy"}`.
    pub fn check_health(&self) -> bool {
        match self.request(Method::GET, HEALTH_PATH, None) {
            Ok(body) => body.get("status").and_then(Value::as_str) == Some(HEALTHY),
            Err(e) => {
                debug!(error = %e, "health check failed");
                false
            }
        }
    }

    /// Latest account, positions and summaries from the MT5 terminal.
    pub fn account_info(&self) -> Result<AccountSnapshot, Failure> {
        self.fetch(Method::GET, "/api/mt5-account-info", None)
    }

    /// Ask the bot to post `message` to its Discord channel.
    pub fn send_discord_test(&self, message: &str) -> Result<Notice, Failure> {
        let body = json!({ "message": message });
        self.fetch(Method::POST, "/api/discord/test", Some(&body))
    }

    pub fn settings_groups(&self) -> Result<Reply<SettingsGroups>, Failure> {
        self.fetch(Method::GET, "/api/config", None)
    }

    /// Overwrite the given keys of one settings group.
    pub fn update_settings(&self, group: &str, values: &Map<String, Value>) -> Result<Reply<Notice>, Failure> {
        let body = Value::Object(values.clone());
        let path = format!("/api/config/{}", segment(group)?);
        self.fetch(Method::PUT, &path, Some(&body))
    }

    pub fn collections(&self) -> Result<Reply<CollectionList>, Failure> {
        self.fetch(Method::GET, "/api/firebase/collections", None)
    }

    pub fn collection_stats(&self, collection: &str) -> Result<Reply<CollectionStats>, Failure> {
        let path = format!("/api/firebase/collection/{}/stats", segment(collection)?);
        self.fetch(Method::GET, &path, None)
    }

    /// Delete every document in a collection.
    pub fn clear_collection(&self, collection: &str) -> Result<Reply<Cleared>, Failure> {
        let path = format!("/api/firebase/collection/{}/clear", segment(collection)?);
        self.fetch(Method::DELETE, &path, None)
    }

    /// Delete documents older than `days` days.
    pub fn clear_old_documents(&self, collection: &str, days: u32) -> Result<Reply<Cleared>, Failure> {
        let path = format!(
            "/api/firebase/collection/{}/clear-old?days={}",
            segment(collection)?,
            days
        );
        self.fetch(Method::DELETE, &path, None)
    }

    pub fn documents(&self, collection: &str, limit: u32, offset: u32) -> Result<Reply<DocumentPage>, Failure> {
        let path = format!(
            "/api/firebase/collection/{}/documents?limit={}&offset={}",
            segment(collection)?,
            limit,
            offset
        );
        self.fetch(Method::GET, &path, None)
    }

    pub fn delete_document(&self, collection: &str, id: &str) -> Result<Reply<Notice>, Failure> {
        let path = format!("/api/firebase/document/{}/{}", segment(collection)?, segment(id)?);
        self.fetch(Method::DELETE, &path, None)
    }

    pub fn update_document(&self, collection: &str, id: &str, data: &Value) -> Result<Reply<Notice>, Failure> {
        let path = format!("/api/firebase/document/{}/{}", segment(collection)?, segment(id)?);
        self.fetch(Method::PUT, &path, Some(data))
    }

    /// `request` followed by decoding into a response shape.
    fn fetch<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<&Value>) -> Result<T, Failure> {
        let value = self.request(method, path, body)?;
        serde_json::from_value(value).map_err(|e| Failure::MalformedResponse(e.to_string()))
    }
}

/// Escape a collection name, document ID or group name for use as exactly
/// one path segment. Empty, `.` and `..` are refused: URL parsing would
/// collapse them into a different route even when escaped.
fn segment(raw: &str) -> Result<String, Failure> {
    match raw {
        "" | "." | ".." => Err(Failure::InvalidRequest(format!(
            "'{}' is not a usable name or ID",
            raw
        ))),
        _ => Ok(utf8_percent_encode(raw, SEGMENT).to_string()),
    }
}

/// Error text from a JSON error body: `error` first, then `message`.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .find_map(|key| value.get(*key))
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
}
