//! Typed tool inputs
//!
//! One struct per tool. Unknown keys are rejected at deserialization and
//! [`ToolInput::validate`] normalises strings and checks bounds before any
//! network I/O happens.

use crate::convert::parse_selector;
use crate::error::FetchError;
use crate::extract::DEFAULT_LINK_SELECTOR;
use crate::impersonate::Impersonate;
use crate::options::{RequestOptions, SessionOptions};
use crate::types::HttpMethod;
use crate::{DEFAULT_JSON_MAX_CHARS, DEFAULT_LINKS_MAX_CHARS, DEFAULT_MAX_CHARS, DEFAULT_TEXT_MAX_CHARS};
use regex::Regex;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;

pub const TOOL_FETCH_PAGE: &str = "stealth_fetch_page";
pub const TOOL_FETCH_TEXT: &str = "stealth_fetch_text";
pub const TOOL_FETCH_JSON: &str = "stealth_fetch_json";
pub const TOOL_EXTRACT_LINKS: &str = "stealth_extract_links";
pub const TOOL_FETCH_HEADERS: &str = "stealth_fetch_headers";
pub const TOOL_EXTRACT_METADATA: &str = "stealth_extract_metadata";
pub const TOOL_EXTRACT_TABLES: &str = "stealth_extract_tables";
pub const TOOL_FETCH_ROBOTS: &str = "stealth_fetch_robots";
pub const TOOL_FETCH_FEED: &str = "stealth_fetch_feed";
pub const TOOL_FETCH_BULK: &str = "stealth_fetch_bulk";

const MAX_CHARS_LIMIT: usize = 1_000_000;
const MAX_TIMEOUT_SECS: f64 = 300.0;

/// A deserializable, self-validating tool input
pub trait ToolInput: DeserializeOwned + JsonSchema {
    /// Registered tool name
    const NAME: &'static str;
    /// Description advertised to MCP clients
    const DESCRIPTION: &'static str;

    /// Normalise fields and check bounds
    fn validate(&mut self) -> Result<(), FetchError>;
}

fn default_max_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_text_max_chars() -> usize {
    DEFAULT_TEXT_MAX_CHARS
}

fn default_json_max_chars() -> usize {
    DEFAULT_JSON_MAX_CHARS
}

fn default_links_max_chars() -> usize {
    DEFAULT_LINKS_MAX_CHARS
}

fn default_link_selector() -> String {
    DEFAULT_LINK_SELECTOR.to_string()
}

fn default_max_results() -> usize {
    100
}

fn default_max_items() -> usize {
    50
}

fn default_max_concurrency() -> usize {
    5
}

fn default_max_chars_per_url() -> usize {
    10_000
}

fn check_url(url: &mut String, field: &'static str) -> Result<(), FetchError> {
    let trimmed = url.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(FetchError::invalid_input(
            field,
            "URL must start with http:// or https://",
        ));
    }
    if trimmed.len() != url.len() {
        *url = trimmed.to_string();
    }
    Ok(())
}

fn check_range<T: PartialOrd + Display + Copy>(
    value: T,
    min: T,
    max: T,
    field: &'static str,
) -> Result<(), FetchError> {
    if value < min || value > max {
        return Err(FetchError::invalid_input(
            field,
            format!("must be between {min} and {max}"),
        ));
    }
    Ok(())
}

fn check_max_chars(value: usize) -> Result<(), FetchError> {
    check_range(value, 1, MAX_CHARS_LIMIT, "max_chars")
}

fn check_timeout(timeout: Option<f64>) -> Result<(), FetchError> {
    match timeout {
        Some(t) if !(t > 0.0 && t <= MAX_TIMEOUT_SECS) => Err(FetchError::invalid_input(
            "timeout",
            "must be greater than 0 and at most 300 seconds",
        )),
        _ => Ok(()),
    }
}

/// Trim an optional string, dropping it when nothing is left
fn trim_optional(value: &mut Option<String>) {
    if let Some(text) = value.take() {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            *value = Some(trimmed.to_string());
        }
    }
}

fn check_options(
    session: Option<&SessionOptions>,
    request: Option<&RequestOptions>,
) -> Result<(), FetchError> {
    if let Some(session) = session {
        session.validate()?;
    }
    if let Some(request) = request {
        request.validate()?;
    }
    Ok(())
}

fn check_selector(selector: Option<&str>) -> Result<(), FetchError> {
    if let Some(selector) = selector {
        parse_selector(selector)?;
    }
    Ok(())
}

/// Input for `stealth_fetch_page`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchPageInput {
    /// Target URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// Extra request headers
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    /// Request timeout in seconds (0 < t <= 300)
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Follow HTTP redirects
    #[serde(default)]
    pub follow_redirects: Option<bool>,
    /// Session-level options; supplying them opens a session for this call only
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    /// Per-request transport options
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
    /// Maximum characters returned
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl ToolInput for FetchPageInput {
    const NAME: &'static str = TOOL_FETCH_PAGE;
    const DESCRIPTION: &'static str =
        "Fetch a web page with browser TLS impersonation and return raw HTML.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        check_timeout(self.timeout)?;
        check_max_chars(self.max_chars)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Input for `stealth_fetch_text`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchTextInput {
    /// Target URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// CSS selector scoping the extracted content
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
    /// Maximum characters returned
    #[serde(default = "default_text_max_chars")]
    pub max_chars: usize,
}

impl ToolInput for FetchTextInput {
    const NAME: &'static str = TOOL_FETCH_TEXT;
    const DESCRIPTION: &'static str = "Fetch a page and return cleaned readability-style text content. \
        Removes scripts/navigation chrome and preserves key structure such as headings, lists, and links.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        trim_optional(&mut self.selector);
        check_selector(self.selector.as_deref())?;
        check_max_chars(self.max_chars)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Methods the JSON tool accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum JsonMethod {
    #[default]
    Get,
    Post,
}

impl From<JsonMethod> for HttpMethod {
    fn from(method: JsonMethod) -> Self {
        match method {
            JsonMethod::Get => HttpMethod::Get,
            JsonMethod::Post => HttpMethod::Post,
        }
    }
}

/// Input for `stealth_fetch_json`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchJsonInput {
    /// Target URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// Extra request headers
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    /// GET or POST
    #[serde(default)]
    pub method: JsonMethod,
    /// JSON text sent as the POST body
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
    /// Maximum characters returned
    #[serde(default = "default_json_max_chars")]
    pub max_chars: usize,
}

impl ToolInput for FetchJsonInput {
    const NAME: &'static str = TOOL_FETCH_JSON;
    const DESCRIPTION: &'static str = "Fetch a JSON API endpoint with browser impersonation and return pretty JSON text. \
        Supports GET and POST requests, with optional JSON body parsing for POST operations.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        trim_optional(&mut self.body);
        check_max_chars(self.max_chars)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Input for `stealth_extract_links`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractLinksInput {
    /// Target URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// CSS selector for link elements
    #[serde(default = "default_link_selector")]
    pub selector: String,
    /// Regex searched in each raw href
    #[serde(default)]
    pub pattern: Option<String>,
    /// Maximum links returned (1..=10000)
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
    /// Maximum characters returned
    #[serde(default = "default_links_max_chars")]
    pub max_chars: usize,
}

impl ToolInput for ExtractLinksInput {
    const NAME: &'static str = TOOL_EXTRACT_LINKS;
    const DESCRIPTION: &'static str = "Fetch a page and extract matching links as JSON. \
        Returns link text, raw href, and resolved absolute URL values.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        let selector = self.selector.trim();
        if selector.is_empty() {
            return Err(FetchError::invalid_input("selector", "must not be empty"));
        }
        self.selector = selector.to_string();
        parse_selector(&self.selector)?;
        trim_optional(&mut self.pattern);
        if let Some(pattern) = &self.pattern {
            Regex::new(pattern).map_err(|e| FetchError::InvalidPattern(e.to_string()))?;
        }
        check_range(self.max_results, 1, 10_000, "max_results")?;
        check_max_chars(self.max_chars)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Input for `stealth_fetch_headers`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchHeadersInput {
    /// Target URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// Extra request headers
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,
    /// Request timeout in seconds (0 < t <= 300)
    #[serde(default)]
    pub timeout: Option<f64>,
    /// Follow HTTP redirects
    #[serde(default)]
    pub follow_redirects: Option<bool>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl ToolInput for FetchHeadersInput {
    const NAME: &'static str = TOOL_FETCH_HEADERS;
    const DESCRIPTION: &'static str = "Fetch a URL and return HTTP status code, final URL, and response headers as JSON. \
        Useful for content-type detection, redirect inspection, cache analysis, and auth header \
        verification without fetching the full response body.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        check_timeout(self.timeout)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Input for `stealth_extract_metadata`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractMetadataInput {
    /// Target URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
    /// Maximum characters returned
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl ToolInput for ExtractMetadataInput {
    const NAME: &'static str = TOOL_EXTRACT_METADATA;
    const DESCRIPTION: &'static str = "Fetch a page and extract structured metadata as JSON. \
        Returns JSON-LD script blocks, Open Graph (og:*) tags, Twitter Card (twitter:*) tags, \
        and standard <meta> tags in a single structured object.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        check_max_chars(self.max_chars)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Input for `stealth_extract_tables`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtractTablesInput {
    /// Target URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// CSS selector scoping which tables are read
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
    /// Maximum characters returned
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl ToolInput for ExtractTablesInput {
    const NAME: &'static str = TOOL_EXTRACT_TABLES;
    const DESCRIPTION: &'static str = "Fetch a page and extract all HTML tables as a JSON list of {headers, rows} objects. \
        Automatically detects header rows from <thead> or leading <th> elements. Useful for \
        financial data, comparison tables, sports results, and pricing grids.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        trim_optional(&mut self.selector);
        check_selector(self.selector.as_deref())?;
        check_max_chars(self.max_chars)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Input for `stealth_fetch_robots`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchRobotsInput {
    /// Any URL on the site; only its scheme and host are used
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
}

impl ToolInput for FetchRobotsInput {
    const NAME: &'static str = TOOL_FETCH_ROBOTS;
    const DESCRIPTION: &'static str = "Fetch and parse a site's robots.txt, returning structured Allow/Disallow/Sitemap data. \
        Derives the robots.txt URL from the scheme and host of the provided URL. Useful for \
        planning respectful crawls and discovering sitemap locations.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

/// Input for `stealth_fetch_feed`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchFeedInput {
    /// Feed URL (http:// or https://)
    pub url: String,
    /// Browser fingerprint target (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// Maximum feed items returned (1..=500)
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    #[serde(default)]
    pub request_options: Option<RequestOptions>,
    /// Maximum characters returned
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl ToolInput for FetchFeedInput {
    const NAME: &'static str = TOOL_FETCH_FEED;
    const DESCRIPTION: &'static str = "Fetch and parse an RSS 2.0 or Atom feed, returning items as structured JSON. \
        Returns feed title, feed link, and a list of items with title, link, published date, \
        and summary. Useful for tracking changelogs, blog updates, and news feeds.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_url(&mut self.url, "url")?;
        check_range(self.max_items, 1, 500, "max_items")?;
        check_max_chars(self.max_chars)?;
        check_options(self.session_options.as_ref(), self.request_options.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct BulkEntry {
    pub url: String,
}

/// A bulk target, given either as a bare URL or as `{"url": ...}`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BulkTarget {
    Plain(String),
    Entry(BulkEntry),
}

impl BulkTarget {
    fn url_mut(&mut self) -> &mut String {
        match self {
            BulkTarget::Plain(url) => url,
            BulkTarget::Entry(entry) => &mut entry.url,
        }
    }

    pub fn into_url(self) -> String {
        match self {
            BulkTarget::Plain(url) => url,
            BulkTarget::Entry(entry) => entry.url,
        }
    }
}

/// Input for `stealth_fetch_bulk`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FetchBulkInput {
    /// URLs to fetch (1..=50)
    pub urls: Vec<BulkTarget>,
    /// Browser fingerprint target applied to all requests (default: chrome)
    #[serde(default)]
    pub impersonate: Option<Impersonate>,
    /// Maximum concurrent requests (1..=20)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Seconds to wait after acquiring a slot before each request (0..=60)
    #[serde(default)]
    pub delay: f64,
    /// Per-request timeout in seconds (0 < t <= 300)
    #[serde(default)]
    pub timeout: Option<f64>,
    #[serde(default)]
    pub session_options: Option<SessionOptions>,
    /// Maximum body characters returned per URL (1..=100000)
    #[serde(default = "default_max_chars_per_url")]
    pub max_chars_per_url: usize,
}

impl ToolInput for FetchBulkInput {
    const NAME: &'static str = TOOL_FETCH_BULK;
    const DESCRIPTION: &'static str = "Fetch multiple URLs concurrently and return per-URL results as a JSON list. \
        Each result includes status (\"ok\" or \"error\"), status_code, final_url, and body text. \
        Errors for individual URLs are isolated; one failure does not stop the others.";

    fn validate(&mut self) -> Result<(), FetchError> {
        check_range(self.urls.len(), 1, 50, "urls")?;
        for target in &mut self.urls {
            check_url(target.url_mut(), "urls")?;
        }
        check_range(self.max_concurrency, 1, 20, "max_concurrency")?;
        if !(0.0..=60.0).contains(&self.delay) {
            return Err(FetchError::invalid_input(
                "delay",
                "must be between 0 and 60 seconds",
            ));
        }
        check_timeout(self.timeout)?;
        check_range(self.max_chars_per_url, 1, 100_000, "max_chars_per_url")?;
        check_options(self.session_options.as_ref(), None)
    }
}
