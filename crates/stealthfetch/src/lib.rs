//! Stealthfetch - read-only fetch-and-transform web tools
//!
//! Each tool fetches one web resource with a browser-like request
//! fingerprint and turns the payload into bounded text or structured JSON:
//! cleaned page text, links, tables, page metadata, RSS/Atom feeds and
//! robots.txt policies.
//!
//! ## Layers
//!
//! - [`Transport`] performs one HTTP exchange. [`Session`] is the reqwest
//!   implementation.
//! - [`fetch`] wraps a transport with URL checks, the HTTP status gate and
//!   truncation.
//! - Reducers and extractors ([`reduce`], [`links`], [`metadata`], [`tables`],
//!   [`feed`], [`robots`]) are pure functions over the fetched text.
//! - [`Toolkit`] validates typed inputs, merges options and runs the tools,
//!   including the bounded-concurrency bulk fetch.
//!
//! ```no_run
//! # async fn demo() -> Result<(), stealthfetch::FetchError> {
//! use stealthfetch::Toolkit;
//!
//! let toolkit = Toolkit::builder().build()?;
//! let text = toolkit
//!     .call("stealth_fetch_text", serde_json::json!({"url": "https://example.com"}))
//!     .await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```

pub mod client;
mod convert;
mod error;
pub mod extract;
mod feed;
mod impersonate;
pub mod inputs;
pub mod options;
mod robots;
mod session;
mod tool;
mod transport;
mod truncate;
mod types;

pub use client::fetch;
pub use convert::reduce;
pub use error::{ErrorKind, FetchError};
pub use extract::{links, metadata, tables, ExtractedLink, ExtractedTable, PageMetadata};
pub use feed::{feed, FeedDocument, FeedItem};
pub use impersonate::Impersonate;
pub use inputs::ToolInput;
pub use options::{RequestOptions, SessionOptions};
pub use robots::{robots, AgentRules, RobotsPolicy, RobotsReport};
pub use session::{Session, SessionScope};
pub use tool::{ToolAnnotations, ToolDescriptor, Toolkit, ToolkitBuilder};
pub use transport::{RequestBody, Transport, TransportError, TransportRequest, TransportResponse};
pub use truncate::truncate;
pub use types::{BulkItem, BulkStatus, FetchCall, FetchResult, HeadersReport, HttpMethod};

/// Browser profile used when a call does not name one
pub const DEFAULT_IMPERSONATE: Impersonate = Impersonate::Chrome;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT: f64 = 30.0;

/// Default output bound for most tools
pub const DEFAULT_MAX_CHARS: usize = 100_000;

pub const DEFAULT_TEXT_MAX_CHARS: usize = 50_000;
pub const DEFAULT_JSON_MAX_CHARS: usize = 100_000;
pub const DEFAULT_LINKS_MAX_CHARS: usize = 100_000;

/// Fetch bound for robots.txt bodies
pub const ROBOTS_MAX_CHARS: usize = 500_000;

/// Response body characters quoted in HTTP status errors
pub const HTTP_ERROR_SNIPPET_CHARS: usize = 300;

/// Short description for tool listings
pub const TOOL_DESCRIPTION: &str = r#"Read-only web fetch tools with browser-like request fingerprints.

- Raw HTML, cleaned text, pretty JSON and response headers
- Link, table and metadata extraction as JSON
- RSS/Atom feeds and robots.txt parsed into structured JSON
- Bulk fetch with bounded concurrency and per-URL error isolation"#;

/// Extended documentation for LLM consumption (llmtxt)
pub const TOOL_LLMTXT: &str = r#"# Stealthfetch Tools

Fetch a web resource with a browser impersonation profile and return a
size-bounded textual or structured result. Every tool is read-only.

## Tools
- `stealth_fetch_page`: raw response text (HTML)
- `stealth_fetch_text`: readable text with `#` headings, `- ` list items and `[text](href)` links
- `stealth_fetch_json`: pretty-printed JSON (GET or POST); non-JSON bodies come back with a warning line
- `stealth_extract_links`: `[{text, href, absolute_url}]`, optional CSS `selector` and regex `pattern`
- `stealth_fetch_headers`: `{status_code, final_url, headers}`
- `stealth_extract_metadata`: `{json_ld, opengraph, twitter, meta}`
- `stealth_extract_tables`: `[{headers, rows}]`
- `stealth_fetch_robots`: `{user_agents, sitemaps, url}` for the site of the given URL
- `stealth_fetch_feed`: `{feed_title, feed_link, items: [{title, link, published, summary}]}`
- `stealth_fetch_bulk`: `[{url, status, status_code?, final_url?, text?, error?}]` for 1-50 URLs

## Common Parameters
- `url` (required): must start with http:// or https://
- `impersonate`: browser profile such as `chrome`, `firefox`, `safari`, `edge` (default: chrome)
- `session_options`: session-level transport options; a throwaway session is used for the call
- `request_options`: per-request transport options (params, data, json, cookies, auth, proxy, ...)
- `max_chars`: output bound; longer output ends with `[truncated at N chars]`

## Errors
Failures are reported as a single message: invalid input, timeouts,
connection or TLS failures, `HTTP {status} error` with a short body snippet,
and feed parse failures.

## Examples

### Readable text of an article section
```json
{"url": "https://example.com/post", "selector": "article"}
```

### Links to news pages
```json
{"url": "https://example.com", "pattern": "/news/", "max_results": 20}
```

### Bulk fetch with throttling
```json
{"urls": ["https://a.example", {"url": "https://b.example"}], "max_concurrency": 2, "delay": 1.0}
```
"#;
