//! Transport client
//!
//! Wraps a [`Transport`] with the contract every tool relies on: scheme
//! check before I/O, body encoding policy, failure classification, the
//! HTTP status gate and output truncation.

use crate::error::FetchError;
use crate::transport::{RequestBody, Transport, TransportError, TransportRequest};
use crate::truncate::truncate;
use crate::types::{FetchCall, FetchResult};
use crate::HTTP_ERROR_SNIPPET_CHARS;
use serde_json::Value;
use tracing::debug;
use url::Url;

impl From<TransportError> for FetchError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => FetchError::Timeout,
            TransportError::Connect => FetchError::Connect,
            TransportError::Tls => FetchError::Tls,
            TransportError::InvalidOptions(msg) => FetchError::InvalidOptions(msg),
            TransportError::Other { kind, message } => FetchError::RequestFailed { kind, message },
        }
    }
}

/// Only http and https are accepted
pub(crate) fn ensure_http_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url).map_err(|_| FetchError::InvalidUrl)?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        _ => Err(FetchError::InvalidUrl),
    }
}

fn encode_body(body: Value) -> RequestBody {
    match body {
        Value::Object(_) | Value::Array(_) => RequestBody::Json(body),
        Value::String(text) => RequestBody::Text(text),
        other => RequestBody::Text(other.to_string()),
    }
}

/// Perform one request and return its truncated body
pub async fn fetch(transport: &dyn Transport, call: FetchCall) -> Result<FetchResult, FetchError> {
    ensure_http_url(&call.url)?;

    let body = if call.options.has_body() {
        None
    } else {
        call.body.map(encode_body)
    };

    debug!(method = %call.method, url = %call.url, "Fetching");

    let response = transport
        .request(TransportRequest {
            method: call.method,
            url: call.url,
            body,
            options: call.options,
        })
        .await?;

    if response.status >= 400 {
        let snippet = truncate(&response.body, HTTP_ERROR_SNIPPET_CHARS)
            .trim()
            .to_string();
        return Err(FetchError::HttpStatus {
            status: response.status,
            snippet: (!snippet.is_empty()).then_some(snippet),
        });
    }

    Ok(FetchResult {
        status_code: response.status,
        final_url: response.final_url,
        text: truncate(&response.body, call.max_chars),
        headers: response.headers,
    })
}
