//! Core types for stealthfetch

use crate::options::RequestOptions;
use crate::DEFAULT_MAX_CHARS;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;

/// HTTP method for the request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Options,
    Head,
    Trace,
    Patch,
    Query,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Query => "QUERY",
        }
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            "HEAD" => Ok(HttpMethod::Head),
            "TRACE" => Ok(HttpMethod::Trace),
            "PATCH" => Ok(HttpMethod::Patch),
            "QUERY" => Ok(HttpMethod::Query),
            _ => Err(format!("Invalid method: {s}")),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call into the transport client
#[derive(Debug, Clone)]
pub struct FetchCall {
    pub url: String,
    pub method: HttpMethod,
    pub body: Option<Value>,
    pub options: RequestOptions,
    pub max_chars: usize,
}

impl FetchCall {
    /// GET `url` with default options
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: HttpMethod::Get,
            body: None,
            options: RequestOptions::default(),
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

/// Successful fetch with a truncated body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResult {
    pub status_code: u16,
    pub final_url: String,
    pub text: String,
    pub headers: BTreeMap<String, String>,
}

/// Output of the headers tool
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadersReport {
    pub status_code: u16,
    pub final_url: String,
    pub headers: BTreeMap<String, String>,
}

/// Outcome of one bulk item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkStatus {
    Ok,
    Error,
}

/// One entry of the bulk tool output, in input order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkItem {
    pub url: String,
    pub status: BulkStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItem {
    pub fn ok(url: String, result: FetchResult) -> Self {
        Self {
            url,
            status: BulkStatus::Ok,
            status_code: Some(result.status_code),
            final_url: Some(result.final_url),
            text: Some(result.text),
            error: None,
        }
    }

    pub fn error(url: String, error: impl ToString) -> Self {
        Self {
            url,
            status: BulkStatus::Error,
            status_code: None,
            final_url: None,
            text: None,
            error: Some(error.to_string()),
        }
    }
}
