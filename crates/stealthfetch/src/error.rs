//! Error types for stealthfetch

use std::borrow::Cow;
use thiserror::Error;

/// Broad failure classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network I/O
    InvalidInput,
    /// The exchange could not complete
    TransportFailure,
    /// The remote answered with a status >= 400
    HttpStatus,
    /// The payload could not be parsed
    ParseFailure,
}

/// Errors that can occur during fetch and transform operations
#[derive(Debug, Error)]
pub enum FetchError {
    /// A tool input field failed validation
    #[error("Invalid value for '{field}': {message}")]
    InvalidInput {
        field: Cow<'static, str>,
        message: String,
    },

    /// No tool is registered under this name
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// URL has a scheme other than http/https
    #[error("Only http/https URLs are supported.")]
    InvalidUrl,

    /// CSS selector could not be parsed
    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// Link filter pattern could not be compiled
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(String),

    /// POST body for the JSON tool is not valid JSON
    #[error("Invalid JSON body for POST request: {0}")]
    InvalidJsonBody(String),

    /// Transport options have the wrong shape or type
    #[error("Invalid transport options: {0}")]
    InvalidOptions(String),

    /// Request timed out
    #[error("Request timed out. Try increasing the timeout value.")]
    Timeout,

    /// DNS resolution or TCP connect failed
    #[error("DNS/connection failed. Check that the URL is correct and reachable.")]
    Connect,

    /// TLS handshake or certificate failure
    #[error("TLS/impersonation error. Try a different impersonate target or verify certificates.")]
    Tls,

    /// Any other transport failure
    #[error("Request failed: {kind}: {message}")]
    RequestFailed { kind: String, message: String },

    /// Remote returned an error status
    #[error("{}", http_status_message(.status, .snippet))]
    HttpStatus { status: u16, snippet: Option<String> },

    /// Feed body is not well-formed XML
    #[error("Invalid XML feed: {0}")]
    InvalidFeed(String),

    /// Feed root element is neither RSS nor Atom
    #[error("Unrecognized feed format: root tag '{0}'")]
    UnrecognizedFeed(String),
}

fn http_status_message(status: &u16, snippet: &Option<String>) -> String {
    match snippet {
        Some(snippet) => format!("HTTP {status} error. Response snippet: {snippet}"),
        None => format!("HTTP {status} error."),
    }
}

impl FetchError {
    /// Shorthand for an input validation failure
    pub fn invalid_input(
        field: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        FetchError::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Classify this error into the caller-facing taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::InvalidInput { .. }
            | FetchError::UnknownTool(_)
            | FetchError::InvalidUrl
            | FetchError::InvalidSelector { .. }
            | FetchError::InvalidPattern(_)
            | FetchError::InvalidJsonBody(_)
            | FetchError::InvalidOptions(_) => ErrorKind::InvalidInput,
            FetchError::Timeout
            | FetchError::Connect
            | FetchError::Tls
            | FetchError::RequestFailed { .. } => ErrorKind::TransportFailure,
            FetchError::HttpStatus { .. } => ErrorKind::HttpStatus,
            FetchError::InvalidFeed(_) | FetchError::UnrecognizedFeed(_) => ErrorKind::ParseFailure,
        }
    }
}
