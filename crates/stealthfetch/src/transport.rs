//! Transport seam
//!
//! Everything above this trait works on buffered request/response values.
//! The default implementation is [`Session`](crate::session::Session); tests
//! and embedders can plug in their own.

use crate::options::RequestOptions;
use crate::types::HttpMethod;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Body handed to the transport
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

/// A single outgoing exchange
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub body: Option<RequestBody>,
    pub options: RequestOptions,
}

/// A fully buffered response
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub final_url: String,
    /// Lowercase header names; repeated headers joined with ", "
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

/// Failures raised by a transport before a response is available
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("timed out")]
    Timeout,
    #[error("connection failed")]
    Connect,
    #[error("tls handshake failed")]
    Tls,
    #[error("{0}")]
    InvalidOptions(String),
    #[error("{kind}: {message}")]
    Other { kind: String, message: String },
}

/// Performs HTTP exchanges on behalf of the tools
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}
