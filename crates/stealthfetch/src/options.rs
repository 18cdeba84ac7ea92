//! Typed transport option bags
//!
//! Session-level and per-request options share most of their fields. Both
//! are closed structs: unknown keys are rejected at deserialization time and
//! values are checked for shape by `validate()` before any I/O happens. The
//! only open-ended part is `curl_options`, a list of low-level protocol
//! tuning pairs normalised onto [`CurlOpt`].

use crate::error::FetchError;
use crate::impersonate::Impersonate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A scalar option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Scalar {
    /// Render as it would appear in a query string or header
    pub fn as_param(&self) -> String {
        match self {
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Text(s) => s.clone(),
        }
    }
}

/// Timeout in seconds, either total or `[connect, read]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Timeout {
    Total(f64),
    Split(f64, f64),
}

impl Timeout {
    fn validate(&self, field: &'static str) -> Result<(), FetchError> {
        let ok = match *self {
            Timeout::Total(t) => t > 0.0 && t.is_finite(),
            Timeout::Split(c, r) => c > 0.0 && r > 0.0 && c.is_finite() && r.is_finite(),
        };
        if ok {
            Ok(())
        } else {
            Err(FetchError::invalid_input(field, "timeouts must be positive seconds"))
        }
    }
}

/// TLS verification: on/off, or a CA bundle path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Verify {
    Flag(bool),
    CaBundle(String),
}

/// Client certificate: combined PEM path, or `[cert_path, key_path]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum ClientCert {
    Combined(String),
    Pair(String, String),
}

/// Query parameters as a map or ordered pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum QueryParams {
    Map(BTreeMap<String, Scalar>),
    Pairs(Vec<(String, Scalar)>),
}

impl QueryParams {
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        match self {
            QueryParams::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.as_param())).collect(),
            QueryParams::Pairs(pairs) => pairs.iter().map(|(k, v)| (k.clone(), v.as_param())).collect(),
        }
    }
}

/// Form or raw request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FormData {
    Map(BTreeMap<String, String>),
    Pairs(Vec<(String, String)>),
    Raw(String),
}

/// URL quoting behaviour: a set of safe characters, or `false` to send as-is
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Quote {
    Safe(String),
    Flag(bool),
}

/// HTTP version negotiation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HttpVersion {
    V1,
    V2,
    V2tls,
    V2PriorKnowledge,
    V3,
    V3only,
}

/// TLS certificate compression preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum CertCompression {
    Zlib,
    Brotli,
}

/// Additional TLS/HTTP2 fingerprint overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExtraFingerprint {
    /// TLS min version (e.g. 771 for TLSv1.2, 772 for TLSv1.3)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_min_version: Option<u16>,
    /// Enable TLS GREASE extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_grease: Option<bool>,
    /// Permute TLS extension order in ClientHello
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_permute_extensions: Option<bool>,
    /// TLS certificate compression preference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_cert_compression: Option<CertCompression>,
    /// TLS signature algorithms list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_signature_algorithms: Option<Vec<String>>,
    /// TLS delegated credential signature algorithms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_delegated_credential: Option<String>,
    /// TLS record size limit extension value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_record_size_limit: Option<u32>,
    /// HTTP/2 stream weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2_stream_weight: Option<u32>,
    /// HTTP/2 stream exclusive flag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2_stream_exclusive: Option<u32>,
    /// Disable HTTP/2 priority signals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http2_no_priority: Option<bool>,
}

/// Curl option key: a libcurl option name or its numeric id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum CurlOptionKey {
    Id(i64),
    Name(String),
}

/// One low-level protocol tuning pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct CurlOptionInput {
    /// Curl option key (e.g. TIMEOUT_MS, CurlOpt.TIMEOUT_MS, or numeric id)
    pub option: CurlOptionKey,
    /// Curl option value
    pub value: Scalar,
}

/// Recognised low-level options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurlOpt {
    Timeout,
    ConnectTimeout,
    TimeoutMs,
    ConnectTimeoutMs,
    FollowLocation,
    MaxRedirs,
    SslVerifyPeer,
    SslVerifyHost,
    UserAgent,
    Referer,
    Proxy,
    AcceptEncoding,
    Verbose,
    Interface,
    MaxRecvSpeedLarge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueShape {
    Integer,
    Flag,
    Text,
}

const CURL_OPTS: &[(CurlOpt, &str, i64, ValueShape)] = &[
    (CurlOpt::Timeout, "TIMEOUT", 13, ValueShape::Integer),
    (CurlOpt::ConnectTimeout, "CONNECTTIMEOUT", 78, ValueShape::Integer),
    (CurlOpt::TimeoutMs, "TIMEOUT_MS", 155, ValueShape::Integer),
    (CurlOpt::ConnectTimeoutMs, "CONNECTTIMEOUT_MS", 156, ValueShape::Integer),
    (CurlOpt::FollowLocation, "FOLLOWLOCATION", 52, ValueShape::Flag),
    (CurlOpt::MaxRedirs, "MAXREDIRS", 68, ValueShape::Integer),
    (CurlOpt::SslVerifyPeer, "SSL_VERIFYPEER", 64, ValueShape::Flag),
    (CurlOpt::SslVerifyHost, "SSL_VERIFYHOST", 81, ValueShape::Integer),
    (CurlOpt::UserAgent, "USERAGENT", 10018, ValueShape::Text),
    (CurlOpt::Referer, "REFERER", 10016, ValueShape::Text),
    (CurlOpt::Proxy, "PROXY", 10004, ValueShape::Text),
    (CurlOpt::AcceptEncoding, "ACCEPT_ENCODING", 10102, ValueShape::Text),
    (CurlOpt::Verbose, "VERBOSE", 41, ValueShape::Flag),
    (CurlOpt::Interface, "INTERFACE", 10062, ValueShape::Text),
    (CurlOpt::MaxRecvSpeedLarge, "MAX_RECV_SPEED_LARGE", 30146, ValueShape::Integer),
];

impl CurlOpt {
    /// Resolve a user-supplied key to a known option
    pub fn from_key(key: &CurlOptionKey) -> Result<Self, FetchError> {
        let found = match key {
            CurlOptionKey::Id(id) => CURL_OPTS.iter().find(|entry| entry.2 == *id),
            CurlOptionKey::Name(name) => {
                let trimmed = name.trim();
                let bare = trimmed.strip_prefix("CurlOpt.").unwrap_or(trimmed);
                match bare.parse::<i64>() {
                    Ok(id) => CURL_OPTS.iter().find(|entry| entry.2 == id),
                    Err(_) => CURL_OPTS
                        .iter()
                        .find(|entry| entry.1.eq_ignore_ascii_case(bare)),
                }
            }
        };

        found.map(|entry| entry.0).ok_or_else(|| {
            let shown = match key {
                CurlOptionKey::Id(id) => id.to_string(),
                CurlOptionKey::Name(name) => name.clone(),
            };
            FetchError::InvalidOptions(format!(
                "Unsupported curl option key: {}. Use CurlOpt names (e.g., TIMEOUT_MS).",
                shown
            ))
        })
    }

    /// Canonical libcurl name
    pub fn name(&self) -> &'static str {
        CURL_OPTS
            .iter()
            .find(|entry| entry.0 == *self)
            .map(|entry| entry.1)
            .unwrap_or("UNKNOWN")
    }

    fn shape(&self) -> ValueShape {
        CURL_OPTS
            .iter()
            .find(|entry| entry.0 == *self)
            .map(|entry| entry.3)
            .unwrap_or(ValueShape::Text)
    }
}

/// A validated low-level option
#[derive(Debug, Clone, PartialEq)]
pub struct CurlSetting {
    pub opt: CurlOpt,
    pub value: Scalar,
}

impl CurlSetting {
    pub fn as_int(&self) -> Option<i64> {
        match self.value {
            Scalar::Int(i) => Some(i),
            Scalar::Bool(b) => Some(i64::from(b)),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self.value {
            Scalar::Bool(b) => Some(b),
            Scalar::Int(i) => Some(i != 0),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// Normalise and shape-check a list of curl options
pub fn resolve_curl_options(entries: &[CurlOptionInput]) -> Result<Vec<CurlSetting>, FetchError> {
    entries
        .iter()
        .map(|entry| {
            let opt = CurlOpt::from_key(&entry.option)?;
            let shape_ok = match (opt.shape(), &entry.value) {
                (ValueShape::Integer, Scalar::Int(_)) => true,
                (ValueShape::Flag, Scalar::Bool(_)) | (ValueShape::Flag, Scalar::Int(0 | 1)) => true,
                (ValueShape::Text, Scalar::Text(_)) => true,
                _ => false,
            };
            if !shape_ok {
                return Err(FetchError::InvalidOptions(format!(
                    "curl option {} has a value of the wrong type",
                    opt.name()
                )));
            }
            Ok(CurlSetting {
                opt,
                value: entry.value.clone(),
            })
        })
        .collect()
}

fn validate_max_redirects(value: Option<i32>, field: &'static str) -> Result<(), FetchError> {
    match value {
        Some(n) if !(-1..=1_000).contains(&n) => Err(FetchError::invalid_input(
            field,
            "must be between -1 (unlimited) and 1000",
        )),
        _ => Ok(()),
    }
}

/// Session-level options. Supplying any of these to a tool call gives that
/// call its own throwaway session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SessionOptions {
    /// Default session headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Default session cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<BTreeMap<String, String>>,
    /// HTTP basic auth `[user, password]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<(String, String)>,
    /// Proxy map for schemes (e.g. {"https": "http://proxy:8080"})
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxies: Option<BTreeMap<String, String>>,
    /// Single proxy URL for all requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Proxy auth `[user, password]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_auth: Option<(String, String)>,
    /// Absolute base URL for relative request paths
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Default query params for all requests in this session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<QueryParams>,
    /// TLS verification (bool) or CA bundle path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<Verify>,
    /// Session timeout seconds or `[connect, read]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    /// Use proxy settings from environment variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_env: Option<bool>,
    /// Default redirect behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_redirects: Option<bool>,
    /// Maximum redirects (-1 for unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<i32>,
    /// Default browser fingerprint profile
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonate: Option<Impersonate>,
    /// Custom JA3 TLS fingerprint string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ja3: Option<String>,
    /// Custom Akamai HTTP/2 fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub akamai: Option<String>,
    /// Additional fingerprint overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_fp: Option<ExtraFingerprint>,
    /// Send the impersonation profile's default browser headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_headers: Option<bool>,
    /// Response text encoding fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_encoding: Option<String>,
    /// Low-level protocol overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curl_options: Option<Vec<CurlOptionInput>>,
    /// HTTP version strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_version: Option<HttpVersion>,
    /// Verbose connection logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    /// Bind sockets to a specific source IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// Client certificate path or `[cert_path, key_path]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<ClientCert>,
    /// Do not persist response cookies (there is no cookie jar; accepted for compatibility)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discard_cookies: Option<bool>,
    /// Fail at the transport layer on 4xx/5xx responses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raise_for_status: Option<bool>,
    /// Connection pool size per host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_clients: Option<usize>,
}

impl SessionOptions {
    /// Fill every unset field from `base`
    pub fn layered_over(mut self, base: &SessionOptions) -> Self {
        macro_rules! inherit {
            ($($field:ident),* $(,)?) => {
                $(
                    if self.$field.is_none() {
                        self.$field = base.$field.clone();
                    }
                )*
            };
        }
        inherit!(
            headers,
            cookies,
            auth,
            proxies,
            proxy,
            proxy_auth,
            base_url,
            params,
            verify,
            timeout,
            trust_env,
            allow_redirects,
            max_redirects,
            impersonate,
            ja3,
            akamai,
            extra_fp,
            default_headers,
            default_encoding,
            curl_options,
            http_version,
            debug,
            interface,
            cert,
            discard_cookies,
            raise_for_status,
            max_clients,
        );
        self
    }

    pub fn validate(&self) -> Result<(), FetchError> {
        if let Some(timeout) = &self.timeout {
            timeout.validate("session_options.timeout")?;
        }
        validate_max_redirects(self.max_redirects, "session_options.max_redirects")?;
        if let Some(n) = self.max_clients {
            if !(1..=1_000).contains(&n) {
                return Err(FetchError::invalid_input(
                    "session_options.max_clients",
                    "must be between 1 and 1000",
                ));
            }
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base).map_err(|e| {
                FetchError::invalid_input("session_options.base_url", e.to_string())
            })?;
        }
        if let Some(entries) = &self.curl_options {
            resolve_curl_options(entries)?;
        }
        Ok(())
    }
}

/// Per-request options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RequestOptions {
    /// Per-request query params
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<QueryParams>,
    /// Request body for form/text payloads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<FormData>,
    /// Request JSON body payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    /// Per-request headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    /// Per-request cookies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<BTreeMap<String, String>>,
    /// HTTP basic auth `[user, password]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<(String, String)>,
    /// Request timeout seconds or `[connect, read]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<Timeout>,
    /// Per-request redirect behavior
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_redirects: Option<bool>,
    /// Maximum redirects (-1 for unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<i32>,
    /// Proxy map
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxies: Option<BTreeMap<String, String>>,
    /// Single proxy URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Proxy auth `[user, password]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_auth: Option<(String, String)>,
    /// TLS verification (bool) or CA bundle path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify: Option<Verify>,
    /// Referer header shortcut
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referer: Option<String>,
    /// Accept-Encoding header value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accept_encoding: Option<String>,
    /// Browser fingerprint profile for this request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub impersonate: Option<Impersonate>,
    /// Custom JA3 TLS fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ja3: Option<String>,
    /// Custom Akamai HTTP/2 fingerprint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub akamai: Option<String>,
    /// Additional fingerprint overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra_fp: Option<ExtraFingerprint>,
    /// Enable/disable the profile's default browser headers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_headers: Option<bool>,
    /// Response text encoding fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_encoding: Option<String>,
    /// URL quoting behavior; false keeps the URL as-is
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<Quote>,
    /// HTTP version strategy
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_version: Option<HttpVersion>,
    /// Bind socket to a specific source IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<String>,
    /// Client cert path or `[cert_path, key_path]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cert: Option<ClientCert>,
    /// Streaming responses are not supported; must be absent or false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    /// Maximum receive speed in bytes/second
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recv_speed: Option<u64>,
    /// Do not store response cookies (there is no cookie jar; accepted for compatibility)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discard_cookies: Option<bool>,
    /// Low-level protocol overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curl_options: Option<Vec<CurlOptionInput>>,
}

/// Fields a tool sets from its own typed input. These always win over the
/// same keys in `request_options`.
#[derive(Debug, Clone, Default)]
pub struct CallOverrides {
    pub headers: Option<BTreeMap<String, String>>,
    pub impersonate: Option<Impersonate>,
    pub timeout: Option<f64>,
    pub allow_redirects: Option<bool>,
}

impl RequestOptions {
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.stream == Some(true) {
            return Err(FetchError::invalid_input(
                "request_options.stream",
                "stream=true is not supported; responses are always buffered",
            ));
        }
        if let Some(timeout) = &self.timeout {
            timeout.validate("request_options.timeout")?;
        }
        validate_max_redirects(self.max_redirects, "request_options.max_redirects")?;
        if let Some(json) = &self.json {
            if !(json.is_object() || json.is_array()) {
                return Err(FetchError::invalid_input(
                    "request_options.json",
                    "must be a JSON object or array",
                ));
            }
        }
        if let Some(Quote::Flag(true)) = self.quote {
            return Err(FetchError::invalid_input(
                "request_options.quote",
                "must be a string of safe characters or false",
            ));
        }
        if let Some(entries) = &self.curl_options {
            resolve_curl_options(entries)?;
        }
        Ok(())
    }

    /// Layer call-specific fields over these options
    pub fn merged_with(mut self, overrides: CallOverrides) -> Self {
        if let Some(headers) = overrides.headers {
            self.headers = Some(headers);
        }
        if let Some(impersonate) = overrides.impersonate {
            self.impersonate = Some(impersonate);
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = Some(Timeout::Total(timeout));
        }
        if let Some(allow) = overrides.allow_redirects {
            self.allow_redirects = Some(allow);
        }
        self
    }

    /// True when the options already carry a body encoding
    pub fn has_body(&self) -> bool {
        self.json.is_some() || self.data.is_some()
    }
}
