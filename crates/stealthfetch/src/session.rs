//! reqwest-backed transport session
//!
//! A [`Session`] owns one `reqwest::Client` configured from
//! [`SessionOptions`]. Request options are applied per request. Options that
//! reqwest only exposes on the client (proxy, TLS verification, redirect
//! policy, HTTP version, local address, client certificate) get a derived
//! client for that single request so the shared one is never mutated.

use crate::impersonate::Impersonate;
use crate::options::{
    resolve_curl_options, ClientCert, CurlOpt, CurlSetting, FormData, HttpVersion, QueryParams,
    RequestOptions, SessionOptions, Timeout, Verify,
};
use crate::transport::{RequestBody, Transport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Redirect cap used when none is configured
pub const DEFAULT_MAX_REDIRECTS: i32 = 30;

const DEFAULT_ENCODING: &str = "utf-8";

#[derive(Debug, Clone, PartialEq)]
enum ProxyRule {
    All(String),
    Http(String),
    Https(String),
}

/// Settings that reqwest fixes at client construction
#[derive(Debug, Clone, PartialEq)]
struct ClientSettings {
    proxies: Vec<ProxyRule>,
    proxy_auth: Option<(String, String)>,
    trust_env: bool,
    verify: Verify,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    follow_redirects: bool,
    max_redirects: i32,
    http_version: Option<HttpVersion>,
    interface: Option<String>,
    cert: Option<ClientCert>,
    max_clients: Option<usize>,
    verbose: bool,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            proxies: Vec::new(),
            proxy_auth: None,
            trust_env: true,
            verify: Verify::Flag(true),
            connect_timeout: None,
            read_timeout: None,
            follow_redirects: true,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            http_version: None,
            interface: None,
            cert: None,
            max_clients: None,
            verbose: false,
        }
    }
}

fn seconds(value: f64) -> Result<Duration, TransportError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| TransportError::InvalidOptions(format!("timeout {value}: {e}")))
}

fn millis(value: i64) -> Result<Duration, TransportError> {
    u64::try_from(value)
        .map(Duration::from_millis)
        .map_err(|_| TransportError::InvalidOptions(format!("negative duration: {value}")))
}

fn proxy_rules(
    proxy: &Option<String>,
    proxies: &Option<BTreeMap<String, String>>,
) -> Option<Vec<ProxyRule>> {
    if proxy.is_none() && proxies.is_none() {
        return None;
    }
    let mut rules = Vec::new();
    if let Some(proxy) = proxy {
        rules.push(ProxyRule::All(proxy.clone()));
    }
    for (scheme, target) in proxies.iter().flatten() {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => rules.push(ProxyRule::Http(target.clone())),
            "https" => rules.push(ProxyRule::Https(target.clone())),
            "all" | "*" => rules.push(ProxyRule::All(target.clone())),
            other => debug!(key = other, "Ignoring proxy mapping with unsupported key"),
        }
    }
    Some(rules)
}

impl ClientSettings {
    fn from_session(options: &SessionOptions, curl: &[CurlSetting]) -> Result<Self, TransportError> {
        let mut settings = Self::default();
        if let Some(rules) = proxy_rules(&options.proxy, &options.proxies) {
            settings.proxies = rules;
        }
        settings.proxy_auth = options.proxy_auth.clone();
        settings.trust_env = options.trust_env.unwrap_or(true);
        if let Some(verify) = &options.verify {
            settings.verify = verify.clone();
        }
        if let Some(Timeout::Split(connect, read)) = options.timeout {
            settings.connect_timeout = Some(seconds(connect)?);
            settings.read_timeout = Some(seconds(read)?);
        }
        if let Some(follow) = options.allow_redirects {
            settings.follow_redirects = follow;
        }
        if let Some(max) = options.max_redirects {
            settings.max_redirects = max;
        }
        settings.http_version = options.http_version;
        settings.interface = options.interface.clone();
        settings.cert = options.cert.clone();
        settings.max_clients = options.max_clients;
        settings.verbose = options.debug.unwrap_or(false);
        settings.apply_curl(curl)?;
        Ok(settings)
    }

    /// Client settings needed for one request on top of the session's
    fn for_request(&self, options: &RequestOptions, curl: &[CurlSetting]) -> Result<Self, TransportError> {
        let mut settings = self.clone();
        if let Some(rules) = proxy_rules(&options.proxy, &options.proxies) {
            settings.proxies = rules;
        }
        if options.proxy_auth.is_some() {
            settings.proxy_auth = options.proxy_auth.clone();
        }
        if let Some(verify) = &options.verify {
            settings.verify = verify.clone();
        }
        if let Some(Timeout::Split(connect, read)) = options.timeout {
            settings.connect_timeout = Some(seconds(connect)?);
            settings.read_timeout = Some(seconds(read)?);
        }
        if let Some(follow) = options.allow_redirects {
            settings.follow_redirects = follow;
        }
        if let Some(max) = options.max_redirects {
            settings.max_redirects = max;
        }
        if options.http_version.is_some() {
            settings.http_version = options.http_version;
        }
        if options.interface.is_some() {
            settings.interface = options.interface.clone();
        }
        if options.cert.is_some() {
            settings.cert = options.cert.clone();
        }
        settings.apply_curl(curl)?;
        Ok(settings)
    }

    fn apply_curl(&mut self, curl: &[CurlSetting]) -> Result<(), TransportError> {
        for setting in curl {
            match setting.opt {
                CurlOpt::ConnectTimeout => {
                    if let Some(secs) = setting.as_int() {
                        self.connect_timeout = Some(millis(secs.saturating_mul(1_000))?);
                    }
                }
                CurlOpt::ConnectTimeoutMs => {
                    if let Some(ms) = setting.as_int() {
                        self.connect_timeout = Some(millis(ms)?);
                    }
                }
                CurlOpt::FollowLocation => {
                    if let Some(follow) = setting.as_flag() {
                        self.follow_redirects = follow;
                    }
                }
                CurlOpt::MaxRedirs => {
                    if let Some(max) = setting.as_int() {
                        self.max_redirects = i32::try_from(max).unwrap_or(i32::MAX);
                    }
                }
                CurlOpt::SslVerifyPeer => {
                    if let Some(verify) = setting.as_flag() {
                        self.verify = Verify::Flag(verify);
                    }
                }
                CurlOpt::Proxy => {
                    if let Some(proxy) = setting.as_text() {
                        self.proxies = vec![ProxyRule::All(proxy.to_string())];
                    }
                }
                CurlOpt::Verbose => {
                    if let Some(verbose) = setting.as_flag() {
                        self.verbose = verbose;
                    }
                }
                CurlOpt::Interface => {
                    if let Some(interface) = setting.as_text() {
                        self.interface = Some(interface.to_string());
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn redirect_policy(&self) -> Policy {
        if !self.follow_redirects {
            Policy::none()
        } else if self.max_redirects < 0 {
            Policy::custom(|attempt| attempt.follow())
        } else {
            Policy::limited(self.max_redirects as usize)
        }
    }

    fn build(&self) -> Result<reqwest::Client, TransportError> {
        let mut builder = reqwest::Client::builder()
            .redirect(self.redirect_policy())
            .connection_verbose(self.verbose);

        if let Some(timeout) = self.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = self.read_timeout {
            builder = builder.read_timeout(timeout);
        }

        if !self.trust_env {
            builder = builder.no_proxy();
        }
        for rule in &self.proxies {
            let proxy = match rule {
                ProxyRule::All(target) => reqwest::Proxy::all(target.as_str()),
                ProxyRule::Http(target) => reqwest::Proxy::http(target.as_str()),
                ProxyRule::Https(target) => reqwest::Proxy::https(target.as_str()),
            }
            .map_err(|e| TransportError::InvalidOptions(format!("proxy: {e}")))?;
            let proxy = match &self.proxy_auth {
                Some((user, password)) => proxy.basic_auth(user, password),
                None => proxy,
            };
            builder = builder.proxy(proxy);
        }

        match &self.verify {
            Verify::Flag(true) => {}
            Verify::Flag(false) => builder = builder.danger_accept_invalid_certs(true),
            Verify::CaBundle(path) => {
                let pem = std::fs::read(path)
                    .map_err(|e| TransportError::InvalidOptions(format!("verify: {path}: {e}")))?;
                let certs = reqwest::Certificate::from_pem_bundle(&pem)
                    .map_err(|e| TransportError::InvalidOptions(format!("verify: {path}: {e}")))?;
                for cert in certs {
                    builder = builder.add_root_certificate(cert);
                }
            }
        }

        if let Some(cert) = &self.cert {
            let pem = match cert {
                ClientCert::Combined(path) => read_pem(path)?,
                ClientCert::Pair(cert_path, key_path) => {
                    let mut pem = read_pem(key_path)?;
                    pem.push(b'\n');
                    pem.extend(read_pem(cert_path)?);
                    pem
                }
            };
            let identity = reqwest::Identity::from_pem(&pem)
                .map_err(|e| TransportError::InvalidOptions(format!("cert: {e}")))?;
            builder = builder.identity(identity);
        }

        match self.http_version {
            Some(HttpVersion::V1) => builder = builder.http1_only(),
            Some(HttpVersion::V2PriorKnowledge) => builder = builder.http2_prior_knowledge(),
            Some(version @ (HttpVersion::V3 | HttpVersion::V3only)) => {
                debug!(?version, "HTTP/3 is not available; negotiating HTTP/1.1 or HTTP/2")
            }
            _ => {}
        }

        if let Some(interface) = &self.interface {
            match interface.parse::<IpAddr>() {
                Ok(addr) => builder = builder.local_address(addr),
                Err(_) => debug!(interface = %interface, "Binding by interface name is not supported"),
            }
        }

        if let Some(max) = self.max_clients {
            builder = builder.pool_max_idle_per_host(max);
        }

        builder
            .build()
            .map_err(|e| TransportError::InvalidOptions(e.to_string()))
    }
}

fn read_pem(path: &str) -> Result<Vec<u8>, TransportError> {
    std::fs::read(path).map_err(|e| TransportError::InvalidOptions(format!("cert: {path}: {e}")))
}

fn header_entry(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), TransportError> {
    let name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| TransportError::InvalidOptions(format!("invalid header name: {name}")))?;
    let value = HeaderValue::from_str(value)
        .map_err(|_| TransportError::InvalidOptions(format!("invalid value for header {name}")))?;
    Ok((name, value))
}

fn params_pairs(params: &Option<QueryParams>) -> Vec<(String, String)> {
    params.as_ref().map(QueryParams::to_pairs).unwrap_or_default()
}

/// Does the error chain point at TLS?
fn mentions_tls(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        let msg = e.to_string().to_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| msg.contains(needle))
        {
            return true;
        }
        source = e.source();
    }
    false
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::Timeout;
    }
    if err.is_connect() {
        if mentions_tls(&err) {
            return TransportError::Tls;
        }
        return TransportError::Connect;
    }
    if err.is_builder() {
        return TransportError::InvalidOptions(err.to_string());
    }
    let kind = if err.is_redirect() {
        "RedirectError"
    } else if err.is_body() {
        "BodyError"
    } else if err.is_decode() {
        "DecodeError"
    } else {
        "RequestError"
    };
    TransportError::Other {
        kind: kind.to_string(),
        message: err.to_string(),
    }
}

fn collect_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        out.entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }
    out
}

/// Long-lived transport context
pub struct Session {
    client: reqwest::Client,
    settings: ClientSettings,
    options: SessionOptions,
    curl: Vec<CurlSetting>,
}

impl Session {
    /// Build a session; fails when the options cannot configure a client
    pub fn new(options: SessionOptions) -> Result<Self, TransportError> {
        let curl = resolve_curl_options(options.curl_options.as_deref().unwrap_or_default())
            .map_err(|e| TransportError::InvalidOptions(e.to_string()))?;
        let settings = ClientSettings::from_session(&options, &curl)?;
        let client = settings.build()?;
        log_unapplied_session(&options);
        Ok(Self {
            client,
            settings,
            options,
            curl,
        })
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    fn resolve_url(&self, url: &str) -> Result<Url, TransportError> {
        let parsed = match &self.options.base_url {
            Some(base) => Url::parse(base).and_then(|base| base.join(url)),
            None => Url::parse(url),
        };
        parsed.map_err(|e| TransportError::InvalidOptions(format!("url {url}: {e}")))
    }

    fn request_headers(
        &self,
        options: &RequestOptions,
        curl: &[CurlSetting],
    ) -> Result<HeaderMap, TransportError> {
        let mut headers = HeaderMap::new();

        let use_preset = options
            .default_headers
            .or(self.options.default_headers)
            .unwrap_or(true);
        if use_preset {
            let profile: Impersonate = options
                .impersonate
                .or(self.options.impersonate)
                .unwrap_or_default();
            for (name, value) in profile.default_headers() {
                let (name, value) = header_entry(name, &value)?;
                headers.insert(name, value);
            }
        }

        for map in [&self.options.headers, &options.headers].into_iter().flatten() {
            for (name, value) in map {
                let (name, value) = header_entry(name, value)?;
                headers.insert(name, value);
            }
        }

        let mut cookies = self.options.cookies.clone().unwrap_or_default();
        cookies.extend(options.cookies.clone().unwrap_or_default());
        if !cookies.is_empty() {
            let cookie = cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            let (name, value) = header_entry("cookie", &cookie)?;
            headers.insert(name, value);
        }

        if let Some(referer) = &options.referer {
            let (name, value) = header_entry("referer", referer)?;
            headers.insert(name, value);
        }
        if let Some(encoding) = &options.accept_encoding {
            let (name, value) = header_entry("accept-encoding", encoding)?;
            headers.insert(name, value);
        }

        for setting in self.curl.iter().chain(curl) {
            let header = match setting.opt {
                CurlOpt::UserAgent => "user-agent",
                CurlOpt::Referer => "referer",
                CurlOpt::AcceptEncoding => "accept-encoding",
                _ => continue,
            };
            if let Some(text) = setting.as_text() {
                let (name, value) = header_entry(header, text)?;
                headers.insert(name, value);
            }
        }

        Ok(headers)
    }

    fn request_timeout(
        &self,
        options: &RequestOptions,
        curl: &[CurlSetting],
    ) -> Result<Option<Duration>, TransportError> {
        let mut timeout = match options.timeout.or(self.options.timeout) {
            Some(Timeout::Total(secs)) => Some(seconds(secs)?),
            _ => None,
        };
        for setting in self.curl.iter().chain(curl) {
            match (setting.opt, setting.as_int()) {
                (CurlOpt::Timeout, Some(secs)) => timeout = Some(millis(secs.saturating_mul(1_000))?),
                (CurlOpt::TimeoutMs, Some(ms)) => timeout = Some(millis(ms)?),
                _ => {}
            }
        }
        Ok(timeout)
    }
}

fn log_unapplied_session(options: &SessionOptions) {
    if options.ja3.is_some() || options.akamai.is_some() || options.extra_fp.is_some() {
        debug!("TLS/HTTP2 fingerprint overrides are not applied by this transport");
    }
    if options.discard_cookies.is_some() {
        debug!("Session keeps no cookie jar; discard_cookies has no effect");
    }
}

fn log_unapplied_request(options: &RequestOptions, curl: &[CurlSetting]) {
    if options.ja3.is_some() || options.akamai.is_some() || options.extra_fp.is_some() {
        debug!("TLS/HTTP2 fingerprint overrides are not applied by this transport");
    }
    if options.max_recv_speed.is_some()
        || curl.iter().any(|s| s.opt == CurlOpt::MaxRecvSpeedLarge)
    {
        debug!("Receive speed limits are not applied by this transport");
    }
    if options.quote.is_some() {
        debug!("URLs are always normalised; quote has no effect");
    }
    if curl.iter().any(|s| s.opt == CurlOpt::SslVerifyHost) {
        debug!("SSL_VERIFYHOST is not applied by this transport");
    }
}

#[async_trait]
impl Transport for Session {
    async fn request(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let options = &request.options;
        let curl = resolve_curl_options(options.curl_options.as_deref().unwrap_or_default())
            .map_err(|e| TransportError::InvalidOptions(e.to_string()))?;
        log_unapplied_request(options, &curl);

        let settings = self.settings.for_request(options, &curl)?;
        let derived;
        let client = if settings == self.settings {
            &self.client
        } else {
            debug!(url = %request.url, "Building a dedicated client for client-scoped request options");
            derived = settings.build()?;
            &derived
        };

        let url = self.resolve_url(&request.url)?;
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| TransportError::InvalidOptions(e.to_string()))?;

        let mut builder = client
            .request(method, url)
            .headers(self.request_headers(options, &curl)?);

        if let Some((user, password)) = options.auth.as_ref().or(self.options.auth.as_ref()) {
            builder = builder.basic_auth(user, Some(password));
        }

        let mut query = params_pairs(&self.options.params);
        query.extend(params_pairs(&options.params));
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        if let Some(timeout) = self.request_timeout(options, &curl)? {
            builder = builder.timeout(timeout);
        }

        if let Some(json) = &options.json {
            builder = builder.json(json);
        } else if let Some(data) = &options.data {
            builder = match data {
                FormData::Map(map) => builder.form(map),
                FormData::Pairs(pairs) => builder.form(pairs),
                FormData::Raw(raw) => builder.body(raw.clone()),
            };
        } else if let Some(body) = request.body {
            builder = match body {
                RequestBody::Json(value) => builder.json(&value),
                RequestBody::Text(text) => builder.body(text),
            };
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = collect_headers(response.headers());

        if self.options.raise_for_status == Some(true) && status >= 400 {
            return Err(TransportError::Other {
                kind: "HTTPError".to_string(),
                message: format!("HTTP Error {status} for url: {final_url}"),
            });
        }

        let encoding = options
            .default_encoding
            .as_deref()
            .or(self.options.default_encoding.as_deref())
            .unwrap_or(DEFAULT_ENCODING);
        let body = response.text_with_charset(encoding).await.map_err(classify)?;

        debug!(status, final_url = %final_url, bytes = body.len(), "Response received");

        Ok(TransportResponse {
            status,
            final_url,
            headers,
            body,
        })
    }
}

/// A session borrowed for one tool call
///
/// Either the process-wide transport or a throwaway session built from
/// per-call session options. The throwaway is released when the scope is
/// dropped, on every exit path.
pub enum SessionScope<'a> {
    Shared(&'a dyn Transport),
    Scoped(Session),
}

impl<'a> SessionScope<'a> {
    pub fn transport(&self) -> &dyn Transport {
        match self {
            SessionScope::Shared(transport) => *transport,
            SessionScope::Scoped(session) => session,
        }
    }

    pub fn is_scoped(&self) -> bool {
        matches!(self, SessionScope::Scoped(_))
    }
}

impl Drop for SessionScope<'_> {
    fn drop(&mut self) {
        if self.is_scoped() {
            debug!("Closing scoped session");
        }
    }
}
