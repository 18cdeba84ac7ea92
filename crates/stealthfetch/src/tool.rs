//! Toolkit builder and tool handlers
//!
//! A [`Toolkit`] owns one long-lived transport shared by every call. Calls
//! that carry `session_options` get a throwaway [`Session`] for their own
//! duration, released when the handler returns on any path.

use crate::client::{ensure_http_url, fetch};
use crate::convert::reduce;
use crate::error::FetchError;
use crate::extract::{links, metadata, tables};
use crate::feed::feed;
use crate::impersonate::Impersonate;
use crate::inputs::{
    BulkTarget, ExtractLinksInput, ExtractMetadataInput, ExtractTablesInput, FetchBulkInput,
    FetchFeedInput, FetchHeadersInput, FetchJsonInput, FetchPageInput, FetchRobotsInput,
    FetchTextInput, JsonMethod, ToolInput, TOOL_EXTRACT_LINKS, TOOL_EXTRACT_METADATA,
    TOOL_EXTRACT_TABLES, TOOL_FETCH_BULK, TOOL_FETCH_FEED, TOOL_FETCH_HEADERS, TOOL_FETCH_JSON,
    TOOL_FETCH_PAGE, TOOL_FETCH_ROBOTS, TOOL_FETCH_TEXT,
};
use crate::options::{CallOverrides, RequestOptions, SessionOptions, Timeout};
use crate::robots::{robots, RobotsReport};
use crate::session::{Session, SessionScope};
use crate::transport::Transport;
use crate::truncate::truncate;
use crate::types::{BulkItem, FetchCall, FetchResult, HeadersReport};
use crate::{DEFAULT_IMPERSONATE, DEFAULT_MAX_CHARS, DEFAULT_TIMEOUT, ROBOTS_MAX_CHARS};
use futures::future::join_all;
use schemars::schema_for;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

const NON_JSON_WARNING: &str = "Warning: response was not valid JSON; returning raw content.";

/// Behaviour hints advertised with every tool
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolAnnotations {
    pub read_only_hint: bool,
    pub destructive_hint: bool,
    pub idempotent_hint: bool,
    pub open_world_hint: bool,
}

const READ_ONLY: ToolAnnotations = ToolAnnotations {
    read_only_hint: true,
    destructive_hint: false,
    idempotent_hint: true,
    open_world_hint: true,
};

/// Name, description and input schema of one tool
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
    pub annotations: ToolAnnotations,
}

fn descriptor<T: ToolInput>() -> ToolDescriptor {
    ToolDescriptor {
        name: T::NAME,
        description: T::DESCRIPTION,
        input_schema: serde_json::to_value(schema_for!(T)).unwrap_or_default(),
        annotations: READ_ONLY,
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_default()
}

fn parse<T: ToolInput>(arguments: Value) -> Result<T, FetchError> {
    let arguments = if arguments.is_null() {
        json!({})
    } else {
        arguments
    };
    serde_path_to_error::deserialize(arguments).map_err(|e| {
        // An empty path means the object itself, e.g. a missing field
        let field = match e.path().to_string() {
            path if path == "." => "arguments".to_string(),
            path => path,
        };
        FetchError::invalid_input(field, e.into_inner().to_string())
    })
}

/// `{scheme}://{host[:port]}/robots.txt` for any URL on the site
fn robots_url(url: &str) -> Result<String, FetchError> {
    let mut parsed = ensure_http_url(url)?;
    parsed.set_path("/robots.txt");
    parsed.set_query(None);
    parsed.set_fragment(None);
    Ok(parsed.into())
}

/// Builder for configuring a [`Toolkit`]
#[derive(Clone)]
pub struct ToolkitBuilder {
    impersonate: Impersonate,
    timeout: f64,
    follow_redirects: bool,
    session_options: Option<SessionOptions>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ToolkitBuilder {
    fn default() -> Self {
        Self {
            impersonate: DEFAULT_IMPERSONATE,
            timeout: DEFAULT_TIMEOUT,
            follow_redirects: true,
            session_options: None,
            transport: None,
        }
    }
}

impl ToolkitBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default browser profile for calls that do not name one
    pub fn impersonate(mut self, impersonate: Impersonate) -> Self {
        self.impersonate = impersonate;
        self
    }

    /// Default request timeout in seconds
    pub fn timeout(mut self, seconds: f64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn follow_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }

    /// Base options for the shared session
    pub fn session_options(mut self, options: SessionOptions) -> Self {
        self.session_options = Some(options);
        self
    }

    /// Use a custom transport instead of building a [`Session`]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Toolkit, FetchError> {
        if !(self.timeout > 0.0 && self.timeout.is_finite()) {
            return Err(FetchError::invalid_input(
                "timeout",
                "must be a positive number of seconds",
            ));
        }

        let mut base = self.session_options.unwrap_or_default();
        base.impersonate.get_or_insert(self.impersonate);
        base.timeout.get_or_insert(Timeout::Total(self.timeout));
        base.allow_redirects.get_or_insert(self.follow_redirects);
        base.validate()?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(Session::new(base.clone())?),
        };
        debug!(impersonate = %self.impersonate, timeout = self.timeout, "Toolkit ready");

        Ok(Toolkit {
            transport,
            base,
            impersonate: self.impersonate,
        })
    }
}

/// The set of fetch tools over one shared transport
#[derive(Clone)]
pub struct Toolkit {
    transport: Arc<dyn Transport>,
    base: SessionOptions,
    impersonate: Impersonate,
}

impl Toolkit {
    pub fn builder() -> ToolkitBuilder {
        ToolkitBuilder::new()
    }

    /// Descriptors for every registered tool
    pub fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            descriptor::<FetchPageInput>(),
            descriptor::<FetchTextInput>(),
            descriptor::<FetchJsonInput>(),
            descriptor::<ExtractLinksInput>(),
            descriptor::<FetchHeadersInput>(),
            descriptor::<ExtractMetadataInput>(),
            descriptor::<ExtractTablesInput>(),
            descriptor::<FetchRobotsInput>(),
            descriptor::<FetchFeedInput>(),
            descriptor::<FetchBulkInput>(),
        ]
    }

    /// Run a tool by name with raw JSON arguments
    pub async fn call(&self, name: &str, arguments: Value) -> Result<String, FetchError> {
        debug!(tool = name, "Dispatching tool call");
        match name {
            TOOL_FETCH_PAGE => self.fetch_page(parse(arguments)?).await,
            TOOL_FETCH_TEXT => self.fetch_text(parse(arguments)?).await,
            TOOL_FETCH_JSON => self.fetch_json(parse(arguments)?).await,
            TOOL_EXTRACT_LINKS => self.extract_links(parse(arguments)?).await,
            TOOL_FETCH_HEADERS => self.fetch_headers(parse(arguments)?).await,
            TOOL_EXTRACT_METADATA => self.extract_metadata(parse(arguments)?).await,
            TOOL_EXTRACT_TABLES => self.extract_tables(parse(arguments)?).await,
            TOOL_FETCH_ROBOTS => self.fetch_robots(parse(arguments)?).await,
            TOOL_FETCH_FEED => self.fetch_feed(parse(arguments)?).await,
            TOOL_FETCH_BULK => self.fetch_bulk(parse(arguments)?).await,
            other => Err(FetchError::UnknownTool(other.to_string())),
        }
    }

    fn profile(&self, requested: Option<Impersonate>) -> Impersonate {
        requested.unwrap_or(self.impersonate)
    }

    /// Request options with the call's own fields layered on top
    fn merged(
        &self,
        request: Option<RequestOptions>,
        impersonate: Option<Impersonate>,
        overrides: CallOverrides,
    ) -> RequestOptions {
        request.unwrap_or_default().merged_with(CallOverrides {
            impersonate: Some(self.profile(impersonate)),
            ..overrides
        })
    }

    fn session_scope(
        &self,
        overrides: Option<&SessionOptions>,
    ) -> Result<SessionScope<'_>, FetchError> {
        match overrides {
            None => Ok(SessionScope::Shared(self.transport.as_ref())),
            Some(options) => {
                debug!("Opening scoped session");
                let session = Session::new(options.clone().layered_over(&self.base))?;
                Ok(SessionScope::Scoped(session))
            }
        }
    }

    /// GET through the call's session scope
    async fn get(
        &self,
        url: String,
        session_options: Option<&SessionOptions>,
        options: RequestOptions,
        max_chars: usize,
    ) -> Result<FetchResult, FetchError> {
        let scope = self.session_scope(session_options)?;
        let call = FetchCall::new(url).options(options).max_chars(max_chars);
        fetch(scope.transport(), call).await
    }

    pub async fn fetch_page(&self, mut input: FetchPageInput) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(
            input.request_options,
            input.impersonate,
            CallOverrides {
                headers: input.headers,
                timeout: input.timeout,
                allow_redirects: input.follow_redirects,
                ..Default::default()
            },
        );
        let result = self
            .get(input.url, input.session_options.as_ref(), options, input.max_chars)
            .await?;
        Ok(result.text)
    }

    pub async fn fetch_text(&self, mut input: FetchTextInput) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(input.request_options, input.impersonate, CallOverrides::default());
        let budget = input.max_chars.saturating_mul(2).max(DEFAULT_MAX_CHARS);
        let result = self
            .get(input.url, input.session_options.as_ref(), options, budget)
            .await?;
        reduce(&result.text, input.selector.as_deref(), input.max_chars)
    }

    pub async fn fetch_json(&self, mut input: FetchJsonInput) -> Result<String, FetchError> {
        input.validate()?;
        let body = match (input.method, input.body.as_deref()) {
            (JsonMethod::Post, Some(raw)) => Some(
                serde_json::from_str::<Value>(raw)
                    .map_err(|e| FetchError::InvalidJsonBody(e.to_string()))?,
            ),
            _ => None,
        };
        let options = self.merged(
            input.request_options,
            input.impersonate,
            CallOverrides {
                headers: input.headers,
                ..Default::default()
            },
        );
        let budget = input.max_chars.saturating_mul(2).max(DEFAULT_MAX_CHARS);

        let scope = self.session_scope(input.session_options.as_ref())?;
        let mut call = FetchCall::new(input.url)
            .method(input.method.into())
            .options(options)
            .max_chars(budget);
        if let Some(body) = body {
            call = call.body(body);
        }
        let result = fetch(scope.transport(), call).await?;

        let output = match serde_json::from_str::<Value>(&result.text) {
            Ok(value) => pretty(&value),
            Err(e) => {
                debug!(error = %e, "Response body is not JSON");
                format!("{NON_JSON_WARNING}\n{}", result.text)
            }
        };
        Ok(truncate(&output, input.max_chars))
    }

    pub async fn extract_links(&self, mut input: ExtractLinksInput) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(input.request_options, input.impersonate, CallOverrides::default());
        // Hrefs resolve against the requested URL even when redirected
        let base = input.url.clone();
        let result = self
            .get(input.url, input.session_options.as_ref(), options, DEFAULT_MAX_CHARS)
            .await?;
        let found = links(
            &result.text,
            &base,
            &input.selector,
            input.pattern.as_deref(),
            input.max_results,
        )?;
        Ok(truncate(&pretty(&found), input.max_chars))
    }

    pub async fn fetch_headers(&self, mut input: FetchHeadersInput) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(
            input.request_options,
            input.impersonate,
            CallOverrides {
                headers: input.headers,
                timeout: input.timeout,
                allow_redirects: input.follow_redirects,
                ..Default::default()
            },
        );
        let result = self
            .get(input.url, input.session_options.as_ref(), options, 1)
            .await?;
        Ok(pretty(&HeadersReport {
            status_code: result.status_code,
            final_url: result.final_url,
            headers: result.headers,
        }))
    }

    pub async fn extract_metadata(
        &self,
        mut input: ExtractMetadataInput,
    ) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(input.request_options, input.impersonate, CallOverrides::default());
        let result = self
            .get(input.url, input.session_options.as_ref(), options, DEFAULT_MAX_CHARS)
            .await?;
        Ok(truncate(&pretty(&metadata(&result.text)), input.max_chars))
    }

    pub async fn extract_tables(&self, mut input: ExtractTablesInput) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(input.request_options, input.impersonate, CallOverrides::default());
        let result = self
            .get(input.url, input.session_options.as_ref(), options, DEFAULT_MAX_CHARS)
            .await?;
        let found = tables(&result.text, input.selector.as_deref())?;
        Ok(truncate(&pretty(&found), input.max_chars))
    }

    pub async fn fetch_robots(&self, mut input: FetchRobotsInput) -> Result<String, FetchError> {
        input.validate()?;
        let url = robots_url(&input.url)?;
        let options = self.merged(input.request_options, input.impersonate, CallOverrides::default());
        let result = self
            .get(url.clone(), input.session_options.as_ref(), options, ROBOTS_MAX_CHARS)
            .await?;
        Ok(pretty(&RobotsReport {
            policy: robots(&result.text),
            url,
        }))
    }

    pub async fn fetch_feed(&self, mut input: FetchFeedInput) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(input.request_options, input.impersonate, CallOverrides::default());
        let result = self
            .get(input.url, input.session_options.as_ref(), options, DEFAULT_MAX_CHARS)
            .await?;
        let parsed = feed(&result.text, input.max_items)?;
        Ok(truncate(&pretty(&parsed), input.max_chars))
    }

    /// Fetch many URLs behind a concurrency gate
    ///
    /// Item failures are reported in place and never fail the call. Output
    /// order follows input order.
    pub async fn fetch_bulk(&self, mut input: FetchBulkInput) -> Result<String, FetchError> {
        input.validate()?;
        let options = self.merged(
            None,
            input.impersonate,
            CallOverrides {
                timeout: input.timeout,
                ..Default::default()
            },
        );
        let scope = self.session_scope(input.session_options.as_ref())?;
        let transport = scope.transport();
        let gate = Semaphore::new(input.max_concurrency);
        let delay = Duration::from_secs_f64(input.delay);
        let max_chars = input.max_chars_per_url;

        let jobs = input.urls.into_iter().map(BulkTarget::into_url).map(|url| {
            let gate = &gate;
            let options = options.clone();
            async move {
                // Held until this item finishes, released on drop
                let _permit = match gate.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => return BulkItem::error(url, e),
                };
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let call = FetchCall::new(url.clone()).options(options).max_chars(max_chars);
                match fetch(transport, call).await {
                    Ok(result) => BulkItem::ok(url, result),
                    Err(e) => {
                        warn!(url = %url, error = %e, "Bulk item failed");
                        BulkItem::error(url, e)
                    }
                }
            }
        });

        let items = join_all(jobs).await;
        Ok(pretty(&items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::transport::{TransportError, TransportRequest, TransportResponse};
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Answers every request from a fixed table keyed by URL
    #[derive(Default)]
    struct TableTransport {
        pages: BTreeMap<String, (u16, String)>,
        seen: Mutex<Vec<TransportRequest>>,
    }

    impl TableTransport {
        fn page(mut self, url: &str, status: u16, body: &str) -> Self {
            self.pages
                .insert(url.to_string(), (status, body.to_string()));
            self
        }

        fn seen(&self) -> Vec<TransportRequest> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for TableTransport {
        async fn request(
            &self,
            request: TransportRequest,
        ) -> Result<TransportResponse, TransportError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.pages.get(&request.url) {
                Some((status, body)) => Ok(TransportResponse {
                    status: *status,
                    final_url: request.url.clone(),
                    headers: BTreeMap::from([(
                        "Content-Type".to_string(),
                        "text/html".to_string(),
                    )]),
                    body: body.clone(),
                }),
                None => Err(TransportError::Connect),
            }
        }
    }

    fn toolkit(transport: TableTransport) -> (Toolkit, Arc<TableTransport>) {
        let transport = Arc::new(transport);
        let kit = Toolkit::builder()
            .transport(transport.clone())
            .build()
            .unwrap();
        (kit, transport)
    }

    #[test]
    fn test_tools_listing() {
        let (kit, _) = toolkit(TableTransport::default());
        let tools = kit.tools();
        assert_eq!(tools.len(), 10);
        let names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        assert!(names.contains(&"stealth_fetch_page"));
        assert!(names.contains(&"stealth_fetch_bulk"));

        let json = serde_json::to_value(&tools[0]).unwrap();
        assert_eq!(json["annotations"]["readOnlyHint"], true);
        assert_eq!(json["annotations"]["destructiveHint"], false);
        assert!(json["inputSchema"]["properties"]["url"].is_object());
    }

    #[test]
    fn test_robots_url() {
        assert_eq!(
            robots_url("https://example.com:8443/deep/path?q=1#frag").unwrap(),
            "https://example.com:8443/robots.txt"
        );
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (kit, _) = toolkit(TableTransport::default());
        let err = kit.call("stealth_nope", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "Unknown tool: stealth_nope");
    }

    #[tokio::test]
    async fn test_invalid_arguments_rejected_before_io() {
        let (kit, transport) = toolkit(TableTransport::default());
        let err = kit
            .call(TOOL_FETCH_PAGE, json!({"url": "file:///etc/passwd"}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("URL must start with http:// or https://"));

        let err = kit.call(TOOL_FETCH_PAGE, json!({})).await.unwrap_err();
        assert!(err.to_string().starts_with("Invalid value for 'arguments'"));
        assert!(err.to_string().contains("url"));
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn test_type_errors_name_the_field() {
        let (kit, transport) = toolkit(TableTransport::default());

        let err = kit
            .call(
                TOOL_FETCH_TEXT,
                json!({"url": "https://a.test/", "max_chars": -5}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().starts_with("Invalid value for 'max_chars'"));

        let err = kit
            .call(TOOL_FETCH_PAGE, json!({"url": 5}))
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid value for 'url'"));

        let err = kit
            .call(
                TOOL_FETCH_BULK,
                json!({"urls": ["https://a.test/"], "max_concurrency": "x"}),
            )
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Invalid value for 'max_concurrency'"));

        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn test_call_impersonate_overrides_request_options() {
        let (kit, transport) =
            toolkit(TableTransport::default().page("https://a.test/", 200, "ok"));
        kit.call(
            TOOL_FETCH_PAGE,
            json!({
                "url": "https://a.test/",
                "impersonate": "firefox",
                "timeout": 5,
                "request_options": {"impersonate": "safari", "timeout": 60}
            }),
        )
        .await
        .unwrap();

        let seen = transport.seen();
        assert_eq!(seen[0].options.impersonate, Some(Impersonate::Firefox));
        assert_eq!(seen[0].options.timeout, Some(Timeout::Total(5.0)));
    }

    #[tokio::test]
    async fn test_default_profile_applied() {
        let (kit, transport) =
            toolkit(TableTransport::default().page("https://a.test/", 200, "ok"));
        kit.call(TOOL_FETCH_TEXT, json!({"url": "https://a.test/"}))
            .await
            .unwrap();
        assert_eq!(
            transport.seen()[0].options.impersonate,
            Some(Impersonate::Chrome)
        );
    }

    #[tokio::test]
    async fn test_json_post_body_parse_failure() {
        let (kit, transport) = toolkit(TableTransport::default());
        let err = kit
            .call(
                TOOL_FETCH_JSON,
                json!({"url": "https://a.test/", "method": "POST", "body": "{not json"}),
            )
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Invalid JSON body for POST request"));
        assert!(transport.seen().is_empty());
    }

    #[tokio::test]
    async fn test_json_non_json_warning() {
        let (kit, _) =
            toolkit(TableTransport::default().page("https://a.test/", 200, "<html>nope</html>"));
        let out = kit
            .call(TOOL_FETCH_JSON, json!({"url": "https://a.test/"}))
            .await
            .unwrap();
        assert_eq!(
            out,
            "Warning: response was not valid JSON; returning raw content.\n<html>nope</html>"
        );
    }

    #[tokio::test]
    async fn test_json_pretty_keeps_document_order() {
        let (kit, _) = toolkit(TableTransport::default().page(
            "https://a.test/",
            200,
            r#"{"b":1,"a":"é","c":{"z":null,"y":[]}}"#,
        ));
        let out = kit
            .call(TOOL_FETCH_JSON, json!({"url": "https://a.test/"}))
            .await
            .unwrap();
        assert_eq!(
            out,
            "{\n  \"b\": 1,\n  \"a\": \"é\",\n  \"c\": {\n    \"z\": null,\n    \"y\": []\n  }\n}"
        );
    }

    #[tokio::test]
    async fn test_headers_report() {
        let (kit, _) = toolkit(TableTransport::default().page("https://a.test/", 200, "body"));
        let out = kit
            .call(TOOL_FETCH_HEADERS, json!({"url": "https://a.test/"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["status_code"], 200);
        assert_eq!(value["final_url"], "https://a.test/");
        // Names pass through in the case the transport reported
        assert_eq!(value["headers"]["Content-Type"], "text/html");
        assert!(value["headers"].get("content-type").is_none());
    }

    #[tokio::test]
    async fn test_robots_tool_uses_site_root() {
        let (kit, transport) = toolkit(TableTransport::default().page(
            "https://a.test/robots.txt",
            200,
            "User-agent: *\nDisallow: /admin\nSitemap: https://a.test/sm.xml",
        ));
        let out = kit
            .call(TOOL_FETCH_ROBOTS, json!({"url": "https://a.test/some/page?x=1"}))
            .await
            .unwrap();
        let value: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["url"], "https://a.test/robots.txt");
        assert_eq!(value["user_agents"]["*"]["disallow"][0], "/admin");
        assert_eq!(value["sitemaps"][0], "https://a.test/sm.xml");
        assert_eq!(transport.seen()[0].url, "https://a.test/robots.txt");
    }

    #[tokio::test]
    async fn test_bulk_isolation_and_order() {
        let (kit, _) = toolkit(
            TableTransport::default()
                .page("https://a.test/", 200, "alpha")
                .page("https://c.test/", 404, "gone"),
        );
        let out = kit
            .call(
                TOOL_FETCH_BULK,
                json!({
                    "urls": ["https://a.test/", {"url": "https://b.test/"}, "https://c.test/"],
                    "max_concurrency": 2
                }),
            )
            .await
            .unwrap();
        let items: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["url"], "https://a.test/");
        assert_eq!(items[0]["status"], "ok");
        assert_eq!(items[0]["text"], "alpha");
        assert_eq!(items[1]["status"], "error");
        assert!(items[1]["error"]
            .as_str()
            .unwrap()
            .starts_with("DNS/connection failed"));
        assert!(items[1].get("status_code").is_none());
        assert_eq!(items[2]["status"], "error");
        assert!(items[2]["error"].as_str().unwrap().starts_with("HTTP 404 error"));
    }

    #[tokio::test]
    async fn test_bulk_truncates_per_url() {
        let (kit, _) = toolkit(TableTransport::default().page("https://a.test/", 200, "abcdef"));
        let out = kit
            .call(
                TOOL_FETCH_BULK,
                json!({"urls": ["https://a.test/"], "max_chars_per_url": 3}),
            )
            .await
            .unwrap();
        let items: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(items[0]["text"], "abc\n[truncated at 3 chars]");
    }

    #[tokio::test]
    async fn test_text_output_truncated() {
        let (kit, _) = toolkit(
            TableTransport::default().page("https://a.test/", 200, "<p>abcdefghij</p>"),
        );
        let out = kit
            .call(TOOL_FETCH_TEXT, json!({"url": "https://a.test/", "max_chars": 4}))
            .await
            .unwrap();
        assert_eq!(out, "abcd\n[truncated at 4 chars]");
    }

    #[test]
    fn test_builder_rejects_bad_timeout() {
        let result = Toolkit::builder()
            .transport(Arc::new(TableTransport::default()))
            .timeout(0.0)
            .build();
        assert!(result.is_err());
    }
}
