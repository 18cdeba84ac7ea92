//! Integration tests for stealthfetch using wiremock

use serde_json::{json, Value};
use stealthfetch::{
    fetch, FetchCall, FetchError, HttpMethod, Session, SessionOptions, Toolkit, Transport,
    TransportRequest,
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Route crate logs into the test harness so failures show the call trace
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("stealthfetch=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn toolkit() -> Toolkit {
    init_tracing();
    Toolkit::builder().build().unwrap()
}

async fn serve(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

#[tokio::test]
async fn test_fetch_page_returns_raw_html() {
    let server = MockServer::start().await;
    serve(&server, "/page", html("<html><body><p>Hello</p></body></html>")).await;

    let out = toolkit()
        .call(
            "stealth_fetch_page",
            json!({"url": format!("{}/page", server.uri())}),
        )
        .await
        .unwrap();
    assert_eq!(out, "<html><body><p>Hello</p></body></html>");
}

#[tokio::test]
async fn test_fetch_page_sends_browser_headers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ua"))
        .and(header("sec-fetch-mode", "navigate"))
        .and(header("x-custom", "1"))
        .respond_with(html("ok"))
        .mount(&server)
        .await;

    let out = toolkit()
        .call(
            "stealth_fetch_page",
            json!({"url": format!("{}/ua", server.uri()), "headers": {"x-custom": "1"}}),
        )
        .await
        .unwrap();
    assert_eq!(out, "ok");
}

#[tokio::test]
async fn test_fetch_text_reduces_page() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/article",
        html(
            r#"<html><body>
            <nav>menu</nav>
            <h1>Heading</h1>
            <p>Paragraph <a href="/a">Link</a></p>
            <ul><li>First</li><li>Second</li></ul>
            <script>alert(1)</script>
            </body></html>"#,
        ),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_fetch_text",
            json!({"url": format!("{}/article", server.uri())}),
        )
        .await
        .unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert!(lines.contains(&"# Heading"));
    assert!(lines.contains(&"- First"));
    assert!(lines.contains(&"- Second"));
    assert!(out.contains("[Link](/a)"));
    assert!(!out.contains("menu"));
    assert!(!out.contains("alert"));
}

#[tokio::test]
async fn test_fetch_text_selector_not_found() {
    let server = MockServer::start().await;
    serve(&server, "/", html("<html><body><p>Only text</p></body></html>")).await;

    let out = toolkit()
        .call(
            "stealth_fetch_text",
            json!({"url": format!("{}/", server.uri()), "selector": "#missing"}),
        )
        .await
        .unwrap();
    assert!(out.starts_with("[selector not found: #missing]"));
    assert!(out.contains("Only text"));
}

#[tokio::test]
async fn test_fetch_json_get_pretty_prints() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/api",
        ResponseTemplate::new(200).set_body_json(json!({"name": "x", "items": [1, 2]})),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_fetch_json",
            json!({"url": format!("{}/api", server.uri())}),
        )
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, json!({"name": "x", "items": [1, 2]}));
    assert!(out.contains("\n  \"items\""));
}

#[tokio::test]
async fn test_fetch_json_post_echo() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/echo"))
        .and(body_json(json!({"query": "rust"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"echo": {"query": "rust"}})))
        .mount(&server)
        .await;

    let out = toolkit()
        .call(
            "stealth_fetch_json",
            json!({
                "url": format!("{}/echo", server.uri()),
                "method": "POST",
                "body": "{\"query\": \"rust\"}"
            }),
        )
        .await
        .unwrap();
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed["echo"]["query"], "rust");
}

#[tokio::test]
async fn test_fetch_json_non_json_warning() {
    let server = MockServer::start().await;
    serve(&server, "/html", html("<p>not json</p>")).await;

    let out = toolkit()
        .call(
            "stealth_fetch_json",
            json!({"url": format!("{}/html", server.uri())}),
        )
        .await
        .unwrap();
    assert_eq!(
        out,
        "Warning: response was not valid JSON; returning raw content.\n<p>not json</p>"
    );
}

#[tokio::test]
async fn test_extract_links_resolves_relative_hrefs() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/docs/index.html",
        html(
            r#"<a href="/news/1">One</a>
               <a href="/blog/2">Two</a>
               <a href="news/3">Three</a>"#,
        ),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_extract_links",
            json!({
                "url": format!("{}/docs/index.html", server.uri()),
                "pattern": "news/"
            }),
        )
        .await
        .unwrap();
    let links: Vec<Value> = serde_json::from_str(&out).unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0]["text"], "One");
    assert_eq!(links[0]["absolute_url"], format!("{}/news/1", server.uri()));
    assert_eq!(
        links[1]["absolute_url"],
        format!("{}/docs/news/3", server.uri())
    );
}

#[tokio::test]
async fn test_fetch_headers() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/h",
        ResponseTemplate::new(200)
            .set_body_string("body")
            .insert_header("content-type", "text/plain")
            .insert_header("x-served-by", "mock"),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_fetch_headers",
            json!({"url": format!("{}/h", server.uri())}),
        )
        .await
        .unwrap();
    let report: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["status_code"], 200);
    assert_eq!(report["final_url"], format!("{}/h", server.uri()));
    assert_eq!(report["headers"]["content-type"], "text/plain");
    assert_eq!(report["headers"]["x-served-by"], "mock");
}

#[tokio::test]
async fn test_extract_links_resolve_against_requested_url() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/moved/page",
        ResponseTemplate::new(301).insert_header("location", "/docs/index.html"),
    )
    .await;
    serve(&server, "/docs/index.html", html(r#"<a href="news/3">Three</a>"#)).await;

    let out = toolkit()
        .call(
            "stealth_extract_links",
            json!({"url": format!("{}/moved/page", server.uri())}),
        )
        .await
        .unwrap();
    let links: Vec<Value> = serde_json::from_str(&out).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(
        links[0]["absolute_url"],
        format!("{}/moved/news/3", server.uri())
    );
}

async fn redirecting_server() -> MockServer {
    let server = MockServer::start().await;
    serve(
        &server,
        "/old",
        ResponseTemplate::new(302).insert_header("location", "/new"),
    )
    .await;
    serve(&server, "/new", html("landed")).await;
    server
}

#[tokio::test]
async fn test_redirects_followed_by_default() {
    let server = redirecting_server().await;

    let out = toolkit()
        .call(
            "stealth_fetch_headers",
            json!({"url": format!("{}/old", server.uri())}),
        )
        .await
        .unwrap();
    let report: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["status_code"], 200);
    assert_eq!(report["final_url"], format!("{}/new", server.uri()));
}

#[tokio::test]
async fn test_redirects_not_followed_when_disabled() {
    let server = redirecting_server().await;

    let out = toolkit()
        .call(
            "stealth_fetch_headers",
            json!({"url": format!("{}/old", server.uri()), "follow_redirects": false}),
        )
        .await
        .unwrap();
    let report: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["status_code"], 302);
    assert_eq!(report["headers"]["location"], "/new");
    assert_eq!(report["final_url"], format!("{}/old", server.uri()));
}

#[tokio::test]
async fn test_http_error_snippet() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/missing",
        ResponseTemplate::new(404).set_body_string("  page not found  "),
    )
    .await;

    let err = toolkit()
        .call(
            "stealth_fetch_page",
            json!({"url": format!("{}/missing", server.uri())}),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus { status: 404, .. }));
    assert_eq!(
        err.to_string(),
        "HTTP 404 error. Response snippet: page not found"
    );
}

#[tokio::test]
async fn test_timeout_message() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/slow",
        html("late").set_delay(Duration::from_secs(3)),
    )
    .await;

    let err = toolkit()
        .call(
            "stealth_fetch_page",
            json!({"url": format!("{}/slow", server.uri()), "timeout": 0.5}),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Request timed out. Try increasing the timeout value."
    );
}

#[tokio::test]
async fn test_extract_metadata() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/meta",
        html(
            r#"<html><head>
            <script type="application/ld+json">{"@type": "Article"}</script>
            <meta property="og:title" content="OG Title" />
            <meta name="twitter:card" content="summary" />
            <meta name="description" content="Desc" />
            </head><body></body></html>"#,
        ),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_extract_metadata",
            json!({"url": format!("{}/meta", server.uri())}),
        )
        .await
        .unwrap();
    let data: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(data["json_ld"][0]["@type"], "Article");
    assert_eq!(data["opengraph"]["title"], "OG Title");
    assert_eq!(data["twitter"]["card"], "summary");
    assert_eq!(data["meta"]["description"], "Desc");
}

#[tokio::test]
async fn test_extract_tables() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/tables",
        html(
            r#"<table>
            <thead><tr><th>Name</th><th>Price</th></tr></thead>
            <tbody><tr><td>Tea</td><td>3</td></tr></tbody>
            </table>"#,
        ),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_extract_tables",
            json!({"url": format!("{}/tables", server.uri())}),
        )
        .await
        .unwrap();
    let tables: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        tables,
        json!([{"headers": ["Name", "Price"], "rows": [["Tea", "3"]]}])
    );
}

#[tokio::test]
async fn test_fetch_feed() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/feed.xml",
        ResponseTemplate::new(200)
            .set_body_string(
                r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>Blog</title><link>https://blog.test</link>
  <item><title>One</title><link>https://blog.test/1</link><description>First</description></item>
  <item><title>Two</title><link>https://blog.test/2</link><description>Second</description></item>
</channel></rss>"#,
            )
            .insert_header("content-type", "application/rss+xml"),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_fetch_feed",
            json!({"url": format!("{}/feed.xml", server.uri()), "max_items": 1}),
        )
        .await
        .unwrap();
    let feed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(feed["feed_title"], "Blog");
    assert_eq!(feed["items"].as_array().unwrap().len(), 1);
    assert_eq!(feed["items"][0]["summary"], "First");
}

#[tokio::test]
async fn test_fetch_feed_rejects_html() {
    let server = MockServer::start().await;
    serve(&server, "/notfeed", html("<html><body>hi</body></html>")).await;

    let err = toolkit()
        .call(
            "stealth_fetch_feed",
            json!({"url": format!("{}/notfeed", server.uri())}),
        )
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unrecognized feed format"));
}

#[tokio::test]
async fn test_fetch_robots() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_string(
            "User-agent: *\nDisallow: /admin\nAllow: /admin/public\n\nSitemap: https://x/sm.xml\nSitemap: https://x/sm.xml\n",
        ),
    )
    .await;

    let out = toolkit()
        .call(
            "stealth_fetch_robots",
            json!({"url": format!("{}/some/deep/page?q=1", server.uri())}),
        )
        .await
        .unwrap();
    let policy: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(policy["url"], format!("{}/robots.txt", server.uri()));
    assert_eq!(policy["user_agents"]["*"]["disallow"], json!(["/admin"]));
    assert_eq!(policy["user_agents"]["*"]["allow"], json!(["/admin/public"]));
    assert_eq!(policy["sitemaps"], json!(["https://x/sm.xml"]));
}

#[tokio::test]
async fn test_scoped_session_override() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/scoped"))
        .and(header("x-session", "scoped"))
        .respond_with(html("scoped hello"))
        .mount(&server)
        .await;
    serve(&server, "/scoped", ResponseTemplate::new(403)).await;

    let kit = toolkit();
    let url = format!("{}/scoped", server.uri());

    let out = kit
        .call(
            "stealth_fetch_page",
            json!({"url": url, "session_options": {"headers": {"x-session": "scoped"}}}),
        )
        .await
        .unwrap();
    assert_eq!(out, "scoped hello");

    // The shared session is untouched by the override
    let err = kit
        .call("stealth_fetch_page", json!({"url": url}))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::HttpStatus { status: 403, .. }));
}

#[tokio::test]
async fn test_bulk_isolation_and_order() {
    let server = MockServer::start().await;
    serve(&server, "/a", html("alpha")).await;
    serve(&server, "/c", html("gamma").set_delay(Duration::from_millis(200))).await;

    let out = toolkit()
        .call(
            "stealth_fetch_bulk",
            json!({
                "urls": [
                    {"url": format!("{}/c", server.uri())},
                    {"url": "http://127.0.0.1:1/"},
                    {"url": format!("{}/a", server.uri())}
                ],
                "max_concurrency": 3,
                "timeout": 5
            }),
        )
        .await
        .unwrap();
    let items: Vec<Value> = serde_json::from_str(&out).unwrap();
    assert_eq!(items.len(), 3);

    assert_eq!(items[0]["url"], format!("{}/c", server.uri()));
    assert_eq!(items[0]["status"], "ok");
    assert_eq!(items[0]["text"], "gamma");

    assert_eq!(items[1]["url"], "http://127.0.0.1:1/");
    assert_eq!(items[1]["status"], "error");
    assert!(items[1]["error"].is_string());
    assert!(items[1].get("text").is_none());

    assert_eq!(items[2]["status"], "ok");
    assert_eq!(items[2]["status_code"], 200);
    assert_eq!(items[2]["text"], "alpha");
}

#[tokio::test]
async fn test_client_fetch_with_session() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/thing"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let session = Session::new(SessionOptions::default()).unwrap();
    let call = FetchCall::new(format!("{}/thing", server.uri())).method(HttpMethod::Delete);
    let result = fetch(&session, call).await.unwrap();
    assert_eq!(result.status_code, 204);
    assert_eq!(result.text, "");
}

#[tokio::test]
async fn test_session_base_url() {
    let server = MockServer::start().await;
    serve(&server, "/relative", html("joined")).await;

    let options: SessionOptions =
        serde_json::from_value(json!({"base_url": format!("{}/", server.uri())})).unwrap();
    let session = Session::new(options).unwrap();
    let result = session
        .request(TransportRequest {
            method: HttpMethod::Get,
            url: "relative".to_string(),
            body: None,
            options: Default::default(),
        })
        .await
        .unwrap();
    assert_eq!(result.body, "joined");
}
