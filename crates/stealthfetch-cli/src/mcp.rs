//! MCP (Model Context Protocol) server implementation

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use stealthfetch::{Toolkit, TOOL_DESCRIPTION};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

fn text_content(text: String, is_error: bool) -> Value {
    let mut result = json!({
        "content": [{
            "type": "text",
            "text": text
        }]
    });
    if is_error {
        result["isError"] = json!(true);
    }
    result
}

/// MCP Server implementation
struct McpServer {
    toolkit: Toolkit,
}

impl McpServer {
    fn new(toolkit: Toolkit) -> Self {
        Self { toolkit }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {}
                },
                "serverInfo": {
                    "name": "stealthfetch",
                    "version": env!("CARGO_PKG_VERSION")
                },
                "instructions": TOOL_DESCRIPTION
            }),
        )
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let tools = serde_json::to_value(self.toolkit.tools()).unwrap_or(json!([]));
        JsonRpcResponse::success(id, json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, id: Option<Value>, params: Value) -> JsonRpcResponse {
        let Some(tool_name) = params.get("name").and_then(|v| v.as_str()) else {
            return JsonRpcResponse::error(id, -32602, "Missing tool name");
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        match self.toolkit.call(tool_name, arguments).await {
            Ok(output) => JsonRpcResponse::success(id, text_content(output, false)),
            Err(e) => {
                debug!(tool = tool_name, error = %e, "Tool call failed");
                JsonRpcResponse::success(id, text_content(format!("Error: {}", e), true))
            }
        }
    }
}

async fn write_response<W>(out: &Mutex<W>, response: &JsonRpcResponse)
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(response).unwrap_or_default();
    line.push('\n');
    let mut out = out.lock().await;
    if let Err(e) = out.write_all(line.as_bytes()).await {
        warn!(error = %e, "Failed to write response");
        return;
    }
    let _ = out.flush().await;
}

/// Run the MCP server over stdio
pub async fn run_server(toolkit: Toolkit) {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = Arc::new(Mutex::new(tokio::io::stdout()));
    serve(toolkit, stdin, stdout).await;
}

/// Answer newline-delimited requests from `input` until it closes
///
/// Tool calls run on their own tasks so a slow fetch does not hold up
/// other requests. Responses share one locked writer. Calls still in flight
/// at end of input are awaited before returning.
async fn serve<R, W>(toolkit: Toolkit, input: R, output: Arc<Mutex<W>>)
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let server = Arc::new(McpServer::new(toolkit));
    let mut calls = JoinSet::new();
    let mut lines = input.lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Error reading input, shutting down");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(req) => req,
            Err(e) => {
                let response = JsonRpcResponse::error(None, -32700, format!("Parse error: {}", e));
                write_response(&output, &response).await;
                continue;
            }
        };

        // Notifications get no response
        if request.id.is_none() {
            debug!(method = %request.method, "Notification");
            continue;
        }

        if request.method == "tools/call" {
            let server = Arc::clone(&server);
            let output = Arc::clone(&output);
            calls.spawn(async move {
                let response = server.handle_request(request).await;
                write_response(&output, &response).await;
            });
        } else {
            let response = server.handle_request(request).await;
            write_response(&output, &response).await;
        }

        // Reap finished calls so the set stays small on long sessions
        while calls.try_join_next().is_some() {}
    }

    if !calls.is_empty() {
        debug!(pending = calls.len(), "Input closed, waiting for tool calls");
    }
    while let Some(joined) = calls.join_next().await {
        if let Err(e) = joined {
            warn!(error = %e, "Tool call task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> McpServer {
        McpServer::new(Toolkit::builder().build().unwrap())
    }

    fn request(id: i64, method: &str, params: Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(id)),
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn test_initialize() {
        let response = server()
            .handle_request(request(1, "initialize", json!({})))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "stealthfetch");
    }

    #[tokio::test]
    async fn test_tools_list() {
        let response = server()
            .handle_request(request(2, "tools/list", Value::Null))
            .await;
        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 10);
        assert!(tools.iter().all(|t| t["inputSchema"].is_object()));
        assert!(tools
            .iter()
            .all(|t| t["annotations"]["readOnlyHint"] == json!(true)));
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let response = server()
            .handle_request(request(3, "resources/list", Value::Null))
            .await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_tool_error_is_result() {
        let response = server()
            .handle_request(request(
                4,
                "tools/call",
                json!({"name": "stealth_fetch_page", "arguments": {"url": "ftp://x"}}),
            ))
            .await;
        let result = response.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error: "));
        assert!(text.contains("URL must start with http:// or https://"));
    }

    #[tokio::test]
    async fn test_missing_tool_name() {
        let response = server()
            .handle_request(request(5, "tools/call", json!({})))
            .await;
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[tokio::test]
    async fn test_pending_calls_answered_after_input_closes() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"stealth_fetch_bulk","arguments":{"urls":["http://127.0.0.1:1/"],"delay":0.2,"timeout":2}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"stealth_fetch_page","arguments":{"url":"ftp://x"}}}"#,
            "\n",
        );
        let output = Arc::new(Mutex::new(Vec::new()));
        serve(
            Toolkit::builder().build().unwrap(),
            input.as_bytes(),
            Arc::clone(&output),
        )
        .await;

        let written = output.lock().await.clone();
        let responses: Vec<Value> = String::from_utf8(written)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let mut ids: Vec<i64> = responses
            .iter()
            .map(|r| r["id"].as_i64().unwrap())
            .collect();
        ids.sort();
        assert_eq!(ids, vec![1, 2, 3]);

        let bulk = responses.iter().find(|r| r["id"] == 2).unwrap();
        let text = bulk["result"]["content"][0]["text"].as_str().unwrap();
        let items: Value = serde_json::from_str(text).unwrap();
        assert_eq!(items[0]["status"], "error");
    }

    #[tokio::test]
    async fn test_parse_error_and_notification() {
        let input = "not json\n{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n";
        let output = Arc::new(Mutex::new(Vec::new()));
        serve(
            Toolkit::builder().build().unwrap(),
            input.as_bytes(),
            Arc::clone(&output),
        )
        .await;

        let written = String::from_utf8(output.lock().await.clone()).unwrap();
        let lines: Vec<&str> = written.lines().collect();
        assert_eq!(lines.len(), 1);
        let response: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(response["error"]["code"], -32700);
    }

    #[test]
    fn test_response_serialization() {
        let ok = JsonRpcResponse::success(Some(json!(1)), json!({}));
        let text = serde_json::to_string(&ok).unwrap();
        assert_eq!(text, r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);

        let err = JsonRpcResponse::error(None, -32700, "Parse error");
        let text = serde_json::to_string(&err).unwrap();
        assert_eq!(
            text,
            r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"Parse error"}}"#
        );
    }
}
