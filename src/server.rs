use crate::mcp::mcp_wrap;
use crate::tools::{tool_descriptors, ToolDispatcher, PROTOCOL_VERSION};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Id {
    Str(String),
    Num(i64),
}

#[derive(Debug, Deserialize)]
struct Request {
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize)]
struct RpcError {
    code: i64,
    message: String,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str) -> Response {
    Response {
        jsonrpc: "2.0",
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0",
        result: Some(result),
        error: None,
        id,
    }
}

/// Serve newline-delimited JSON-RPC on stdin/stdout until EOF.
pub async fn run_stdio_server(dispatcher: &ToolDispatcher) -> anyhow::Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve(dispatcher, stdin, stdout).await
}

/// Requests are handled one at a time, in arrival order.
pub async fn serve<R, W>(dispatcher: &ToolDispatcher, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Serving MCP over stdio; protocol={}", PROTOCOL_VERSION);
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if let Some(resp) = handle_line(dispatcher, &line).await {
            let payload = serde_json::to_string(&resp)?;
            writer.write_all(payload.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    info!("stdin closed; stopping server");
    Ok(())
}

async fn handle_line(dispatcher: &ToolDispatcher, line: &str) -> Option<Response> {
    let req: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!("Discarding unparsable message: {}", e);
            return Some(rpc_error(None, -32700, &format!("Parse error: {}", e)));
        }
    };
    debug!("Received method={}", req.method);
    // Notifications carry no id and never get a reply.
    let Some(id) = req.id else {
        debug!("Notification {}", req.method);
        return None;
    };
    Some(dispatch(dispatcher, id, &req.method, req.params).await)
}

async fn dispatch(dispatcher: &ToolDispatcher, id: Id, method: &str, params: Value) -> Response {
    match method {
        "initialize" => handle_initialize(id),
        "ping" => rpc_ok(Some(id), serde_json::json!({})),
        "tools/list" => rpc_ok(Some(id), serde_json::json!({ "tools": tool_descriptors() })),
        "tools/call" => handle_tools_call(dispatcher, id, params).await,
        other => rpc_error(Some(id), -32601, &format!("Method not found: {}", other)),
    }
}

fn handle_initialize(id: Id) -> Response {
    rpc_ok(
        Some(id),
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "github-account-mcp",
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

async fn handle_tools_call(dispatcher: &ToolDispatcher, id: Id, params: Value) -> Response {
    let call: ToolCallParams = match serde_json::from_value(params) {
        Ok(c) => c,
        Err(e) => return rpc_error(Some(id), -32602, &format!("Invalid params: {}", e)),
    };
    let result = dispatcher.call_tool(&call.name, &call.arguments).await;
    rpc_ok(Some(id), mcp_wrap(&result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Credentials};
    use crate::http::GitHubClient;

    fn dispatcher() -> ToolDispatcher {
        // Points at a closed port; these tests never reach the network.
        let cfg = Config::new(Credentials::new("t", "me")).with_api_url("http://127.0.0.1:9");
        ToolDispatcher::new(GitHubClient::new(&cfg).unwrap())
    }

    async fn run(input: &str) -> Vec<Value> {
        let d = dispatcher();
        let mut out = Vec::new();
        serve(&d, input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn initialize_then_list() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"initialize","id":1,"params":{}}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"tools/list","id":"two"}"#, "\n",
        );
        let out = run(input).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(out[1]["id"], "two");
        assert_eq!(out[1]["result"]["tools"].as_array().map(Vec::len), Some(4));
    }

    #[tokio::test]
    async fn unknown_tool_is_a_text_error_not_rpc_error() {
        let input = r#"{"jsonrpc":"2.0","method":"tools/call","id":3,"params":{"name":"nope","arguments":{}}}"#;
        let out = run(input).await;
        assert!(out[0].get("error").is_none());
        assert_eq!(out[0]["result"]["content"][0]["text"], "Error: Unknown tool: nope");
        assert_eq!(out[0]["result"]["isError"], true);
    }

    #[tokio::test]
    async fn validation_error_before_network() {
        let input = r#"{"jsonrpc":"2.0","method":"tools/call","id":4,"params":{"name":"get_my_repos","arguments":{"limit":101}}}"#;
        let out = run(input).await;
        assert_eq!(
            out[0]["result"]["content"][0]["text"],
            "Error: limit must be between 1 and 100"
        );
    }

    #[tokio::test]
    async fn protocol_errors() {
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"2.0","method":"resources/list","id":5}"#, "\n",
            r#"{"jsonrpc":"2.0","method":"tools/call","id":6,"params":{"arguments":{}}}"#, "\n",
        );
        let out = run(input).await;
        assert_eq!(out[0]["error"]["code"], -32700);
        assert_eq!(out[1]["error"]["code"], -32601);
        assert_eq!(out[2]["error"]["code"], -32602);
    }
}
