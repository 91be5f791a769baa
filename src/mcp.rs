use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::error::{GraylogError, Result};
use crate::tools::{tool_definitions, GraylogTools};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "graylog-mcp";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

impl RpcRequest {
    /// JSON-RPC notifications carry no id and get no response.
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcResponse {
    fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn err(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".into(),
            id,
            result: None,
            error: Some(RpcError { code, message }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Messages the server must write for one inbound message, in order.
/// Usually a single response; `notifications/initialized` yields a
/// `tools/list_changed` notification instead.
pub async fn process_message(tools: &GraylogTools, req: RpcRequest) -> Vec<Value> {
    if req.method == "notifications/initialized" {
        return vec![json!({
            "jsonrpc": "2.0",
            "method": "notifications/tools/list_changed"
        })];
    }
    match process_request(tools, req).await {
        Some(resp) => vec![serde_json::to_value(resp).unwrap_or(Value::Null)],
        None => Vec::new(),
    }
}

pub async fn process_request(tools: &GraylogTools, req: RpcRequest) -> Option<RpcResponse> {
    debug!(method = %req.method, "rpc request");
    let resp = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "ping" => RpcResponse::ok(req.id.clone(), json!({})),
        "tools/list" => RpcResponse::ok(req.id.clone(), json!({ "tools": tool_definitions() })),
        "tools/call" => handle_call_tool(tools, &req).await,
        _ if req.is_notification() => {
            debug!(method = %req.method, "ignoring notification");
            return None;
        }
        _ => RpcResponse::err(
            req.id.clone(),
            METHOD_NOT_FOUND,
            format!("method not found: {}", req.method),
        ),
    };
    if req.is_notification() {
        return None;
    }
    Some(resp)
}

fn handle_initialize(req: &RpcRequest) -> RpcResponse {
    RpcResponse::ok(
        req.id.clone(),
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": true }
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

async fn handle_call_tool(tools: &GraylogTools, req: &RpcRequest) -> RpcResponse {
    let params: CallToolParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => return RpcResponse::err(req.id.clone(), INVALID_PARAMS, format!("invalid params: {e}")),
    };

    match tools.call(&params.name, params.arguments).await {
        Ok(text) => RpcResponse::ok(
            req.id.clone(),
            json!({ "content": [{ "type": "text", "text": text }] }),
        ),
        Err(GraylogError::InvalidRequest(msg)) => RpcResponse::err(req.id.clone(), INVALID_PARAMS, msg),
        // backend failures are reported to the model, not as protocol errors
        Err(e) => {
            warn!(tool = %params.name, error = %e, "tool call failed");
            RpcResponse::ok(
                req.id.clone(),
                json!({
                    "content": [{ "type": "text", "text": e.to_string() }],
                    "isError": true
                }),
            )
        }
    }
}

pub async fn run_stdio(tools: Arc<GraylogTools>) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin).lines();
    let mut stdout = tokio::io::stdout();
    info!("serving MCP over stdio");

    while let Some(line) = reader.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let req: RpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                let resp = RpcResponse::err(Value::Null, PARSE_ERROR, format!("parse error: {e}"));
                write_message(&mut stdout, &serde_json::to_value(resp)?).await?;
                continue;
            }
        };

        for msg in process_message(&tools, req).await {
            write_message(&mut stdout, &msg).await?;
        }
    }

    info!("stdin closed, shutting down");
    Ok(())
}

async fn write_message(stdout: &mut tokio::io::Stdout, msg: &Value) -> Result<()> {
    let line = serde_json::to_string(msg)?;
    stdout.write_all(line.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}
