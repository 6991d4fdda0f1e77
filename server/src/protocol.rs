//! MCP JSON-RPC 2.0 message types and routing.
//!
//! One JSON object per line on stdin/stdout:
//! - Request:      {"jsonrpc":"2.0","id":1,"method":"tools/call","params":{...}}
//! - Notification: {"jsonrpc":"2.0","method":"notifications/initialized"}
//! - Success:      {"jsonrpc":"2.0","id":1,"result":{...}}
//! - Error:        {"jsonrpc":"2.0","id":1,"error":{"code":-32601,"message":"..."}}
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::handler::{ClipboardReader, ReadFormat};

pub const JSONRPC_VERSION: &str = "2.0";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "mcp-clip";
pub const READ_CLIPBOARD_TOOL: &str = "read_clipboard";

/// JSON-RPC 2.0 standard error codes
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// A parsed request or notification. `id` is `None` for notifications.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcRequest {
    pub id: Option<Value>,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

/// Methods this server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    Initialize,
    Ping,
    ToolsList,
    ToolsCall,
}

impl McpMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "initialize" => Some(Self::Initialize),
            "ping" => Some(Self::Ping),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            _ => None,
        }
    }
}

/// Tool definition as listed by `tools/list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of a `tools/call`. Tool failures are results with `isError: true`,
/// not JSON-RPC errors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: text.into(),
            }],
            is_error: None,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            is_error: Some(true),
            ..Self::text(text)
        }
    }
}

pub fn read_clipboard_tool() -> ToolDefinition {
    ToolDefinition {
        name: READ_CLIPBOARD_TOOL.to_string(),
        description: "Read the current clipboard content, supporting text and images".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "format": {
                    "type": "string",
                    "description": "Format to return clipboard content in: 'text', 'base64', or 'auto' (default)",
                    "enum": ["text", "base64", "auto"]
                }
            }
        }),
    }
}

/// Parses one line of input into a request, or the error response to send
/// back. `Ok(None)` is a response from the client, which gets no reply.
pub fn parse_request(line: &str) -> Result<Option<JsonRpcRequest>, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        JsonRpcResponse::error(Value::Null, error_codes::PARSE_ERROR, format!("Parse error: {e}"))
    })?;

    let id = value.get("id").cloned();
    let reply_id = id.clone().unwrap_or(Value::Null);

    match value.get("jsonrpc").and_then(Value::as_str) {
        Some(JSONRPC_VERSION) => {}
        Some(other) => {
            return Err(JsonRpcResponse::error(
                reply_id,
                error_codes::INVALID_REQUEST,
                format!("Invalid jsonrpc version: expected '{JSONRPC_VERSION}', got '{other}'"),
            ))
        }
        None => {
            return Err(JsonRpcResponse::error(
                reply_id,
                error_codes::INVALID_REQUEST,
                "Missing or invalid 'jsonrpc' field",
            ))
        }
    }

    if value.get("method").is_none() && (value.get("result").is_some() || value.get("error").is_some()) {
        tracing::debug!(id = %reply_id, "ignoring response from client");
        return Ok(None);
    }

    let method = value
        .get("method")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            JsonRpcResponse::error(
                reply_id.clone(),
                error_codes::INVALID_REQUEST,
                "Missing 'method' field",
            )
        })?
        .to_string();

    let params = value.get("params").cloned().unwrap_or_else(|| json!({}));

    Ok(Some(JsonRpcRequest { id, method, params }))
}

/// Routes a request. Returns `None` for notifications, which get no reply.
pub async fn handle_request(request: JsonRpcRequest, reader: &ClipboardReader) -> Option<JsonRpcResponse> {
    if request.is_notification() {
        tracing::debug!(method = %request.method, "notification received");
        return None;
    }
    let JsonRpcRequest { id, method, params } = request;
    let id = id.unwrap_or(Value::Null);

    let response = match McpMethod::parse(&method) {
        Some(McpMethod::Initialize) => handle_initialize(id, &params),
        Some(McpMethod::Ping) => JsonRpcResponse::success(id, json!({})),
        Some(McpMethod::ToolsList) => JsonRpcResponse::success(
            id,
            json!({ "tools": [read_clipboard_tool()] }),
        ),
        Some(McpMethod::ToolsCall) => handle_tools_call(id, &params, reader).await,
        None => JsonRpcResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {method}"),
        ),
    };
    Some(response)
}

fn handle_initialize(id: Value, params: &Value) -> JsonRpcResponse {
    let protocol_version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    JsonRpcResponse::success(
        id,
        json!({
            "protocolVersion": protocol_version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION"),
            }
        }),
    )
}

async fn handle_tools_call(id: Value, params: &Value, reader: &ClipboardReader) -> JsonRpcResponse {
    let Some(params) = params.as_object() else {
        return JsonRpcResponse::error(
            id,
            error_codes::INVALID_PARAMS,
            "Invalid params: expected object",
        );
    };
    let Some(name) = params.get("name").and_then(Value::as_str) else {
        return JsonRpcResponse::error(
            id,
            error_codes::INVALID_PARAMS,
            "Missing required parameter: name",
        );
    };
    if name != READ_CLIPBOARD_TOOL {
        return JsonRpcResponse::error(
            id,
            error_codes::INVALID_PARAMS,
            format!("Tool not found: {name}"),
        );
    }

    let format = params
        .get("arguments")
        .and_then(|args| args.get("format"))
        .and_then(Value::as_str);

    let result = match ReadFormat::parse(format) {
        Ok(format) => match reader.read(format).await {
            Ok(outcome) => ToolResult::text(outcome.to_string()),
            Err(e) => {
                tracing::debug!(error = %e, "read_clipboard failed");
                ToolResult::error(e.to_string())
            }
        },
        Err(e) => ToolResult::error(e.to_string()),
    };

    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}
