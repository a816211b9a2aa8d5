//! JSON-RPC message types for the tool protocol.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version marker.
pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// The request line is not valid JSON.
pub const PARSE_ERROR: i32 = -32700;
/// The method is not known.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Malformed parameters, or an unknown tool.
pub const INVALID_PARAMS: i32 = -32602;
/// A tool handler failed.
pub const INTERNAL_ERROR: i32 = -32603;

/// An incoming request or notification.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    /// Version marker. Accepted as sent.
    #[serde(default)]
    pub jsonrpc: String,
    /// Request id, echoed in the response. Absent or null for notifications.
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name.
    #[serde(default)]
    pub method: String,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    /// Returns true if no response may be sent for this request.
    #[must_use]
    pub const fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Error object carried by a failed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
}

/// Outcome of a request: a result or an error, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload {
    /// Successful result.
    Result(Value),
    /// Failure.
    Error(RpcError),
}

impl Payload {
    /// Creates an error payload.
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self::Error(RpcError {
            code,
            message: message.into(),
        })
    }
}

/// A response line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Id of the request being answered, or null for parse errors.
    pub id: Value,
    /// Result or error.
    #[serde(flatten)]
    pub payload: Payload,
}

impl Response {
    /// Creates a response for `id`.
    #[must_use]
    pub fn new(id: Value, payload: Payload) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            payload,
        }
    }

    /// Creates an error response.
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self::new(id, Payload::error(code, message))
    }

    /// Returns the error, if this is an error response.
    #[must_use]
    pub const fn as_error(&self) -> Option<&RpcError> {
        match &self.payload {
            Payload::Error(e) => Some(e),
            Payload::Result(_) => None,
        }
    }

    /// Returns the result, if this is a successful response.
    #[must_use]
    pub const fn as_result(&self) -> Option<&Value> {
        match &self.payload {
            Payload::Result(v) => Some(v),
            Payload::Error(_) => None,
        }
    }
}

/// Parameters of `tools/call`.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Tool name.
    pub name: String,
    /// Tool arguments. Missing arguments mean an empty object.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// One content block of a tool result.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    /// Content type, always `"text"`.
    #[serde(rename = "type")]
    pub kind: &'static str,
    /// Pretty-printed JSON result.
    pub text: String,
}

/// Result of `tools/call`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content blocks.
    pub content: Vec<Content>,
}

impl ToolCallResult {
    /// Wraps a tool's JSON output as a single text block.
    #[must_use]
    pub fn text(value: &Value) -> Self {
        let text = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        Self {
            content: vec![Content { kind: "text", text }],
        }
    }
}

/// Entry of `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// What the tool does.
    pub description: String,
    /// JSON schema for the arguments.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}
