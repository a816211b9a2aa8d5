//! Line-delimited JSON-RPC server.
//!
//! Each input line is one request; each response is one output line,
//! flushed before the next line is read. Requests are handled strictly in
//! order. Requests without an id are notifications and never get a line
//! back, even when they fail.

use super::protocol::{
    Payload, Request, Response, ToolCallParams, ToolCallResult, ToolInfo, INTERNAL_ERROR,
    INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR, PROTOCOL_VERSION,
};
use super::registry::ToolRegistry;
use crate::core::error::{Error, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "git-guardian";

/// Supported protocol methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `initialized` or `notifications/initialized`
    Initialized,
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// `resources/list`
    ResourcesList,
    /// `prompts/list`
    PromptsList,
    /// `ping`
    Ping,
    /// Anything else.
    Unknown(String),
}

impl Method {
    /// Parses a method name.
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "initialize" => Self::Initialize,
            "initialized" | "notifications/initialized" => Self::Initialized,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            "resources/list" => Self::ResourcesList,
            "prompts/list" => Self::PromptsList,
            "ping" => Self::Ping,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Returns true for methods polled often enough to be noise at debug level.
    const fn is_routine(&self) -> bool {
        matches!(self, Self::ResourcesList | Self::PromptsList | Self::Ping)
    }
}

/// Protocol server dispatching to a borrowed tool registry.
#[derive(Debug)]
pub struct Server<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> Server<'a> {
    /// Creates a server over `registry`.
    #[must_use]
    pub const fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Serves requests until end of input.
    ///
    /// End of input is a clean shutdown. Any other read failure is returned.
    /// Lines are read as raw bytes, so a line that is not UTF-8 is answered
    /// with a parse error like any other malformed request. Failures to
    /// write a response are logged and do not stop the loop.
    pub async fn serve<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(tools = self.registry.len(), "Protocol server starting");
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .await
                .map_err(|e| Error::io("read request", e))?;
            if read == 0 {
                break;
            }

            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            if let Some(response) = self.handle_line(&line).await {
                if let Err(e) = write_response(&mut writer, &response).await {
                    tracing::warn!(error = %e, "Failed to write response");
                }
            }
        }

        tracing::info!("Input closed, shutting down");
        Ok(())
    }

    /// Handles one input line, returning the response to send, if any.
    pub async fn handle_line(&self, line: &[u8]) -> Option<Response> {
        let request: Request = match serde_json::from_slice(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable request");
                return Some(Response::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ));
            },
        };

        let method = Method::parse(&request.method);
        if method.is_routine() {
            tracing::trace!(method = %request.method, "Handling method");
        } else {
            tracing::debug!(method = %request.method, "Handling method");
        }

        let payload = self.dispatch(&method, request.params).await?;

        match request.id {
            Some(id) => Some(Response::new(id, payload)),
            None => {
                if let Payload::Error(e) = &payload {
                    tracing::debug!(method = %request.method, error = %e.message, "Dropping notification error");
                }
                None
            },
        }
    }

    /// Runs a method. `None` means the method never produces a response.
    async fn dispatch(&self, method: &Method, params: Option<Value>) -> Option<Payload> {
        let payload = match method {
            Method::Initialize => Payload::Result(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": crate::VERSION,
                },
                "capabilities": {
                    "tools": {},
                    "resources": {},
                    "prompts": {},
                },
            })),
            Method::Initialized => return None,
            Method::ToolsList => self.tools_list(),
            Method::ToolsCall => self.tools_call(params).await,
            Method::ResourcesList => Payload::Result(json!({ "resources": [] })),
            Method::PromptsList => Payload::Result(json!({ "prompts": [] })),
            Method::Ping => Payload::Result(json!({})),
            Method::Unknown(name) => {
                tracing::debug!(method = %name, "Unknown method");
                Payload::error(METHOD_NOT_FOUND, format!("Method not found: {name}"))
            },
        };
        Some(payload)
    }

    fn tools_list(&self) -> Payload {
        let tools: Vec<ToolInfo> = self
            .registry
            .tools()
            .map(|tool| ToolInfo {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                input_schema: json!({ "type": "object", "properties": {} }),
            })
            .collect();
        Payload::Result(json!({ "tools": tools }))
    }

    async fn tools_call(&self, params: Option<Value>) -> Payload {
        let params: ToolCallParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            Some(Err(e)) => return Payload::error(INVALID_PARAMS, format!("Invalid params: {e}")),
            None => return Payload::error(INVALID_PARAMS, "Invalid params: missing params"),
        };

        let Some(tool) = self.registry.get(&params.name) else {
            return Payload::error(INVALID_PARAMS, format!("Tool not found: {}", params.name));
        };

        tracing::info!(tool = %params.name, "Executing tool");
        let arguments = match params.arguments {
            Some(Value::Null) | None => json!({}),
            Some(arguments) => arguments,
        };

        match tool.call(arguments).await {
            Ok(result) => match serde_json::to_value(ToolCallResult::text(&result)) {
                Ok(wrapped) => Payload::Result(wrapped),
                Err(e) => Payload::error(INTERNAL_ERROR, format!("Tool execution error: {e}")),
            },
            Err(e) => {
                if e.is_user_error() {
                    tracing::info!(tool = %params.name, error = %e, "Tool rejected request");
                } else {
                    tracing::warn!(tool = %params.name, error = %e, "Tool failed");
                }
                Payload::error(INTERNAL_ERROR, format!("Tool execution error: {e}"))
            },
        }
    }
}

/// Writes one response line and flushes.
async fn write_response<W>(writer: &mut W, response: &Response) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line =
        serde_json::to_vec(response).map_err(|e| Error::json("encode response", e))?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .map_err(|e| Error::io("write response", e))?;
    writer
        .flush()
        .await
        .map_err(|e| Error::io("flush response", e))
}
