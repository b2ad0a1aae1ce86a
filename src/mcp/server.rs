//! MCP stdio server exposing the event store to AI tooling.
//!
//! Speaks JSON-RPC 2.0 over stdin/stdout, one message per line. Two
//! tools are registered: `get_last_workflows` (recent workflow summaries)
//! and `get_event` (point lookup by delivery id).

use super::protocol::{
    error_codes, InitializeResult, JsonRpcRequest, JsonRpcResponse, ServerCapabilities,
    ServerInfo, Tool, ToolCallParams, ToolCallResult, ToolsCapability, ToolsListResult,
};
use crate::event_store::FileEventStore;
use crate::workflows;
use anyhow::Result;
use serde_json::{json, Value};
use std::io::{BufRead, Write};

const SERVER_NAME: &str = "github-events";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Default number of workflows returned when the caller omits `limit`.
const DEFAULT_WORKFLOW_LIMIT: u64 = 10;

/// MCP server backed by the file event store.
pub struct McpEventServer {
    store: FileEventStore,
}

impl McpEventServer {
    pub fn new(store: FileEventStore) -> Self {
        Self { store }
    }

    /// Runs the server synchronously, reading requests from stdin and
    /// writing responses to stdout until EOF.
    pub fn run_sync(self) -> Result<()> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(&line) {
                let encoded = serde_json::to_string(&response)?;
                writeln!(stdout, "{}", encoded)?;
                stdout.flush()?;
            }
        }

        Ok(())
    }

    /// Handles a single JSON-RPC message. Notifications (no id) are
    /// consumed without a response.
    fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(message) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    None,
                    error_codes::PARSE_ERROR,
                    format!("Failed to parse request: {}", e),
                ));
            }
        };

        if request.id.is_none() {
            return None;
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tool_call(request.params),
            _ => Err((
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err((code, message)) => JsonRpcResponse::error(request.id, code, message),
        })
    }

    fn handle_initialize(&self) -> Result<Value, (i32, String)> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        serialize_result(result)
    }

    fn handle_tools_list(&self) -> Result<Value, (i32, String)> {
        let tools = vec![
            Tool {
                name: "get_last_workflows".to_string(),
                description: "Get the last workflow runs from the GitHub events database."
                    .to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "number",
                            "default": DEFAULT_WORKFLOW_LIMIT,
                            "description": "The maximum number of workflows to retrieve (default 10)."
                        }
                    }
                }),
            },
            Tool {
                name: "get_event".to_string(),
                description: "Get a single stored GitHub event by its id field.".to_string(),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "id": {
                            "type": "string",
                            "description": "The id of the stored event to fetch."
                        }
                    },
                    "required": ["id"]
                }),
            },
        ];

        serialize_result(ToolsListResult { tools })
    }

    fn handle_tool_call(&self, params: Option<Value>) -> Result<Value, (i32, String)> {
        let params = params.ok_or((error_codes::INVALID_PARAMS, "Missing params".to_string()))?;
        let call: ToolCallParams = serde_json::from_value(params)
            .map_err(|e| (error_codes::INVALID_PARAMS, format!("Invalid tool call params: {}", e)))?;

        let result = match call.name.as_str() {
            "get_last_workflows" => self.handle_get_last_workflows(&call.arguments),
            "get_event" => self.handle_get_event(&call.arguments),
            _ => ToolCallResult::error(format!("Unknown tool: {}", call.name)),
        };

        serialize_result(result)
    }

    fn handle_get_last_workflows(&self, arguments: &Value) -> ToolCallResult {
        let limit = arguments
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_WORKFLOW_LIMIT) as usize;

        let summaries = workflows::list_recent_workflows(&self.store, limit);
        let encoded = match serde_json::to_string_pretty(&summaries) {
            Ok(encoded) => encoded,
            Err(e) => return ToolCallResult::error(format!("Error fetching workflows: {}", e)),
        };

        if summaries.is_empty() {
            ToolCallResult::texts(vec!["No workflows found.".to_string(), encoded])
        } else {
            ToolCallResult::text(encoded)
        }
    }

    fn handle_get_event(&self, arguments: &Value) -> ToolCallResult {
        let id = match arguments.get("id").and_then(Value::as_str) {
            Some(id) => id,
            None => return ToolCallResult::error("Missing required argument: id".to_string()),
        };

        match self.store.get(id) {
            Some(event) => match serde_json::to_string_pretty(&event) {
                Ok(encoded) => ToolCallResult::text(encoded),
                Err(e) => ToolCallResult::error(format!("Error encoding event: {}", e)),
            },
            None => ToolCallResult::error(format!("No event found with id: {}", id)),
        }
    }
}

fn serialize_result(result: impl serde::Serialize) -> Result<Value, (i32, String)> {
    serde_json::to_value(result)
        .map_err(|e| (error_codes::INTERNAL_ERROR, format!("Serialization error: {}", e)))
}
