//! JSON-RPC 2.0 framing and the MCP payloads this client exchanges.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::types::{ServerInfo, ToolDescriptor};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub(crate) const METHOD_INITIALIZE: &str = "initialize";
pub(crate) const METHOD_INITIALIZED: &str = "notifications/initialized";
pub(crate) const METHOD_CANCELLED: &str = "notifications/cancelled";
pub(crate) const METHOD_LIST_TOOLS: &str = "tools/list";
pub(crate) const METHOD_CALL_TOOL: &str = "tools/call";
pub(crate) const METHOD_PING: &str = "ping";

pub(crate) const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

impl<'a> JsonRpcRequest<'a> {
    pub(crate) fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> JsonRpcNotification<'a> {
    pub(crate) fn new(method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params,
        }
    }
}

/// Answer to a request the server sent us.
#[derive(Debug, Serialize)]
pub(crate) struct JsonRpcReply {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

impl JsonRpcReply {
    pub(crate) fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    pub(crate) fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Incoming {
    Response {
        id: u64,
        outcome: Result<Value, JsonRpcError>,
    },
    Request {
        id: Value,
        method: String,
    },
    Notification {
        method: String,
    },
}

/// Sorts one decoded line into response, server request, or notification.
pub(crate) fn classify(value: Value) -> Result<Incoming, String> {
    let Value::Object(mut object) = value else {
        return Err("message is not a JSON object".to_string());
    };

    if let Some(method) = object.get("method").and_then(Value::as_str) {
        let method = method.to_string();
        return Ok(match object.remove("id") {
            Some(id) if !id.is_null() => Incoming::Request { id, method },
            _ => Incoming::Notification { method },
        });
    }

    let id = object
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| "response has no numeric id".to_string())?;

    if let Some(error) = object.remove("error") {
        let error = serde_json::from_value::<JsonRpcError>(error)
            .map_err(|err| format!("malformed error object for id {id}: {err}"))?;
        return Ok(Incoming::Response {
            id,
            outcome: Err(error),
        });
    }

    match object.remove("result") {
        Some(result) => Ok(Incoming::Response {
            id,
            outcome: Ok(result),
        }),
        None => Err(format!("response for id {id} has neither result nor error")),
    }
}

pub(crate) fn initialize_params(client_name: &str, client_version: &str) -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": client_name,
            "version": client_version,
        },
    })
}

pub(crate) fn list_tools_params(cursor: Option<&str>) -> Value {
    match cursor {
        Some(cursor) => json!({ "cursor": cursor }),
        None => json!({}),
    }
}

pub(crate) fn call_tool_params(name: &str, arguments: Map<String, Value>) -> Value {
    json!({
        "name": name,
        "arguments": arguments,
    })
}

pub(crate) fn cancelled_params(request_id: u64, reason: &str) -> Value {
    json!({
        "requestId": request_id,
        "reason": reason,
    })
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: ServerInfo,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ListToolsResult {
    pub tools: Vec<ToolDescriptor>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default)]
    pub structured_content: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_separates_responses_requests_and_notifications() {
        let response = classify(json!({"jsonrpc": "2.0", "id": 4, "result": {"tools": []}}))
            .expect("response should classify");
        assert_eq!(
            response,
            Incoming::Response {
                id: 4,
                outcome: Ok(json!({"tools": []}))
            }
        );

        let failure = classify(json!({
            "jsonrpc": "2.0", "id": 5,
            "error": {"code": -32602, "message": "Unknown tool: nope"}
        }))
        .expect("error response should classify");
        let Incoming::Response { id, outcome } = failure else {
            panic!("expected a response");
        };
        assert_eq!(id, 5);
        assert_eq!(outcome.expect_err("error outcome").code, -32602);

        let request = classify(json!({"jsonrpc": "2.0", "id": "srv-1", "method": "ping"}))
            .expect("request should classify");
        assert_eq!(
            request,
            Incoming::Request {
                id: json!("srv-1"),
                method: "ping".to_string()
            }
        );

        let notification = classify(json!({
            "jsonrpc": "2.0", "method": "notifications/message", "params": {"level": "info"}
        }))
        .expect("notification should classify");
        assert_eq!(
            notification,
            Incoming::Notification {
                method: "notifications/message".to_string()
            }
        );
    }

    #[test]
    fn classify_rejects_malformed_messages() {
        assert!(classify(json!([1, 2, 3])).is_err());
        assert!(classify(json!({"jsonrpc": "2.0", "result": {}})).is_err());
        assert!(classify(json!({"jsonrpc": "2.0", "id": 2})).is_err());
    }

    #[test]
    fn request_framing_matches_json_rpc() {
        let request = JsonRpcRequest::new(3, METHOD_LIST_TOOLS, list_tools_params(Some("p2")));
        let rendered = serde_json::to_value(&request).expect("serialize");
        assert_eq!(
            rendered,
            json!({"jsonrpc": "2.0", "id": 3, "method": "tools/list", "params": {"cursor": "p2"}})
        );

        let notification = JsonRpcNotification::new(METHOD_INITIALIZED, None);
        let rendered = serde_json::to_value(&notification).expect("serialize");
        assert_eq!(
            rendered,
            json!({"jsonrpc": "2.0", "method": "notifications/initialized"})
        );
    }

    #[test]
    fn call_tool_result_defaults_missing_fields() {
        let parsed: CallToolResult =
            serde_json::from_value(json!({"content": [{"type": "text", "text": "ok"}]}))
                .expect("result should parse");

        assert!(!parsed.is_error);
        assert_eq!(parsed.content.len(), 1);
        assert!(parsed.structured_content.is_none());
    }
}
