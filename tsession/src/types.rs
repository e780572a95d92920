//! Tool descriptors, server identity, and typed tool output.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// One tool advertised by the server. Immutable once discovered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "empty_object_schema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            input_schema,
        }
    }
}

fn str_field(value: &Value, name: &str) -> Option<String> {
    value.get(name).and_then(Value::as_str).map(str::to_string)
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// What the server reported during the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServerDetails {
    pub info: ServerInfo,
    pub protocol_version: String,
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum McpContent {
    Text(String),
    Image { data: String, mime_type: String },
    Audio { data: String, mime_type: String },
    Resource(Value),
    Unknown(Value),
}

impl McpContent {
    pub fn from_value(value: Value) -> Self {
        let kind = str_field(&value, "type").unwrap_or_default();

        match kind.as_str() {
            "text" => match str_field(&value, "text") {
                Some(text) => Self::Text(text),
                None => Self::Unknown(value),
            },
            "image" | "audio" => match (str_field(&value, "data"), str_field(&value, "mimeType")) {
                (Some(data), Some(mime_type)) if kind == "image" => Self::Image { data, mime_type },
                (Some(data), Some(mime_type)) => Self::Audio { data, mime_type },
                _ => Self::Unknown(value),
            },
            "resource" | "resource_link" => Self::Resource(value),
            _ => Self::Unknown(value),
        }
    }

    /// Text items render verbatim; everything else as compact JSON.
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Image { data, mime_type } => {
                json!({"type": "image", "mimeType": mime_type, "data": data}).to_string()
            }
            Self::Audio { data, mime_type } => {
                json!({"type": "audio", "mimeType": mime_type, "data": data}).to_string()
            }
            Self::Resource(value) | Self::Unknown(value) => value.to_string(),
        }
    }
}

/// Successful output of one tool invocation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ToolOutput {
    pub content: Vec<McpContent>,
    pub structured: Option<Value>,
}

impl ToolOutput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text(text.into())],
            structured: None,
        }
    }

    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(McpContent::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_parses_camel_case_schema_and_defaults() {
        let parsed: ToolDescriptor = serde_json::from_value(json!({
            "name": "get_alerts",
            "description": "Weather alerts for a US state",
            "inputSchema": {"type": "object", "properties": {"state": {"type": "string"}}}
        }))
        .expect("descriptor should parse");
        assert_eq!(parsed.name, "get_alerts");
        assert_eq!(parsed.input_schema["properties"]["state"]["type"], "string");

        let bare: ToolDescriptor =
            serde_json::from_value(json!({"name": "ping"})).expect("bare descriptor");
        assert_eq!(bare.description, None);
        assert_eq!(bare.input_schema["type"], "object");
    }

    #[test]
    fn content_items_keep_their_kind() {
        assert_eq!(
            McpContent::from_value(json!({"type": "text", "text": "hi"})),
            McpContent::Text("hi".to_string())
        );
        assert_eq!(
            McpContent::from_value(json!({"type": "image", "data": "AAA", "mimeType": "image/png"})),
            McpContent::Image {
                data: "AAA".to_string(),
                mime_type: "image/png".to_string()
            }
        );
        assert!(matches!(
            McpContent::from_value(json!({"type": "audio", "data": "BBB", "mimeType": "audio/wav"})),
            McpContent::Audio { .. }
        ));
        assert!(matches!(
            McpContent::from_value(json!({"type": "resource", "resource": {"uri": "file:///a"}})),
            McpContent::Resource(_)
        ));
        assert!(matches!(
            McpContent::from_value(json!({"type": "hologram"})),
            McpContent::Unknown(_)
        ));
    }

    #[test]
    fn output_text_joins_rendered_items() {
        let output = ToolOutput {
            content: vec![
                McpContent::Text("Forecast: sunny".to_string()),
                McpContent::Unknown(json!({"type": "hologram"})),
                McpContent::Text("High: 75F".to_string()),
            ],
            structured: None,
        };

        assert_eq!(
            output.text(),
            "Forecast: sunny\n{\"type\":\"hologram\"}\nHigh: 75F"
        );
        assert_eq!(ToolOutput::default().text(), "");
    }
}
