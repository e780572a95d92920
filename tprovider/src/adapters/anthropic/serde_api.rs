//! Messages API payload serde models and conversion helpers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    ContentBlock, ConversationMessage, ModelRequest, ModelResponse, ProviderError, ProviderId,
    StopReason, TokenUsage, ToolDefinition,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesApiRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<MessagesApiMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<MessagesApiTool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagesApiMessage {
    pub role: String,
    pub content: Vec<MessagesApiBlock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagesApiBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessagesApiTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessagesApiResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub model: String,
    /// Raw blocks; typed one by one so an unknown `type` names itself in the error.
    pub content: Vec<Value>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub usage: MessagesApiUsage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct MessagesApiUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MessagesApiErrorEnvelope {
    error: MessagesApiError,
}

#[derive(Debug, Deserialize)]
struct MessagesApiError {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    message: String,
}

pub(crate) fn build_api_request(
    request: ModelRequest,
    default_max_tokens: u32,
) -> MessagesApiRequest {
    MessagesApiRequest {
        model: request.model,
        max_tokens: request.options.max_tokens.unwrap_or(default_max_tokens),
        messages: request
            .messages
            .into_iter()
            .map(MessagesApiMessage::from)
            .collect(),
        tools: request
            .tools
            .into_iter()
            .map(MessagesApiTool::from)
            .collect(),
        system: request.system_prompt,
        temperature: request.options.temperature,
    }
}

pub(crate) fn parse_stop_reason(value: Option<&str>) -> StopReason {
    match value {
        Some("end_turn") => StopReason::EndTurn,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        Some("tool_use") => StopReason::ToolUse,
        _ => StopReason::Other,
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<MessagesApiErrorEnvelope>(body).ok()?;
    match parsed.error.kind {
        Some(kind) => Some(format!("{kind}: {}", parsed.error.message)),
        None => Some(parsed.error.message),
    }
}

pub(crate) fn parse_content_block(value: Value) -> Result<ContentBlock, ProviderError> {
    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ProviderError::invalid_response("content block is missing 'type'"))?
        .to_string();

    match kind.as_str() {
        "text" | "tool_use" | "tool_result" => serde_json::from_value::<MessagesApiBlock>(value)
            .map(ContentBlock::from)
            .map_err(|err| {
                ProviderError::invalid_response(format!("malformed '{kind}' block: {err}"))
            }),
        other => Err(ProviderError::invalid_response(format!(
            "unsupported content block type '{other}'"
        ))),
    }
}

impl MessagesApiResponse {
    pub fn into_model_response(self) -> Result<ModelResponse, ProviderError> {
        let content = self
            .content
            .into_iter()
            .map(parse_content_block)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ModelResponse {
            provider: ProviderId::Anthropic,
            model: self.model,
            content,
            stop_reason: parse_stop_reason(self.stop_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: self.usage.input_tokens,
                output_tokens: self.usage.output_tokens,
            },
        })
    }
}

impl From<ConversationMessage> for MessagesApiMessage {
    fn from(value: ConversationMessage) -> Self {
        Self {
            role: value.role.as_str().to_string(),
            content: value
                .content
                .into_iter()
                .map(MessagesApiBlock::from)
                .collect(),
        }
    }
}

impl From<ContentBlock> for MessagesApiBlock {
    fn from(value: ContentBlock) -> Self {
        match value {
            ContentBlock::Text { text } => Self::Text { text },
            ContentBlock::ToolUse { id, name, input } => Self::ToolUse { id, name, input },
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Self::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
        }
    }
}

impl From<MessagesApiBlock> for ContentBlock {
    fn from(value: MessagesApiBlock) -> Self {
        match value {
            MessagesApiBlock::Text { text } => Self::Text { text },
            MessagesApiBlock::ToolUse { id, name, input } => Self::ToolUse { id, name, input },
            MessagesApiBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => Self::ToolResult {
                tool_use_id,
                content,
                is_error,
            },
        }
    }
}

impl From<ToolDefinition> for MessagesApiTool {
    fn from(value: ToolDefinition) -> Self {
        Self {
            name: value.name,
            description: value.description,
            input_schema: value.input_schema,
        }
    }
}
