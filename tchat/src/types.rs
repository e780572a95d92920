//! Query options, transcript entries, and query outcomes.

use std::time::Duration;

use serde_json::{Map, Value};
use tcommon::QueryId;
use tprovider::{ConversationMessage, TokenUsage};

pub const DEFAULT_MAX_TOKENS: u32 = 1000;

/// Model-facing settings applied to every turn of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatOptions {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
    pub system_prompt: Option<String>,
}

impl ChatOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            system_prompt: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// One line of the human-readable transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptEntry {
    Text(String),
    ToolCall {
        name: String,
        arguments: Map<String, Value>,
    },
}

impl TranscriptEntry {
    pub fn render(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::ToolCall { name, arguments } => {
                format!(
                    "[Calling tool {name} with args {}]",
                    Value::Object(arguments.clone())
                )
            }
        }
    }
}

/// Record of one tool call made while answering a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub tool_use_id: String,
    pub name: String,
    pub arguments: Map<String, Value>,
    /// Text sent back to the model as the tool result.
    pub result: String,
    pub is_error: bool,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub query_id: QueryId,
    pub transcript: Vec<TranscriptEntry>,
    pub model_calls: u32,
    pub tool_calls: Vec<ToolInvocation>,
    pub usage: TokenUsage,
    pub history: Vec<ConversationMessage>,
}

impl QueryOutcome {
    pub fn new(query_id: QueryId) -> Self {
        Self {
            query_id,
            transcript: Vec::new(),
            model_calls: 0,
            tool_calls: Vec::new(),
            usage: TokenUsage::default(),
            history: Vec::new(),
        }
    }

    /// The transcript as shown to the user, one entry per line.
    pub fn text(&self) -> String {
        self.transcript
            .iter()
            .map(TranscriptEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
