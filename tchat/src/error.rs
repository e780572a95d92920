//! Query-level errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use tprovider::ProviderError;
use tsession::{SessionError, SessionErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    InvalidRequest,
    Provider,
    ToolExecution,
    Transport,
    Protocol,
    Timeout,
    TurnLimitExceeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Provider, message)
    }

    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::ToolExecution, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Transport, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Protocol, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Timeout, message)
    }

    pub fn turn_limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::TurnLimitExceeded, message)
    }

    /// True when the tool-server session can no longer serve queries.
    pub fn is_session_fatal(&self) -> bool {
        self.kind == ChatErrorKind::Transport
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        ChatError::provider(value.to_string())
    }
}

impl From<SessionError> for ChatError {
    fn from(value: SessionError) -> Self {
        let kind = match value.kind {
            SessionErrorKind::ToolExecution => ChatErrorKind::ToolExecution,
            SessionErrorKind::Transport | SessionErrorKind::Connect => ChatErrorKind::Transport,
            SessionErrorKind::Protocol | SessionErrorKind::UnsupportedScript => {
                ChatErrorKind::Protocol
            }
            SessionErrorKind::Timeout => ChatErrorKind::Timeout,
        };

        let message = match value.tool_name {
            Some(tool_name) => format!("tool '{tool_name}' failed: {}", value.message),
            None => value.message,
        };

        ChatError::new(kind, message)
    }
}
