//! Tool-server session errors and classifications.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionErrorKind {
    /// The server script extension has no known launcher. Raised before spawning.
    UnsupportedScript,
    /// The subprocess failed to start or the handshake did not complete.
    Connect,
    /// An operation was issued out of order, or the server sent something malformed.
    Protocol,
    /// The remote tool reported failure.
    ToolExecution,
    /// The stream closed or an I/O operation failed.
    Transport,
    /// A request received no response within the call timeout.
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    pub kind: SessionErrorKind,
    pub message: String,
    pub tool_name: Option<String>,
}

impl SessionError {
    pub fn new(kind: SessionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tool_name: None,
        }
    }

    pub fn unsupported_script(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::UnsupportedScript, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Connect, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Protocol, message)
    }

    pub fn tool_execution(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::ToolExecution, message)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Transport, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(SessionErrorKind::Timeout, message)
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    /// A fatal error leaves the session unusable until it is re-established.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            SessionErrorKind::Transport | SessionErrorKind::Connect
        )
    }
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.tool_name {
            Some(tool_name) => write!(f, "{:?} [tool={}]: {}", self.kind, tool_name, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for SessionError {}
