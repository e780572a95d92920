//! Startup and shutdown errors surfaced by the client binary.

use std::error::Error;
use std::fmt::{Display, Formatter};

use tprovider::ProviderError;
use tsession::{SessionError, SessionErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientErrorKind {
    /// Missing or malformed configuration; nothing was launched.
    Config,
    Provider,
    /// The tool server could not be launched or did not complete the handshake.
    Connect,
    Session,
    Io,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientError {
    pub kind: ClientErrorKind,
    pub message: String,
}

impl ClientError {
    pub fn new(kind: ClientErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Config, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Provider, message)
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Connect, message)
    }

    pub fn session(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Session, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ClientErrorKind::Io, message)
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ClientError {}

impl From<ProviderError> for ClientError {
    fn from(value: ProviderError) -> Self {
        ClientError::provider(value.to_string())
    }
}

impl From<SessionError> for ClientError {
    fn from(value: SessionError) -> Self {
        match value.kind {
            SessionErrorKind::UnsupportedScript | SessionErrorKind::Connect => {
                ClientError::connect(value.to_string())
            }
            _ => ClientError::session(value.to_string()),
        }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(value: std::io::Error) -> Self {
        ClientError::io(value.to_string())
    }
}
