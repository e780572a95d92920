//! Stdio transport session for tool servers speaking MCP over JSON-RPC.
//!
//! ```rust,no_run
//! use serde_json::Map;
//! use tsession::{SessionConfig, StdioSession};
//!
//! # async fn run() -> Result<(), tsession::SessionError> {
//! let session = StdioSession::connect("weather.py", SessionConfig::default()).await?;
//! for tool in session.list_tools().await? {
//!     println!("{}", tool.name);
//! }
//! let output = session.call_tool("get_alerts", Map::new()).await?;
//! println!("{}", output.text());
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod hooks;
mod launch;
mod protocol;
mod session;
mod tool_session;
mod types;

pub mod prelude {
    pub use crate::{
        McpContent, NoopToolCallHooks, ServerCommand, SessionConfig, SessionError,
        SessionErrorKind, StdioSession, ToolCallHooks, ToolDescriptor, ToolOutput, ToolSession,
    };
}

pub use error::{SessionError, SessionErrorKind};
pub use hooks::{NoopToolCallHooks, ToolCallHooks};
pub use launch::{Interpreters, ServerCommand};
pub use protocol::{JsonRpcError, PROTOCOL_VERSION};
pub use session::{SessionConfig, SessionState, StdioSession};
pub use tool_session::ToolSession;
pub use types::{McpContent, ServerDetails, ServerInfo, ToolDescriptor, ToolOutput};
