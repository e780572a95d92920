//! Common imports for building on the client.

pub use crate::{
    CliArgs, ClientConfig, ClientError, ClientErrorKind, DriverExit, InteractiveDriver,
    ResourceStack, run_client,
};
pub use tchat::{ChatError, ChatErrorKind, ChatOptions, ChatPolicy, ChatService, QueryOutcome};
pub use tprovider::{AnthropicProvider, ModelProvider, ProviderId, SecureCredentialManager};
pub use tsession::{SessionConfig, SessionError, StdioSession, ToolDescriptor, ToolSession};
