//! Model provider contracts and the Anthropic Messages API adapter.
//!
//! ```rust
//! use tprovider::{ContentBlock, ConversationMessage, ModelRequest, Role};
//!
//! let request = ModelRequest::builder("claude-sonnet-4-20250514")
//!     .message(ConversationMessage::user_text("What's the weather in Sacramento?"))
//!     .max_tokens(1000)
//!     .build()
//!     .expect("request should be valid");
//!
//! assert_eq!(request.messages[0].role, Role::User);
//! assert_eq!(
//!     request.messages[0].content,
//!     vec![ContentBlock::text("What's the weather in Sacramento?")]
//! );
//! ```

pub mod credentials;
pub mod error;
pub mod hooks;
pub mod model;
pub mod prelude;
pub mod provider;
pub mod resilience;

pub mod adapters;

pub use credentials::{SecretString, SecureCredentialManager};
pub use error::{ProviderError, ProviderErrorKind};
pub use model::{
    ContentBlock, ConversationMessage, ModelRequest, ModelRequestBuilder, ModelResponse,
    ProviderId, Role, StopReason, TokenUsage, ToolDefinition,
};
pub use provider::ModelProvider;
pub use hooks::{NoopOperationHooks, ProviderOperationHooks};
pub use resilience::{RetryPolicy, parse_retry_after, retry_provider_call};
pub use tcommon::BoxFuture;

#[cfg(feature = "provider-anthropic")]
pub use adapters::anthropic::{
    ANTHROPIC_BASE_URL, ANTHROPIC_VERSION, AnthropicHttpTransport, AnthropicProvider,
    AnthropicTransport, DEFAULT_ANTHROPIC_MODEL,
};
