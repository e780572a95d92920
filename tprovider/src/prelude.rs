//! Common `tprovider` imports for downstream crates.

pub use crate::{
    ContentBlock, ConversationMessage, ModelProvider, ModelRequest, ModelRequestBuilder,
    ModelResponse, NoopOperationHooks, ProviderError, ProviderErrorKind, ProviderId,
    ProviderOperationHooks, RetryPolicy, Role, SecureCredentialManager, StopReason, TokenUsage,
    ToolDefinition, retry_provider_call,
};
pub use tcommon::BoxFuture;

#[cfg(feature = "provider-anthropic")]
pub use crate::{AnthropicHttpTransport, AnthropicProvider, AnthropicTransport};
