//! Query orchestration between a model provider and a tool-server session.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tchat::{ChatOptions, ChatService};
//! use tprovider::{AnthropicHttpTransport, AnthropicProvider, SecureCredentialManager};
//! use tsession::{SessionConfig, StdioSession};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = Arc::new(SecureCredentialManager::new());
//! credentials.set_api_key(tprovider::ProviderId::Anthropic, "sk-ant-...")?;
//! let provider = Arc::new(AnthropicProvider::new(
//!     credentials,
//!     Arc::new(AnthropicHttpTransport::default()),
//! ));
//! let session = Arc::new(StdioSession::connect("weather.py", SessionConfig::default()).await?);
//!
//! let service = ChatService::builder(provider, session)
//!     .options(ChatOptions::new("claude-sonnet-4-20250514"))
//!     .build();
//! let outcome = service.process_query("What's the weather in Sacramento?").await?;
//! println!("{}", outcome.text());
//! # Ok(())
//! # }
//! ```

mod catalog;
mod error;
mod hooks;
mod service;
mod types;

pub mod prelude {
    pub use crate::{
        ChatError, ChatErrorKind, ChatOptions, ChatPolicy, ChatService, ChatServiceBuilder,
        NoopQueryHooks, QueryHooks, QueryOutcome, ToolInvocation, TranscriptEntry,
        to_provider_tools,
    };
    pub use tcommon::QueryId;
}

pub use catalog::to_provider_tools;
pub use error::{ChatError, ChatErrorKind};
pub use hooks::{NoopQueryHooks, QueryHooks};
pub use service::{ChatPolicy, ChatService, ChatServiceBuilder, DEFAULT_MAX_TURNS};
pub use types::{
    ChatOptions, DEFAULT_MAX_TOKENS, QueryOutcome, ToolInvocation, TranscriptEntry,
};
