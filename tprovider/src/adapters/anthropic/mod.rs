//! Anthropic Messages API adapter.

mod provider;
mod serde_api;
mod transport;

pub use provider::AnthropicProvider;
pub use serde_api::{
    MessagesApiBlock, MessagesApiMessage, MessagesApiRequest, MessagesApiResponse,
    MessagesApiTool, MessagesApiUsage,
};
pub use transport::{AnthropicHttpTransport, AnthropicTransport};

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
