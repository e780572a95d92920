//! Anthropic provider construction for the client.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tobserve::{SafeProviderHooks, TracingObservabilityHooks};
use tprovider::{
    ANTHROPIC_BASE_URL, AnthropicHttpTransport, AnthropicProvider, ProviderError, ProviderId,
    SecureCredentialManager,
};

use crate::ClientConfig;

#[derive(Debug, Clone)]
pub struct ProviderBuildConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub default_max_tokens: u32,
}

impl Default for ProviderBuildConfig {
    fn default() -> Self {
        Self {
            base_url: ANTHROPIC_BASE_URL.to_string(),
            timeout: Duration::from_secs(90),
            default_max_tokens: tchat::DEFAULT_MAX_TOKENS,
        }
    }
}

impl ProviderBuildConfig {
    pub fn from_client_config(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            default_max_tokens: config.max_tokens,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stores `api_key` in `credentials` and builds a provider reading from it.
pub fn build_anthropic_provider(
    credentials: Arc<SecureCredentialManager>,
    api_key: &str,
    config: ProviderBuildConfig,
) -> Result<AnthropicProvider, ProviderError> {
    credentials.set_api_key(ProviderId::Anthropic, api_key.trim())?;

    let http = Client::builder()
        .timeout(config.timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;
    let transport = AnthropicHttpTransport::new(http).with_base_url(config.base_url);

    Ok(AnthropicProvider::new(credentials, Arc::new(transport))
        .with_hooks(Arc::new(SafeProviderHooks::new(TracingObservabilityHooks)))
        .with_default_max_tokens(config.default_max_tokens))
}
