//! Anthropic provider implementation over transport and shared models.

use std::sync::Arc;

use futures_timer::Delay;
use tcommon::BoxFuture;

use crate::{
    ModelProvider, ModelRequest, ModelResponse, NoopOperationHooks, ProviderError, ProviderId,
    ProviderOperationHooks, RetryPolicy, SecretString, SecureCredentialManager,
    retry_provider_call,
};

use super::DEFAULT_MAX_TOKENS;
use super::serde_api::{MessagesApiRequest, build_api_request};
use super::transport::AnthropicTransport;

#[derive(Clone)]
pub struct AnthropicProvider {
    credentials: Arc<SecureCredentialManager>,
    transport: Arc<dyn AnthropicTransport>,
    retry_policy: RetryPolicy,
    hooks: Arc<dyn ProviderOperationHooks>,
    default_max_tokens: u32,
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("transport", &self.transport)
            .field("retry_policy", &self.retry_policy)
            .field("default_max_tokens", &self.default_max_tokens)
            .finish_non_exhaustive()
    }
}

impl AnthropicProvider {
    pub fn new(
        credentials: Arc<SecureCredentialManager>,
        transport: Arc<dyn AnthropicTransport>,
    ) -> Self {
        Self {
            credentials,
            transport,
            retry_policy: RetryPolicy::default(),
            hooks: Arc::new(NoopOperationHooks),
            default_max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Used when a request leaves `max_tokens` unset; the API requires one.
    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens.max(1);
        self
    }

    pub(crate) fn build_request(&self, request: ModelRequest) -> MessagesApiRequest {
        build_api_request(request, self.default_max_tokens)
    }

    fn resolve_api_key(&self) -> Result<SecretString, ProviderError> {
        self.credentials
            .with_api_key(ProviderId::Anthropic, |key| SecretString::new(key))?
            .ok_or_else(|| ProviderError::authentication("no Anthropic API key configured"))
    }
}

impl ModelProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> BoxFuture<'a, Result<ModelResponse, ProviderError>> {
        Box::pin(async move {
            request.validate()?;
            let api_key = self.resolve_api_key()?;
            let api_request = self.build_request(request);

            let response = retry_provider_call(
                ProviderId::Anthropic,
                "complete",
                &self.retry_policy,
                self.hooks.as_ref(),
                |_attempt| self.transport.create_message(&api_request, &api_key),
                Delay::new,
            )
            .await?;

            response.into_model_response()
        })
    }
}
