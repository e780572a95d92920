//! Messages API transport trait and reqwest-based HTTP implementation.

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, Response};
use tcommon::BoxFuture;

use crate::{ProviderError, SecretString, parse_retry_after};

use super::serde_api::{MessagesApiRequest, MessagesApiResponse, extract_error_message};
use super::{ANTHROPIC_BASE_URL, ANTHROPIC_VERSION};

pub trait AnthropicTransport: Send + Sync + std::fmt::Debug {
    fn create_message<'a>(
        &'a self,
        request: &'a MessagesApiRequest,
        api_key: &'a SecretString,
    ) -> BoxFuture<'a, Result<MessagesApiResponse, ProviderError>>;
}

#[derive(Debug, Clone)]
pub struct AnthropicHttpTransport {
    client: Client,
    base_url: String,
}

impl Default for AnthropicHttpTransport {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl AnthropicHttpTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            base_url: ANTHROPIC_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn parse_error(response: Response) -> ProviderError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_retry_after);
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body)
            .unwrap_or_else(|| format!("Anthropic request failed with status {status}"));

        let error = ProviderError::from_status(status.as_u16(), message);
        match retry_after {
            Some(delay) => error.with_retry_after(delay),
            None => error,
        }
    }
}

impl AnthropicTransport for AnthropicHttpTransport {
    fn create_message<'a>(
        &'a self,
        request: &'a MessagesApiRequest,
        api_key: &'a SecretString,
    ) -> BoxFuture<'a, Result<MessagesApiResponse, ProviderError>> {
        Box::pin(async move {
            let response = self
                .client
                .post(self.endpoint("messages"))
                .header("x-api-key", api_key.expose())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(request)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        ProviderError::timeout(err.to_string())
                    } else {
                        ProviderError::transport(err.to_string())
                    }
                })?;

            if !response.status().is_success() {
                return Err(Self::parse_error(response).await);
            }

            response
                .json::<MessagesApiResponse>()
                .await
                .map_err(|err| ProviderError::invalid_response(err.to_string()))
        })
    }
}
