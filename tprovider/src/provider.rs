use tcommon::BoxFuture;

use crate::{ModelRequest, ModelResponse, ProviderError, ProviderId};

/// A model backend that answers one request with one complete response.
pub trait ModelProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn complete<'a>(
        &'a self,
        request: ModelRequest,
    ) -> BoxFuture<'a, Result<ModelResponse, ProviderError>>;
}
