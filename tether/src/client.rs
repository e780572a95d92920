//! Wires configuration, provider, tool session, and driver into one client run.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tchat::ChatService;
use tobserve::{SafeQueryHooks, SafeToolHooks, TracingObservabilityHooks};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tprovider::{ProviderId, SecureCredentialManager};
use tsession::StdioSession;

use crate::{
    ClientConfig, ClientError, DriverExit, InteractiveDriver, ProviderBuildConfig, ResourceStack,
    build_anthropic_provider,
};

/// Connects to the configured server and drives the prompt loop over `driver`.
///
/// Every acquired resource is released before this returns, on success, error, or panic.
pub async fn run_client<R, W>(
    config: ClientConfig,
    driver: &mut InteractiveDriver<R, W>,
) -> Result<DriverExit, ClientError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut resources = ResourceStack::new();
    let outcome = AssertUnwindSafe(serve(&config, driver, &mut resources))
        .catch_unwind()
        .await;
    resources.finish(outcome).await
}

async fn serve<R, W>(
    config: &ClientConfig,
    driver: &mut InteractiveDriver<R, W>,
    resources: &mut ResourceStack,
) -> Result<DriverExit, ClientError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let credentials = Arc::new(SecureCredentialManager::new());
    {
        let credentials = Arc::clone(&credentials);
        resources.push("model provider credentials", move || {
            Box::pin(async move {
                credentials.clear(ProviderId::Anthropic)?;
                Ok::<(), ClientError>(())
            })
        });
    }

    let provider = build_anthropic_provider(
        Arc::clone(&credentials),
        config.api_key.expose(),
        ProviderBuildConfig::from_client_config(config),
    )?;

    let session = Arc::new(
        StdioSession::connect(&config.server_script, config.session_config()).await?,
    );
    {
        let session = Arc::clone(&session);
        resources.push("tool server session", move || {
            Box::pin(async move {
                session.close().await?;
                Ok::<(), ClientError>(())
            })
        });
    }

    let tools = session.list_tools().await?;
    tracing::info!(
        server = %session.server().info.name,
        tools = tools.len(),
        "connected to tool server"
    );
    driver.announce(session.server(), &tools).await?;

    let service = ChatService::builder(Arc::new(provider), session)
        .options(config.chat_options())
        .policy(config.chat_policy())
        .query_hooks(Arc::new(SafeQueryHooks::new(TracingObservabilityHooks)))
        .tool_hooks(Arc::new(SafeToolHooks::new(TracingObservabilityHooks)))
        .build();

    Ok(driver.run(&service).await?)
}
