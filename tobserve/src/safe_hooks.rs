//! Wrappers that keep a panicking hook from taking down the call it observes.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use serde_json::{Map, Value};
use tchat::{ChatError, QueryHooks, QueryOutcome};
use tcommon::QueryId;
use tprovider::{ModelResponse, ProviderError, ProviderId, ProviderOperationHooks};
use tsession::{SessionError, ToolCallHooks, ToolOutput};

fn guarded(hook: &str, callback: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(callback)).is_err() {
        tracing::warn!(hook, "observability hook panicked");
    }
}

pub struct SafeProviderHooks<H> {
    inner: H,
}

impl<H> SafeProviderHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeProviderHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        guarded("provider.attempt_start", || {
            self.inner.on_attempt_start(provider, operation, attempt)
        });
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        guarded("provider.retry_scheduled", || {
            self.inner
                .on_retry_scheduled(provider, operation, attempt, delay, error)
        });
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        guarded("provider.success", || {
            self.inner.on_success(provider, operation, attempts)
        });
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        guarded("provider.failure", || {
            self.inner.on_failure(provider, operation, attempts, error)
        });
    }
}

pub struct SafeToolHooks<H> {
    inner: H,
}

impl<H> SafeToolHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ToolCallHooks for SafeToolHooks<H>
where
    H: ToolCallHooks,
{
    fn on_call_start(&self, query: &QueryId, tool_name: &str, arguments: &Map<String, Value>) {
        guarded("tool.call_start", || {
            self.inner.on_call_start(query, tool_name, arguments)
        });
    }

    fn on_call_success(
        &self,
        query: &QueryId,
        tool_name: &str,
        output: &ToolOutput,
        elapsed: Duration,
    ) {
        guarded("tool.call_success", || {
            self.inner.on_call_success(query, tool_name, output, elapsed)
        });
    }

    fn on_call_failure(
        &self,
        query: &QueryId,
        tool_name: &str,
        error: &SessionError,
        elapsed: Duration,
    ) {
        guarded("tool.call_failure", || {
            self.inner.on_call_failure(query, tool_name, error, elapsed)
        });
    }
}

pub struct SafeQueryHooks<H> {
    inner: H,
}

impl<H> SafeQueryHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> QueryHooks for SafeQueryHooks<H>
where
    H: QueryHooks,
{
    fn on_query_start(&self, query: &QueryId, text: &str) {
        guarded("query.start", || self.inner.on_query_start(query, text));
    }

    fn on_turn_complete(&self, query: &QueryId, turn: u32, response: &ModelResponse) {
        guarded("query.turn_complete", || {
            self.inner.on_turn_complete(query, turn, response)
        });
    }

    fn on_query_success(&self, query: &QueryId, outcome: &QueryOutcome, elapsed: Duration) {
        guarded("query.success", || {
            self.inner.on_query_success(query, outcome, elapsed)
        });
    }

    fn on_query_failure(&self, query: &QueryId, error: &ChatError, elapsed: Duration) {
        guarded("query.failure", || {
            self.inner.on_query_failure(query, error, elapsed)
        });
    }
}
