//! Structured `tracing` events for provider attempts, tool calls, and queries.
//!
//! ```rust
//! use tobserve::TracingObservabilityHooks;
//! use tsession::ToolCallHooks;
//!
//! fn accepts_tool_hooks(_hooks: &dyn ToolCallHooks) {}
//!
//! let hooks = TracingObservabilityHooks;
//! accepts_tool_hooks(&hooks);
//! ```

use std::time::Duration;

use serde_json::{Map, Value};
use tchat::{ChatError, QueryHooks, QueryOutcome};
use tcommon::QueryId;
use tprovider::{ModelResponse, ProviderError, ProviderId, ProviderOperationHooks};
use tsession::{SessionError, ToolCallHooks, ToolOutput};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObservabilityHooks;

impl ProviderOperationHooks for TracingObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, attempt: u32) {
        tracing::debug!(
            phase = "provider",
            event = "attempt_start",
            provider = %provider,
            operation,
            attempt
        );
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        tracing::warn!(
            phase = "provider",
            event = "retry_scheduled",
            provider = %provider,
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        tracing::debug!(
            phase = "provider",
            event = "success",
            provider = %provider,
            operation,
            attempts
        );
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        attempts: u32,
        error: &ProviderError,
    ) {
        tracing::error!(
            phase = "provider",
            event = "failure",
            provider = %provider,
            operation,
            attempts,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }
}

impl ToolCallHooks for TracingObservabilityHooks {
    fn on_call_start(&self, query: &QueryId, tool_name: &str, arguments: &Map<String, Value>) {
        tracing::info!(
            phase = "tool",
            event = "call_start",
            query_id = %query,
            tool_name,
            argument_count = arguments.len()
        );
    }

    fn on_call_success(
        &self,
        query: &QueryId,
        tool_name: &str,
        output: &ToolOutput,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "tool",
            event = "call_success",
            query_id = %query,
            tool_name,
            content_items = output.content.len(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_call_failure(
        &self,
        query: &QueryId,
        tool_name: &str,
        error: &SessionError,
        elapsed: Duration,
    ) {
        tracing::error!(
            phase = "tool",
            event = "call_failure",
            query_id = %query,
            tool_name,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            fatal = error.is_fatal(),
            error = %error
        );
    }
}

impl QueryHooks for TracingObservabilityHooks {
    fn on_query_start(&self, query: &QueryId, text: &str) {
        tracing::info!(
            phase = "query",
            event = "start",
            query_id = %query,
            query_chars = text.chars().count()
        );
    }

    fn on_turn_complete(&self, query: &QueryId, turn: u32, response: &ModelResponse) {
        tracing::debug!(
            phase = "query",
            event = "turn_complete",
            query_id = %query,
            turn,
            stop_reason = ?response.stop_reason,
            tool_use = response.has_tool_use(),
            output_tokens = response.usage.output_tokens
        );
    }

    fn on_query_success(&self, query: &QueryId, outcome: &QueryOutcome, elapsed: Duration) {
        tracing::info!(
            phase = "query",
            event = "success",
            query_id = %query,
            model_calls = outcome.model_calls,
            tool_calls = outcome.tool_calls.len(),
            total_tokens = outcome.usage.total_tokens(),
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_query_failure(&self, query: &QueryId, error: &ChatError, elapsed: Duration) {
        tracing::error!(
            phase = "query",
            event = "failure",
            query_id = %query,
            elapsed_ms = elapsed.as_millis() as u64,
            error_kind = ?error.kind,
            error = %error
        );
    }
}
