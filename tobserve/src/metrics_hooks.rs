//! `metrics` counters and histograms for provider attempts, tool calls, and queries.
//!
//! ```rust
//! use tobserve::MetricsObservabilityHooks;
//! use tprovider::ProviderOperationHooks;
//!
//! fn accepts_provider_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = MetricsObservabilityHooks;
//! accepts_provider_hooks(&hooks);
//! ```

use std::time::Duration;

use serde_json::{Map, Value};
use tchat::{ChatError, QueryHooks, QueryOutcome};
use tcommon::QueryId;
use tprovider::{ModelResponse, ProviderError, ProviderId, ProviderOperationHooks};
use tsession::{SessionError, ToolCallHooks, ToolOutput};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsObservabilityHooks;

impl ProviderOperationHooks for MetricsObservabilityHooks {
    fn on_attempt_start(&self, provider: ProviderId, operation: &str, _attempt: u32) {
        metrics::counter!(
            "tether_provider_attempt_start_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
    }

    fn on_retry_scheduled(
        &self,
        provider: ProviderId,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "tether_provider_retry_scheduled_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "tether_provider_retry_delay_seconds",
            "provider" => provider.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_success(&self, provider: ProviderId, operation: &str, attempts: u32) {
        metrics::counter!(
            "tether_provider_success_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "tether_provider_attempts_per_success",
            "provider" => provider.to_string()
        )
        .record(attempts as f64);
    }

    fn on_failure(
        &self,
        provider: ProviderId,
        operation: &str,
        _attempts: u32,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "tether_provider_failure_total",
            "provider" => provider.to_string(),
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
    }
}

impl ToolCallHooks for MetricsObservabilityHooks {
    fn on_call_start(&self, _query: &QueryId, tool_name: &str, _arguments: &Map<String, Value>) {
        metrics::counter!(
            "tether_tool_call_start_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
    }

    fn on_call_success(
        &self,
        _query: &QueryId,
        tool_name: &str,
        _output: &ToolOutput,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "tether_tool_call_success_total",
            "tool_name" => tool_name.to_string()
        )
        .increment(1);
        metrics::histogram!(
            "tether_tool_call_duration_seconds",
            "tool_name" => tool_name.to_string(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_call_failure(
        &self,
        _query: &QueryId,
        tool_name: &str,
        error: &SessionError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "tether_tool_call_failure_total",
            "tool_name" => tool_name.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "tether_tool_call_duration_seconds",
            "tool_name" => tool_name.to_string(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }
}

impl QueryHooks for MetricsObservabilityHooks {
    fn on_query_start(&self, _query: &QueryId, _text: &str) {
        metrics::counter!("tether_query_start_total").increment(1);
    }

    fn on_turn_complete(&self, _query: &QueryId, _turn: u32, response: &ModelResponse) {
        metrics::counter!(
            "tether_model_turn_total",
            "stop_reason" => format!("{:?}", response.stop_reason)
        )
        .increment(1);
        metrics::counter!("tether_model_input_tokens_total")
            .increment(u64::from(response.usage.input_tokens));
        metrics::counter!("tether_model_output_tokens_total")
            .increment(u64::from(response.usage.output_tokens));
    }

    fn on_query_success(&self, _query: &QueryId, outcome: &QueryOutcome, elapsed: Duration) {
        metrics::counter!("tether_query_success_total").increment(1);
        metrics::histogram!("tether_query_turns").record(f64::from(outcome.model_calls));
        metrics::histogram!("tether_query_duration_seconds", "status" => "success")
            .record(elapsed.as_secs_f64());
    }

    fn on_query_failure(&self, _query: &QueryId, error: &ChatError, elapsed: Duration) {
        metrics::counter!(
            "tether_query_failure_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("tether_query_duration_seconds", "status" => "failure")
            .record(elapsed.as_secs_f64());
    }
}
