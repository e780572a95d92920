//! Hooks for query lifecycle events.

use std::time::Duration;

use tcommon::QueryId;
use tprovider::ModelResponse;

use crate::{ChatError, QueryOutcome};

pub trait QueryHooks: Send + Sync {
    fn on_query_start(&self, _query: &QueryId, _text: &str) {}

    /// Called after each model response, before any tool in it runs.
    fn on_turn_complete(&self, _query: &QueryId, _turn: u32, _response: &ModelResponse) {}

    fn on_query_success(&self, _query: &QueryId, _outcome: &QueryOutcome, _elapsed: Duration) {}

    fn on_query_failure(&self, _query: &QueryId, _error: &ChatError, _elapsed: Duration) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopQueryHooks;

impl QueryHooks for NoopQueryHooks {}
