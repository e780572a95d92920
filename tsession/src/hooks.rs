//! Hooks for tool invocation lifecycle events.
//!
//! ```rust
//! use tsession::{NoopToolCallHooks, ToolCallHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn ToolCallHooks) {}
//!
//! let hooks = NoopToolCallHooks;
//! assert_hooks_trait(&hooks);
//! ```

use std::time::Duration;

use serde_json::{Map, Value};
use tcommon::QueryId;

use crate::{SessionError, ToolOutput};

pub trait ToolCallHooks: Send + Sync {
    fn on_call_start(&self, _query: &QueryId, _tool_name: &str, _arguments: &Map<String, Value>) {}

    fn on_call_success(
        &self,
        _query: &QueryId,
        _tool_name: &str,
        _output: &ToolOutput,
        _elapsed: Duration,
    ) {
    }

    fn on_call_failure(
        &self,
        _query: &QueryId,
        _tool_name: &str,
        _error: &SessionError,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolCallHooks;

impl ToolCallHooks for NoopToolCallHooks {}
