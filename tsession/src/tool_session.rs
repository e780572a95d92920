//! The tool-server surface the orchestrator depends on.

use serde_json::{Map, Value};
use tcommon::BoxFuture;

use crate::{SessionError, ToolDescriptor, ToolOutput};

pub trait ToolSession: Send + Sync {
    fn list_tools<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ToolDescriptor>, SessionError>>;

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: Map<String, Value>,
    ) -> BoxFuture<'a, Result<ToolOutput, SessionError>>;
}
