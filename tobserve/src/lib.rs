//! Tracing and metrics hooks for provider calls, tool calls, and queries.
//!
//! ```rust
//! use tobserve::{MetricsObservabilityHooks, SafeProviderHooks, SafeQueryHooks, TracingObservabilityHooks};
//!
//! let _provider_hooks = SafeProviderHooks::new(TracingObservabilityHooks);
//! let _query_hooks = SafeQueryHooks::new(MetricsObservabilityHooks);
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsObservabilityHooks;
pub use safe_hooks::{SafeProviderHooks, SafeQueryHooks, SafeToolHooks};
pub use tracing_hooks::TracingObservabilityHooks;

pub mod prelude {
    pub use crate::{
        MetricsObservabilityHooks, SafeProviderHooks, SafeQueryHooks, SafeToolHooks,
        TracingObservabilityHooks,
    };
}
