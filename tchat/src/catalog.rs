//! Adapts a server's tool catalog into provider tool declarations.
//!
//! ```rust
//! use serde_json::json;
//! use tchat::to_provider_tools;
//! use tsession::ToolDescriptor;
//!
//! let catalog = vec![ToolDescriptor::new(
//!     "get_forecast",
//!     "Forecast for a location",
//!     json!({"type": "object", "properties": {"latitude": {"type": "number"}}}),
//! )];
//!
//! let tools = to_provider_tools(&catalog);
//! assert_eq!(tools[0].name, "get_forecast");
//! assert_eq!(tools[0].input_schema["properties"]["latitude"]["type"], "number");
//! ```

use tprovider::ToolDefinition;
use tsession::ToolDescriptor;

/// Field-for-field mapping; schemas pass through untouched and order is preserved.
pub fn to_provider_tools(catalog: &[ToolDescriptor]) -> Vec<ToolDefinition> {
    catalog
        .iter()
        .map(|tool| ToolDefinition {
            name: tool.name.clone(),
            description: tool.description.clone().unwrap_or_default(),
            input_schema: tool.input_schema.clone(),
        })
        .collect()
}
