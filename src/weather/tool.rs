//! The `get_weather` tool exposed to the model

use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

use super::{WeatherLookup, WeatherResult};
use crate::llm::core::types::ToolDeclaration;
use crate::llm::tools::{create_tool_declaration, FunctionRegistry, RegistryError};

pub const NAME: &str = "get_weather";

pub const DESCRIPTION: &str = "Retrieves the current weather report for a given city.";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetWeatherArgs {
    /// Name of the city
    pub city: String,
}

pub fn declaration() -> ToolDeclaration {
    create_tool_declaration::<GetWeatherArgs>(NAME, DESCRIPTION)
}

/// Register `get_weather` backed by `lookup`
///
/// Lookup failures are returned as an `"error"` status in the tool output so
/// the model can relay them; only malformed arguments fail the call itself.
pub fn register(
    registry: &mut FunctionRegistry,
    lookup: Arc<dyn WeatherLookup>,
) -> Result<(), RegistryError> {
    registry.register_async_tool(
        NAME,
        move |args: GetWeatherArgs| {
            let lookup = Arc::clone(&lookup);
            async move {
                tracing::info!(city = %args.city, "Tool get_weather called");
                Ok::<WeatherResult, String>(lookup.lookup(&args.city).await)
            }
        },
        declaration(),
    )
}
