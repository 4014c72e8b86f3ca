//! Tool declaration helpers using JSON Schema generation

use schemars::{schema_for, JsonSchema};

use crate::llm::core::types::ToolDeclaration;

/// Create a tool declaration whose input schema is derived from `T`
///
/// Doc comments on the fields of `T` become parameter descriptions, which is
/// what the model reads when deciding how to call the tool.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize, JsonSchema)]
/// struct GetWeatherArgs {
///     /// Name of the city
///     city: String,
/// }
///
/// let decl = create_tool_declaration::<GetWeatherArgs>(
///     "get_weather",
///     "Retrieves the current weather report for a given city.",
/// );
/// ```
pub fn create_tool_declaration<T: JsonSchema>(
    name: impl Into<String>,
    description: impl Into<String>,
) -> ToolDeclaration {
    let schema = schema_for!(T);
    ToolDeclaration {
        name: name.into(),
        description: description.into(),
        input_schema: serde_json::to_value(&schema)
            .expect("Failed to serialize schema - this is a bug in schemars or the JsonSchema impl"),
    }
}
