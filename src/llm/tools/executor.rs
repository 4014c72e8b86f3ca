//! Tool executor trait

use async_trait::async_trait;

/// Executes tool calls requested by the model
///
/// `Ok` carries the tool output (a JSON string), `Err` a message that is
/// handed back to the model as a failed tool result.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute the tool `name` for the call `tool_use_id`
    async fn execute(
        &self,
        tool_use_id: String,
        name: String,
        arguments: serde_json::Value,
    ) -> Result<String, String>;
}
