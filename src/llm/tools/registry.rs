//! Function registry for tool execution

use std::collections::HashMap;
use std::future::Future;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::executor::ToolExecutor;
use crate::llm::core::types::ToolDeclaration;

/// Boxed async tool function taking raw JSON arguments
pub type AsyncToolFn =
    Box<dyn Fn(serde_json::Value) -> BoxFuture<'static, Result<String, String>> + Send + Sync>;

/// Everything needed to expose one tool: its name, body and declaration
pub struct ToolRegistration {
    pub name: String,
    pub function: AsyncToolFn,
    pub declaration: ToolDeclaration,
}

/// Errors raised while building a registry
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Tool name '{registered}' does not match its declaration '{declared}'")]
    NameMismatch { registered: String, declared: String },
}

/// Registry of tools callable by the model
///
/// Arguments are deserialized from the model's JSON into the tool's argument
/// type, and results are serialized back to a JSON string.
pub struct FunctionRegistry {
    functions: HashMap<String, AsyncToolFn>,
    /// Kept in registration order so requests are stable
    declarations: Vec<ToolDeclaration>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            functions: HashMap::new(),
            declarations: Vec::new(),
        }
    }

    /// Register a complete tool
    pub fn register(&mut self, registration: ToolRegistration) -> Result<(), RegistryError> {
        if registration.name != registration.declaration.name {
            return Err(RegistryError::NameMismatch {
                registered: registration.name,
                declared: registration.declaration.name,
            });
        }
        if self.functions.contains_key(&registration.name) {
            return Err(RegistryError::DuplicateTool(registration.name));
        }

        tracing::debug!(tool = %registration.name, "Registered tool");
        self.declarations.push(registration.declaration);
        self.functions.insert(registration.name, registration.function);
        Ok(())
    }

    /// Register an async function with typed arguments and result
    ///
    /// * `Args` - deserialized from the model's arguments
    /// * `R` - serialized to JSON as the tool output
    pub fn register_async_tool<F, Args, R, Fut>(
        &mut self,
        name: impl Into<String>,
        func: F,
        declaration: ToolDeclaration,
    ) -> Result<(), RegistryError>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Args: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        Fut: Future<Output = Result<R, String>> + Send + 'static,
    {
        self.register(ToolRegistration {
            name: name.into(),
            function: wrap_async(func),
            declaration,
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Declarations of every registered tool, in registration order
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.declarations.clone()
    }

    async fn execute_function(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<String, String> {
        match self.functions.get(name) {
            Some(func) => func(arguments).await,
            None => Err(format!("Unknown tool: {}", name)),
        }
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for FunctionRegistry {
    async fn execute(
        &self,
        tool_use_id: String,
        name: String,
        arguments: serde_json::Value,
    ) -> Result<String, String> {
        tracing::debug!(%tool_use_id, tool = %name, %arguments, "Executing tool");
        self.execute_function(&name, arguments).await
    }
}

/// Adapt a typed async function to the raw JSON calling convention
fn wrap_async<F, Args, R, Fut>(func: F) -> AsyncToolFn
where
    F: Fn(Args) -> Fut + Send + Sync + 'static,
    Args: DeserializeOwned + Send + 'static,
    R: Serialize + Send + 'static,
    Fut: Future<Output = Result<R, String>> + Send + 'static,
{
    Box::new(move |args_json: serde_json::Value| {
        let args = match serde_json::from_value::<Args>(args_json) {
            Ok(args) => args,
            Err(e) => {
                let err_msg = format!("Failed to deserialize arguments: {}", e);
                return Box::pin(async move { Err(err_msg) }) as BoxFuture<'static, _>;
            }
        };

        let future = func(args);
        Box::pin(async move {
            let result = future.await?;
            serde_json::to_string(&result).map_err(|e| format!("Failed to serialize result: {}", e))
        }) as BoxFuture<'static, _>
    })
}
