//! Tool execution framework
//!
//! The [`ToolExecutor`] trait is what the agent loop calls; the
//! [`FunctionRegistry`] is the standard implementation, mapping tool names to
//! typed Rust functions.

pub mod declaration;
pub mod executor;
pub mod registry;

pub use declaration::create_tool_declaration;
pub use executor::ToolExecutor;
pub use registry::{AsyncToolFn, FunctionRegistry, RegistryError, ToolRegistration};
