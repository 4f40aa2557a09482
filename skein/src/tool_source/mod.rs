//! Tool source abstraction: list tools and call a tool by name.
//!
//! The tool loop and the ReAct act step depend on `ToolSource` rather than on a concrete
//! registry. [`ToolRegistry`](crate::tools::ToolRegistry) is the main implementation.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Tool declaration sent to the model: name, description and JSON Schema for arguments.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolSpec {
    pub name: String,
    /// Human-readable description for the model.
    pub description: Option<String>,
    /// JSON Schema for the arguments object.
    pub input_schema: Value,
}

/// Result of a single tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallContent {
    /// Result text placed in the tool-result message.
    pub text: String,
}

impl ToolCallContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Serializes a JSON value as the result text.
    pub fn json(value: &Value) -> Self {
        Self {
            text: value.to_string(),
        }
    }
}

/// Errors from listing or calling tools.
///
/// Only `NotFound` is structural; the others describe a failed execution and are
/// converted to result text by callers so the model can see them and adapt.
#[derive(Debug, Error)]
pub enum ToolSourceError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("invalid arguments: {0}")]
    InvalidInput(String),
    #[error("tool execution failed: {0}")]
    Execution(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// Lists tools for the model and executes the ones it requests.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Declarations for every available tool.
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolSourceError>;

    /// Calls the named tool. Returns `NotFound` when no such tool exists.
    async fn call_tool(&self, name: &str, arguments: Value)
        -> Result<ToolCallContent, ToolSourceError>;
}

/// Parses a provider's tool-argument string into a JSON value.
///
/// Empty input yields `{}`. Some providers double-encode arguments as a JSON string;
/// that inner string is decoded too.
pub fn parse_tool_arguments(arguments: &str) -> Result<Value, ToolSourceError> {
    if arguments.trim().is_empty() {
        return Ok(serde_json::json!({}));
    }
    let raw: Value = serde_json::from_str(arguments)
        .map_err(|e| ToolSourceError::InvalidInput(format!("arguments are not JSON: {}", e)))?;
    match raw.as_str() {
        Some(inner) => serde_json::from_str(inner).or(Ok(raw)),
        None => Ok(raw),
    }
}
