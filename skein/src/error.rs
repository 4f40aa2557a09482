//! Agent execution error types.
//!
//! Returned by the tool loop, compiled graphs, nodes and LLM clients. Tool-level
//! failures never reach this type: they are turned into tool-result text by the
//! caller (see [`ToolSourceError`](crate::tool_source::ToolSourceError)).

use thiserror::Error;

/// Agent execution error.
///
/// Structural failures (unknown tool, unreachable route, runaway loop) abort the run
/// and name the offender. `MalformedStructuredOutput` and `Timeout` are recoverable:
/// callers may re-prompt or retry.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. LLM call failed, node error).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// The model requested a tool that is not registered.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Structured model output did not match the requested schema.
    #[error("malformed structured output: {0}")]
    MalformedStructuredOutput(String),

    /// A conditional router returned a key outside its declared target set.
    #[error("unreachable route '{route}' from node '{node}'")]
    UnreachableRoute { node: String, route: String },

    /// Iteration bound of a tool loop or graph run exceeded.
    #[error("runaway loop: exceeded {limit} iterations")]
    RunawayLoop { limit: usize },

    /// A model, tool or node call did not finish within its timeout.
    #[error("timed out: {0}")]
    Timeout(String),

    /// The run was cancelled through its cancellation token.
    #[error("run cancelled")]
    Cancelled,
}

impl AgentError {
    /// Whether the caller may reasonably retry or re-prompt after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AgentError::MalformedStructuredOutput(_) | AgentError::Timeout(_)
        )
    }
}
