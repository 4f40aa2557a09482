//! Shared state types: tool-call requests and the ReAct graph state.

mod react_state;

pub use react_state::ReActState;

use serde::{Deserialize, Serialize};

/// A single tool invocation requested by the model.
///
/// `arguments` is the raw JSON string from the provider; it is parsed when the tool
/// is called. `id` correlates the request with its `Message::Tool` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool name as registered in the tool source.
    pub name: String,
    /// Arguments as a JSON string.
    pub arguments: String,
    /// Correlation id; providers normally set it, the tool loop fills it when missing.
    pub id: Option<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: arguments.into(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}
