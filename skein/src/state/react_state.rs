//! State for the ReAct graph (think → act → think … → END).

use serde::{Deserialize, Serialize};

use crate::llm::LlmUsage;
use crate::message::Message;

use super::ToolCall;

/// Conversation plus the tool calls requested by the latest think step.
///
/// ThinkNode appends the assistant message and fills `tool_calls`; ActNode runs them,
/// appends one `Message::Tool` per call and clears `tool_calls`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReActState {
    pub messages: Vec<Message>,
    /// Pending tool calls from the last assistant turn.
    pub tool_calls: Vec<ToolCall>,
    /// Completed act rounds.
    #[serde(default)]
    pub turn_count: u32,
    /// Accumulated token usage over all think steps, when the provider reports it.
    #[serde(default)]
    pub total_usage: Option<LlmUsage>,
}

impl ReActState {
    /// State holding a single user message.
    pub fn from_user(input: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::user(input)],
            ..Self::default()
        }
    }

    /// Content of the last assistant message, if any.
    pub fn last_assistant_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(|m| m.content())
    }
}
