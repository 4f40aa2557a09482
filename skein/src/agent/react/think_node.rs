//! Think node: send the conversation to the LLM, record its reply and any tool calls.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::assign_call_ids;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::ReActState;

pub struct ThinkNode {
    llm: Arc<dyn LlmClient>,
}

impl ThinkNode {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Node<ReActState> for ThinkNode {
    fn id(&self) -> &str {
        "think"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let response = self.llm.invoke(&state.messages).await?;
        let mut tool_calls = response.tool_calls;
        assign_call_ids(&mut tool_calls);

        let total_usage = match (&state.total_usage, &response.usage) {
            (Some(t), Some(u)) => Some(t.add(u)),
            (t, u) => t.clone().or_else(|| u.clone()),
        };
        let mut messages = state.messages;
        messages.push(Message::assistant_with_tool_calls(
            response.content,
            tool_calls.clone(),
        ));
        Ok((
            ReActState {
                messages,
                tool_calls,
                turn_count: state.turn_count,
                total_usage,
            },
            Next::Continue,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, LlmUsage, MockLlm};
    use crate::state::ToolCall;

    #[tokio::test]
    async fn records_reply_and_pending_calls() {
        let mut response =
            LlmResponse::with_tool_calls("", vec![ToolCall::new("search_tool", r#"{"query":"x"}"#)]);
        response.usage = Some(LlmUsage {
            prompt_tokens: 3,
            completion_tokens: 2,
            total_tokens: 5,
        });
        let node = ThinkNode::new(Arc::new(MockLlm::scripted(vec![response])));
        let (state, next) = node.run(ReActState::from_user("hi")).await.unwrap();
        assert_eq!(next, Next::Continue);
        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.tool_calls.len(), 1);
        assert!(state.tool_calls[0].id.is_some());
        assert_eq!(state.total_usage.map(|u| u.total_tokens), Some(5));
    }
}
