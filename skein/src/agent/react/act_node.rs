//! Act node: run the pending tool calls and append their results to the conversation.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::execute_tool_call;
use crate::error::AgentError;
use crate::graph::{Next, Node};
use crate::state::ReActState;
use crate::tool_source::ToolSource;

/// Executes every pending call in order. Unknown tools abort the run; other tool
/// failures are returned to the model as `"Error: ..."` results.
pub struct ActNode {
    tools: Arc<dyn ToolSource>,
}

impl ActNode {
    pub fn new(tools: Arc<dyn ToolSource>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Node<ReActState> for ActNode {
    fn id(&self) -> &str {
        "act"
    }

    async fn run(&self, state: ReActState) -> Result<(ReActState, Next), AgentError> {
        let mut messages = state.messages;
        for call in &state.tool_calls {
            tracing::debug!(tool = %call.name, "act: calling tool");
            messages.push(execute_tool_call(self.tools.as_ref(), call).await?);
        }
        Ok((
            ReActState {
                messages,
                tool_calls: Vec::new(),
                turn_count: state.turn_count + 1,
                total_usage: state.total_usage,
            },
            Next::Continue,
        ))
    }
}
