//! ReAct agent: think → (act → think)* → END over [`ReActState`].
//!
//! - **[`ThinkNode`]**: calls the LLM with the conversation; may record tool calls.
//! - **[`ActNode`]**: runs the recorded tool calls and appends their results.
//! - **[`tools_condition`]**: routes to `act` while tool calls are pending, else to END.
//! - **[`ReactAgent`]**: compiles the graph once and runs it per request.

mod act_node;
mod think_node;

pub use act_node::ActNode;
pub use think_node::ThinkNode;

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AgentError;
use crate::graph::{CompilationError, CompiledStateGraph, RunConfig, StateGraph, END, START};
use crate::llm::LlmClient;
use crate::message::Message;
use crate::state::ReActState;
use crate::tool_source::ToolSource;

/// Output of the tools_condition function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolsConditionResult {
    /// Route to the tools execution node.
    Tools,
    /// Route to the end node ("__end__").
    End,
}

impl ToolsConditionResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tools => "tools",
            Self::End => END,
        }
    }
}

/// Conditional routing: if tool_calls present, route to act; else end.
pub fn tools_condition(state: &ReActState) -> ToolsConditionResult {
    if state.tool_calls.is_empty() {
        ToolsConditionResult::End
    } else {
        ToolsConditionResult::Tools
    }
}

/// Prebuilt ReAct agent.
///
/// The LLM client must be bound to the tools the source provides. Turns are bounded by
/// the graph recursion limit: each think or act step is one superstep.
pub struct ReactAgent {
    graph: CompiledStateGraph<ReActState>,
    config: RunConfig,
}

impl ReactAgent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolSource>,
    ) -> Result<Self, CompilationError> {
        let mut graph = StateGraph::<ReActState>::new();
        graph
            .add_node("think", Arc::new(ThinkNode::new(llm)))
            .add_node("act", Arc::new(ActNode::new(tools)));
        graph.add_edge(START, "think").add_edge("act", "think");
        let path_map: HashMap<String, String> = [
            ("tools".to_string(), "act".to_string()),
            (END.to_string(), END.to_string()),
        ]
        .into_iter()
        .collect();
        graph.add_conditional_edges(
            "think",
            Arc::new(|s: &ReActState| tools_condition(s).as_str().to_string()),
            Some(path_map),
        );
        Ok(Self {
            graph: graph.compile()?,
            config: RunConfig::default().with_run_name("react"),
        })
    }

    pub fn with_run_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs the agent over `messages` and returns the final state.
    pub async fn run(&self, messages: Vec<Message>) -> Result<ReActState, AgentError> {
        let state = ReActState {
            messages,
            ..ReActState::default()
        };
        self.graph.invoke(state, Some(self.config.clone())).await
    }

    /// Runs the agent and returns the last assistant reply.
    pub async fn invoke(&self, messages: Vec<Message>) -> Result<String, AgentError> {
        let state = self.run(messages).await?;
        Ok(state.last_assistant_reply().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ToolCall;

    #[test]
    fn tools_condition_returns_end_when_no_tool_calls() {
        let state = ReActState::from_user("hello");
        assert_eq!(tools_condition(&state), ToolsConditionResult::End);
        assert_eq!(tools_condition(&state).as_str(), "__end__");
    }

    #[test]
    fn tools_condition_returns_tools_when_tool_calls_present() {
        let mut state = ReActState::from_user("search");
        state.tool_calls = vec![ToolCall::new("search_tool", "{}").with_id("tc1")];
        assert_eq!(tools_condition(&state), ToolsConditionResult::Tools);
        assert_eq!(tools_condition(&state).as_str(), "tools");
    }
}
