//! Agents built on the LLM and tool abstractions: the manual tool loop and the ReAct graph.

pub mod react;
pub mod tool_loop;

pub use react::{tools_condition, ActNode, ReactAgent, ThinkNode, ToolsConditionResult};
pub use tool_loop::{ToolCallPolicy, ToolLoop, ToolLoopRun};

use tracing::{debug, warn};

use crate::error::AgentError;
use crate::message::Message;
use crate::state::ToolCall;
use crate::tool_source::{parse_tool_arguments, ToolSource, ToolSourceError};

/// Truncates a string for logging, appending "..." if longer than max_len.
fn truncate_for_log(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max_len).collect::<String>())
    }
}

/// Executes one tool call and returns its `Message::Tool` result.
///
/// An unregistered tool is fatal (`UnknownTool`). Any other failure, including
/// unparseable arguments, becomes the result text `"Error: <msg>"` so the model can
/// see it and adapt. The call must already carry an id.
pub(crate) async fn execute_tool_call(
    tools: &dyn ToolSource,
    call: &ToolCall,
) -> Result<Message, AgentError> {
    let call_id = call.id.clone().unwrap_or_default();
    let outcome = match parse_tool_arguments(&call.arguments) {
        Ok(args) => tools.call_tool(&call.name, args).await,
        Err(e) => Err(e),
    };
    let text = match outcome {
        Ok(content) => {
            debug!(tool = %call.name, call_id = %call_id, result = %truncate_for_log(&content.text, 200), "tool call done");
            content.text
        }
        Err(ToolSourceError::NotFound(name)) => return Err(AgentError::UnknownTool(name)),
        Err(e) => {
            warn!(tool = %call.name, call_id = %call_id, error = %e, "tool error returned to model");
            format!("Error: {}", e)
        }
    };
    Ok(Message::tool(call_id, call.name.clone(), text))
}

/// Gives every call an id so each tool result can be correlated.
pub(crate) fn assign_call_ids(calls: &mut [ToolCall]) {
    for call in calls.iter_mut().filter(|c| c.id.is_none()) {
        call.id = Some(uuid::Uuid::new_v4().to_string());
    }
}
