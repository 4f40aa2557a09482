//! Manual tool loop: request, run the requested tools, append results, ask again.
//!
//! The history starts with the user's input. Each iteration sends the whole history to
//! the model. A reply without tool calls is the answer and is returned as-is (it is not
//! appended). Otherwise the assistant request and one tool-result message per honoured
//! call are appended and the model is asked again. After N tool rounds the history holds
//! 2N+1 messages and the model has been called N+1 times.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::AgentError;
use crate::llm::LlmClient;
use crate::message::Message;
use crate::tool_source::ToolSource;

use super::{assign_call_ids, execute_tool_call};

/// Default bound on model calls per run.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Which of the tool calls in one assistant turn are executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolCallPolicy {
    /// Every call, sequentially, in the order the model listed them.
    #[default]
    All,
    /// Only the first call; the recorded assistant message is trimmed to match.
    FirstOnly,
}

/// Outcome of one tool-loop run.
#[derive(Debug, Clone)]
pub struct ToolLoopRun {
    pub answer: String,
    /// Conversation up to (not including) the final answer.
    pub history: Vec<Message>,
    pub model_calls: usize,
}

/// Tool-calling loop over an `LlmClient` and a `ToolSource`.
///
/// **Interaction**: The client should be bound to the same tools the source provides
/// (see `ChatOpenAI::with_tools`).
pub struct ToolLoop {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolSource>,
    max_iterations: usize,
    call_timeout: Option<Duration>,
    policy: ToolCallPolicy,
}

impl ToolLoop {
    pub fn new(llm: Arc<dyn LlmClient>, tools: Arc<dyn ToolSource>) -> Self {
        Self {
            llm,
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            call_timeout: None,
            policy: ToolCallPolicy::All,
        }
    }

    /// Maximum model calls before the run fails with `RunawayLoop`.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Timeout applied to each model call and each tool call.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    pub fn with_tool_call_policy(mut self, policy: ToolCallPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Runs the loop and returns the final answer text.
    pub async fn invoke(&self, input: &str) -> Result<String, AgentError> {
        self.run(input, &CancellationToken::new())
            .await
            .map(|run| run.answer)
    }

    /// Runs the loop, returning the answer together with the history and call count.
    pub async fn run(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ToolLoopRun, AgentError> {
        let mut history = vec![Message::user(input)];
        let mut model_calls = 0;

        loop {
            if model_calls >= self.max_iterations {
                return Err(AgentError::RunawayLoop {
                    limit: self.max_iterations,
                });
            }
            model_calls += 1;

            let response = self
                .guarded(cancel, "model call", self.llm.invoke(&history))
                .await?;
            if !response.has_tool_calls() {
                info!(iteration = model_calls, "tool loop answered");
                return Ok(ToolLoopRun {
                    answer: response.content,
                    history,
                    model_calls,
                });
            }

            let mut calls = response.tool_calls;
            if self.policy == ToolCallPolicy::FirstOnly {
                calls.truncate(1);
            }
            assign_call_ids(&mut calls);
            debug!(iteration = model_calls, tools = calls.len(), "tool loop iteration");

            let mut results = Vec::with_capacity(calls.len());
            for call in &calls {
                let result = self
                    .guarded(
                        cancel,
                        &format!("tool '{}'", call.name),
                        execute_tool_call(self.tools.as_ref(), call),
                    )
                    .await?;
                results.push(result);
            }
            history.push(Message::assistant_with_tool_calls(response.content, calls));
            history.extend(results);
        }
    }

    /// Applies the call timeout and races the cancellation token.
    async fn guarded<T, F>(
        &self,
        cancel: &CancellationToken,
        what: &str,
        fut: F,
    ) -> Result<T, AgentError>
    where
        F: Future<Output = Result<T, AgentError>>,
    {
        let timed = async {
            match self.call_timeout {
                Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
                    AgentError::Timeout(format!("{} exceeded {:?}", what, limit))
                })?,
                None => fut.await,
            }
        };
        tokio::select! {
            result = timed => result,
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
        }
    }
}
