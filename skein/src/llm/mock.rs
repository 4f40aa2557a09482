//! Mock LLM for tests and offline runs.
//!
//! Three modes: a fixed response returned on every call, a script of responses
//! consumed in order, or a responder closure that looks at the messages. Every mode
//! counts calls and records the messages it was given.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse};
use crate::message::Message;
use crate::state::ToolCall;

type Responder = Arc<dyn Fn(&[Message]) -> Result<LlmResponse, AgentError> + Send + Sync>;

enum Mode {
    Fixed(LlmResponse),
    Scripted(Mutex<VecDeque<LlmResponse>>),
    Responder(Responder),
}

/// Mock LLM with call counting.
///
/// **Interaction**: Implements `LlmClient`; used by tool loop, ReAct and workflow tests.
pub struct MockLlm {
    mode: Mode,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<Message>>>,
    delay: Option<Duration>,
}

impl MockLlm {
    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    /// Returns the same content and tool calls on every call.
    pub fn new(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::with_mode(Mode::Fixed(LlmResponse::with_tool_calls(content, tool_calls)))
    }

    /// Returns assistant text and no tool calls on every call.
    pub fn with_no_tool_calls(content: impl Into<String>) -> Self {
        Self::new(content, Vec::new())
    }

    /// Returns the given responses in order; fails once they run out.
    pub fn scripted(responses: impl IntoIterator<Item = LlmResponse>) -> Self {
        Self::with_mode(Mode::Scripted(Mutex::new(responses.into_iter().collect())))
    }

    /// Computes each response from the incoming messages.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&[Message]) -> Result<LlmResponse, AgentError> + Send + Sync + 'static,
    {
        Self::with_mode(Mode::Responder(Arc::new(f)))
    }

    /// Sleeps before answering; used to exercise timeouts and concurrency.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of `invoke` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Message lists received, one entry per call.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(&self, messages: &[Message]) -> Result<LlmResponse, AgentError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.mode {
            Mode::Fixed(response) => Ok(response.clone()),
            Mode::Scripted(queue) => queue
                .lock()
                .map_err(|_| AgentError::ExecutionFailed("mock script lock poisoned".into()))?
                .pop_front()
                .ok_or_else(|| {
                    AgentError::ExecutionFailed(format!("mock script exhausted at call {}", n + 1))
                }),
            Mode::Responder(f) => f(messages),
        }
    }
}
