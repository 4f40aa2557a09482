//! Ready-made workflows composed from the step graph and the LLM client.
//!
//! Each workflow holds an `Arc<dyn LlmClient>` (plus a search client where it researches),
//! builds its graph on `invoke` and returns the final state. Steps that need typed model
//! output read it through [`StructuredOutput`](crate::llm::StructuredOutput); give those
//! steps a client bound to the schema with `with_structured_llm` when using OpenAI.

pub mod evaluator;
pub mod orchestrator;
pub mod parallel;
pub mod prompt_chain;
pub mod reflection;
pub mod reflexion;
pub mod routing;

pub use evaluator::{Evaluation, InvestmentPlanner, InvestmentState};
pub use orchestrator::{Dish, Dishes, MealPlanner, MealState};
pub use parallel::{TranslationFanOut, TranslationState};
pub use prompt_chain::{ChainState, CoverLetterChain};
pub use reflection::{PostRefiner, PostState};
pub use reflexion::{AnswerQuestion, Reflection, ReflexionAgent, ReflexionState, ReviseAnswer};
pub use routing::{Route, RouterState, TaskRouter};

use std::fmt::Debug;
use std::time::Duration;

use crate::error::AgentError;
use crate::graph::{CompiledStateGraph, RetryOn, RetryPolicy, RunConfig, StateGraph};
use crate::llm::LlmClient;
use crate::message::Message;

/// Sends a single user prompt and returns the trimmed reply text.
pub(crate) async fn ask(llm: &dyn LlmClient, prompt: String) -> Result<String, AgentError> {
    let response = llm.invoke(&[Message::user(prompt)]).await?;
    Ok(response.content.trim().to_string())
}

/// `config` with a recursion limit of at least `supersteps`, so a workflow's own
/// iteration budget is what ends its loop.
pub(crate) fn covering(config: &RunConfig, supersteps: usize) -> RunConfig {
    let limit = config.recursion_limit.max(supersteps);
    config.clone().with_recursion_limit(limit)
}

/// Retry used by every workflow step: a model call that hits the run's node timeout is
/// re-run twice. Schema mismatches are already re-prompted by `StructuredOutput`.
pub fn step_retry() -> RetryPolicy {
    RetryPolicy::doubling(2, Duration::from_millis(250), Duration::from_secs(2))
        .on(RetryOn::Timeouts)
}

/// Compiles a workflow graph with [`step_retry`]; wiring mistakes surface as
/// `ExecutionFailed`.
pub(crate) fn build<S>(graph: StateGraph<S>) -> Result<CompiledStateGraph<S>, AgentError>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    graph
        .with_retry_policy(step_retry())
        .compile()
        .map_err(|e| AgentError::ExecutionFailed(format!("workflow graph invalid: {}", e)))
}
