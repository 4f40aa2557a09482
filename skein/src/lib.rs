//! # Skein
//!
//! Tool-calling loops and bounded step graphs for LLM agents, with a **state-in, state-out**
//! design: one state type flows through every step of a graph.
//!
//! ## Two patterns
//!
//! - **Manual tool loop** ([`ToolLoop`]): send the history to the model, execute the tools it
//!   asks for, append the results, ask again. Bounded by an iteration limit, an optional
//!   per-call timeout and a cancellation token.
//! - **Step graph** ([`StateGraph`] → [`CompiledStateGraph`]): sequential chains, parallel
//!   branches with join barriers, conditional routing with declared targets, dynamic fan-out
//!   via [`SendTask`], and cycles bounded by a recursion limit.
//!
//! ## Main modules
//!
//! - [`agent`]: [`ToolLoop`], and the ReAct graph ([`ReactAgent`], [`ThinkNode`], [`ActNode`],
//!   [`tools_condition`]).
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`FnNode`], [`Next`],
//!   [`RunConfig`], [`RetryPolicy`], [`StreamEvent`].
//! - [`channels`]: [`StateUpdater`], [`FieldBasedUpdater`], the [`append`] and
//!   [`merge_if_set`] reducers, [`JoinBarrier`].
//! - [`llm`]: [`LlmClient`], [`ChatOpenAI`], [`MockLlm`], [`StructuredOutput`].
//! - [`tools`]: [`Tool`], [`ToolRegistry`], arithmetic, clothing and web search tools.
//! - [`workflows`]: cover letter chain, translation fan-out, task router, meal planner,
//!   post refiner, investment planner, reflexion agent.
//! - [`settings`]: [`RunSettings`] read from the environment.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skein::{math_registry, ChatOpenAI, ToolLoop};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), skein::AgentError> {
//! let tools = Arc::new(math_registry());
//! let llm = ChatOpenAI::new("gpt-4o-mini").with_tools(tools.list());
//! let answer = ToolLoop::new(Arc::new(llm), tools)
//!     .invoke("What is 3 plus 4 times 2?")
//!     .await?;
//! println!("{}", answer);
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod channels;
pub mod error;
pub mod graph;
pub mod llm;
pub mod message;
pub mod settings;
pub mod state;
pub mod tool_source;
pub mod tools;
pub mod workflows;

pub use agent::{
    tools_condition, ActNode, ReactAgent, ThinkNode, ToolCallPolicy, ToolLoop, ToolLoopRun,
    ToolsConditionResult,
};
pub use channels::{
    append, merge_if_set, FieldBasedUpdater, JoinBarrier, ReplaceUpdater, StateUpdater,
};
pub use error::AgentError;
pub use graph::{
    Backoff, CompilationError, CompiledStateGraph, FnNode, Next, Node, RetryOn, RetryPolicy,
    RunConfig, RunContext, SendTask, StateGraph, StreamEvent, StreamMode, END, START,
};
pub use llm::{
    ChatOpenAI, LlmClient, LlmResponse, LlmUsage, MockLlm, StructuredOutput, ToolChoiceMode,
};
pub use message::Message;
pub use settings::RunSettings;
pub use state::{ReActState, ToolCall};
pub use tool_source::{ToolSource, ToolSourceError, ToolSpec};
pub use tools::{math_registry, SearchClient, TavilyClient, Tool, ToolRegistry, WebSearchTool};
