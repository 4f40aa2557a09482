//! Bounded step graph: build with `StateGraph`, compile, then invoke or stream.
//!
//! Covers sequential chains, parallel fan-out/fan-in (several edges from one node plus a
//! join edge), conditional routing with declared targets, dynamic fan-out with `SendTask`,
//! and cycles bounded by state counters and the recursion limit.

mod compile_error;
mod compiled;
mod conditional;
mod logging;
mod next;
mod node;
mod retry;
mod run_context;
mod state_graph;
mod stream;

pub use compile_error::CompilationError;
pub use compiled::CompiledStateGraph;
pub use conditional::{
    ConditionalRouter, ConditionalRouterFn, FanOutRouter, FanOutRouterFn, NextEntry, SendTask,
};
pub use logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_state_update,
};
pub use next::Next;
pub use node::{FnNode, Node};
pub use retry::{Backoff, RetryOn, RetryPolicy};
pub use run_context::{RunConfig, RunContext, DEFAULT_RECURSION_LIMIT};
pub use state_graph::{StateGraph, END, START};
pub use stream::{StreamEvent, StreamMode};
