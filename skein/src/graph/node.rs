//! Graph node trait: one step in a StateGraph.
//!
//! Receives state `S`, returns updated `S` and `Next`. [`FnNode`] wraps an async closure
//! for steps that need no struct of their own.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::AgentError;

use super::{Next, RunContext};

/// One step in a graph: state in, (state out, next step).
///
/// The returned state is merged into the run's state by the graph's `StateUpdater`.
/// A node that is the target of a fan-out receives its own sub-state instead of the
/// shared state.
///
/// **Interaction**: Registered with `StateGraph::add_node`; run by `CompiledStateGraph`.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Node id (e.g. `"think"`, `"act"`). Must be unique within a graph.
    fn id(&self) -> &str;

    async fn run(&self, state: S) -> Result<(S, Next), AgentError>;

    /// Variant with run context (config, cancellation, streaming).
    ///
    /// Default implementation calls `run` and ignores the context.
    async fn run_with_context(
        &self,
        state: S,
        _ctx: &RunContext<S>,
    ) -> Result<(S, Next), AgentError> {
        self.run(state).await
    }
}

type NodeFn<S> = Arc<dyn Fn(S) -> BoxFuture<'static, Result<(S, Next), AgentError>> + Send + Sync>;

/// Node backed by an async closure.
///
/// ```rust,ignore
/// let double = FnNode::new("double", |mut s: Counter| async move {
///     s.n *= 2;
///     Ok((s, Next::Continue))
/// });
/// graph.add_node("double", Arc::new(double));
/// ```
pub struct FnNode<S> {
    id: String,
    f: NodeFn<S>,
}

impl<S> FnNode<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new<F, Fut>(id: impl Into<String>, f: F) -> Self
    where
        F: Fn(S) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(S, Next), AgentError>> + Send + 'static,
    {
        Self {
            id: id.into(),
            f: Arc::new(move |s| Box::pin(f(s))),
        }
    }
}

#[async_trait]
impl<S> Node<S> for FnNode<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: S) -> Result<(S, Next), AgentError> {
        (self.f)(state).await
    }
}
