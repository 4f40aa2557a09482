//! Compiled state graph: immutable, runs in supersteps.
//!
//! Each superstep runs every task of the frontier concurrently and waits for all of
//! them, merges their outputs into the state in task order, then computes the next
//! frontier from routers, `Next` hints, static edges and join barriers. The run ends
//! when the frontier is empty.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::channels::{BoxedStateUpdater, JoinBarrier};
use crate::error::AgentError;

use super::logging::{
    log_graph_complete, log_graph_error, log_graph_start, log_node_complete, log_node_start,
    log_node_state, log_state_update,
};
use super::retry::RetryPolicy;
use super::state_graph::END;
use super::stream::{StreamEvent, StreamMode};
use super::{Next, NextEntry, Node, RunConfig, RunContext};

/// Join edge: `target` runs once all `sources` have completed.
#[derive(Debug, Clone)]
pub(crate) struct JoinEdge {
    pub(crate) sources: Vec<String>,
    pub(crate) target: String,
}

/// One unit of work in a superstep. `input` is set for fan-out tasks, which run on
/// their own sub-state; other tasks read the merged state.
#[derive(Debug, Clone)]
struct Task<S> {
    node_id: String,
    input: Option<S>,
}

/// Compiled graph: immutable structure, cheap to clone and safe to invoke concurrently.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: Arc<HashMap<String, Arc<dyn Node<S>>>>,
    pub(super) start_targets: Vec<String>,
    pub(super) next_map: Arc<HashMap<String, NextEntry<S>>>,
    pub(super) joins: Arc<Vec<JoinEdge>>,
    pub(super) state_updater: BoxedStateUpdater<S>,
    pub(super) retry_policy: RetryPolicy,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Nodes scheduled in the first superstep.
    pub fn start_targets(&self) -> &[String] {
        &self.start_targets
    }

    /// Runs the graph to completion and returns the final state.
    pub async fn invoke(&self, state: S, config: Option<RunConfig>) -> Result<S, AgentError> {
        self.invoke_with_context(state, RunContext::new(config.unwrap_or_default()))
            .await
    }

    /// Runs with a caller-built context (cancellation token, stream sender).
    pub async fn invoke_with_context(
        &self,
        state: S,
        ctx: RunContext<S>,
    ) -> Result<S, AgentError> {
        log_graph_start(ctx.config.run_name.as_deref());
        let result = self.run_loop(state, ctx).await;
        if let Err(ref e) = result {
            log_graph_error(e);
        }
        result
    }

    /// Runs the graph in the background and streams events for the selected modes.
    ///
    /// The stream ends when the run finishes; a failed run is visible as a `TaskEnd`
    /// with an error (when `Tasks` is selected) and in the logs.
    pub fn stream(
        &self,
        state: S,
        config: Option<RunConfig>,
        stream_mode: impl IntoIterator<Item = StreamMode>,
    ) -> ReceiverStream<StreamEvent<S>> {
        let (tx, rx) = mpsc::channel(128);
        let graph = self.clone();
        let mut ctx = RunContext::new(config.unwrap_or_default());
        ctx.stream_tx = Some(tx);
        ctx.stream_mode = stream_mode.into_iter().collect();

        tokio::spawn(async move {
            let _ = graph.invoke_with_context(state, ctx).await;
        });

        ReceiverStream::new(rx)
    }

    async fn run_loop(&self, mut state: S, mut ctx: RunContext<S>) -> Result<S, AgentError> {
        let limit = ctx.config.recursion_limit;
        let mut barriers: Vec<JoinBarrier<String>> = self
            .joins
            .iter()
            .map(|j| JoinBarrier::from_names(j.sources.iter().cloned()))
            .collect();
        let mut frontier: Vec<Task<S>> = self
            .start_targets
            .iter()
            .map(|id| Task {
                node_id: id.clone(),
                input: None,
            })
            .collect();
        dedupe_shared(&mut frontier);

        while !frontier.is_empty() {
            if ctx.cancel.is_cancelled() {
                return Err(AgentError::Cancelled);
            }
            if ctx.step >= limit {
                return Err(AgentError::RunawayLoop { limit });
            }
            ctx.step += 1;

            let runs = frontier.iter().map(|task| {
                let input = task.input.clone().unwrap_or_else(|| state.clone());
                self.run_task(&task.node_id, input, &ctx)
            });
            let results = tokio::select! {
                results = join_all(runs) => results,
                _ = ctx.cancel.cancelled() => return Err(AgentError::Cancelled),
            };

            let mut outputs: Vec<(S, Next)> = Vec::with_capacity(results.len());
            for result in results {
                outputs.push(result?);
            }

            for (task, (out, _)) in frontier.iter().zip(outputs.iter()) {
                self.state_updater.apply_update(&mut state, out);
                log_state_update(&task.node_id);
                ctx.emit(StreamEvent::Updates {
                    node_id: task.node_id.clone(),
                    state: out.clone(),
                })
                .await;
            }
            ctx.emit(StreamEvent::Values(state.clone())).await;

            let mut next_frontier: Vec<Task<S>> = Vec::new();
            for (task, (_, next)) in frontier.iter().zip(outputs) {
                let ended = next == Next::End;
                next_frontier.extend(self.successors(&task.node_id, next, &state)?);
                if ended {
                    continue;
                }
                for barrier in barriers.iter_mut() {
                    barrier.mark_seen(&task.node_id);
                }
            }
            for (join, barrier) in self.joins.iter().zip(barriers.iter_mut()) {
                if barrier.consume() && join.target != END {
                    tracing::debug!(target_node = %join.target, "join barrier released");
                    next_frontier.push(Task {
                        node_id: join.target.clone(),
                        input: None,
                    });
                }
            }
            dedupe_shared(&mut next_frontier);
            frontier = next_frontier;
        }

        log_graph_complete(ctx.config.run_name.as_deref(), ctx.step);
        Ok(state)
    }

    /// Tasks that follow `node_id`, resolved on the merged state.
    fn successors(&self, node_id: &str, next: Next, state: &S) -> Result<Vec<Task<S>>, AgentError> {
        let shared = |id: &str| Task {
            node_id: id.to_string(),
            input: None,
        };
        match self.next_map.get(node_id) {
            Some(NextEntry::Conditional(router)) => {
                let target = router.resolve_next(node_id, state)?;
                tracing::debug!(node_id, target = %target, "conditional route");
                if target == END {
                    return Ok(Vec::new());
                }
                if !self.nodes.contains_key(&target) {
                    return Err(AgentError::UnreachableRoute {
                        node: node_id.to_string(),
                        route: target,
                    });
                }
                Ok(vec![shared(&target)])
            }
            Some(NextEntry::FanOut(router)) => {
                let tasks = router.dispatch(node_id, state)?;
                tracing::debug!(node_id, tasks = tasks.len(), "fan-out dispatch");
                Ok(tasks
                    .into_iter()
                    .map(|t| Task {
                        node_id: t.node,
                        input: Some(t.state),
                    })
                    .collect())
            }
            edges => match next {
                Next::End => Ok(Vec::new()),
                Next::Node(target) if target == END => Ok(Vec::new()),
                Next::Node(target) => {
                    if !self.nodes.contains_key(&target) {
                        return Err(AgentError::UnreachableRoute {
                            node: node_id.to_string(),
                            route: target,
                        });
                    }
                    Ok(vec![shared(&target)])
                }
                Next::Continue => Ok(match edges {
                    Some(NextEntry::Edges(targets)) => targets
                        .iter()
                        .filter(|t| t.as_str() != END)
                        .map(|t| shared(t))
                        .collect(),
                    _ => Vec::new(),
                }),
            },
        }
    }

    /// Runs one task with timeout, retry and stream events.
    async fn run_task(
        &self,
        node_id: &str,
        input: S,
        ctx: &RunContext<S>,
    ) -> Result<(S, Next), AgentError> {
        let node = self
            .nodes
            .get(node_id)
            .cloned()
            .ok_or_else(|| AgentError::ExecutionFailed(format!("node not found: {}", node_id)))?;

        log_node_start(node_id, ctx.step);
        log_node_state(node_id, &input);
        ctx.emit(StreamEvent::TaskStart {
            node_id: node_id.to_string(),
        })
        .await;

        let mut attempt = 0;
        let result = loop {
            let run = node.run_with_context(input.clone(), ctx);
            let result = match ctx.config.node_timeout {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(r) => r,
                    Err(_) => Err(AgentError::Timeout(format!(
                        "node '{}' exceeded {:?}",
                        node_id, limit
                    ))),
                },
                None => run.await,
            };
            let err = match result {
                Err(e) => e,
                ok => break ok,
            };
            match self.retry_policy.retry_after(&err, attempt) {
                Some(delay) => {
                    tracing::warn!(node_id, attempt, error = %err, ?delay, "node failed, retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                None => break Err(err),
            }
        };

        ctx.emit(StreamEvent::TaskEnd {
            node_id: node_id.to_string(),
            result: result.as_ref().map(|_| ()).map_err(|e| e.to_string()),
        })
        .await;
        if let Ok((_, next)) = &result {
            log_node_complete(node_id, next);
        }
        result
    }
}

/// Drops repeated shared tasks for the same node, keeping the first; fan-out tasks stay.
fn dedupe_shared<S>(tasks: &mut Vec<Task<S>>) {
    let mut seen: HashSet<String> = HashSet::new();
    tasks.retain(|t| t.input.is_some() || seen.insert(t.node_id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{append, FieldBasedUpdater};
    use crate::graph::{FnNode, RetryOn, StateGraph, START};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_stream::StreamExt;

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Trail {
        visited: Vec<String>,
        n: u32,
    }

    /// Returns a partial state carrying only this node's visit.
    fn visit(id: &'static str) -> Arc<dyn Node<Trail>> {
        Arc::new(FnNode::new(id, move |_: Trail| async move {
            let delta = Trail {
                visited: vec![id.to_string()],
                ..Trail::default()
            };
            Ok((delta, Next::Continue))
        }))
    }

    fn appending() -> BoxedStateUpdater<Trail> {
        Arc::new(FieldBasedUpdater::new(|c: &mut Trail, u: &Trail| {
            append(&mut c.visited, &u.visited);
            c.n = c.n.max(u.n);
        }))
    }

    #[tokio::test]
    async fn linear_chain_runs_in_order() {
        let mut g = StateGraph::<Trail>::new().with_state_updater(appending());
        g.add_node("a", visit("a")).add_node("b", visit("b"));
        g.add_edge(START, "a").add_edge("a", "b").add_edge("b", END);
        let out = g.compile().unwrap().invoke(Trail::default(), None).await.unwrap();
        assert_eq!(out.visited, vec!["a", "b"]);
    }

    /// **Scenario**: A join target after branches of different lengths runs exactly once,
    /// after the longer branch.
    #[tokio::test]
    async fn join_waits_for_uneven_branches() {
        let mut g = StateGraph::<Trail>::new().with_state_updater(appending());
        g.add_node("a1", visit("a1"))
            .add_node("a2", visit("a2"))
            .add_node("b1", visit("b1"))
            .add_node("c", visit("c"));
        g.add_edge(START, "a1").add_edge(START, "b1").add_edge("a1", "a2");
        g.add_join_edge(["a2", "b1"], "c").add_edge("c", END);
        let out = g.compile().unwrap().invoke(Trail::default(), None).await.unwrap();
        assert_eq!(out.visited, vec!["a1", "b1", "a2", "c"]);
    }

    #[tokio::test]
    async fn next_node_jump_overrides_edges() {
        let mut g = StateGraph::<Trail>::new().with_state_updater(appending());
        g.add_node(
            "a",
            Arc::new(FnNode::new("a", |_: Trail| async move {
                let delta = Trail {
                    visited: vec!["a".into()],
                    ..Trail::default()
                };
                Ok((delta, Next::Node("c".into())))
            })),
        )
        .add_node("b", visit("b"))
        .add_node("c", visit("c"));
        g.add_edge(START, "a")
            .add_edge("a", "b")
            .add_edge("b", END)
            .add_edge("c", END);
        let out = g.compile().unwrap().invoke(Trail::default(), None).await.unwrap();
        assert_eq!(out.visited, vec!["a", "c"]);
    }

    /// **Scenario**: A cycle without a reachable stop trips the recursion limit.
    #[tokio::test]
    async fn recursion_limit_stops_runaway_cycle() {
        let mut g = StateGraph::<Trail>::new();
        g.add_node("spin", visit("spin"));
        g.add_edge(START, "spin");
        g.add_conditional_edges(
            "spin",
            Arc::new(|s: &Trail| if s.n > 100 { "done".into() } else { "again".into() }),
            Some(
                [("again".to_string(), "spin".to_string()), ("done".to_string(), END.to_string())]
                    .into_iter()
                    .collect(),
            ),
        );
        let err = g
            .compile()
            .unwrap()
            .invoke(Trail::default(), Some(RunConfig::default().with_recursion_limit(4)))
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::RunawayLoop { limit: 4 }));
    }

    /// **Scenario**: A router without a path map returning an unknown key fails right
    /// after the routing node, naming the node and the key.
    #[tokio::test]
    async fn open_router_unknown_key_is_unreachable() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut g = StateGraph::<Trail>::new().with_state_updater(appending());
        g.add_node(
            "a",
            Arc::new(FnNode::new("a", move |s: Trail| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok((s, Next::Continue))
                }
            })),
        )
        .add_node("b", visit("b"));
        g.add_edge(START, "a").add_edge("b", END);
        g.add_conditional_edges("a", Arc::new(|_: &Trail| "ghost".to_string()), None);
        let err = g
            .compile()
            .unwrap()
            .invoke(Trail::default(), None)
            .await
            .unwrap_err();
        match err {
            AgentError::UnreachableRoute { node, route } => {
                assert_eq!(node, "a");
                assert_eq!(route, "ghost");
            }
            other => panic!("expected UnreachableRoute, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn node_timeout_surfaces_timeout() {
        let mut g = StateGraph::<Trail>::new();
        g.add_node(
            "slow",
            Arc::new(FnNode::new("slow", |s: Trail| async move {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok((s, Next::Continue))
            })),
        );
        g.add_edge(START, "slow").add_edge("slow", END);
        let err = g
            .compile()
            .unwrap()
            .invoke(
                Trail::default(),
                Some(RunConfig::default().with_node_timeout(Duration::from_millis(10))),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
    }

    #[tokio::test]
    async fn cancelled_token_stops_run() {
        let mut g = StateGraph::<Trail>::new();
        g.add_node(
            "slow",
            Arc::new(FnNode::new("slow", |s: Trail| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok((s, Next::Continue))
            })),
        );
        g.add_edge(START, "slow").add_edge("slow", END);
        let graph = g.compile().unwrap();
        let ctx = RunContext::new(RunConfig::default());
        let cancel = ctx.cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let err = graph
            .invoke_with_context(Trail::default(), ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Cancelled));
    }

    /// **Scenario**: A node failing once succeeds on retry when execution errors are covered.
    #[tokio::test]
    async fn retry_policy_recovers_flaky_node() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut g = StateGraph::<Trail>::new().with_retry_policy(
            RetryPolicy::fixed(2, Duration::from_millis(1)).on(RetryOn::ExecutionErrors),
        );
        g.add_node(
            "flaky",
            Arc::new(FnNode::new("flaky", move |s: Trail| {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(AgentError::ExecutionFailed("transient".into()))
                    } else {
                        Ok((s, Next::Continue))
                    }
                }
            })),
        );
        g.add_edge(START, "flaky").add_edge("flaky", END);
        g.compile().unwrap().invoke(Trail::default(), None).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    /// **Scenario**: An unreachable route is final even under a generous retry policy.
    #[tokio::test]
    async fn structural_failure_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut g = StateGraph::<Trail>::new().with_retry_policy(
            RetryPolicy::fixed(3, Duration::ZERO).on(RetryOn::ExecutionErrors),
        );
        g.add_node(
            "jump",
            Arc::new(FnNode::new("jump", move |_: Trail| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err::<(Trail, Next), _>(AgentError::UnreachableRoute {
                        node: "jump".into(),
                        route: "nowhere".into(),
                    })
                }
            })),
        );
        g.add_edge(START, "jump").add_edge("jump", END);
        let err = g.compile().unwrap().invoke(Trail::default(), None).await.unwrap_err();
        assert!(matches!(err, AgentError::UnreachableRoute { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stream_emits_tasks_and_values() {
        let mut g = StateGraph::<Trail>::new().with_state_updater(appending());
        g.add_node("a", visit("a"));
        g.add_edge(START, "a").add_edge("a", END);
        let events: Vec<StreamEvent<Trail>> = g
            .compile()
            .unwrap()
            .stream(
                Trail::default(),
                None,
                [StreamMode::Tasks, StreamMode::Values],
            )
            .collect()
            .await;
        assert!(matches!(events[0], StreamEvent::TaskStart { ref node_id } if node_id == "a"));
        assert!(matches!(events[1], StreamEvent::TaskEnd { result: Ok(()), .. }));
        assert!(matches!(events.last(), Some(StreamEvent::Values(s)) if s.visited == vec!["a"]));
    }
}
