//! State graph builder: nodes, static/join/conditional/fan-out edges, compile.
//!
//! Add nodes with `add_node` and wire them with `add_edge(from, to)`, using `START` and
//! `END` for entry and exit. Several edges from one node (or from START) form a static
//! fan-out whose branches run in the same superstep. `add_join_edge` schedules a target
//! once after all of its sources completed. `add_conditional_edges` routes on state through
//! a declared path map; `add_fan_out` dispatches one task per `SendTask`.
//!
//! # State updates
//!
//! By default a node's output replaces the whole state. Graphs with parallel branches
//! should install a `FieldBasedUpdater` through `with_state_updater` so accumulating
//! fields merge instead of overwrite.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt::Debug;
use std::sync::Arc;

use crate::channels::{BoxedStateUpdater, ReplaceUpdater};

use super::compile_error::CompilationError;
use super::compiled::{CompiledStateGraph, JoinEdge};
use super::conditional::{
    ConditionalRouter, ConditionalRouterFn, FanOutRouter, FanOutRouterFn, NextEntry,
};
use super::node::Node;
use super::retry::RetryPolicy;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// State graph: nodes plus explicit edges and optional routers.
///
/// **Interaction**: Accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Static edges (from_id, to_id), in insertion order.
    edges: Vec<(String, String)>,
    joins: Vec<JoinEdge>,
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
    fan_outs: HashMap<String, FanOutRouter<S>>,
    state_updater: Option<BoxedStateUpdater<S>>,
    retry_policy: RetryPolicy,
}

impl<S> Default for StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<S> StateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            joins: Vec::new(),
            conditional_edges: HashMap::new(),
            fan_outs: HashMap::new(),
            state_updater: None,
            retry_policy: RetryPolicy::none(),
        }
    }

    /// Attaches a custom state updater (default `ReplaceUpdater`).
    ///
    /// ```rust,ignore
    /// use skein::channels::{append, FieldBasedUpdater};
    ///
    /// let graph = StateGraph::<MyState>::new().with_state_updater(Arc::new(
    ///     FieldBasedUpdater::new(|c: &mut MyState, u: &MyState| append(&mut c.items, &u.items)),
    /// ));
    /// ```
    pub fn with_state_updater(self, updater: BoxedStateUpdater<S>) -> Self {
        Self {
            state_updater: Some(updater),
            ..self
        }
    }

    /// Attaches a retry policy for node execution (default: no retries).
    pub fn with_retry_policy(self, retry_policy: RetryPolicy) -> Self {
        Self {
            retry_policy,
            ..self
        }
    }

    /// Adds a node; replaces any node with the same id.
    pub fn add_node(&mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> &mut Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds a static edge. Several edges from the same source run their targets in parallel.
    pub fn add_edge(&mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> &mut Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Runs `target` once after every node in `sources` has completed.
    ///
    /// Sources may finish in different supersteps; the target waits for the last one.
    pub fn add_join_edge<I, T>(&mut self, sources: I, target: impl Into<String>) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.joins.push(JoinEdge {
            sources: sources.into_iter().map(Into::into).collect(),
            target: target.into(),
        });
        self
    }

    /// Adds conditional edges from `source`: after it runs, `path(state)` picks the next node.
    ///
    /// With `Some(path_map)` the returned key must be one of the map's keys; any other key
    /// fails the run with `UnreachableRoute`. With `None` the key is the next node id or END.
    ///
    /// ```rust,ignore
    /// graph.add_conditional_edges(
    ///     "think",
    ///     Arc::new(|s: &ReActState| tools_condition(s).as_str().to_string()),
    ///     Some([("tools".into(), "act".into()), (END.into(), END.into())].into_iter().collect()),
    /// );
    /// ```
    pub fn add_conditional_edges(
        &mut self,
        source: impl Into<String>,
        path: ConditionalRouterFn<S>,
        path_map: Option<HashMap<String, String>>,
    ) -> &mut Self {
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(path, path_map));
        self
    }

    /// Adds a dynamic fan-out from `source`: `dispatch(state)` returns one `SendTask` per
    /// unit of work, each naming one of `targets`.
    pub fn add_fan_out<I, T>(
        &mut self,
        source: impl Into<String>,
        dispatch: FanOutRouterFn<S>,
        targets: I,
    ) -> &mut Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let targets = targets.into_iter().map(Into::into).collect();
        self.fan_outs
            .insert(source.into(), FanOutRouter::new(dispatch, targets));
        self
    }

    fn check_node(&self, id: &str) -> Result<(), CompilationError> {
        if id == START || id == END || self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(CompilationError::NodeNotFound(id.to_string()))
        }
    }

    /// Validates the wiring and builds the executable graph.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        for (from, to) in &self.edges {
            self.check_node(from)?;
            self.check_node(to)?;
        }
        for join in &self.joins {
            for source in &join.sources {
                self.check_node(source)?;
            }
            self.check_node(&join.target)?;
        }
        for (source, router) in &self.conditional_edges {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(targets) = router.targets() {
                for target in targets {
                    if target != END && !self.nodes.contains_key(target) {
                        return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                    }
                }
            }
        }
        for (source, router) in &self.fan_outs {
            if !self.nodes.contains_key(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(bad) = router.targets.iter().find(|t| !self.nodes.contains_key(*t)) {
                return Err(CompilationError::InvalidFanOutTarget(bad.clone()));
            }
        }

        let start_targets: Vec<String> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t.clone())
            .collect();
        if start_targets.is_empty() {
            return Err(CompilationError::MissingStart);
        }

        let mut static_next: HashMap<String, Vec<String>> = HashMap::new();
        for (from, to) in self.edges.iter().filter(|(f, _)| f != START) {
            let targets = static_next.entry(from.clone()).or_default();
            if !targets.contains(to) {
                targets.push(to.clone());
            }
        }
        for source in self.conditional_edges.keys().chain(self.fan_outs.keys()) {
            if static_next.contains_key(source) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(
                    source.clone(),
                ));
            }
        }
        if let Some(both) = self
            .conditional_edges
            .keys()
            .find(|s| self.fan_outs.contains_key(*s))
        {
            return Err(CompilationError::NodeHasBothEdgeAndConditional(both.clone()));
        }

        let open_router = self
            .conditional_edges
            .values()
            .any(|r| r.targets().is_none());
        let has_end = open_router
            || self.edges.iter().any(|(_, t)| t == END)
            || self.joins.iter().any(|j| j.target == END)
            || self
                .conditional_edges
                .values()
                .filter_map(|r| r.targets())
                .any(|mut ts| ts.any(|t| t == END));
        if !has_end {
            return Err(CompilationError::MissingEnd);
        }
        if !self.end_reachable(&start_targets, &static_next) {
            return Err(CompilationError::EndUnreachable);
        }

        let fan_out_targets: HashSet<&String> =
            self.fan_outs.values().flat_map(|r| r.targets.iter()).collect();
        if !fan_out_targets.is_empty() && self.state_updater.is_none() {
            tracing::warn!(
                "graph has fan-out edges but uses ReplaceUpdater; parallel outputs will overwrite each other"
            );
        }

        let mut next_map: HashMap<String, NextEntry<S>> = static_next
            .into_iter()
            .map(|(from, targets)| (from, NextEntry::Edges(targets)))
            .collect();
        for (source, router) in self.conditional_edges {
            next_map.insert(source, NextEntry::Conditional(router));
        }
        for (source, router) in self.fan_outs {
            next_map.insert(source, NextEntry::FanOut(router));
        }

        let state_updater = self
            .state_updater
            .unwrap_or_else(|| Arc::new(ReplaceUpdater));

        Ok(CompiledStateGraph {
            nodes: Arc::new(self.nodes),
            start_targets,
            next_map: Arc::new(next_map),
            joins: Arc::new(self.joins),
            state_updater,
            retry_policy: self.retry_policy,
        })
    }

    /// Breadth-first walk over every declared route from START. A node routed without a
    /// path map may pick END itself, so reaching one counts as reaching END.
    fn end_reachable(
        &self,
        start_targets: &[String],
        static_next: &HashMap<String, Vec<String>>,
    ) -> bool {
        let mut seen: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = start_targets.iter().cloned().collect();
        while let Some(id) = queue.pop_front() {
            if id == END {
                return true;
            }
            if !seen.insert(id.clone()) {
                continue;
            }
            let mut successors: Vec<String> = Vec::new();
            if let Some(targets) = static_next.get(&id) {
                successors.extend(targets.iter().cloned());
            }
            if let Some(router) = self.conditional_edges.get(&id) {
                match router.targets() {
                    Some(targets) => successors.extend(targets.cloned()),
                    None => return true,
                }
            }
            if let Some(router) = self.fan_outs.get(&id) {
                successors.extend(router.targets.iter().cloned());
            }
            for join in self.joins.iter().filter(|j| j.sources.contains(&id)) {
                successors.push(join.target.clone());
            }
            queue.extend(successors);
        }
        false
    }
}
