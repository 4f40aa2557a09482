//! Conditional and fan-out routing: choose the next node(s) from state.
//!
//! A conditional router maps state to a single key. With a path map, the key must be
//! one of the map's keys; an undeclared key is a fatal [`AgentError::UnreachableRoute`].
//! Without a path map, the key itself is the next node id (or END).
//!
//! A fan-out router maps state to any number of [`SendTask`]s, each running a declared
//! target node with its own sub-state.
//!
//! **Interaction**: Used by `StateGraph::add_conditional_edges` / `add_fan_out` and the
//! `CompiledStateGraph` superstep loop.

use std::collections::{HashMap, HashSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::AgentError;

/// Router function: takes a reference to state and returns a routing key.
pub type ConditionalRouterFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Fan-out router function: takes state and returns one task per unit of work.
pub type FanOutRouterFn<S> = Arc<dyn Fn(&S) -> Vec<SendTask<S>> + Send + Sync>;

/// One dynamically dispatched task: run `node` with `state` as its input.
#[derive(Debug, Clone)]
pub struct SendTask<S> {
    pub node: String,
    pub state: S,
}

impl<S> SendTask<S> {
    pub fn new(node: impl Into<String>, state: S) -> Self {
        Self {
            node: node.into(),
            state,
        }
    }
}

/// Conditional edge definition: routing function plus optional path map.
#[derive(Clone)]
pub struct ConditionalRouter<S> {
    pub(super) path: ConditionalRouterFn<S>,
    pub(super) path_map: Option<HashMap<String, String>>,
}

impl<S> ConditionalRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(path: ConditionalRouterFn<S>, path_map: Option<HashMap<String, String>>) -> Self {
        Self { path, path_map }
    }

    /// Resolves the next node id (or END) from the current state.
    ///
    /// `source` names the routing node in the error when the key is undeclared.
    pub fn resolve_next(&self, source: &str, state: &S) -> Result<String, AgentError> {
        let key = (self.path)(state);
        match &self.path_map {
            None => Ok(key),
            Some(map) => map
                .get(&key)
                .cloned()
                .ok_or_else(|| AgentError::UnreachableRoute {
                    node: source.to_string(),
                    route: key,
                }),
        }
    }

    /// Declared targets, when a path map was given.
    pub fn targets(&self) -> Option<impl Iterator<Item = &String>> {
        self.path_map.as_ref().map(|m| m.values())
    }
}

/// Fan-out edge definition: dispatch function plus the set of nodes it may target.
#[derive(Clone)]
pub struct FanOutRouter<S> {
    pub(super) dispatch: FanOutRouterFn<S>,
    pub(super) targets: HashSet<String>,
}

impl<S> FanOutRouter<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(dispatch: FanOutRouterFn<S>, targets: HashSet<String>) -> Self {
        Self { dispatch, targets }
    }

    /// Produces the tasks for this state; every task must target a declared node.
    pub fn dispatch(&self, source: &str, state: &S) -> Result<Vec<SendTask<S>>, AgentError> {
        let tasks = (self.dispatch)(state);
        if let Some(bad) = tasks.iter().find(|t| !self.targets.contains(&t.node)) {
            return Err(AgentError::UnreachableRoute {
                node: source.to_string(),
                route: bad.node.clone(),
            });
        }
        Ok(tasks)
    }
}

/// How to determine the next node(s) after a given node runs.
#[derive(Clone)]
pub enum NextEntry<S> {
    /// Static edges (zero or more; several form a fan-out). The node's `Next` is respected.
    Edges(Vec<String>),
    /// Next node decided by the router from state; the node's `Next` is ignored.
    Conditional(ConditionalRouter<S>),
    /// Next tasks produced by the fan-out router; the node's `Next` is ignored.
    FanOut(FanOutRouter<S>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_map_rejects_undeclared_key() {
        let router: ConditionalRouter<u32> = ConditionalRouter::new(
            Arc::new(|n| if *n > 1 { "big".into() } else { "dance".into() }),
            Some([("big".to_string(), "b".to_string())].into_iter().collect()),
        );
        assert_eq!(router.resolve_next("r", &2).unwrap(), "b");
        match router.resolve_next("r", &0) {
            Err(AgentError::UnreachableRoute { node, route }) => {
                assert_eq!(node, "r");
                assert_eq!(route, "dance");
            }
            other => panic!("expected UnreachableRoute, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn no_path_map_uses_key_as_node() {
        let router: ConditionalRouter<u32> = ConditionalRouter::new(Arc::new(|_| "x".into()), None);
        assert_eq!(router.resolve_next("r", &0).unwrap(), "x");
        assert!(router.targets().is_none());
    }

    #[test]
    fn fan_out_rejects_undeclared_target() {
        let router: FanOutRouter<u32> = FanOutRouter::new(
            Arc::new(|n| vec![SendTask::new("worker", *n), SendTask::new("rogue", *n)]),
            ["worker".to_string()].into_iter().collect(),
        );
        assert!(matches!(
            router.dispatch("plan", &1),
            Err(AgentError::UnreachableRoute { ref route, .. }) if route == "rogue"
        ));
    }
}
