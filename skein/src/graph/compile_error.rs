//! Graph compilation error.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Returned by `StateGraph::compile()` when the graph's wiring cannot run: an edge names
/// an unknown node, routes are declared twice, or END cannot be reached from START.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// A node id in an edge was not registered via `add_node` (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("graph must have at least one edge from START")]
    MissingStart,

    /// No edge, path-map entry or router can lead to END.
    #[error("graph has no edge to END")]
    MissingEnd,

    /// END exists as a target but cannot be reached from START.
    #[error("END is not reachable from START")]
    EndUnreachable,

    /// A node has static edges and a conditional or fan-out router; it must pick one.
    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),

    /// A value in a conditional path_map is not a valid node id or END.
    #[error("conditional path_map invalid target: {0}")]
    InvalidConditionalPathMap(String),

    /// A declared fan-out target is not a registered node.
    #[error("fan-out invalid target: {0}")]
    InvalidFanOutTarget(String),
}
