//! Routing hint returned by a node alongside its state.

/// Next step after running a node.
///
/// - **Continue**: follow the node's outgoing edges (END if it has none).
/// - **Node(id)**: jump to the given node (e.g. reflect → generate in a refinement loop).
/// - **End**: this branch stops here.
///
/// Conditional and fan-out routers take precedence: when a node has one, its `Next` is
/// ignored.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Next {
    Continue,
    Node(String),
    End,
}
