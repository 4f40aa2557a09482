//! Stream modes and events emitted by `CompiledStateGraph::stream`.

use std::fmt::Debug;

/// Which kinds of events to emit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamMode {
    /// Full merged state after each superstep.
    Values,
    /// Each task's output, with its node id.
    Updates,
    /// Task start/end events.
    Tasks,
}

#[derive(Clone, Debug)]
pub enum StreamEvent<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    Values(S),
    Updates {
        node_id: String,
        state: S,
    },
    TaskStart {
        node_id: String,
    },
    /// `Ok(())` on success, `Err(message)` when the task failed.
    TaskEnd {
        node_id: String,
        result: Result<(), String>,
    },
}

impl<S> StreamEvent<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// The mode that must be enabled for this event to be sent.
    pub fn mode(&self) -> StreamMode {
        match self {
            StreamEvent::Values(_) => StreamMode::Values,
            StreamEvent::Updates { .. } => StreamMode::Updates,
            StreamEvent::TaskStart { .. } | StreamEvent::TaskEnd { .. } => StreamMode::Tasks,
        }
    }
}
