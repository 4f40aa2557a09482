//! Per-run configuration and context passed into nodes.
//!
//! Nothing here is global: every invocation builds its own `RunContext`, so one compiled
//! graph can serve concurrent runs.

use std::collections::HashSet;
use std::fmt::Debug;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::stream::{StreamEvent, StreamMode};

/// Default bound on supersteps per run.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Run configuration.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Maximum supersteps before the run fails with `RunawayLoop`.
    pub recursion_limit: usize,
    /// Per-task timeout; expiry fails the task with `Timeout`.
    pub node_timeout: Option<Duration>,
    /// Label used in logs.
    pub run_name: Option<String>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            node_timeout: None,
            run_name: None,
        }
    }
}

impl RunConfig {
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_node_timeout(mut self, timeout: Duration) -> Self {
        self.node_timeout = Some(timeout);
        self
    }

    pub fn with_run_name(mut self, name: impl Into<String>) -> Self {
        self.run_name = Some(name.into());
        self
    }
}

/// Run context passed into nodes via `Node::run_with_context`.
#[derive(Clone)]
pub struct RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub config: RunConfig,
    /// Current superstep, starting at 1 once the run begins.
    pub step: usize,
    pub cancel: CancellationToken,
    pub stream_tx: Option<mpsc::Sender<StreamEvent<S>>>,
    pub stream_mode: HashSet<StreamMode>,
}

impl<S> RunContext<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    pub fn new(config: RunConfig) -> Self {
        Self {
            config,
            step: 0,
            cancel: CancellationToken::new(),
            stream_tx: None,
            stream_mode: HashSet::new(),
        }
    }

    /// Uses an external token so the caller can cancel the run.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Sends `event` when a stream is attached and its mode is enabled.
    ///
    /// A dropped receiver is not an error; the run continues without a listener.
    pub async fn emit(&self, event: StreamEvent<S>) {
        if let Some(tx) = &self.stream_tx {
            if self.stream_mode.contains(&event.mode()) {
                let _ = tx.send(event).await;
            }
        }
    }
}
