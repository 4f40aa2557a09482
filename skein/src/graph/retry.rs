//! Node retry: which failures a graph re-runs, how often, and how long it waits.
//!
//! Structural failures (unknown tool, unreachable route, runaway loop) and cancellation
//! are always final. What else is re-run depends on [`RetryOn`].

use std::time::Duration;

use crate::error::AgentError;

/// Pause before each re-run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles after every attempt, capped at `max`.
    Doubling { first: Duration, max: Duration },
}

/// Failures a [`RetryPolicy`] re-runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryOn {
    /// `Timeout` only.
    Timeouts,
    /// `Timeout` and `MalformedStructuredOutput`.
    #[default]
    Recoverable,
    /// Recoverable errors plus `ExecutionFailed`, e.g. a provider answering 5xx.
    ExecutionErrors,
}

/// Per-node retry policy. The default never retries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    retries: usize,
    backoff: Backoff,
    retry_on: RetryOn,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            retries: 0,
            backoff: Backoff::Fixed(Duration::ZERO),
            retry_on: RetryOn::default(),
        }
    }

    pub fn fixed(retries: usize, interval: Duration) -> Self {
        Self {
            retries,
            backoff: Backoff::Fixed(interval),
            retry_on: RetryOn::default(),
        }
    }

    pub fn doubling(retries: usize, first: Duration, max: Duration) -> Self {
        Self {
            retries,
            backoff: Backoff::Doubling { first, max },
            retry_on: RetryOn::default(),
        }
    }

    pub fn on(mut self, retry_on: RetryOn) -> Self {
        self.retry_on = retry_on;
        self
    }

    /// Re-runs allowed after the first attempt.
    pub fn retries(&self) -> usize {
        self.retries
    }

    /// Delay before re-running after failure number `attempt` (0-based), or `None` when
    /// `err` is final.
    pub fn retry_after(&self, err: &AgentError, attempt: usize) -> Option<Duration> {
        if attempt >= self.retries || !self.covers(err) {
            return None;
        }
        Some(match self.backoff {
            Backoff::Fixed(interval) => interval,
            Backoff::Doubling { first, max } => 1u32
                .checked_shl(attempt as u32)
                .and_then(|factor| first.checked_mul(factor))
                .map_or(max, |d| d.min(max)),
        })
    }

    fn covers(&self, err: &AgentError) -> bool {
        match err {
            AgentError::Timeout(_) => true,
            AgentError::MalformedStructuredOutput(_) => self.retry_on != RetryOn::Timeouts,
            AgentError::ExecutionFailed(_) => self.retry_on == RetryOn::ExecutionErrors,
            AgentError::UnknownTool(_)
            | AgentError::UnreachableRoute { .. }
            | AgentError::RunawayLoop { .. }
            | AgentError::Cancelled => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout() -> AgentError {
        AgentError::Timeout("slow".into())
    }

    #[test]
    fn none_never_retries() {
        assert_eq!(RetryPolicy::none().retry_after(&timeout(), 0), None);
    }

    #[test]
    fn fixed_stops_after_its_retries() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(5));
        assert_eq!(policy.retry_after(&timeout(), 1), Some(Duration::from_millis(5)));
        assert_eq!(policy.retry_after(&timeout(), 2), None);
    }

    #[test]
    fn doubling_caps_at_max() {
        let policy = RetryPolicy::doubling(40, Duration::from_secs(1), Duration::from_secs(5));
        assert_eq!(policy.retry_after(&timeout(), 0), Some(Duration::from_secs(1)));
        assert_eq!(policy.retry_after(&timeout(), 2), Some(Duration::from_secs(4)));
        assert_eq!(policy.retry_after(&timeout(), 3), Some(Duration::from_secs(5)));
        assert_eq!(policy.retry_after(&timeout(), 35), Some(Duration::from_secs(5)));
    }

    /// **Scenario**: Which failures each `RetryOn` re-runs; structural ones never are.
    #[test]
    fn retry_on_selects_failures() {
        let malformed = AgentError::MalformedStructuredOutput("x".into());
        let failed = AgentError::ExecutionFailed("503".into());
        let base = RetryPolicy::fixed(1, Duration::ZERO);

        let timeouts = base.clone().on(RetryOn::Timeouts);
        assert!(timeouts.retry_after(&timeout(), 0).is_some());
        assert!(timeouts.retry_after(&malformed, 0).is_none());

        assert!(base.retry_after(&malformed, 0).is_some());
        assert!(base.retry_after(&failed, 0).is_none());

        let any = base.on(RetryOn::ExecutionErrors);
        assert!(any.retry_after(&failed, 0).is_some());
        for fatal in [
            AgentError::UnknownTool("t".into()),
            AgentError::UnreachableRoute {
                node: "r".into(),
                route: "x".into(),
            },
            AgentError::RunawayLoop { limit: 3 },
            AgentError::Cancelled,
        ] {
            assert!(any.retry_after(&fatal, 0).is_none(), "{fatal:?}");
        }
    }
}
