//! Timeout enforcement.
//!
//! # Responsibilities
//! - Bound each probe attempt by its own timeout
//! - Bound a whole evaluation by an optional overall deadline
//! - Cancel outstanding attempts cleanly when the deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - An attempt cut off by the deadline yields `None`; callers count it as
//!   a failed probe

use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

/// Overall deadline shared by every probe of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No overall deadline; only per-attempt timeouts apply.
    pub fn none() -> Self {
        Self(None)
    }

    /// Deadline `after` from now.
    pub fn after(after: Duration) -> Self {
        Self(Some(Instant::now() + after))
    }

    /// Deadline from an optional duration.
    pub fn from_budget(budget: Option<Duration>) -> Self {
        budget.map(Self::after).unwrap_or_default()
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Run `fut` to completion unless the deadline passes first.
    pub async fn guard<F: Future>(&self, fut: F) -> Option<F::Output> {
        match self.0 {
            Some(at) => timeout_at(at, fut).await.ok(),
            None => Some(fut.await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_deadline_runs_to_completion() {
        let deadline = Deadline::none();
        assert!(!deadline.is_expired());
        assert_eq!(deadline.guard(async { 7 }).await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_cancels_slow_future() {
        let deadline = Deadline::after(Duration::from_millis(50));
        let slow = tokio::time::sleep(Duration::from_secs(5));

        assert_eq!(deadline.guard(slow).await, None);
        assert!(deadline.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_future_beats_deadline() {
        let deadline = Deadline::after(Duration::from_secs(1));
        let fast = async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            "done"
        };
        assert_eq!(deadline.guard(fast).await, Some("done"));
    }
}
