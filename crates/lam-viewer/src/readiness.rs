//! Mesh-readiness polling.
//!
//! A bounded retry state machine: `Pending` moves to `Ready` on the first
//! successful probe, or to `BestEffort` once the retry budget is spent.
//! Both outcomes are terminal and neither is an error.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::scheduler::Scheduler;

/// Timing and budget of a polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Wait before the first probe
    pub initial_delay: Duration,
    /// Wait between consecutive probes
    pub interval: Duration,
    /// Failed probes tolerated after the first one
    pub max_retries: u32,
}

impl RetryPolicy {
    pub fn new(initial_delay: Duration, interval: Duration, max_retries: u32) -> Self {
        Self {
            initial_delay,
            interval,
            max_retries,
        }
    }

    /// Probes performed when nothing ever becomes ready.
    pub fn total_probes(&self) -> u32 {
        self.max_retries + 1
    }

    /// Wall time until the budget runs out.
    pub fn worst_case(&self) -> Duration {
        self.initial_delay + self.interval * self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::ZERO, Duration::from_millis(200), 8)
    }
}

/// Poller state; `retries` counts failed probes so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    Pending { retries: u32 },
    Ready { retries: u32 },
    BestEffort { retries: u32 },
}

impl Readiness {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Readiness::Pending { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready { .. })
    }

    pub fn retries(&self) -> u32 {
        match self {
            Readiness::Pending { retries }
            | Readiness::Ready { retries }
            | Readiness::BestEffort { retries } => *retries,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadinessPoller {
    policy: RetryPolicy,
    state: Readiness,
}

impl ReadinessPoller {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            state: Readiness::Pending { retries: 0 },
        }
    }

    pub fn state(&self) -> Readiness {
        self.state
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Feed one probe result. Terminal states absorb further observations.
    pub fn observe(&mut self, ready: bool) -> Readiness {
        if let Readiness::Pending { retries } = self.state {
            self.state = if ready {
                Readiness::Ready { retries }
            } else if retries >= self.policy.max_retries {
                Readiness::BestEffort { retries }
            } else {
                Readiness::Pending {
                    retries: retries + 1,
                }
            };
        }
        self.state
    }

    /// Probe until terminal, sleeping through `scheduler` between probes.
    pub async fn run<S, F>(mut self, scheduler: &S, mut probe: F) -> Readiness
    where
        S: Scheduler + ?Sized,
        F: FnMut() -> bool,
    {
        scheduler.sleep(self.policy.initial_delay).await;
        loop {
            let state = self.observe(probe());
            trace!(?state, "Readiness probe");
            if state.is_terminal() {
                debug!(?state, "Readiness settled");
                return state;
            }
            scheduler.sleep(self.policy.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::scheduler::TokioScheduler;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_millis(200), Duration::from_millis(300), 8)
    }

    #[test]
    fn test_state_machine() {
        let mut poller = ReadinessPoller::new(RetryPolicy::new(Duration::ZERO, Duration::ZERO, 2));
        assert_eq!(poller.observe(false), Readiness::Pending { retries: 1 });
        assert_eq!(poller.observe(false), Readiness::Pending { retries: 2 });
        assert_eq!(poller.observe(false), Readiness::BestEffort { retries: 2 });
        // Terminal states absorb.
        assert_eq!(poller.observe(true), Readiness::BestEffort { retries: 2 });

        let mut poller = ReadinessPoller::new(RetryPolicy::default());
        assert_eq!(poller.observe(true), Readiness::Ready { retries: 0 });
        assert!(poller.state().is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_ready_exhausts_budget_exactly() {
        let probes = Cell::new(0);
        let start = tokio::time::Instant::now();

        let state = ReadinessPoller::new(policy())
            .run(&TokioScheduler, || {
                probes.set(probes.get() + 1);
                false
            })
            .await;

        assert_eq!(state, Readiness::BestEffort { retries: 8 });
        assert_eq!(probes.get(), policy().total_probes());
        assert_eq!(start.elapsed(), policy().worst_case());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_stops_early() {
        let probes = Cell::new(0);
        let start = tokio::time::Instant::now();

        let state = ReadinessPoller::new(policy())
            .run(&TokioScheduler, || {
                probes.set(probes.get() + 1);
                probes.get() == 3
            })
            .await;

        assert_eq!(state, Readiness::Ready { retries: 2 });
        assert_eq!(probes.get(), 3);
        assert_eq!(start.elapsed(), Duration::from_millis(200 + 2 * 300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_probes_once() {
        let probes = Cell::new(0);
        let state = ReadinessPoller::new(RetryPolicy::new(Duration::ZERO, Duration::ZERO, 0))
            .run(&TokioScheduler, || {
                probes.set(probes.get() + 1);
                false
            })
            .await;
        assert_eq!(state, Readiness::BestEffort { retries: 0 });
        assert_eq!(probes.get(), 1);
    }
}
