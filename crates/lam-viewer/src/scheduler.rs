//! Timer abstraction for polling loops.

use std::time::Duration;

use async_trait::async_trait;

/// Suspends the calling task without blocking the event loop.
#[async_trait(?Send)]
pub trait Scheduler {
    async fn sleep(&self, duration: Duration);
}

/// Scheduler backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait(?Send)]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
