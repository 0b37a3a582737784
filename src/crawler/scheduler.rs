//! Admission gate for detail fetches
//!
//! A counting semaphore bounds how many detail fetches are in flight at
//! once. `fan_out` runs one task per item behind the gate and returns only
//! when every task has finished, so no fetch outlives the page that
//! scheduled it.

use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Default ceiling of simultaneous detail fetches
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 5;

/// Bounded fan-out of per-item tasks
pub struct Scheduler {
    gate: Arc<Semaphore>,
    limit: usize,
}

impl Scheduler {
    /// Creates a scheduler admitting at most `limit` tasks at once
    ///
    /// A limit of zero is raised to one.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            gate: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs `task` for every item, at most `limit` at a time
    ///
    /// Results come back in item order. An item gets `None` only if the gate
    /// was closed before it could be admitted.
    pub async fn fan_out<I, F, Fut>(&self, items: I, task: F) -> Vec<Option<Fut::Output>>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future,
    {
        let task = &task;
        let gated = items.into_iter().map(|item| async move {
            let _permit = match self.gate.acquire().await {
                Ok(permit) => permit,
                Err(e) => {
                    tracing::warn!("Admission gate closed: {}", e);
                    return None;
                }
            };
            Some(task(item).await)
        });

        join_all(gated).await
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CONCURRENT_FETCHES)
    }
}
