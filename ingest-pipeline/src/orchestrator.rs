//! Bounded worker pool that dispatches one task future per work item
//! (`spec.md` §4.6). A [`tokio::sync::Semaphore`] stands in for the
//! original thread pool's `max_workers`; a [`CancellationToken`] is the
//! abortable global stop signal the rate limiter's waits must also respect.

use crate::status::{RunSummary, TaskStatus};
use futures::stream::{FuturesUnordered, StreamExt};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct Orchestrator {
    workers: usize,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// A token workers can race against their own suspension points
    /// (rate-limiter sleeps, HTTP calls) to abort promptly (`spec.md` §5).
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Runs `task` once per item, at most `workers` concurrently. Items are
    /// submitted eagerly; ordering between them is not guaranteed
    /// (`spec.md` §4.6). A cancellation observed before a work item starts
    /// skips it outright rather than running it to get a `FATAL_ERROR`.
    pub async fn run<T, F, Fut>(&self, items: Vec<T>, task: F) -> RunSummary
    where
        T: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TaskStatus> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let task = Arc::new(task);
        let mut in_flight = FuturesUnordered::new();
        let mut summary = RunSummary::new();

        for item in items {
            if self.cancel.is_cancelled() {
                break;
            }

            let semaphore = semaphore.clone();
            let task = task.clone();
            let cancel = self.cancel.clone();

            in_flight.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return TaskStatus::FatalError;
                };
                if cancel.is_cancelled() {
                    return TaskStatus::FatalError;
                }
                task(item).await
            }));
        }

        while let Some(result) = in_flight.next().await {
            match result {
                Ok(status) => summary.record(status),
                Err(join_error) => {
                    tracing::error!(%join_error, "task panicked");
                    summary.record(TaskStatus::FatalError);
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_every_item_and_tallies_results() {
        let orchestrator = Orchestrator::new(2);
        let items = vec![1, 2, 3, 4, 5];
        let summary = orchestrator
            .run(items, |n| async move {
                if n % 2 == 0 {
                    TaskStatus::Success
                } else {
                    TaskStatus::SuccessNoData
                }
            })
            .await;

        assert_eq!(summary.total(), 5);
        assert_eq!(summary.count(TaskStatus::Success), 2);
        assert_eq!(summary.count(TaskStatus::SuccessNoData), 3);
    }

    #[tokio::test]
    async fn cancellation_before_dispatch_skips_remaining_items() {
        let orchestrator = Orchestrator::new(1);
        orchestrator.cancel();
        let summary = orchestrator.run(vec![1, 2, 3], |_| async move { TaskStatus::Success }).await;
        assert_eq!(summary.total(), 0);
    }
}
