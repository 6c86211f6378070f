//! Bounded fan-out/fan-in task groups
//!
//! A [`WorkerPool`] caps how many tasks run at once; it is shared by every phase of a run. Each
//! phase opens a [`TaskGroup`], dispatches one task per chunk of work, and then blocks in
//! [`TaskGroup::join`] until all of them have finished.
//!
//! Tasks never wait on each other and never share mutable state: each returns its own result and
//! the join collects them. Waiting can be interrupted through a
//! [`CancellationToken`]; the join then returns early with the results of the tasks that had
//! already completed and the rest are aborted when the group is dropped.
//!
//! An [`Interrupt`] hands out those tokens. Each interrupt ends one wait: a run interrupted while
//! matching still copies the matches found so far, and only a second interrupt stops the copy.
//!
//! ```
//! use common::pool::WorkerPool;
//! use std::num::NonZeroUsize;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let pool = WorkerPool::new(NonZeroUsize::new(4).unwrap());
//! let mut group = pool.task_group();
//! for n in 0..10u64 {
//!     group.spawn(async move { n * n });
//! }
//! let joined = group.join(&tokio_util::sync::CancellationToken::new()).await;
//! assert!(!joined.interrupted);
//! assert_eq!(joined.results.iter().sum::<u64>(), 285);
//! # }
//! ```

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;

/// Shared cap on concurrently running tasks.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
}

impl WorkerPool {
    pub fn new(size: NonZeroUsize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(size.get())),
        }
    }

    /// Number of workers currently idle.
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn task_group<T: Send + 'static>(&self) -> TaskGroup<T> {
        TaskGroup {
            permits: self.permits.clone(),
            join_set: JoinSet::new(),
            dispatched: 0,
        }
    }
}

/// Interruption of the wait in progress, e.g. on Ctrl-C.
///
/// [`Interrupt::trigger`] cancels the current token. The interrupt stays pending until
/// [`Interrupt::clear`], so one that arrives between two waits ends the next one. Clearing hands
/// out a fresh token, later waits are only ended by another trigger.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    current: Arc<std::sync::Mutex<CancellationToken>>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CancellationToken> {
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn trigger(&self) {
        self.lock().cancel();
    }

    /// Token to pass to the next [`TaskGroup::join`].
    pub fn token(&self) -> CancellationToken {
        self.lock().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_cancelled()
    }

    /// Acknowledge a pending interrupt.
    pub fn clear(&self) {
        let mut current = self.lock();
        if current.is_cancelled() {
            *current = CancellationToken::new();
        }
    }
}

/// Outcome of waiting on a [`TaskGroup`].
#[derive(Debug)]
pub struct Joined<T> {
    /// results of the tasks that completed, in completion order
    pub results: Vec<T>,
    /// number of tasks that were dispatched
    pub dispatched: usize,
    /// number of tasks that panicked
    pub panicked: usize,
    /// the wait was cancelled before every task completed
    pub interrupted: bool,
}

impl<T> Joined<T> {
    /// Tasks that neither completed nor panicked.
    pub fn unfinished(&self) -> usize {
        self.dispatched - self.results.len() - self.panicked
    }
}

/// One phase worth of tasks dispatched to a [`WorkerPool`].
#[derive(Debug)]
pub struct TaskGroup<T> {
    permits: Arc<Semaphore>,
    join_set: JoinSet<Result<T, JoinError>>,
    dispatched: usize,
}

impl<T: Send + 'static> TaskGroup<T> {
    /// Dispatch an async task. It starts once a worker is free.
    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permits = self.permits.clone();
        self.dispatched += 1;
        self.join_set.spawn(async move {
            // the semaphore is never closed, a missing permit only means an unbounded start
            let _permit = permits.acquire_owned().await.ok();
            Ok(task.await)
        });
    }

    /// Dispatch a CPU-bound task onto the blocking thread pool. It starts once a worker is free.
    pub fn spawn_blocking<F>(&mut self, task: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        let permits = self.permits.clone();
        self.dispatched += 1;
        self.join_set.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            tokio::task::spawn_blocking(task).await
        });
    }

    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Wait for every dispatched task, or until `cancel` fires.
    pub async fn join(mut self, cancel: &CancellationToken) -> Joined<T> {
        let mut joined = Joined {
            results: Vec::with_capacity(self.dispatched),
            dispatched: self.dispatched,
            panicked: 0,
            interrupted: false,
        };
        loop {
            let next = tokio::select! {
                biased;
                next = self.join_set.join_next() => next,
                _ = cancel.cancelled() => {
                    joined.interrupted = true;
                    break;
                }
            };
            match next {
                None => break,
                Some(Ok(Ok(result))) => joined.results.push(result),
                Some(Ok(Err(error)) | Err(error)) => {
                    tracing::error!("task failed: {}", error);
                    joined.panicked += 1;
                }
            }
        }
        if joined.interrupted {
            // collect whatever already finished without waiting for the rest
            while let Some(next) = self.join_set.try_join_next() {
                match next {
                    Ok(Ok(result)) => joined.results.push(result),
                    Ok(Err(error)) | Err(error) => {
                        if !error.is_cancelled() {
                            tracing::error!("task failed: {}", error);
                            joined.panicked += 1;
                        }
                    }
                }
            }
            tracing::warn!(
                "wait interrupted: {} of {} tasks finished",
                joined.results.len() + joined.panicked,
                joined.dispatched
            );
        }
        joined
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tracing_test::traced_test;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn joins_all_tasks() {
        let pool = WorkerPool::new(size(3));
        let mut group = pool.task_group();
        for n in 0..20usize {
            if n % 2 == 0 {
                group.spawn(async move { n });
            } else {
                group.spawn_blocking(move || n);
            }
        }
        assert_eq!(group.dispatched(), 20);
        let joined = group.join(&CancellationToken::new()).await;
        assert!(!joined.interrupted);
        assert_eq!(joined.panicked, 0);
        assert_eq!(joined.unfinished(), 0);
        let mut results = joined.results;
        results.sort();
        assert_eq!(results, (0..20).collect::<Vec<_>>());
        assert_eq!(pool.available(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[traced_test]
    async fn never_exceeds_pool_size() {
        let pool = WorkerPool::new(size(2));
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut group = pool.task_group();
        for _ in 0..16 {
            let running = running.clone();
            let peak = peak.clone();
            group.spawn(async move {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                running.fetch_sub(1, Ordering::SeqCst);
            });
        }
        let joined = group.join(&CancellationToken::new()).await;
        assert_eq!(joined.results.len(), 16);
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert!(peak.load(Ordering::SeqCst) >= 1);
    }

    #[tokio::test]
    #[traced_test]
    async fn empty_group_joins_immediately() {
        let pool = WorkerPool::new(size(1));
        let joined = pool.task_group::<()>().join(&CancellationToken::new()).await;
        assert_eq!(joined.dispatched, 0);
        assert!(joined.results.is_empty());
        assert!(!joined.interrupted);
    }

    #[tokio::test]
    #[traced_test]
    async fn panicking_task_does_not_affect_siblings() {
        let pool = WorkerPool::new(size(2));
        let mut group = pool.task_group();
        group.spawn(async { 1 });
        group.spawn_blocking(|| -> i32 { panic!("boom") });
        group.spawn(async { 2 });
        let joined = group.join(&CancellationToken::new()).await;
        assert_eq!(joined.panicked, 1);
        let mut results = joined.results;
        results.sort();
        assert_eq!(results, vec![1, 2]);
        assert!(logs_contain("task failed"));
    }

    #[tokio::test]
    #[traced_test]
    async fn cancelled_join_returns_partial_results() {
        let pool = WorkerPool::new(size(4));
        let mut group = pool.task_group();
        group.spawn(async { "quick" });
        group.spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
            "slow"
        });
        let cancel = CancellationToken::new();
        let canceller = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                cancel.cancel();
            })
        };
        let joined = group.join(&cancel).await;
        canceller.await.unwrap();
        assert!(joined.interrupted);
        assert_eq!(joined.results, vec!["quick"]);
        assert_eq!(joined.unfinished(), 1);
        assert!(logs_contain("wait interrupted"));
    }

    #[test]
    fn interrupt_stays_pending_until_cleared() {
        let interrupt = Interrupt::new();
        let first = interrupt.token();
        assert!(!interrupt.is_pending());
        interrupt.trigger();
        assert!(first.is_cancelled());
        assert!(interrupt.is_pending());
        // a token taken after the trigger is already cancelled
        assert!(interrupt.token().is_cancelled());
        interrupt.clear();
        assert!(!interrupt.is_pending());
        let second = interrupt.token();
        assert!(!second.is_cancelled());
        // clearing without a pending interrupt keeps the token
        interrupt.clear();
        interrupt.clone().trigger();
        assert!(second.is_cancelled());
    }

    #[tokio::test]
    #[traced_test]
    async fn pre_cancelled_join_does_not_wait() {
        let pool = WorkerPool::new(size(1));
        let mut group = pool.task_group();
        group.spawn(async {
            tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
        });
        let cancel = CancellationToken::new();
        cancel.cancel();
        let joined = group.join(&cancel).await;
        assert!(joined.interrupted);
        assert!(joined.results.is_empty());
        assert_eq!(joined.unfinished(), 1);
    }
}
