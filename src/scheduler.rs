//! Cancellable deferred continuations.
//!
//! Command handlers frequently defer work ("hide the terminal after three
//! seconds", "subscribe once the process id is known"). The [`Scheduler`]
//! runs that work on the tokio runtime and ties each task to a child of one
//! root [`CancellationToken`], so a plugin's deactivation can abort every
//! continuation that has not run yet.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use crate::cancellation::CancellationToken;
use crate::disposable::{Disposable, DisposableKind};
use crate::error::HostError;

/// Spawns deferred work that can be cancelled individually or all at once.
///
/// Cloning a scheduler yields a handle to the same root token and counter.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::Scheduler;
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let scheduler = Scheduler::new();
/// let fired = Arc::new(AtomicBool::new(false));
/// let flag = fired.clone();
///
/// let _timer = scheduler
///     .schedule_after(Duration::from_millis(10), "hide-terminal", move || {
///         flag.store(true, Ordering::SeqCst);
///     })
///     .unwrap();
///
/// scheduler.cancel_all();
/// tokio::time::sleep(Duration::from_millis(30)).await;
/// assert!(!fired.load(Ordering::SeqCst));
/// # }
/// ```
#[derive(Clone, Debug, Default)]
pub struct Scheduler {
    root: CancellationToken,
    pending: Arc<AtomicUsize>,
}

/// Decrements the pending counter when a task finishes or is dropped.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter.clone())
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Scheduler {
    /// Creates a scheduler with a fresh root token.
    pub fn new() -> Self {
        Self::default()
    }

    /// The root token; cancelling it is equivalent to [`cancel_all`](Self::cancel_all).
    pub fn token(&self) -> CancellationToken {
        self.root.clone()
    }

    /// Number of tasks that have been spawned and not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns true once [`cancel_all`](Self::cancel_all) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Cancels every task spawned through this scheduler.
    ///
    /// Tasks scheduled afterwards are cancelled immediately.
    pub fn cancel_all(&self) {
        if !self.root.is_cancelled() {
            log::debug!("Cancelling {} pending continuations", self.pending());
        }
        self.root.cancel();
    }

    /// Runs `action` after `delay` unless cancelled first.
    ///
    /// The returned [`DisposableKind::Timer`] disposable cancels this one task.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn schedule_after<F>(
        &self,
        delay: Duration,
        label: impl Into<String>,
        action: F,
    ) -> Result<Disposable, HostError>
    where
        F: FnOnce() + Send + 'static,
    {
        let label = label.into();
        let task_label = label.clone();
        self.spawn_cancellable(label, async move {
            tokio::time::sleep(delay).await;
            log::debug!("Timer {} fired after {:?}", task_label, delay);
            action();
        })
    }

    /// Runs an async continuation that is abandoned on cancellation.
    ///
    /// The future is dropped at its next suspension point after cancellation.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn spawn<Fut>(&self, label: impl Into<String>, future: Fut) -> Result<Disposable, HostError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn_cancellable(label.into(), future)
    }

    fn spawn_cancellable<Fut>(&self, label: String, future: Fut) -> Result<Disposable, HostError>
    where
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = Handle::try_current()
            .map_err(|_| HostError::new(format!("cannot schedule {}: no async runtime", label)))?;

        let token = self.root.child_token();
        let task_token = token.clone();
        let guard = PendingGuard::new(&self.pending);
        let task_label = label.clone();

        handle.spawn(async move {
            let _guard = guard;
            if task_token.is_cancelled() {
                return;
            }
            tokio::select! {
                _ = future => {}
                _ = task_token.cancelled() => {
                    log::debug!("Continuation {} cancelled", task_label);
                }
            }
        });

        Ok(Disposable::new(DisposableKind::Timer, label, move || {
            token.cancel();
            Ok(())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn scheduling_without_runtime_fails() {
        let scheduler = Scheduler::new();
        let err = scheduler
            .schedule_after(Duration::from_millis(1), "orphan", || {})
            .unwrap_err();
        assert!(err.message().contains("orphan"));
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timer_disposable_cancels_one_task() {
        let scheduler = Scheduler::new();
        let first = Arc::new(AtomicBool::new(false));
        let second = Arc::new(AtomicBool::new(false));

        let f = first.clone();
        let timer = scheduler
            .schedule_after(Duration::from_secs(3), "first", move || f.store(true, Ordering::SeqCst))
            .unwrap();
        let s = second.clone();
        let _other = scheduler
            .schedule_after(Duration::from_secs(3), "second", move || s.store(true, Ordering::SeqCst))
            .unwrap();

        timer.release().unwrap();
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert!(!first.load(Ordering::SeqCst));
        assert!(second.load(Ordering::SeqCst));
        assert_eq!(scheduler.pending(), 0);
    }
}
