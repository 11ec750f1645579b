//! Cancellation token support for deferred plugin work.
//!
//! Timers and async continuations started by command handlers hold a child
//! token of the plugin's root token, so deactivation can abort everything that
//! has not fired yet.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// A token that can be used to signal cancellation across async operations.
///
/// Cancelling a token cancels every child created from it.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let token = CancellationToken::new();
/// let child = token.child_token();
///
/// let waiter = tokio::spawn({
///     let child = child.clone();
///     async move { child.cancelled().await }
/// });
///
/// token.cancel();
/// waiter.await.unwrap();
/// assert!(child.is_cancelled());
/// # }
/// ```
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationTokenInner>,
}

struct CancellationTokenInner {
    cancelled: AtomicBool,
    notify: Notify,
    parent: Option<CancellationToken>,
    children: Mutex<Vec<Weak<CancellationTokenInner>>>,
}

impl CancellationTokenInner {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self::with_parent(None)
    }

    fn with_parent(parent: Option<CancellationToken>) -> Self {
        Self {
            inner: Arc::new(CancellationTokenInner {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                parent,
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Creates a child token that will be cancelled when either this token
    /// or the child itself is cancelled.
    ///
    /// ```
    /// use plugin_lifecycle::CancellationToken;
    ///
    /// let parent = CancellationToken::new();
    /// let child = parent.child_token();
    ///
    /// parent.cancel();
    /// assert!(child.is_cancelled());
    /// ```
    pub fn child_token(&self) -> Self {
        let child = Self::with_parent(Some(self.clone()));
        {
            let mut children = self.inner.children.lock();
            children.retain(|weak| weak.strong_count() > 0);
            children.push(Arc::downgrade(&child.inner));
        }
        // The parent may have been cancelled between creation and linking.
        if self.is_cancelled() {
            child.inner.cancel();
        }
        child
    }

    /// Cancels the token and all of its children.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Returns true if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }

        if let Some(ref parent) = self.inner.parent {
            return parent.is_cancelled();
        }

        false
    }

    /// Returns a future that completes when cancellation is requested.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
