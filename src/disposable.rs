//! Cleanup handles for acquired plugin resources.

use std::fmt;
use std::sync::Arc;

use crate::error::HostError;
use crate::traits::Dispose;

/// Release action stored inside a [`Disposable`].
pub type ReleaseFn = Box<dyn FnOnce() -> Result<(), HostError> + Send>;

/// Kind of resource a [`Disposable`] stands for.
///
/// The kind carries no behavior; it tags the handle for logging, observers
/// and drain reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisposableKind {
    /// A registered command
    Command,
    /// An event subscription
    Subscription,
    /// A UI element such as a status bar item or message
    Widget,
    /// A terminal created through the host
    Terminal,
    /// A scheduled continuation
    Timer,
    /// A group of disposables released together
    Composite,
    /// Anything else
    Custom,
}

impl fmt::Display for DisposableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DisposableKind::Command => "command",
            DisposableKind::Subscription => "subscription",
            DisposableKind::Widget => "widget",
            DisposableKind::Terminal => "terminal",
            DisposableKind::Timer => "timer",
            DisposableKind::Composite => "composite",
            DisposableKind::Custom => "custom",
        };
        f.write_str(name)
    }
}

/// Opaque handle representing one acquired resource.
///
/// A disposable owns a single release action. Releasing consumes the handle,
/// so the action runs at most once. Dropping a disposable without releasing
/// it does **not** run the action; hand it to a
/// [`DisposableRegistry`](crate::DisposableRegistry) to get it released on
/// deactivation.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::{Disposable, DisposableKind};
/// use std::sync::{Arc, Mutex};
///
/// let log = Arc::new(Mutex::new(Vec::new()));
/// let log_clone = log.clone();
/// let d = Disposable::new(DisposableKind::Subscription, "on-close", move || {
///     log_clone.lock().unwrap().push("released");
///     Ok(())
/// });
///
/// assert_eq!(d.kind(), DisposableKind::Subscription);
/// assert_eq!(d.label(), "on-close");
/// d.release().unwrap();
/// assert_eq!(*log.lock().unwrap(), vec!["released"]);
/// ```
pub struct Disposable {
    kind: DisposableKind,
    label: String,
    action: ReleaseFn,
}

impl Disposable {
    /// Creates a disposable from a fallible release action.
    pub fn new<F>(kind: DisposableKind, label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() -> Result<(), HostError> + Send + 'static,
    {
        Self {
            kind,
            label: label.into(),
            action: Box::new(action),
        }
    }

    /// Creates a [`DisposableKind::Custom`] disposable from an infallible closure.
    pub fn from_fn<F>(label: impl Into<String>, action: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(DisposableKind::Custom, label, move || {
            action();
            Ok(())
        })
    }

    /// Wraps a shared resource implementing [`Dispose`].
    pub fn from_dispose<T>(kind: DisposableKind, label: impl Into<String>, resource: Arc<T>) -> Self
    where
        T: Dispose + ?Sized,
    {
        Self::new(kind, label, move || resource.dispose())
    }

    /// A disposable whose release does nothing.
    pub fn noop(label: impl Into<String>) -> Self {
        Self::new(DisposableKind::Custom, label, || Ok(()))
    }

    /// Combines several disposables into one.
    ///
    /// The members are released last-to-first. Every member is released even
    /// if an earlier one fails; the returned error lists all failures.
    ///
    /// ```
    /// use plugin_lifecycle::{Disposable, HostError};
    /// use std::sync::{Arc, Mutex};
    ///
    /// let order = Arc::new(Mutex::new(Vec::new()));
    /// let (o1, o2) = (order.clone(), order.clone());
    /// let group = Disposable::from_many("pair", vec![
    ///     Disposable::from_fn("first", move || o1.lock().unwrap().push(1)),
    ///     Disposable::from_fn("second", move || o2.lock().unwrap().push(2)),
    /// ]);
    /// group.release().unwrap();
    /// assert_eq!(*order.lock().unwrap(), vec![2, 1]);
    /// ```
    pub fn from_many(label: impl Into<String>, members: Vec<Disposable>) -> Self {
        Self::new(DisposableKind::Composite, label, move || {
            let mut members = members;
            let mut failures = Vec::new();
            while let Some(member) = members.pop() {
                let member_label = member.label.clone();
                if let Err(err) = member.release() {
                    failures.push(format!("{}: {}", member_label, err.message()));
                }
            }
            if failures.is_empty() {
                Ok(())
            } else {
                Err(HostError::new(failures.join("; ")))
            }
        })
    }

    /// The resource kind.
    pub fn kind(&self) -> DisposableKind {
        self.kind
    }

    /// The label given at construction.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Runs the release action, consuming the handle.
    pub fn release(self) -> Result<(), HostError> {
        (self.action)()
    }

    pub(crate) fn into_parts(self) -> (DisposableKind, String, ReleaseFn) {
        (self.kind, self.label, self.action)
    }
}

impl fmt::Debug for Disposable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposable")
            .field("kind", &self.kind)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}
