//! Observers for registry lifecycle events.
//!
//! This module provides hooks for watching disposables being registered and
//! released, so that plugin teardown can be traced and debugged.

use std::sync::Arc;
use std::time::Duration;

use crate::disposable::DisposableKind;
use crate::error::LifecycleError;
use crate::registry::DrainReport;

/// Observer trait for registry events.
///
/// Observer calls are made synchronously while registering and draining.
/// Keep implementations lightweight; a slow observer slows down teardown.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::{Disposable, DisposableKind, DisposableRegistry, LifecycleError, LifecycleObserver};
/// use std::sync::{Arc, Mutex};
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct Trace(Mutex<Vec<String>>);
///
/// impl LifecycleObserver for Trace {
///     fn registered(&self, kind: DisposableKind, label: &str, _position: usize) {
///         self.0.lock().unwrap().push(format!("+{}:{}", kind, label));
///     }
///
///     fn released(&self, kind: DisposableKind, label: &str, _duration: Duration) {
///         self.0.lock().unwrap().push(format!("-{}:{}", kind, label));
///     }
///
///     fn release_failed(&self, _kind: DisposableKind, label: &str, _error: &LifecycleError) {
///         self.0.lock().unwrap().push(format!("!{}", label));
///     }
/// }
///
/// let trace = Arc::new(Trace::default());
/// let registry = DisposableRegistry::new();
/// registry.add_observer(trace.clone());
/// registry.register(Disposable::noop("a"));
/// registry.release_all();
///
/// assert_eq!(*trace.0.lock().unwrap(), vec!["+custom:a", "-custom:a"]);
/// ```
pub trait LifecycleObserver: Send + Sync {
    /// Called after a disposable was appended.
    ///
    /// `position` is the zero-based index of the new entry.
    fn registered(&self, kind: DisposableKind, label: &str, position: usize);

    /// Called after a release action completed successfully.
    fn released(&self, kind: DisposableKind, label: &str, duration: Duration);

    /// Called when a release action returned an error or panicked.
    ///
    /// Draining continues after this call.
    fn release_failed(&self, kind: DisposableKind, label: &str, error: &LifecycleError);

    /// Called once a drain has emptied the registry.
    fn drained(&self, report: &DrainReport) {
        let _ = report;
    }
}

/// Container for registered observers.
#[derive(Clone, Default)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn LifecycleObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    #[inline]
    pub(crate) fn registered(&self, kind: DisposableKind, label: &str, position: usize) {
        for observer in &self.observers {
            observer.registered(kind, label, position);
        }
    }

    #[inline]
    pub(crate) fn released(&self, kind: DisposableKind, label: &str, duration: Duration) {
        for observer in &self.observers {
            observer.released(kind, label, duration);
        }
    }

    #[inline]
    pub(crate) fn release_failed(&self, kind: DisposableKind, label: &str, error: &LifecycleError) {
        for observer in &self.observers {
            observer.release_failed(kind, label, error);
        }
    }

    #[inline]
    pub(crate) fn drained(&self, report: &DrainReport) {
        for observer in &self.observers {
            observer.drained(report);
        }
    }
}

/// Built-in observer that forwards events to the `log` facade.
///
/// Registrations and successful releases are logged at `debug`, failures at
/// `warn`, and the drain summary at `info`.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::{DisposableRegistry, LoggingObserver};
/// use std::sync::Arc;
///
/// let registry = DisposableRegistry::new();
/// registry.add_observer(Arc::new(LoggingObserver::with_prefix("[my-plugin]")));
/// ```
pub struct LoggingObserver {
    prefix: String,
}

impl LoggingObserver {
    /// Creates a new logging observer with default prefix.
    pub fn new() -> Self {
        Self {
            prefix: "[plugin-lifecycle]".to_string(),
        }
    }

    /// Creates a new logging observer with a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl LifecycleObserver for LoggingObserver {
    fn registered(&self, kind: DisposableKind, label: &str, position: usize) {
        log::debug!("{} registered {} {} at #{}", self.prefix, kind, label, position);
    }

    fn released(&self, kind: DisposableKind, label: &str, duration: Duration) {
        log::debug!("{} released {} {} in {:?}", self.prefix, kind, label, duration);
    }

    fn release_failed(&self, kind: DisposableKind, label: &str, error: &LifecycleError) {
        log::warn!("{} release of {} {} failed: {}", self.prefix, kind, label, error);
    }

    fn drained(&self, report: &DrainReport) {
        log::info!(
            "{} drained {} disposables ({} failed)",
            self.prefix,
            report.attempted(),
            report.failures().len()
        );
    }
}
