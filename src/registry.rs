//! The disposable registry: append during activation, LIFO drain on deactivation.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Mutex, RwLock};

use crate::disposable::{Disposable, DisposableKind};
use crate::error::LifecycleError;
use crate::internal::guarded_release;
use crate::observer::{LifecycleObserver, Observers};

/// Ordered holder of [`Disposable`]s.
///
/// Entries are kept in acquisition order. [`release_all`](Self::release_all)
/// pops and releases them last-in-first-out, re-checking for new entries after
/// every release, so disposables registered by a release action are drained
/// in the same call.
///
/// The internal lock is never held while a release action or an observer
/// runs. A release action may therefore capture an `Arc<DisposableRegistry>`
/// and call [`register`](Self::register) on it.
///
/// Once [`seal`](Self::seal)ed, the registry accepts nothing new: late
/// disposables are released on arrival instead of being stored where no
/// drain would reach them.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::{Disposable, DisposableRegistry};
/// use std::sync::{Arc, Mutex};
///
/// let order = Arc::new(Mutex::new(Vec::new()));
/// let registry = DisposableRegistry::new();
/// for name in ["A", "B", "C"] {
///     let order = order.clone();
///     registry.register(Disposable::from_fn(name, move || order.lock().unwrap().push(name)));
/// }
///
/// let report = registry.release_all();
/// assert_eq!(*order.lock().unwrap(), vec!["C", "B", "A"]);
/// assert_eq!(report.attempted(), 3);
/// assert!(registry.is_empty());
/// ```
#[derive(Default)]
pub struct DisposableRegistry {
    entries: Mutex<Entries>,
    observers: RwLock<Observers>,
}

#[derive(Default)]
struct Entries {
    items: Vec<Disposable>,
    sealed: bool,
}

impl DisposableRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches an observer notified of every registration and release.
    pub fn add_observer(&self, observer: Arc<dyn LifecycleObserver>) {
        self.observers.write().add(observer);
    }

    /// Appends a disposable.
    ///
    /// On a sealed registry the disposable is released immediately.
    pub fn register(&self, disposable: Disposable) {
        if let Err(late) = self.try_register(disposable) {
            log::warn!(
                "Registry sealed; releasing late {} {} immediately",
                late.kind(),
                late.label()
            );
            // Failures are already logged and reported to observers.
            let _ = self.release_one(late);
        }
    }

    /// Appends a disposable unless the registry is sealed.
    ///
    /// # Errors
    ///
    /// Hands `disposable` back when the registry has been sealed.
    pub fn try_register(&self, disposable: Disposable) -> Result<(), Disposable> {
        let observers = self.observer_snapshot();
        let kind = disposable.kind();
        let label = if observers.has_observers() { Some(disposable.label().to_string()) } else { None };

        let position = {
            let mut entries = self.entries.lock();
            if entries.sealed {
                return Err(disposable);
            }
            entries.items.push(disposable);
            entries.items.len() - 1
        };

        if let Some(label) = label {
            observers.registered(kind, &label, position);
        }
        Ok(())
    }

    /// Appends every disposable from `disposables`, in iteration order.
    pub fn register_all<I>(&self, disposables: I)
    where
        I: IntoIterator<Item = Disposable>,
    {
        for disposable in disposables {
            self.register(disposable);
        }
    }

    /// Stops accepting new entries.
    ///
    /// Entries already stored stay put until the next
    /// [`release_all`](Self::release_all).
    pub fn seal(&self) {
        self.entries.lock().sealed = true;
    }

    /// Returns true once [`seal`](Self::seal) has been called.
    pub fn is_sealed(&self) -> bool {
        self.entries.lock().sealed
    }

    /// Number of disposables waiting to be released.
    pub fn len(&self) -> usize {
        self.entries.lock().items.len()
    }

    /// Returns true if nothing is waiting to be released.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().items.is_empty()
    }

    /// Labels of pending entries, oldest first.
    pub fn labels(&self) -> Vec<String> {
        self.entries.lock().items.iter().map(|d| d.label().to_string()).collect()
    }

    /// Releases every entry, most recently registered first.
    ///
    /// Failing release actions (errors or panics) are recorded in the returned
    /// report and do not stop the drain. Calling this on an empty registry is
    /// a no-op that returns an empty report.
    pub fn release_all(&self) -> DrainReport {
        let mut report = DrainReport::default();

        loop {
            // Pop under the lock, release outside it.
            let next = self.entries.lock().items.pop();
            let Some(disposable) = next else { break };

            match self.release_one(disposable) {
                Ok(released) => report.released.push(released),
                Err(failure) => report.failures.push(failure),
            }
        }

        if !report.is_empty() {
            self.observer_snapshot().drained(&report);
        }
        report
    }

    fn release_one(&self, disposable: Disposable) -> Result<ReleasedEntry, ReleaseFailure> {
        let (kind, label, action) = disposable.into_parts();
        let started = Instant::now();
        match guarded_release(&label, action) {
            Ok(()) => {
                self.observer_snapshot().released(kind, &label, started.elapsed());
                Ok(ReleasedEntry { kind, label })
            }
            Err(error) => {
                log::warn!("Failed to release {} {}: {}", kind, label, error);
                self.observer_snapshot().release_failed(kind, &label, &error);
                Err(ReleaseFailure { kind, label, error })
            }
        }
    }

    // Callbacks run on a copy so observers may re-enter the registry.
    fn observer_snapshot(&self) -> Observers {
        self.observers.read().clone()
    }
}

impl std::fmt::Debug for DisposableRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposableRegistry")
            .field("pending", &self.len())
            .finish()
    }
}

/// A disposable that was released successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleasedEntry {
    pub kind: DisposableKind,
    pub label: String,
}

/// A disposable whose release action failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFailure {
    pub kind: DisposableKind,
    pub label: String,
    pub error: LifecycleError,
}

/// Outcome of one [`DisposableRegistry::release_all`] call.
///
/// Both lists are in release order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    released: Vec<ReleasedEntry>,
    failures: Vec<ReleaseFailure>,
}

impl DrainReport {
    /// Entries released successfully.
    pub fn released(&self) -> &[ReleasedEntry] {
        &self.released
    }

    /// Entries whose release failed.
    pub fn failures(&self) -> &[ReleaseFailure] {
        &self.failures
    }

    /// Labels of successfully released entries, in release order.
    pub fn released_labels(&self) -> Vec<&str> {
        self.released.iter().map(|e| e.label.as_str()).collect()
    }

    /// Number of release actions invoked.
    pub fn attempted(&self) -> usize {
        self.released.len() + self.failures.len()
    }

    /// True when no release action was invoked.
    pub fn is_empty(&self) -> bool {
        self.attempted() == 0
    }

    /// True when every invoked release action succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Appends `other` after this report's entries.
    pub fn merge(&mut self, other: DrainReport) {
        self.released.extend(other.released);
        self.failures.extend(other.failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HostError;

    #[test]
    fn empty_drain_reports_nothing() {
        let registry = DisposableRegistry::new();
        let report = registry.release_all();
        assert!(report.is_empty());
        assert!(report.is_clean());
    }

    #[test]
    fn labels_are_in_acquisition_order() {
        let registry = DisposableRegistry::new();
        registry.register_all(vec![Disposable::noop("one"), Disposable::noop("two")]);
        assert_eq!(registry.labels(), vec!["one", "two"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn sealed_registry_hands_entries_back() {
        let registry = DisposableRegistry::new();
        registry.register(Disposable::noop("early"));
        registry.seal();

        let late = registry.try_register(Disposable::noop("late")).unwrap_err();
        assert_eq!(late.label(), "late");
        assert!(registry.is_sealed());
        assert_eq!(registry.labels(), vec!["early"]);
        assert_eq!(registry.release_all().released_labels(), vec!["early"]);
    }

    #[test]
    fn merge_keeps_order() {
        let registry = DisposableRegistry::new();
        registry.register(Disposable::noop("x"));
        let mut first = registry.release_all();

        registry.register(Disposable::new(DisposableKind::Widget, "y", || {
            Err(HostError::new("stuck"))
        }));
        registry.register(Disposable::noop("z"));
        first.merge(registry.release_all());

        assert_eq!(first.released_labels(), vec!["x", "z"]);
        assert_eq!(first.failures()[0].label, "y");
        assert_eq!(first.attempted(), 3);
    }
}
