//! Disposal trait for host-owned resources.

use crate::error::HostError;

/// Trait for resources that can be torn down.
///
/// Host objects such as terminals and status bar items implement this trait
/// so that they can be wrapped into a [`Disposable`](crate::Disposable) and
/// tracked by a [`DisposableRegistry`](crate::DisposableRegistry).
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::{Dispose, Disposable, DisposableKind, DisposableRegistry, HostError};
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// struct Panel {
///     closed: AtomicBool,
/// }
///
/// impl Dispose for Panel {
///     fn dispose(&self) -> Result<(), HostError> {
///         self.closed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let panel = Arc::new(Panel { closed: AtomicBool::new(false) });
/// let registry = DisposableRegistry::new();
/// registry.register(Disposable::from_dispose(DisposableKind::Widget, "panel", panel.clone()));
///
/// registry.release_all();
/// assert!(panel.closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release the resource.
    fn dispose(&self) -> Result<(), HostError>;
}
