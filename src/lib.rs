//! # plugin-lifecycle
//!
//! Disposable-registry lifecycle for IDE extension-host plugins.
//!
//! ## Features
//!
//! - **LIFO teardown**: resources are released last-acquired-first
//! - **Exactly once**: every registered disposable is released once, including
//!   disposables registered while the registry is being drained
//! - **Failure isolation**: a release action that errors or panics never stops
//!   the remaining releases
//! - **Cancellable continuations**: timers and async follow-ups started by
//!   command handlers are cancelled on deactivation
//! - **Host abstraction**: commands, notifications, terminals and status bar
//!   items are consumed through the [`host::Host`] trait
//!
//! ## Quick Start
//!
//! ```rust
//! use plugin_lifecycle::{Disposable, DisposableRegistry};
//! use std::sync::{Arc, Mutex};
//!
//! let order = Arc::new(Mutex::new(Vec::new()));
//! let registry = DisposableRegistry::new();
//!
//! for name in ["command", "subscription", "widget"] {
//!     let order = order.clone();
//!     registry.register(Disposable::from_fn(name, move || order.lock().unwrap().push(name)));
//! }
//!
//! registry.release_all();
//! assert_eq!(*order.lock().unwrap(), vec!["widget", "subscription", "command"]);
//!
//! // Draining again is a no-op.
//! assert!(registry.release_all().is_empty());
//! ```
//!
//! ## Plugins
//!
//! ```rust
//! use plugin_lifecycle::{LifecycleConfig, LifecycleState, PluginHandle};
//! use plugin_lifecycle::host::RecordingHost;
//! use plugin_lifecycle::sample::SamplePlugin;
//! use std::sync::Arc;
//!
//! let host = RecordingHost::new();
//! let handle = PluginHandle::new(SamplePlugin::new(), Arc::new(host.clone()), LifecycleConfig::default());
//!
//! handle.activate().unwrap();
//! assert_eq!(host.registered_commands().len(), plugin_lifecycle::commands::ALL.len());
//!
//! let report = handle.deactivate();
//! assert!(report.is_clean());
//! assert!(host.registered_commands().is_empty());
//! assert_eq!(handle.state(), LifecycleState::Deactivated);
//! ```

pub mod cancellation;
pub mod commands;
pub mod config;
pub mod disposable;
pub mod error;
pub mod host;
pub mod observer;
pub mod plugin;
pub mod registry;
pub mod sample;
pub mod scheduler;
pub mod traits;

// Internal modules
mod internal;

pub use cancellation::CancellationToken;
pub use config::LifecycleConfig;
pub use disposable::{Disposable, DisposableKind, ReleaseFn};
pub use error::{HostError, LifecycleError, LifecycleResult};
pub use observer::{LifecycleObserver, LoggingObserver};
pub use plugin::{LifecycleState, Plugin, PluginContext, PluginHandle};
pub use registry::{DisposableRegistry, DrainReport, ReleaseFailure, ReleasedEntry};
pub use scheduler::Scheduler;
pub use traits::Dispose;
