//! Plugin activation and deactivation.
//!
//! A [`Plugin`] acquires resources in [`Plugin::activate`] and hands their
//! disposables to its [`PluginContext`]. [`PluginHandle`] drives the two
//! lifecycle entry points exactly once each and drains the context's
//! registry on deactivation.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::LifecycleConfig;
use crate::disposable::Disposable;
use crate::error::{LifecycleError, LifecycleResult};
use crate::host::Host;
use crate::registry::{DisposableRegistry, DrainReport};
use crate::scheduler::Scheduler;

/// Lifecycle phase of a plugin.
///
/// Phases only move forward: `Inactive → Active → Deactivated`, or
/// `Inactive → Deactivated` when activation fails or never happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, `activate` not yet called
    Inactive,
    /// `activate` succeeded; resources are being tracked
    Active,
    /// Torn down; the registry has been drained and is not reused
    Deactivated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Inactive => "inactive",
            LifecycleState::Active => "active",
            LifecycleState::Deactivated => "deactivated",
        })
    }
}

/// The two entry points a plugin exposes to the host.
pub trait Plugin: Send + Sync {
    /// Identifier used in logs.
    fn id(&self) -> &str;

    /// Acquire resources and register their disposables with `ctx`.
    fn activate(&self, ctx: &PluginContext) -> LifecycleResult<()>;

    /// Extra teardown run before the registry is drained.
    fn deactivate(&self, ctx: &PluginContext) -> LifecycleResult<()> {
        let _ = ctx;
        Ok(())
    }
}

/// Everything a plugin needs while it is active.
///
/// Cloning is cheap; clones share the registry, scheduler and host. Command
/// handlers usually capture a clone so they can register late resources.
#[derive(Clone)]
pub struct PluginContext {
    host: Arc<dyn Host>,
    subscriptions: Arc<DisposableRegistry>,
    scheduler: Scheduler,
    config: Arc<LifecycleConfig>,
}

impl PluginContext {
    pub fn new(host: Arc<dyn Host>, config: LifecycleConfig) -> Self {
        Self {
            host,
            subscriptions: Arc::new(DisposableRegistry::new()),
            scheduler: Scheduler::new(),
            config: Arc::new(config),
        }
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    /// The registry drained on deactivation.
    pub fn subscriptions(&self) -> &Arc<DisposableRegistry> {
        &self.subscriptions
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Returns true once deactivation has started.
    pub fn is_closed(&self) -> bool {
        self.subscriptions.is_sealed()
    }

    /// Tracks `disposable` until deactivation.
    ///
    /// After deactivation has started nothing would drain the registry again,
    /// so the disposable is released on the spot instead. The check and the
    /// append happen under the registry's lock, so a continuation racing with
    /// deactivation cannot slip an entry past the final drain.
    pub fn subscribe(&self, disposable: Disposable) {
        self.subscriptions.register(disposable);
    }

    fn close(&self) {
        self.subscriptions.seal();
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("subscriptions", &self.subscriptions)
            .field("pending", &self.scheduler.pending())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Owns a plugin and its context and enforces the lifecycle order.
///
/// # Examples
///
/// ```
/// use plugin_lifecycle::{Disposable, LifecycleConfig, LifecycleResult, Plugin, PluginContext, PluginHandle};
/// use plugin_lifecycle::host::RecordingHost;
/// use std::sync::Arc;
///
/// struct Hello;
///
/// impl Plugin for Hello {
///     fn id(&self) -> &str { "hello" }
///
///     fn activate(&self, ctx: &PluginContext) -> LifecycleResult<()> {
///         ctx.subscribe(Disposable::noop("greeting"));
///         Ok(())
///     }
/// }
///
/// let handle = PluginHandle::new(Hello, Arc::new(RecordingHost::new()), LifecycleConfig::default());
/// handle.activate().unwrap();
/// assert_eq!(handle.deactivate().released_labels(), vec!["greeting"]);
/// assert!(handle.deactivate().is_empty());
/// ```
pub struct PluginHandle<P: Plugin> {
    plugin: P,
    ctx: PluginContext,
    state: Mutex<LifecycleState>,
}

impl<P: Plugin> PluginHandle<P> {
    pub fn new(plugin: P, host: Arc<dyn Host>, config: LifecycleConfig) -> Self {
        Self::with_context(plugin, PluginContext::new(host, config))
    }

    /// Uses a prepared context, e.g. one with observers on its registry.
    pub fn with_context(plugin: P, ctx: PluginContext) -> Self {
        Self {
            plugin,
            ctx,
            state: Mutex::new(LifecycleState::Inactive),
        }
    }

    pub fn plugin(&self) -> &P {
        &self.plugin
    }

    pub fn context(&self) -> &PluginContext {
        &self.ctx
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Runs the plugin's activation routine.
    ///
    /// If activation fails, whatever it registered so far is released and the
    /// plugin ends up [`LifecycleState::Deactivated`].
    ///
    /// # Errors
    ///
    /// [`LifecycleError::AlreadyActivated`] when called more than once, or
    /// [`LifecycleError::ActivationFailed`] when the routine fails.
    pub fn activate(&self) -> LifecycleResult<()> {
        {
            let mut state = self.state.lock();
            if *state != LifecycleState::Inactive {
                return Err(LifecycleError::AlreadyActivated);
            }
            *state = LifecycleState::Active;
        }

        log::info!("Activating plugin {}", self.plugin.id());
        match self.plugin.activate(&self.ctx) {
            Ok(()) => {
                log::info!(
                    "Plugin {} activated with {} disposables",
                    self.plugin.id(),
                    self.ctx.subscriptions.len()
                );
                Ok(())
            }
            Err(err) => {
                log::error!("Activation of {} failed: {}", self.plugin.id(), err);
                *self.state.lock() = LifecycleState::Deactivated;
                let report = self.teardown();
                log::info!("Rolled back {} disposables", report.attempted());
                Err(match err {
                    LifecycleError::ActivationFailed(msg) => LifecycleError::ActivationFailed(msg),
                    other => LifecycleError::ActivationFailed(other.to_string()),
                })
            }
        }
    }

    /// Tears the plugin down.
    ///
    /// The plugin's own hook runs first. Pending continuations are then
    /// cancelled (unless disabled in the configuration) and the registry is
    /// drained last-in-first-out. Calling this again, or before activation,
    /// releases nothing and returns an empty report.
    pub fn deactivate(&self) -> DrainReport {
        let previous = {
            let mut state = self.state.lock();
            std::mem::replace(&mut *state, LifecycleState::Deactivated)
        };

        match previous {
            LifecycleState::Active => {
                log::info!("Deactivating plugin {}", self.plugin.id());
                if let Err(err) = self.plugin.deactivate(&self.ctx) {
                    log::error!("Deactivate hook of {} failed: {}", self.plugin.id(), err);
                }
                let report = self.teardown();
                log::info!(
                    "Plugin {} deactivated: {} released, {} failed",
                    self.plugin.id(),
                    report.released().len(),
                    report.failures().len()
                );
                report
            }
            LifecycleState::Inactive => {
                log::debug!("Plugin {} deactivated before activation", self.plugin.id());
                self.ctx.close();
                DrainReport::default()
            }
            LifecycleState::Deactivated => {
                log::debug!("Plugin {} already deactivated", self.plugin.id());
                DrainReport::default()
            }
        }
    }

    fn teardown(&self) -> DrainReport {
        if self.ctx.config.cancel_pending_on_deactivate {
            self.ctx.scheduler.cancel_all();
        }
        self.ctx.close();
        self.ctx.subscriptions.release_all()
    }
}

impl<P: Plugin> Drop for PluginHandle<P> {
    fn drop(&mut self) {
        if *self.state.get_mut() == LifecycleState::Active {
            log::warn!(
                "Plugin {} dropped while active; {} disposables were never released",
                self.plugin.id(),
                self.ctx.subscriptions.len()
            );
        }
    }
}
