use plugin_lifecycle::host::RecordingHost;
use plugin_lifecycle::{
    Disposable, DisposableKind, LifecycleConfig, LifecycleError, LifecycleResult, LifecycleState,
    LoggingObserver, Plugin, PluginContext, PluginHandle,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::time::Duration;

/// Acquires an outer resource and an inner one that depends on it.
struct Nested {
    order: Arc<Mutex<Vec<&'static str>>>,
    hook_calls: Arc<AtomicUsize>,
}

impl Plugin for Nested {
    fn id(&self) -> &str {
        "nested"
    }

    fn activate(&self, ctx: &PluginContext) -> LifecycleResult<()> {
        for name in ["connection", "subscription", "widget"] {
            let order = self.order.clone();
            ctx.subscribe(Disposable::new(DisposableKind::Custom, name, move || {
                order.lock().unwrap().push(name);
                Ok(())
            }));
        }
        Ok(())
    }

    fn deactivate(&self, _ctx: &PluginContext) -> LifecycleResult<()> {
        self.hook_calls.fetch_add(1, Ordering::SeqCst);
        Err(LifecycleError::Host(plugin_lifecycle::HostError::new("hook failed")))
    }
}

fn nested() -> (PluginHandle<Nested>, Arc<Mutex<Vec<&'static str>>>, Arc<AtomicUsize>) {
    let order = Arc::new(Mutex::new(Vec::new()));
    let hook_calls = Arc::new(AtomicUsize::new(0));
    let plugin = Nested {
        order: order.clone(),
        hook_calls: hook_calls.clone(),
    };
    let handle = PluginHandle::new(plugin, Arc::new(RecordingHost::new()), LifecycleConfig::default());
    (handle, order, hook_calls)
}

#[test]
fn test_lifecycle_states_move_forward() {
    let (handle, order, _) = nested();
    assert_eq!(handle.state(), LifecycleState::Inactive);

    handle.activate().unwrap();
    assert_eq!(handle.state(), LifecycleState::Active);
    assert_eq!(handle.activate().unwrap_err(), LifecycleError::AlreadyActivated);

    handle.deactivate();
    assert_eq!(handle.state(), LifecycleState::Deactivated);
    assert_eq!(*order.lock().unwrap(), vec!["widget", "subscription", "connection"]);
}

#[test]
fn test_failing_deactivate_hook_still_drains() {
    let (handle, order, hook_calls) = nested();
    handle.activate().unwrap();

    let report = handle.deactivate();
    assert_eq!(report.attempted(), 3);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
    assert_eq!(order.lock().unwrap().len(), 3);

    // Hook and drain run once.
    assert!(handle.deactivate().is_empty());
    assert_eq!(hook_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_deactivate_before_activate_is_a_noop() {
    let (handle, order, hook_calls) = nested();
    assert!(handle.deactivate().is_empty());
    assert_eq!(handle.state(), LifecycleState::Deactivated);
    assert_eq!(hook_calls.load(Ordering::SeqCst), 0);
    assert!(order.lock().unwrap().is_empty());
    assert_eq!(handle.activate().unwrap_err(), LifecycleError::AlreadyActivated);
}

#[test]
fn test_observers_attached_to_a_prepared_context() {
    let _ = env_logger::builder().is_test(true).try_init();
    let ctx = PluginContext::new(Arc::new(RecordingHost::new()), LifecycleConfig::default());
    ctx.subscriptions().add_observer(Arc::new(LoggingObserver::with_prefix("[nested]")));

    let order = Arc::new(Mutex::new(Vec::new()));
    let plugin = Nested {
        order: order.clone(),
        hook_calls: Arc::new(AtomicUsize::new(0)),
    };
    let handle = PluginHandle::with_context(plugin, ctx);
    handle.activate().unwrap();
    assert!(handle.deactivate().is_clean());
    assert_eq!(order.lock().unwrap().len(), 3);
}

/// Schedules a timer during activation.
struct Timed {
    fired: Arc<AtomicBool>,
}

impl Plugin for Timed {
    fn id(&self) -> &str {
        "timed"
    }

    fn activate(&self, ctx: &PluginContext) -> LifecycleResult<()> {
        let fired = self.fired.clone();
        ctx.scheduler().schedule_after(Duration::from_secs(3), "tick", move || {
            fired.store(true, Ordering::SeqCst);
        })?;
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_pending_timers_are_cancelled_on_deactivate() {
    let fired = Arc::new(AtomicBool::new(false));
    let handle = PluginHandle::new(
        Timed { fired: fired.clone() },
        Arc::new(RecordingHost::new()),
        LifecycleConfig::default(),
    );
    handle.activate().unwrap();
    handle.deactivate();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(!fired.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_pending_timers_survive_when_cancellation_is_disabled() {
    let fired = Arc::new(AtomicBool::new(false));
    let handle = PluginHandle::new(
        Timed { fired: fired.clone() },
        Arc::new(RecordingHost::new()),
        LifecycleConfig::default().with_cancel_pending_on_deactivate(false),
    );
    handle.activate().unwrap();
    handle.deactivate();

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(fired.load(Ordering::SeqCst));
}

#[test]
fn test_activation_outside_a_runtime_fails_cleanly() {
    let fired = Arc::new(AtomicBool::new(false));
    let handle = PluginHandle::new(
        Timed { fired },
        Arc::new(RecordingHost::new()),
        LifecycleConfig::default(),
    );

    let err = handle.activate().unwrap_err();
    assert!(matches!(err, LifecycleError::ActivationFailed(msg) if msg.contains("no async runtime")));
    assert_eq!(handle.state(), LifecycleState::Deactivated);
}

#[test]
fn test_subscribe_racing_deactivate_never_leaks() {
    for _ in 0..200 {
        let (handle, _, _) = nested();
        handle.activate().unwrap();

        let released = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(2));
        let worker = {
            let ctx = handle.context().clone();
            let released = released.clone();
            let barrier = barrier.clone();
            std::thread::spawn(move || {
                barrier.wait();
                ctx.subscribe(Disposable::from_fn("late", move || {
                    released.fetch_add(1, Ordering::SeqCst);
                }));
            })
        };

        barrier.wait();
        handle.deactivate();
        worker.join().unwrap();

        // Either drained by deactivate or released on arrival, exactly once.
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert!(handle.context().subscriptions().is_empty());
    }
}
