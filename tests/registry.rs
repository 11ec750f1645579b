use plugin_lifecycle::{
    Disposable, DisposableKind, DisposableRegistry, DrainReport, HostError, LifecycleError,
    LifecycleObserver,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder(order: &Arc<Mutex<Vec<String>>>, name: &str) -> Disposable {
    let order = order.clone();
    let name = name.to_string();
    Disposable::from_fn(name.clone(), move || order.lock().unwrap().push(name))
}

#[test]
fn test_releases_in_reverse_registration_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let registry = DisposableRegistry::new();

    registry.register(recorder(&order, "A"));
    registry.register(recorder(&order, "B"));
    registry.register(recorder(&order, "C"));
    assert_eq!(registry.len(), 3);

    let report = registry.release_all();

    assert_eq!(*order.lock().unwrap(), vec!["C", "B", "A"]);
    assert_eq!(report.released_labels(), vec!["C", "B", "A"]);
    assert_eq!(registry.len(), 0);
}

#[test]
fn test_second_drain_is_a_noop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = DisposableRegistry::new();

    let counter = calls.clone();
    registry.register(Disposable::from_fn("A", move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    let first = registry.release_all();
    let second = registry.release_all();

    assert_eq!(first.attempted(), 1);
    assert!(second.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reentrant_registration_is_drained_in_the_same_call() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let registry = Arc::new(DisposableRegistry::new());

    registry.register(recorder(&order, "outer"));

    let inner_registry = registry.clone();
    let inner_order = order.clone();
    registry.register(Disposable::from_fn("spawner", move || {
        inner_order.lock().unwrap().push("spawner".to_string());
        inner_registry.register(recorder(&inner_order, "late"));
    }));

    let report = registry.release_all();

    // "late" is pushed on top of "outer", so it goes before it.
    assert_eq!(*order.lock().unwrap(), vec!["spawner", "late", "outer"]);
    assert_eq!(report.attempted(), 3);
    assert!(registry.is_empty());
}

#[test]
fn test_failing_release_does_not_skip_siblings() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let registry = DisposableRegistry::new();

    registry.register(recorder(&order, "first"));
    registry.register(Disposable::new(DisposableKind::Subscription, "broken", || {
        Err(HostError::new("listener already removed"))
    }));
    registry.register(recorder(&order, "last"));

    let report = registry.release_all();

    assert_eq!(*order.lock().unwrap(), vec!["last", "first"]);
    assert!(!report.is_clean());
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.failures()[0].kind, DisposableKind::Subscription);
    assert_eq!(
        report.failures()[0].error,
        LifecycleError::ReleaseFailed {
            label: "broken".to_string(),
            message: "listener already removed".to_string(),
        }
    );
}

#[test]
fn test_panicking_release_does_not_skip_siblings() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let registry = DisposableRegistry::new();

    registry.register(recorder(&order, "A"));
    registry.register(Disposable::from_fn("panics", || panic!("widget vanished")));
    registry.register(recorder(&order, "C"));

    let report = registry.release_all();

    assert_eq!(*order.lock().unwrap(), vec!["C", "A"]);
    assert!(matches!(
        &report.failures()[0].error,
        LifecycleError::ReleasePanicked { label, message }
            if label == "panics" && message == "widget vanished"
    ));
    assert!(registry.is_empty());
}

#[test]
fn test_observer_sees_every_event() {
    #[derive(Default)]
    struct Events {
        log: Mutex<Vec<String>>,
        drains: AtomicUsize,
    }

    impl LifecycleObserver for Events {
        fn registered(&self, kind: DisposableKind, label: &str, position: usize) {
            self.log.lock().unwrap().push(format!("reg {} {} {}", kind, label, position));
        }

        fn released(&self, kind: DisposableKind, label: &str, _duration: Duration) {
            self.log.lock().unwrap().push(format!("rel {} {}", kind, label));
        }

        fn release_failed(&self, kind: DisposableKind, label: &str, _error: &LifecycleError) {
            self.log.lock().unwrap().push(format!("fail {} {}", kind, label));
        }

        fn drained(&self, report: &DrainReport) {
            assert_eq!(report.attempted(), 2);
            self.drains.fetch_add(1, Ordering::SeqCst);
        }
    }

    let events = Arc::new(Events::default());
    let registry = DisposableRegistry::new();
    registry.add_observer(events.clone());

    registry.register(Disposable::new(DisposableKind::Command, "cmd", || Ok(())));
    registry.register(Disposable::new(DisposableKind::Widget, "item", || {
        Err(HostError::new("gone"))
    }));
    registry.release_all();
    // Empty drains are not reported.
    registry.release_all();

    assert_eq!(
        *events.log.lock().unwrap(),
        vec![
            "reg command cmd 0",
            "reg widget item 1",
            "fail widget item",
            "rel command cmd",
        ]
    );
    assert_eq!(events.drains.load(Ordering::SeqCst), 1);
}

#[test]
fn test_composite_members_release_inside_the_drain() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let registry = DisposableRegistry::new();

    registry.register(recorder(&order, "before"));
    registry.register(Disposable::from_many(
        "group",
        vec![recorder(&order, "g1"), recorder(&order, "g2")],
    ));
    registry.register(recorder(&order, "after"));

    registry.release_all();
    assert_eq!(*order.lock().unwrap(), vec!["after", "g2", "g1", "before"]);
}

#[test]
fn test_concurrent_registration_and_drain_release_each_entry_once() {
    let registry = Arc::new(DisposableRegistry::new());
    let calls = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..4)
        .map(|worker| {
            let registry = registry.clone();
            let calls = calls.clone();
            std::thread::spawn(move || {
                for i in 0..250 {
                    let calls = calls.clone();
                    registry.register(Disposable::from_fn(format!("w{}-{}", worker, i), move || {
                        calls.fetch_add(1, Ordering::SeqCst);
                    }));
                    if i % 50 == 0 {
                        registry.release_all();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    registry.release_all();
    assert!(registry.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 1000);
}

#[test]
fn test_observers_may_reenter_the_registry() {
    struct Reentrant {
        registry: std::sync::Weak<DisposableRegistry>,
        counter: Arc<Counter>,
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl LifecycleObserver for Counter {
        fn registered(&self, _kind: DisposableKind, _label: &str, _position: usize) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }

        fn released(&self, _kind: DisposableKind, _label: &str, _duration: Duration) {}

        fn release_failed(&self, _kind: DisposableKind, _label: &str, _error: &LifecycleError) {}
    }

    impl LifecycleObserver for Reentrant {
        fn registered(&self, _kind: DisposableKind, label: &str, _position: usize) {
            if label == "first" {
                if let Some(registry) = self.registry.upgrade() {
                    registry.add_observer(self.counter.clone());
                }
            }
        }

        fn released(&self, _kind: DisposableKind, label: &str, _duration: Duration) {
            if label == "first" {
                if let Some(registry) = self.registry.upgrade() {
                    registry.register(Disposable::noop("from-observer"));
                }
            }
        }

        fn release_failed(&self, _kind: DisposableKind, _label: &str, _error: &LifecycleError) {}
    }

    let registry = Arc::new(DisposableRegistry::new());
    let counter = Arc::new(Counter::default());
    registry.add_observer(Arc::new(Reentrant {
        registry: Arc::downgrade(&registry),
        counter: counter.clone(),
    }));

    registry.register(Disposable::noop("first"));
    let report = registry.release_all();

    assert_eq!(report.released_labels(), vec!["first", "from-observer"]);
    // The counter was attached after "first" and saw only the late entry.
    assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    assert!(registry.is_empty());
}
