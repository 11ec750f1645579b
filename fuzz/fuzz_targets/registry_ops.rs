#![no_main]

use libfuzzer_sys::fuzz_target;
use plugin_lifecycle::{Disposable, DisposableKind, DisposableRegistry, HostError};
use std::sync::{Arc, Mutex};

fuzz_target!(|data: &[u8]| {
    let registry = Arc::new(DisposableRegistry::new());
    let released = Arc::new(Mutex::new(Vec::new()));
    let mut registered = 0usize;

    // Each byte picks an operation: the low two bits choose what to do,
    // the rest is a tag for the new entry.
    for (index, byte) in data.iter().enumerate() {
        let log = released.clone();
        match byte % 4 {
            0 => {
                registry.register(Disposable::from_fn(format!("ok{}", index), move || {
                    log.lock().unwrap().push(index);
                }));
                registered += 1;
            }
            1 => {
                registry.register(Disposable::new(DisposableKind::Widget, format!("err{}", index), move || {
                    log.lock().unwrap().push(index);
                    Err(HostError::new("fuzzed failure"))
                }));
                registered += 1;
            }
            2 => {
                // Registers a child while being released.
                let child_registry = registry.clone();
                let child_log = log.clone();
                registry.register(Disposable::from_fn(format!("spawn{}", index), move || {
                    log.lock().unwrap().push(index);
                    child_registry.register(Disposable::from_fn("child", move || {
                        child_log.lock().unwrap().push(usize::MAX);
                    }));
                }));
                registered += 2;
            }
            _ => {
                let report = registry.release_all();
                assert!(registry.is_empty());
                assert_eq!(report.attempted(), registered);
                registered = 0;
            }
        }
    }

    let report = registry.release_all();
    assert_eq!(report.attempted(), registered);
    assert!(registry.release_all().is_empty());
});
