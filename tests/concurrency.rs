mod common;

use common::{Calls, MockFactory};
use scoped_handles::{LifecycleManager, LifecycleOptions};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn quiet() -> LifecycleOptions {
    LifecycleOptions::default().with_logging(false)
}

#[test]
fn concurrent_first_access_constructs_once() {
    const THREADS: usize = 16;

    let factory = Arc::new(MockFactory::new().slow(Duration::from_millis(20)));
    let calls = factory.calls.clone();
    let manager = Arc::new(LifecycleManager::new(factory, quiet().with_flush_on_close(true)));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                manager.primary().unwrap()
            })
        })
        .collect();

    let sessions: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(Calls::count(&calls.make_primary), 1);
    for session in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], session));
    }

    manager.close();
    assert_eq!(Calls::count(&calls.flush), 1);
    assert_eq!(Calls::count(&calls.release_primary), 1);
    assert_eq!(calls.events().last().map(String::as_str), Some("release-primary:1"));
}

#[test]
fn concurrent_access_to_both_kinds() {
    const THREADS: usize = 12;

    let factory = Arc::new(MockFactory::new().slow(Duration::from_millis(5)));
    let calls = factory.calls.clone();
    let manager = Arc::new(LifecycleManager::new(factory, quiet()));
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|i| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                if i % 2 == 0 {
                    manager.primary().unwrap().id
                } else {
                    manager.stateless().unwrap().id
                }
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
    assert_eq!(Calls::count(&calls.make_primary), 1);
    assert_eq!(Calls::count(&calls.make_stateless), 1);
}

#[test]
fn slow_primary_does_not_block_stateless() {
    let factory = Arc::new(MockFactory::new().slow(Duration::from_millis(300)));
    let manager = Arc::new(LifecycleManager::new(factory, quiet()));

    // Pre-build the stateless handle, then start a slow primary construction
    let reader = manager.stateless().unwrap();

    let builder = {
        let manager = manager.clone();
        thread::spawn(move || manager.primary().unwrap())
    };
    thread::sleep(Duration::from_millis(50));

    // The cached stateless handle comes back while primary is still being built
    let started = std::time::Instant::now();
    let again = manager.stateless().unwrap();
    assert!(started.elapsed() < Duration::from_millis(200));
    assert!(Arc::ptr_eq(&reader, &again));

    builder.join().unwrap();
}

#[test]
fn managers_for_different_units_are_isolated() {
    const UNITS: usize = 8;

    let factory = Arc::new(MockFactory::new());
    let calls = factory.calls.clone();
    let barrier = Arc::new(Barrier::new(UNITS));

    let handles: Vec<_> = (0..UNITS)
        .map(|_| {
            let factory = factory.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                let manager = LifecycleManager::new(factory, quiet());
                barrier.wait();
                let first = manager.primary().unwrap();
                let second = manager.primary().unwrap();
                assert!(Arc::ptr_eq(&first, &second));
                let id = first.id;
                manager.close();
                id
            })
        })
        .collect();

    let mut ids: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort_unstable();
    ids.dedup();

    assert_eq!(ids.len(), UNITS);
    assert_eq!(Calls::count(&calls.make_primary), UNITS);
    assert_eq!(Calls::count(&calls.release_primary), UNITS);
}

#[test]
fn close_during_construction_releases_the_new_handle() {
    let factory = Arc::new(MockFactory::new().slow(Duration::from_millis(100)));
    let calls = factory.calls.clone();
    let manager = Arc::new(LifecycleManager::new(factory, quiet()));

    let builder = {
        let manager = manager.clone();
        thread::spawn(move || manager.primary())
    };
    thread::sleep(Duration::from_millis(20));

    // close waits for the in-flight construction and then releases it
    manager.close();

    let built = builder.join().unwrap();
    assert!(built.is_ok());
    assert_eq!(Calls::count(&calls.make_primary), 1);
    assert_eq!(Calls::count(&calls.release_primary), 1);
    assert!(manager.primary().unwrap_err().is_disposed());
}

#[test]
fn concurrent_close_releases_once() {
    const THREADS: usize = 8;

    let factory = Arc::new(MockFactory::new());
    let calls = factory.calls.clone();
    let manager = Arc::new(LifecycleManager::new(factory, quiet().with_flush_on_close(true)));
    manager.primary().unwrap();
    manager.stateless().unwrap();
    let barrier = Arc::new(Barrier::new(THREADS));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                manager.close();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(Calls::count(&calls.flush), 1);
    assert_eq!(Calls::count(&calls.release_primary), 1);
    assert_eq!(Calls::count(&calls.release_stateless), 1);
}
