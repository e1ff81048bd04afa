#![cfg(feature = "async")]

mod common;

use common::{Calls, MockFactory};
use scoped_handles::{HandleProvider, LifecycleError, LifecycleManager, LifecycleOptions};
use std::sync::Arc;
use std::time::Duration;

fn quiet() -> LifecycleOptions {
    LifecycleOptions::default().with_logging(false)
}

#[tokio::test]
async fn async_access_matches_sync_access() {
    let factory = Arc::new(MockFactory::new());
    let calls = factory.calls.clone();
    let manager = Arc::new(LifecycleManager::new(factory, quiet()));

    let session = manager.primary_async().await.unwrap();
    let reader = manager.stateless_async().await.unwrap();

    assert!(Arc::ptr_eq(&session, &manager.primary().unwrap()));
    assert!(Arc::ptr_eq(&reader, &manager.stateless().unwrap()));
    assert_eq!(Calls::count(&calls.make_primary), 1);
    assert_eq!(Calls::count(&calls.make_stateless), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_tasks_share_one_handle() {
    let factory = Arc::new(MockFactory::new().slow(Duration::from_millis(20)));
    let calls = factory.calls.clone();
    let manager = Arc::new(LifecycleManager::new(factory, quiet()));

    let tasks: Vec<_> = (0..10)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.primary_async().await.unwrap() })
        })
        .collect();

    let mut sessions = Vec::new();
    for task in tasks {
        sessions.push(task.await.unwrap());
    }

    assert_eq!(Calls::count(&calls.make_primary), 1);
    for session in &sessions[1..] {
        assert!(Arc::ptr_eq(&sessions[0], session));
    }
}

#[tokio::test]
async fn async_access_after_close_is_disposed() {
    let manager = Arc::new(LifecycleManager::new(Arc::new(MockFactory::new()), quiet()));
    manager.close();

    assert!(manager.primary_async().await.unwrap_err().is_disposed());
    assert!(manager.stateless_async().await.unwrap_err().is_disposed());
}

#[tokio::test]
async fn async_factory_failure_propagates() {
    let manager = Arc::new(LifecycleManager::new(
        Arc::new(MockFactory::new().failing_stateless(1)),
        quiet(),
    ));

    let err = manager.stateless_async().await.unwrap_err();
    assert!(matches!(err, LifecycleError::Factory { .. }));
    assert!(manager.stateless_async().await.is_ok());
}

#[tokio::test]
async fn using_async_closes_after_the_future() {
    let provider = HandleProvider::new(MockFactory::new())
        .with_options(quiet().with_flush_on_close(true));
    let calls = provider.factory().calls.clone();

    let id = provider
        .using_async(|manager| async move {
            let worker = {
                let manager = manager.clone();
                tokio::spawn(async move { manager.primary_async().await.map(|s| s.id) })
            };
            let here = manager.primary_async().await?.id;
            let there = worker.await.expect("worker task")?;
            assert_eq!(here, there);
            Ok::<_, LifecycleError>(here)
        })
        .await
        .unwrap();

    assert_eq!(id, 1);
    assert_eq!(Calls::count(&calls.make_primary), 1);
    assert_eq!(Calls::count(&calls.flush), 1);
    assert_eq!(Calls::count(&calls.release_primary), 1);
}

#[tokio::test]
async fn using_async_closes_on_error() {
    let provider = HandleProvider::new(MockFactory::new()).with_options(quiet());
    let calls = provider.factory().calls.clone();

    let result: Result<(), &str> = provider
        .using_async(|manager| async move {
            manager.stateless_async().await.map_err(|_| "unexpected")?;
            Err("rejected")
        })
        .await;

    assert_eq!(result, Err("rejected"));
    assert_eq!(Calls::count(&calls.release_stateless), 1);
}
