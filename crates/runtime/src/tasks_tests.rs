// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::sync::atomic::AtomicBool;

fn bucket() -> TaskBucket {
    TaskBucket::new("test.bucket", Duration::from_millis(200))
}

#[tokio::test]
async fn completed_tasks_drop_out_of_the_bucket() {
    let bucket = bucket();
    bucket.spawn("quick", async {});
    // let the task run to completion
    tokio::task::yield_now().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(bucket.is_empty());
}

#[tokio::test]
async fn cancel_all_aborts_live_tasks() {
    let bucket = bucket();
    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    bucket.spawn("sleeper", async move {
        tokio::time::sleep(Duration::from_secs(60)).await;
        flag.store(true, Ordering::SeqCst);
    });
    assert_eq!(bucket.len(), 1);

    bucket.cancel_all().await;
    assert!(bucket.is_empty());
    assert!(!finished.load(Ordering::SeqCst));
}

#[tokio::test]
async fn cancel_all_with_nothing_tracked_is_a_noop() {
    let bucket = bucket();
    bucket.cancel_all().await;
    assert!(bucket.is_empty());
}

#[tokio::test]
async fn panicking_task_is_contained() {
    let bucket = bucket();
    bucket.spawn("boom", async {
        #[allow(clippy::panic)]
        {
            panic!("deliberate");
        }
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    // the panic was swallowed and the entry cleaned up
    assert!(bucket.is_empty());

    // the bucket still works afterwards
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    bucket.spawn("after", async move {
        flag.store(true, Ordering::SeqCst);
    });
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn run_blocking_returns_the_value() {
    let bucket = bucket();
    let value = bucket.run_blocking(|| 6 * 7).await.unwrap();
    assert_eq!(value, 42);
}

#[test]
fn run_sync_bridges_from_a_plain_thread() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let bucket = TaskBucket::new("sync.bucket", Duration::from_millis(200));
    let value = bucket
        .run_sync(runtime.handle(), async { 6 * 7 }, Duration::from_secs(1))
        .unwrap();
    assert_eq!(value, 42);
}

#[tokio::test]
async fn run_sync_refuses_on_runtime_threads() {
    let bucket = bucket();
    let handle = tokio::runtime::Handle::current();
    let err = bucket.run_sync(&handle, async {}, Duration::from_secs(1)).unwrap_err();
    assert!(err.to_string().contains("within the runtime"));
}

#[test]
fn run_sync_times_out() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let bucket = TaskBucket::new("sync.bucket", Duration::from_millis(200));
    let err = bucket
        .run_sync(
            runtime.handle(),
            async {
                tokio::time::sleep(Duration::from_secs(60)).await;
            },
            Duration::from_millis(50),
        )
        .unwrap_err();
    assert!(matches!(err, RuntimeError::Timeout(_)));
}
