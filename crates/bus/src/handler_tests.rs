// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};

fn event() -> Arc<Event> {
    Arc::new(Event::component_loaded("light"))
}

#[tokio::test]
async fn async_handler_is_invoked() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handler = Handler::new("count", move |_event| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        }
    });

    handler.call(event()).await.unwrap();
    handler.call(event()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(handler.name(), "count");
}

#[tokio::test]
async fn blocking_handler_runs_off_loop() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handler = Handler::blocking("block", move |_event| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, Infallible>(())
    });

    handler.call(event()).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn handler_errors_surface_to_caller() {
    let handler = Handler::new("fail", |_event| async {
        Err::<(), _>(std::io::Error::other("nope"))
    });
    let err = handler.call(event()).await.unwrap_err();
    assert!(err.to_string().contains("nope"));
}
