// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::BusError;
use crate::predicates::Guard;
use hassette_core::Event;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

fn counting_handler() -> (Handler, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let handler = Handler::new("count", move |_event| {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        }
    });
    (handler, calls)
}

fn params(handler: Handler) -> ListenerParams {
    ListenerParams {
        owner: "test-owner".to_string(),
        topic: "hass.event.state_changed".to_string(),
        handler,
        predicates: Vec::new(),
        once: false,
        debounce: None,
        throttle: None,
        cancel: CancellationToken::new(),
    }
}

#[tokio::test]
async fn listener_without_predicate_matches_everything() {
    let (handler, calls) = counting_handler();
    let listener = Listener::create(params(handler)).unwrap();

    let event = Event::component_loaded("light");
    assert!(listener.matches(&event).await);
    listener.handle(Arc::new(event)).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn listener_predicate_filters() {
    let (handler, _calls) = counting_handler();
    let mut p = params(handler);
    p.predicates = vec![Arc::new(Guard::new(|event| event.topic().starts_with("hassette.")))];
    let listener = Listener::create(p).unwrap();

    assert!(!listener.matches(&Event::component_loaded("light")).await);
    assert!(listener.matches(&Event::app_load_completed()).await);
}

#[test]
fn debounce_and_throttle_are_mutually_exclusive() {
    let (handler, _calls) = counting_handler();
    let mut p = params(handler);
    p.debounce = Some(std::time::Duration::from_millis(100));
    p.throttle = Some(std::time::Duration::from_millis(100));
    let err = Listener::create(p).unwrap_err();
    assert!(matches!(err, BusError::Config(_)));
}

#[test]
fn listener_ids_are_assigned_monotonically() {
    let (handler, _calls) = counting_handler();
    let a = Listener::create(params(handler.clone())).unwrap();
    let b = Listener::create(params(handler)).unwrap();
    assert!(a.listener_id() < b.listener_id());
}

#[test]
fn listener_keeps_original_handler_name() {
    let (handler, _calls) = counting_handler();
    let mut p = params(handler);
    p.debounce = Some(std::time::Duration::from_millis(10));
    let listener = Listener::create(p).unwrap();
    // the wrapped handler is decorated, the reported name is the original
    assert_eq!(listener.handler_name(), "count");
}
