// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Debounce and throttle semantics over the full stack.

use crate::support::{rig, state_change};
use hassette_bus::Handler;
use hassette_core::Event;
use hassette_runtime::SubscribeOptions;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn recorder() -> (Handler, Arc<Mutex<Vec<String>>>) {
    let seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let handler = Handler::new("record", move |event: Arc<Event>| {
        let sink = Arc::clone(&sink);
        async move {
            if let Some(payload) = event.as_state_changed() {
                if let Some(value) = payload.state_value_new().and_then(|v| v.as_str()) {
                    sink.lock().unwrap().push(value.to_string());
                }
            }
            Ok::<_, Infallible>(())
        }
    });
    (handler, seen)
}

#[tokio::test]
async fn debounced_handler_fires_once_with_the_last_event() {
    let rig = rig().await;
    let (handler, seen) = recorder();
    rig.hassette
        .bus("spec")
        .on_with(
            hassette_core::topics::HASS_EVENT_STATE_CHANGED,
            handler,
            SubscribeOptions::debounced(Duration::from_millis(100)),
        )
        .await
        .unwrap();

    for value in ["a", "b", "c"] {
        rig.feed.send(state_change("sensor.x", None, Some(value))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    // quiet window still open after the last event
    assert!(seen.lock().unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(*seen.lock().unwrap(), vec!["c".to_string()]);

    rig.hassette.stop().await;
}

#[tokio::test]
async fn throttled_handler_fires_first_and_again_after_the_window() {
    let rig = rig().await;
    let (handler, seen) = recorder();
    rig.hassette
        .bus("spec")
        .on_with(
            hassette_core::topics::HASS_EVENT_STATE_CHANGED,
            handler,
            SubscribeOptions::throttled(Duration::from_millis(100)),
        )
        .await
        .unwrap();

    for value in ["a", "b", "c"] {
        rig.feed.send(state_change("sensor.x", None, Some(value))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);

    // past the window, the next event fires again
    tokio::time::sleep(Duration::from_millis(100)).await;
    rig.feed.send(state_change("sensor.x", None, Some("d"))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(*seen.lock().unwrap(), vec!["a".to_string(), "d".to_string()]);

    rig.hassette.stop().await;
}

#[tokio::test]
async fn predicates_run_before_the_rate_limiter() {
    use hassette_bus::predicates::{EntityIs, Pred};

    let rig = rig().await;
    let (handler, seen) = recorder();
    let predicates: Vec<Pred> = vec![Arc::new(EntityIs::new("sensor.wanted"))];
    rig.hassette
        .bus("spec")
        .on_with(
            hassette_core::topics::HASS_EVENT_STATE_CHANGED,
            handler,
            SubscribeOptions {
                predicates,
                throttle: Some(Duration::from_millis(100)),
                ..SubscribeOptions::default()
            },
        )
        .await
        .unwrap();

    // a non-matching event must not consume the throttle window
    rig.feed.send(state_change("sensor.noise", None, Some("x"))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    rig.feed.send(state_change("sensor.wanted", None, Some("y"))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(*seen.lock().unwrap(), vec!["y".to_string()]);
    rig.hassette.stop().await;
}
