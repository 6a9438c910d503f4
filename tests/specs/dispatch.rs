// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Basic dispatch through the full stack.

use crate::support::{rig, settle, state_change};
use hassette_bus::predicates::{EntityIs, Pred};
use hassette_bus::Handler;
use hassette_core::Event;
use hassette_runtime::SubscribeOptions;
use std::sync::Mutex;
use std::convert::Infallible;
use std::sync::Arc;

#[tokio::test]
async fn handler_fires_for_its_entity_only() {
    let rig = rig().await;

    let seen: Arc<Mutex<Vec<Arc<Event>>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let predicates: Vec<Pred> = vec![Arc::new(EntityIs::new("light.kitchen"))];
    rig.hassette
        .bus("spec")
        .on_with(
            hassette_core::topics::HASS_EVENT_STATE_CHANGED,
            Handler::new("kitchen", move |event: Arc<Event>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(event);
                    Ok::<_, Infallible>(())
                }
            }),
            SubscribeOptions { predicates, ..SubscribeOptions::default() },
        )
        .await
        .unwrap();

    rig.feed.send(state_change("light.kitchen", Some("off"), Some("on"))).await.unwrap();
    rig.feed.send(state_change("light.bedroom", Some("off"), Some("on"))).await.unwrap();
    settle().await;

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    let payload = seen[0].as_state_changed().unwrap();
    assert_eq!(payload.entity_id, "light.kitchen");
    assert_eq!(payload.state_value_new(), Some(&serde_json::json!("on")));

    rig.hassette.stop().await;
}

#[tokio::test]
async fn events_reach_the_state_proxy_before_handlers() {
    let rig = rig().await;
    let proxy = Arc::clone(rig.hassette.state_proxy());

    let observed: Arc<Mutex<Vec<Option<serde_json::Value>>>> = Arc::new(Mutex::new(Vec::new()));
    let results = Arc::clone(&observed);
    rig.hassette
        .bus("spec")
        .on(
            hassette_core::topics::HASS_EVENT_STATE_CHANGED,
            Handler::new("proxy-reader", move |event: Arc<Event>| {
                let results = Arc::clone(&results);
                let proxy = Arc::clone(&proxy);
                async move {
                    let entity_id =
                        event.as_state_changed().map(|p| p.entity_id.clone()).unwrap_or_default();
                    let cached = proxy
                        .get_state(&entity_id)
                        .ok()
                        .flatten()
                        .map(|s| s.state.clone());
                    results.lock().unwrap().push(cached);
                    Ok::<_, Infallible>(())
                }
            }),
        )
        .await
        .unwrap();

    rig.feed.send(state_change("sensor.temp", None, Some("21"))).await.unwrap();
    settle().await;

    assert_eq!(*observed.lock().unwrap(), vec![Some(serde_json::json!("21"))]);
    rig.hassette.stop().await;
}
