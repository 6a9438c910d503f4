// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::service::BusService;
use crate::resource::start_service;
use crate::sink::EventSink;
use hassette_core::{EntityState, Event, HassetteConfig};
use parking_lot::Mutex;
use serde_json::json;
use std::convert::Infallible;

struct Rig {
    sink: EventSink,
    bus: Arc<BusService>,
}

async fn rig() -> Rig {
    let config = HassetteConfig::default();
    let (sink, ingress) = EventSink::channel();
    let bus = BusService::new(sink.clone(), ingress, Arc::new(Router::new()), &config);
    start_service(&bus).await.unwrap();
    Rig { sink, bus }
}

fn counting_handler() -> (Handler, Arc<Mutex<usize>>) {
    let count = Arc::new(Mutex::new(0usize));
    let counter = Arc::clone(&count);
    let handler = Handler::new("count", move |_event| {
        let counter = Arc::clone(&counter);
        async move {
            *counter.lock() += 1;
            Ok::<_, Infallible>(())
        }
    });
    (handler, count)
}

fn change(entity_id: &str, old: &str, new: &str) -> Event {
    Event::state_changed(
        entity_id,
        Some(EntityState::new(entity_id, old)),
        Some(EntityState::new(entity_id, new)),
    )
}

async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(30)).await;
}

#[tokio::test]
async fn on_entity_requires_a_state_change_by_default() {
    let rig = rig().await;
    let (handler, count) = counting_handler();
    rig.bus
        .handle("test")
        .on_entity("light.kitchen", handler, EntityOptions::default())
        .await
        .unwrap();

    rig.sink.send(change("light.kitchen", "off", "on")).await.unwrap();
    rig.sink.send(change("light.kitchen", "on", "on")).await.unwrap();
    rig.sink.send(change("light.bedroom", "off", "on")).await.unwrap();
    settle().await;

    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn on_entity_changed_to_filters_target_state() {
    let rig = rig().await;
    let (handler, count) = counting_handler();
    rig.bus
        .handle("test")
        .on_entity(
            "light.kitchen",
            handler,
            EntityOptions {
                changed_to: Some(Condition::value("on")),
                ..EntityOptions::default()
            },
        )
        .await
        .unwrap();

    rig.sink.send(change("light.kitchen", "off", "on")).await.unwrap();
    rig.sink.send(change("light.kitchen", "on", "off")).await.unwrap();
    settle().await;

    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn on_attribute_tracks_one_attribute() {
    let rig = rig().await;
    let (handler, count) = counting_handler();
    rig.bus
        .handle("test")
        .on_attribute(
            "light.kitchen",
            "brightness",
            handler,
            None,
            None,
            SubscribeOptions::default(),
        )
        .await
        .unwrap();

    let mut old = EntityState::new("light.kitchen", "on");
    old.attributes.insert("brightness".into(), json!(100));
    let mut new = EntityState::new("light.kitchen", "on");
    new.attributes.insert("brightness".into(), json!(200));
    rig.sink
        .send(Event::state_changed("light.kitchen", Some(old.clone()), Some(new)))
        .await
        .unwrap();
    // same brightness: no delta
    rig.sink
        .send(Event::state_changed("light.kitchen", Some(old.clone()), Some(old)))
        .await
        .unwrap();
    settle().await;

    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn on_call_service_filters_domain_and_service() {
    let rig = rig().await;
    let (handler, count) = counting_handler();
    rig.bus
        .handle("test")
        .on_call_service(Some("light"), Some("turn_on"), handler, SubscribeOptions::default())
        .await
        .unwrap();

    rig.sink
        .send(Event::call_service("light", "turn_on", serde_json::Map::new()))
        .await
        .unwrap();
    rig.sink
        .send(Event::call_service("light", "turn_off", serde_json::Map::new()))
        .await
        .unwrap();
    rig.sink
        .send(Event::call_service("switch", "turn_on", serde_json::Map::new()))
        .await
        .unwrap();
    settle().await;

    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn on_homeassistant_restart_is_a_call_service_shorthand() {
    let rig = rig().await;
    let (handler, count) = counting_handler();
    rig.bus
        .handle("test")
        .on_homeassistant_restart(handler, SubscribeOptions::default())
        .await
        .unwrap();

    rig.sink
        .send(Event::call_service("homeassistant", "restart", serde_json::Map::new()))
        .await
        .unwrap();
    rig.sink
        .send(Event::call_service("homeassistant", "reload_all", serde_json::Map::new()))
        .await
        .unwrap();
    settle().await;

    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn on_service_status_filters_by_status() {
    use hassette_core::{ResourceRole, ServiceStatusPayload};

    let rig = rig().await;
    let (handler, count) = counting_handler();
    rig.bus
        .handle("test")
        .on_service_failed(handler, SubscribeOptions::default())
        .await
        .unwrap();

    let failed = Event::service_status(ServiceStatusPayload {
        resource_name: "x".into(),
        role: ResourceRole::Service,
        status: ResourceStatus::Failed,
        previous_status: ResourceStatus::Running,
        error: None,
    });
    let running = Event::service_status(ServiceStatusPayload {
        resource_name: "x".into(),
        role: ResourceRole::Service,
        status: ResourceStatus::Running,
        previous_status: ResourceStatus::Starting,
        error: None,
    });
    rig.sink.send(failed).await.unwrap();
    rig.sink.send(running).await.unwrap();
    settle().await;

    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn on_websocket_status_filters_by_kind() {
    let rig = rig().await;
    let (handler, count) = counting_handler();
    rig.bus
        .handle("test")
        .on_websocket_status(Some(WsStatusKind::Connected), handler, SubscribeOptions::default())
        .await
        .unwrap();

    rig.sink.send(Event::websocket_status(WsStatusKind::Connected)).await.unwrap();
    rig.sink.send(Event::websocket_status(WsStatusKind::Disconnected)).await.unwrap();
    settle().await;

    assert_eq!(*count.lock(), 1);
}

#[tokio::test]
async fn subscription_cancel_is_idempotent() {
    let rig = rig().await;
    let (handler, count) = counting_handler();
    let sub = rig
        .bus
        .handle("test")
        .on(hassette_core::topics::HASS_EVENT_STATE_CHANGED, handler)
        .await
        .unwrap();

    sub.cancel().await;
    sub.cancel().await;

    rig.sink.send(change("light.kitchen", "off", "on")).await.unwrap();
    settle().await;
    assert_eq!(*count.lock(), 0);
}
