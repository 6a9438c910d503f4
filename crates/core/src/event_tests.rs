// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn state_changed_carries_canonical_topic() {
    let event = Event::state_changed(
        "light.kitchen",
        Some(EntityState::new("light.kitchen", "off")),
        Some(EntityState::new("light.kitchen", "on")),
    );
    assert_eq!(event.topic(), topics::HASS_EVENT_STATE_CHANGED);

    let payload = event.as_state_changed().unwrap();
    assert_eq!(payload.entity_id, "light.kitchen");
    assert_eq!(payload.domain(), "light");
    assert_eq!(payload.state_value_old(), Some(&json!("off")));
    assert_eq!(payload.state_value_new(), Some(&json!("on")));
}

#[test]
fn equality_is_structural() {
    let a = Event::component_loaded("light");
    let b = Event::component_loaded("light");
    assert_eq!(a, b);

    let c = Event::component_loaded("switch");
    assert_ne!(a, c);
}

#[test]
fn payload_round_trips_through_serde() {
    let event = Event::call_service(
        "light",
        "turn_on",
        [("entity_id".to_string(), json!("light.kitchen"))].into_iter().collect(),
    );
    let text = serde_json::to_string(&event).unwrap();
    assert!(text.contains("hass:call_service"));

    let back: Event = serde_json::from_str(&text).unwrap();
    assert_eq!(back, event);
}

#[test]
fn attr_accessors_read_both_sides() {
    let mut old = EntityState::new("light.kitchen", "on");
    old.attributes.insert("brightness".into(), json!(100));
    let mut new = EntityState::new("light.kitchen", "on");
    new.attributes.insert("brightness".into(), json!(200));

    let event = Event::state_changed("light.kitchen", Some(old), Some(new));
    let payload = event.as_state_changed().unwrap();
    assert_eq!(payload.attr_old("brightness"), Some(&json!(100)));
    assert_eq!(payload.attr_new("brightness"), Some(&json!(200)));
    assert_eq!(payload.attr_new("color_temp"), None);
}

#[test]
fn service_status_payload_serializes_enums_snake_case() {
    let event = Event::service_status(ServiceStatusPayload {
        resource_name: "bus".into(),
        role: ResourceRole::Service,
        status: ResourceStatus::Failed,
        previous_status: ResourceStatus::Running,
        error: Some("boom".into()),
    });
    let text = serde_json::to_string(&event).unwrap();
    assert!(text.contains("\"status\":\"failed\""));
    assert!(text.contains("\"role\":\"service\""));
}
