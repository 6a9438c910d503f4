// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire message to event conversion.

use hassette_core::{EntityState, Event};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Deserialize)]
struct WsMessage {
    #[serde(rename = "type")]
    kind: String,
    event: Option<WireEvent>,
}

#[derive(Deserialize)]
struct WireEvent {
    event_type: String,
    #[serde(default)]
    data: Value,
}

#[derive(Deserialize)]
struct StateChangedData {
    entity_id: String,
    old_state: Option<EntityState>,
    new_state: Option<EntityState>,
}

#[derive(Deserialize)]
struct CallServiceData {
    domain: String,
    service: String,
    #[serde(default)]
    service_data: Map<String, Value>,
}

#[derive(Deserialize)]
struct ComponentLoadedData {
    component: String,
}

#[derive(Deserialize)]
struct ServiceRegisteredData {
    domain: String,
    service: String,
}

/// Parse one websocket frame into a bus event. Non-event frames and
/// malformed payloads return `None`.
pub fn parse_ws_message(text: &str) -> Option<Event> {
    let message: WsMessage = serde_json::from_str(text).ok()?;
    if message.kind != "event" {
        return None;
    }
    let wire = message.event?;

    match wire.event_type.as_str() {
        "state_changed" => {
            let data: StateChangedData = serde_json::from_value(wire.data)
                .map_err(|e| debug!(error = %e, "malformed state_changed"))
                .ok()?;
            Some(Event::state_changed(data.entity_id, data.old_state, data.new_state))
        }
        "call_service" => {
            let data: CallServiceData = serde_json::from_value(wire.data)
                .map_err(|e| debug!(error = %e, "malformed call_service"))
                .ok()?;
            Some(Event::call_service(data.domain, data.service, data.service_data))
        }
        "component_loaded" => {
            let data: ComponentLoadedData = serde_json::from_value(wire.data)
                .map_err(|e| debug!(error = %e, "malformed component_loaded"))
                .ok()?;
            Some(Event::component_loaded(data.component))
        }
        "service_registered" => {
            let data: ServiceRegisteredData = serde_json::from_value(wire.data)
                .map_err(|e| debug!(error = %e, "malformed service_registered"))
                .ok()?;
            Some(Event::service_registered(data.domain, data.service))
        }
        other => Some(Event::custom(
            format!("hass.event.{other}"),
            other.to_string(),
            wire.data,
        )),
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
