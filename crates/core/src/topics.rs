// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic vocabulary shared across the runtime.
//!
//! Topics are matched exactly or against glob subscriptions
//! (`*`, `?`, `[...]`).

/// Home Assistant state change: `{entity_id, old_state, new_state}`.
pub const HASS_EVENT_STATE_CHANGED: &str = "hass.event.state_changed";

/// Home Assistant service call: `{domain, service, service_data}`.
pub const HASS_EVENT_CALL_SERVICE: &str = "hass.event.call_service";

/// Home Assistant component finished loading: `{component}`.
pub const HASS_EVENT_COMPONENT_LOADED: &str = "hass.event.component_loaded";

/// Home Assistant service registration: `{domain, service}`.
pub const HASS_EVENT_SERVICE_REGISTERED: &str = "hass.event.service_registered";

/// Resource lifecycle transitions within Hassette itself.
pub const HASSETTE_EVENT_SERVICE_STATUS: &str = "hassette.event.service_status";

/// Source/config file change notifications.
pub const HASSETTE_EVENT_FILE_WATCHER: &str = "hassette.event.file_watcher";

/// Upstream websocket connected/disconnected signals.
pub const HASSETTE_EVENT_WEBSOCKET_STATUS: &str = "hassette.event.websocket_status";

/// End-of-boot marker emitted after app initialization completes.
pub const HASSETTE_EVENT_APP_LOAD_COMPLETED: &str = "hassette.event.app_load_completed";
