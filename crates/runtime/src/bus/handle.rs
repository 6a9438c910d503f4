// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-owner subscription facade.
//!
//! The `on_*` helpers synthesize the right predicate list and delegate
//! to `on_with`. Every listener created through a handle is tagged with
//! the handle's owner, so `remove_all_listeners` can sweep an app's
//! subscriptions in one call.

use hassette_bus::predicates::{
    AttrChanged, Changed, ChangedFrom, ChangedTo, Condition, EntityIs, Guard, Pred,
};
use hassette_bus::{BusError, Handler, Listener, ListenerParams, Router, Subscription};
use hassette_core::{topics, ResourceStatus, WsStatusKind};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Common subscription modifiers.
#[derive(Default)]
pub struct SubscribeOptions {
    /// Extra predicates, AND-ed with whatever the helper synthesizes.
    pub predicates: Vec<Pred>,
    pub once: bool,
    pub debounce: Option<Duration>,
    pub throttle: Option<Duration>,
}

impl SubscribeOptions {
    pub fn once() -> Self {
        Self { once: true, ..Self::default() }
    }

    pub fn debounced(window: Duration) -> Self {
        Self { debounce: Some(window), ..Self::default() }
    }

    pub fn throttled(window: Duration) -> Self {
        Self { throttle: Some(window), ..Self::default() }
    }
}

/// Modifiers for [`BusHandle::on_entity`].
pub struct EntityOptions {
    /// Require the state value to have changed. On by default.
    pub changed: bool,
    pub changed_from: Option<Condition>,
    pub changed_to: Option<Condition>,
    pub options: SubscribeOptions,
}

impl Default for EntityOptions {
    fn default() -> Self {
        Self { changed: true, changed_from: None, changed_to: None, options: SubscribeOptions::default() }
    }
}

#[derive(Clone)]
pub struct BusHandle {
    owner: String,
    router: Arc<Router>,
    cancel: CancellationToken,
}

impl BusHandle {
    pub(crate) fn new(owner: impl Into<String>, router: Arc<Router>, cancel: CancellationToken) -> Self {
        Self { owner: owner.into(), router, cancel }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Subscribe to a topic (exact or glob) with default options.
    pub async fn on(&self, topic: &str, handler: Handler) -> Result<Subscription, BusError> {
        self.on_with(topic, handler, SubscribeOptions::default()).await
    }

    /// Subscribe with explicit options.
    pub async fn on_with(
        &self,
        topic: &str,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        let listener = Listener::create(ListenerParams {
            owner: self.owner.clone(),
            topic: topic.to_string(),
            handler,
            predicates: options.predicates,
            once: options.once,
            debounce: options.debounce,
            throttle: options.throttle,
            cancel: self.cancel.clone(),
        })?;
        let listener = Arc::new(listener);
        let subscription = Subscription::new(
            listener.listener_id(),
            listener.topic().to_string(),
            Arc::clone(&self.router),
        );
        self.router.add_route(listener).await;
        Ok(subscription)
    }

    /// Subscribe to state changes for an entity (exact id or glob).
    pub async fn on_entity(
        &self,
        entity_id: &str,
        handler: Handler,
        opts: EntityOptions,
    ) -> Result<Subscription, BusError> {
        let EntityOptions { changed, changed_from, changed_to, mut options } = opts;

        let mut preds: Vec<Pred> = vec![Arc::new(EntityIs::new(entity_id))];
        if changed {
            preds.push(Arc::new(Changed));
        }
        if let Some(condition) = changed_from {
            preds.push(Arc::new(ChangedFrom::new(condition)));
        }
        if let Some(condition) = changed_to {
            preds.push(Arc::new(ChangedTo::new(condition)));
        }
        preds.append(&mut options.predicates);
        options.predicates = preds;

        self.on_with(topics::HASS_EVENT_STATE_CHANGED, handler, options).await
    }

    /// Subscribe to changes of one attribute of an entity.
    pub async fn on_attribute(
        &self,
        entity_id: &str,
        attr: &str,
        handler: Handler,
        changed_from: Option<Condition>,
        changed_to: Option<Condition>,
        mut options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        let mut attr_changed = AttrChanged::new(attr);
        if let Some(condition) = changed_from {
            attr_changed = attr_changed.from(condition);
        }
        if let Some(condition) = changed_to {
            attr_changed = attr_changed.to(condition);
        }

        let mut preds: Vec<Pred> =
            vec![Arc::new(EntityIs::new(entity_id)), Arc::new(attr_changed)];
        preds.append(&mut options.predicates);
        options.predicates = preds;

        self.on_with(topics::HASS_EVENT_STATE_CHANGED, handler, options).await
    }

    /// Subscribe to service call events, optionally filtered by domain
    /// and service name.
    pub async fn on_call_service(
        &self,
        domain: Option<&str>,
        service: Option<&str>,
        handler: Handler,
        mut options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        let mut preds: Vec<Pred> = Vec::new();
        if let Some(domain) = domain {
            let domain = domain.to_string();
            preds.push(Arc::new(Guard::new(move |event| {
                event.as_call_service().is_some_and(|p| p.domain == domain)
            })));
        }
        if let Some(service) = service {
            let service = service.to_string();
            preds.push(Arc::new(Guard::new(move |event| {
                event.as_call_service().is_some_and(|p| p.service == service)
            })));
        }
        preds.append(&mut options.predicates);
        options.predicates = preds;

        self.on_with(topics::HASS_EVENT_CALL_SERVICE, handler, options).await
    }

    /// Home Assistant restart is a `homeassistant.restart` service call.
    pub async fn on_homeassistant_restart(
        &self,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        self.on_call_service(Some("homeassistant"), Some("restart"), handler, options).await
    }

    pub async fn on_component_loaded(
        &self,
        component: Option<&str>,
        handler: Handler,
        mut options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        if let Some(component) = component {
            let component = component.to_string();
            options.predicates.insert(
                0,
                Arc::new(Guard::new(move |event| {
                    matches!(
                        &event.payload,
                        hassette_core::Payload::ComponentLoaded { component: c } if *c == component
                    )
                })),
            );
        }
        self.on_with(topics::HASS_EVENT_COMPONENT_LOADED, handler, options).await
    }

    pub async fn on_service_registered(
        &self,
        domain: Option<&str>,
        service: Option<&str>,
        handler: Handler,
        mut options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        let domain = domain.map(str::to_string);
        let service = service.map(str::to_string);
        options.predicates.insert(
            0,
            Arc::new(Guard::new(move |event| match &event.payload {
                hassette_core::Payload::ServiceRegistered { domain: d, service: s } => {
                    domain.as_ref().is_none_or(|want| want == d)
                        && service.as_ref().is_none_or(|want| want == s)
                }
                _ => false,
            })),
        );
        self.on_with(topics::HASS_EVENT_SERVICE_REGISTERED, handler, options).await
    }

    /// Subscribe to Hassette resource lifecycle events, optionally for
    /// one status.
    pub async fn on_service_status(
        &self,
        status: Option<ResourceStatus>,
        handler: Handler,
        mut options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        if let Some(status) = status {
            options.predicates.insert(
                0,
                Arc::new(Guard::new(move |event| {
                    event.as_service_status().is_some_and(|p| p.status == status)
                })),
            );
        }
        self.on_with(topics::HASSETTE_EVENT_SERVICE_STATUS, handler, options).await
    }

    pub async fn on_service_failed(
        &self,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        self.on_service_status(Some(ResourceStatus::Failed), handler, options).await
    }

    pub async fn on_service_crashed(
        &self,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        self.on_service_status(Some(ResourceStatus::Crashed), handler, options).await
    }

    pub async fn on_service_started(
        &self,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        self.on_service_status(Some(ResourceStatus::Running), handler, options).await
    }

    /// Subscribe to websocket connect/disconnect signals.
    pub async fn on_websocket_status(
        &self,
        kind: Option<WsStatusKind>,
        handler: Handler,
        mut options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        if let Some(kind) = kind {
            options.predicates.insert(
                0,
                Arc::new(Guard::new(move |event| {
                    matches!(
                        &event.payload,
                        hassette_core::Payload::WebsocketStatus { event_type } if *event_type == kind
                    )
                })),
            );
        }
        self.on_with(topics::HASSETTE_EVENT_WEBSOCKET_STATUS, handler, options).await
    }

    pub async fn on_app_load_completed(
        &self,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Result<Subscription, BusError> {
        self.on_with(topics::HASSETTE_EVENT_APP_LOAD_COMPLETED, handler, options).await
    }

    /// Sweep every listener owned by this handle's owner.
    pub async fn remove_all_listeners(&self) {
        self.router.clear_owner(&self.owner).await;
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
