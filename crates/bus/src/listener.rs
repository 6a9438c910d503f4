// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener model.
//!
//! A listener binds a topic to a wrapped handler plus an optional
//! predicate. The wrapped handler is the user callback after sync/async
//! adaptation and debounce/throttle decoration.

use crate::adapters::{add_debounce, add_throttle};
use crate::error::BusError;
use crate::handler::Handler;
use crate::predicates::{normalize_where, Pred};
use hassette_core::{next_listener_id, Event, ListenerId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything needed to build a listener. Debounce and throttle are
/// mutually exclusive.
pub struct ListenerParams {
    /// Cleanup scope, typically an app or service unique name.
    pub owner: String,
    /// Exact topic or glob pattern.
    pub topic: String,
    pub handler: Handler,
    /// Filter list; empty means no filter, several are AND-ed.
    pub predicates: Vec<Pred>,
    /// Remove the listener after its first invocation.
    pub once: bool,
    pub debounce: Option<Duration>,
    pub throttle: Option<Duration>,
    /// Cancelled on bus shutdown; aborts outstanding debounce timers.
    pub cancel: CancellationToken,
}

pub struct Listener {
    listener_id: ListenerId,
    owner: String,
    topic: String,
    handler_name: String,
    handler: Handler,
    predicate: Option<Pred>,
    once: bool,
    debounce: Option<Duration>,
    throttle: Option<Duration>,
}

impl Listener {
    pub fn create(params: ListenerParams) -> Result<Self, BusError> {
        let ListenerParams { owner, topic, handler, predicates, once, debounce, throttle, cancel } =
            params;

        if debounce.is_some() && throttle.is_some() {
            return Err(BusError::Config(
                "debounce and throttle are mutually exclusive".to_string(),
            ));
        }

        let handler_name = handler.name().to_string();
        let mut wrapped = handler;
        if let Some(window) = debounce.filter(|w| !w.is_zero()) {
            wrapped = add_debounce(wrapped, window, cancel);
        } else if let Some(window) = throttle.filter(|w| !w.is_zero()) {
            wrapped = add_throttle(wrapped, window);
        }

        Ok(Self {
            listener_id: next_listener_id(),
            owner,
            topic,
            handler_name,
            handler: wrapped,
            predicate: normalize_where(predicates),
            once,
            debounce,
            throttle,
        })
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Name of the original user callback, for log context.
    pub fn handler_name(&self) -> &str {
        &self.handler_name
    }

    pub fn once(&self) -> bool {
        self.once
    }

    pub fn debounce(&self) -> Option<Duration> {
        self.debounce
    }

    pub fn throttle(&self) -> Option<Duration> {
        self.throttle
    }

    /// Evaluate the predicate; no predicate matches everything.
    pub async fn matches(&self, event: &Event) -> bool {
        match &self.predicate {
            Some(p) => p.matches(event).await,
            None => true,
        }
    }

    /// Invoke the wrapped handler.
    pub async fn handle(&self, event: Arc<Event>) -> Result<(), crate::handler::HandlerError> {
        self.handler.call(event).await
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("listener_id", &self.listener_id)
            .field("owner", &self.owner)
            .field("topic", &self.topic)
            .field("handler", &self.handler_name)
            .field("once", &self.once)
            .finish()
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
