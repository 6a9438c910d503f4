// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription handle returned by bus `on*` calls.

use crate::router::Router;
use hassette_core::ListenerId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Handle to an active listener. `cancel()` is idempotent; dropping the
/// handle leaves the listener subscribed.
#[derive(Clone)]
pub struct Subscription {
    listener_id: ListenerId,
    topic: String,
    router: Arc<Router>,
    cancelled: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new(listener_id: ListenerId, topic: String, router: Arc<Router>) -> Self {
        Self { listener_id, topic, router, cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn listener_id(&self) -> ListenerId {
        self.listener_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Remove the listener from the router. Safe to call repeatedly.
    pub async fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        self.router.remove_listener_by_id(&self.topic, self.listener_id).await;
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("listener_id", &self.listener_id)
            .field("topic", &self.topic)
            .finish()
    }
}
