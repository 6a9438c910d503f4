// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ingress sink: the producer side of the bus channel.
//!
//! Bounded multi-producer channel; the single consumer is the bus
//! service dispatch loop. Producers backpressure when the channel is
//! full. After teardown closes the stream, sends become no-ops so late
//! status transitions don't error.

use crate::error::RuntimeError;
use hassette_core::Event;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

/// Conventional ingress capacity.
pub const INGRESS_CAPACITY: usize = 1000;

#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<Arc<Event>>,
    closed: Arc<AtomicBool>,
}

impl EventSink {
    /// Create the ingress channel pair.
    pub fn channel() -> (Self, mpsc::Receiver<Arc<Event>>) {
        let (tx, rx) = mpsc::channel(INGRESS_CAPACITY);
        (Self { tx, closed: Arc::new(AtomicBool::new(false)) }, rx)
    }

    /// Send an event into the bus; awaits when the channel is full.
    pub async fn send(&self, event: Event) -> Result<(), RuntimeError> {
        if self.is_closed() {
            return Err(RuntimeError::StreamClosed);
        }
        self.tx.send(Arc::new(event)).await.map_err(|_| {
            self.closed.store(true, Ordering::SeqCst);
            RuntimeError::StreamClosed
        })
    }

    /// Best-effort send for lifecycle transitions: a closed stream is
    /// recorded locally and otherwise ignored.
    pub async fn send_best_effort(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            debug!(error = %e, "dropping event, streams closed");
        }
    }

    /// Mark the stream closed during teardown; later sends are dropped.
    pub fn mark_closed(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
