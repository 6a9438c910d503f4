// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate-limiting handler wrappers.
//!
//! Both wrappers sit after predicate evaluation: only events that pass
//! the listener's filter enter the debounce/throttle state machine.

use crate::handler::Handler;
use hassette_core::Event;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

struct DebounceState {
    pending: Mutex<Option<AbortHandle>>,
    last_event: Mutex<Option<Arc<Event>>>,
}

/// Debounce: each call restarts the quiet window; the inner handler
/// fires once, with the most recent event, after `window` of inactivity.
///
/// The pending timer is aborted when a new call arrives or when `cancel`
/// fires (bus shutdown).
pub fn add_debounce(handler: Handler, window: Duration, cancel: CancellationToken) -> Handler {
    let state = Arc::new(DebounceState {
        pending: Mutex::new(None),
        last_event: Mutex::new(None),
    });
    let name: Arc<str> = format!("debounced({})", handler.name()).into();

    Handler::new(name, move |event: Arc<Event>| {
        *state.last_event.lock() = Some(event);
        if let Some(pending) = state.pending.lock().take() {
            pending.abort();
        }

        let timer_handler = handler.clone();
        let timer_state = Arc::clone(&state);
        let timer_cancel = cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = timer_cancel.cancelled() => {
                    debug!("debounce timer cancelled by shutdown");
                }
                _ = tokio::time::sleep(window) => {
                    let last = timer_state.last_event.lock().clone();
                    if let Some(event) = last {
                        if let Err(error) = timer_handler.call(event).await {
                            warn!(handler = timer_handler.name(), %error, "debounced handler failed");
                        }
                    }
                }
            }
        });
        *state.pending.lock() = Some(timer.abort_handle());

        async { Ok::<_, std::convert::Infallible>(()) }
    })
}

struct ThrottleState {
    last_fire: Mutex<Option<tokio::time::Instant>>,
}

/// Throttle: the first call fires immediately; calls within `window` of
/// the last fire are dropped, not queued. The window resets on each
/// successful fire.
pub fn add_throttle(handler: Handler, window: Duration) -> Handler {
    let state = Arc::new(ThrottleState { last_fire: Mutex::new(None) });
    let name: Arc<str> = format!("throttled({})", handler.name()).into();

    Handler::new(name, move |event: Arc<Event>| {
        let fire = {
            let mut last = state.last_fire.lock();
            let now = tokio::time::Instant::now();
            match *last {
                Some(t) if now.duration_since(t) < window => false,
                _ => {
                    *last = Some(now);
                    true
                }
            }
        };

        let handler = handler.clone();
        async move {
            if fire {
                handler.call(event).await
            } else {
                Ok(())
            }
        }
    })
}

#[cfg(test)]
#[path = "adapters_tests.rs"]
mod tests;
