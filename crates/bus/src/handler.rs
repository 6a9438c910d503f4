// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Handler adaptation.
//!
//! User callbacks come in two shapes: async functions of the event, and
//! blocking functions that must not run on the runtime threads. Both are
//! adapted into a single cloneable `Handler` the bus can call.

use futures_util::future::BoxFuture;
use hassette_core::Event;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Error type surfaced by user handlers. Handler failures are logged by
/// the dispatch loop and never propagate to peers.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

type HandlerFn = dyn Fn(Arc<Event>) -> BoxFuture<'static, Result<(), HandlerError>> + Send + Sync;

/// A cloneable async event callback.
#[derive(Clone)]
pub struct Handler {
    name: Arc<str>,
    f: Arc<HandlerFn>,
}

impl Handler {
    /// Wrap an async closure.
    pub fn new<F, Fut, E>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(Arc<Event>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<HandlerError>,
    {
        let f = Arc::new(f);
        Self {
            name: name.into(),
            f: Arc::new(move |event| {
                let f = Arc::clone(&f);
                Box::pin(async move { f(event).await.map_err(Into::into) })
            }),
        }
    }

    /// Wrap a blocking closure; it runs on the blocking thread pool so
    /// it cannot stall the dispatch loop.
    pub fn blocking<F, E>(name: impl Into<Arc<str>>, f: F) -> Self
    where
        F: Fn(Arc<Event>) -> Result<(), E> + Send + Sync + 'static,
        E: Into<HandlerError> + Send + 'static,
    {
        let f = Arc::new(f);
        Self {
            name: name.into(),
            f: Arc::new(move |event| {
                let f = Arc::clone(&f);
                Box::pin(async move {
                    match tokio::task::spawn_blocking(move || f(event).map_err(Into::into)).await {
                        Ok(result) => result,
                        Err(join_err) => Err(Box::new(join_err) as HandlerError),
                    }
                })
            }),
        }
    }

    /// Name of the original callback, for log context.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn call(&self, event: Arc<Event>) -> Result<(), HandlerError> {
        (self.f)(event).await
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name).finish()
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
