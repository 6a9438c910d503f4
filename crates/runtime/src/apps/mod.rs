// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App framework: user automation units and their lifecycle manager.
//!
//! Apps are compiled in and registered in an [`AppRegistry`] keyed by
//! class name; a manifest's `class_name` resolves against it. One app
//! key can run several indexed instances, each with its own validated
//! configuration, its own bus/scheduler owner scope, and its own
//! supervised lifecycle.

mod changes;
mod handler;
mod instance;
mod registry;

pub use changes::{compute_change_set, AppChangeSet};
pub use handler::{AppHandler, ConfigLoader, ContextFactory};
pub use instance::AppInstance;
pub use registry::{AppFactory, AppRegistry};

use crate::api::Api;
use crate::bus::BusHandle;
use crate::scheduler::SchedulerHandle;
use crate::sink::EventSink;
use async_trait::async_trait;

/// Error type surfaced by app hooks and factories. App failures are
/// recorded per app and never affect peers.
pub type AppError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Capabilities handed to each app instance. The bus and scheduler are
/// scoped to the instance's unique owner name, so unsubscribing the
/// whole app is one sweep.
#[derive(Clone)]
pub struct AppContext {
    pub bus: BusHandle,
    pub scheduler: SchedulerHandle,
    pub api: Api,
    pub sink: EventSink,
    owner: String,
}

impl AppContext {
    pub fn new(
        owner: impl Into<String>,
        bus: BusHandle,
        scheduler: SchedulerHandle,
        api: Api,
        sink: EventSink,
    ) -> Self {
        Self { bus, scheduler, api, sink, owner: owner.into() }
    }

    /// The instance's unique owner name.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Publish an event onto the bus.
    pub async fn send_event(
        &self,
        event: hassette_core::Event,
    ) -> Result<(), crate::error::RuntimeError> {
        self.sink.send(event).await
    }
}

/// A user-written unit of automation logic.
///
/// `on_initialize` sets up subscriptions and scheduled jobs through the
/// context; `on_shutdown` releases anything the instance owns beyond
/// those (listeners and jobs are swept automatically).
#[async_trait]
pub trait App: Send + Sync {
    async fn on_initialize(&self, ctx: &AppContext) -> Result<(), AppError>;

    async fn on_shutdown(&self, _ctx: &AppContext) -> Result<(), AppError> {
        Ok(())
    }
}
