// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hassette runtime: supervised services around the event bus.
//!
//! Composes the leaf crates into the running system: the resource
//! framework, task buckets, bus dispatch loop, scheduler service, state
//! proxy, websocket link, app handler, service watcher, file watcher,
//! health endpoint, and the `Hassette` orchestrator that owns them all.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod api;
pub mod apps;
mod bus;
mod core;
mod error;
mod file_watcher;
mod health;
mod resource;
mod scheduler;
mod service_watcher;
mod sink;
mod state;
mod tasks;
#[cfg(test)]
mod test_support;
mod websocket;

pub use api::{Api, ApiError, HassApi};
pub use apps::{App, AppContext, AppError, AppFactory, AppHandler, AppRegistry};
pub use bus::{BusHandle, BusService, EntityOptions, SubscribeOptions};
pub use self::core::{Hassette, HassetteParams};
pub use error::RuntimeError;
pub use file_watcher::FileWatcherService;
pub use health::HealthService;
pub use resource::{
    initialize, restart_service, shutdown, start_service, Lifecycle, Resource, Service,
};
pub use scheduler::{SchedulerHandle, SchedulerService};
pub use service_watcher::ServiceWatcher;
pub use sink::EventSink;
pub use state::StateProxy;
pub use tasks::TaskBucket;
pub use websocket::{WebsocketService, WsTransport};
