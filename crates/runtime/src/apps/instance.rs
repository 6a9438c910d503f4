// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One running instance of an app.
//!
//! Wraps the user app behind the resource framework: hooks run through
//! the terminal drivers, and shutdown sweeps the instance's listeners
//! and scheduled jobs by owner.

use super::{App, AppContext};
use crate::error::RuntimeError;
use crate::resource::{Lifecycle, Resource};
use crate::sink::EventSink;
use async_trait::async_trait;
use hassette_core::ResourceRole;
use std::time::Duration;

pub struct AppInstance {
    resource: Resource,
    app: Box<dyn App>,
    ctx: AppContext,
    instance_name: String,
    index: usize,
}

impl AppInstance {
    pub fn new(
        class_name: &str,
        instance_name: impl Into<String>,
        index: usize,
        app: Box<dyn App>,
        ctx: AppContext,
        events: EventSink,
        cancel_timeout: Duration,
    ) -> Self {
        let instance_name = instance_name.into();
        Self {
            resource: Resource::new(
                format!("{class_name}.{instance_name}"),
                ResourceRole::App,
                events,
                cancel_timeout,
            ),
            app,
            ctx,
            instance_name,
            index,
        }
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn ctx(&self) -> &AppContext {
        &self.ctx
    }
}

#[async_trait]
impl Lifecycle for AppInstance {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn on_initialize(&self) -> Result<(), RuntimeError> {
        self.app
            .on_initialize(&self.ctx)
            .await
            .map_err(|e| RuntimeError::Message(e.to_string()))
    }

    async fn after_initialize(&self) -> Result<(), RuntimeError> {
        self.resource.mark_ready("initialized");
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), RuntimeError> {
        self.app
            .on_shutdown(&self.ctx)
            .await
            .map_err(|e| RuntimeError::Message(e.to_string()))
    }

    async fn after_shutdown(&self) -> Result<(), RuntimeError> {
        // sweep everything the instance registered under its owner
        self.ctx.bus.remove_all_listeners().await;
        self.ctx.scheduler.remove_all_jobs().await;
        Ok(())
    }
}
