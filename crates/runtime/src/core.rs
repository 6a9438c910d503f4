// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `Hassette` orchestrator.
//!
//! Owns the ingress channel and every service, starts them in
//! dependency order, gates on readiness with the startup timeout, and
//! tears everything down in reverse order on shutdown. A service crash
//! reaches the service watcher, which cancels the global shutdown
//! token this struct waits on.

use crate::api::{Api, HassApi};
use crate::apps::{AppContext, AppHandler, AppRegistry, ConfigLoader};
use crate::bus::{BusHandle, BusService};
use crate::error::RuntimeError;
use crate::file_watcher::FileWatcherService;
use crate::health::HealthService;
use crate::resource::{self, Lifecycle, Service};
use crate::scheduler::{SchedulerHandle, SchedulerService};
use crate::service_watcher::ServiceWatcher;
use crate::sink::EventSink;
use crate::state::StateProxy;
use crate::websocket::{WebsocketService, WsTransport};
use hassette_bus::Router;
use hassette_core::{Clock, Event, HassetteConfig, SystemClock};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Everything needed to assemble a runtime. The transport and API are
/// collaborator seams; tests inject fakes, the daemon wires real
/// clients.
pub struct HassetteParams {
    pub config: HassetteConfig,
    pub registry: AppRegistry,
    pub transport: Arc<dyn WsTransport>,
    pub api: Arc<dyn HassApi>,
    /// Defaults to the system clock.
    pub clock: Option<Arc<dyn Clock>>,
    /// Reloads configuration on file-change events. Defaults to
    /// re-reading `<config_dir>/hassette.toml`, falling back to the
    /// boot-time snapshot when the file does not exist.
    pub config_loader: Option<Arc<ConfigLoader>>,
}

pub struct Hassette {
    config: Arc<HassetteConfig>,
    sink: EventSink,
    shutdown: CancellationToken,

    api: Arc<dyn HassApi>,
    bus_service: Arc<BusService>,
    scheduler_service: Arc<SchedulerService>,
    websocket: Arc<WebsocketService>,
    state_proxy: Arc<StateProxy>,
    service_watcher: Arc<ServiceWatcher>,
    app_handler: Arc<AppHandler>,
    file_watcher: Arc<FileWatcherService>,
    health: Arc<HealthService>,
}

impl Hassette {
    pub fn new(params: HassetteParams) -> Arc<Self> {
        let HassetteParams { config, registry, transport, api, clock, config_loader } = params;
        let config = Arc::new(config);
        let clock: Arc<dyn Clock> = clock.unwrap_or_else(|| Arc::new(SystemClock));
        let shutdown = CancellationToken::new();

        let (sink, ingress) = EventSink::channel();
        let router = Arc::new(Router::new());

        let bus_service = BusService::new(sink.clone(), ingress, Arc::clone(&router), &config);
        let scheduler_service =
            SchedulerService::new(sink.clone(), Arc::clone(&clock), &config);
        let websocket = WebsocketService::new(sink.clone(), transport, &config);
        let state_proxy = StateProxy::new(sink.clone(), Arc::clone(&api), &config);
        let health = HealthService::new(sink.clone(), Arc::clone(&websocket), &config);
        let service_watcher = ServiceWatcher::new(sink.clone(), shutdown.clone(), &config);
        let file_watcher = FileWatcherService::new(sink.clone(), &config);

        let ctx_factory = {
            let bus_service = Arc::clone(&bus_service);
            let scheduler_service = Arc::clone(&scheduler_service);
            let api = Arc::clone(&api);
            let state_proxy = Arc::clone(&state_proxy);
            let sink = sink.clone();
            Arc::new(move |owner: &str| {
                AppContext::new(
                    owner,
                    bus_service.handle(owner),
                    scheduler_service.handle(owner),
                    Api::new(Arc::clone(&api), Arc::clone(&state_proxy)),
                    sink.clone(),
                )
            })
        };

        let config_loader = config_loader.unwrap_or_else(|| {
            let path = config.config_dir.join("hassette.toml");
            let snapshot = Arc::clone(&config);
            Arc::new(move || {
                if path.exists() {
                    HassetteConfig::load(&path)
                } else {
                    Ok((*snapshot).clone())
                }
            })
        });

        let app_handler = AppHandler::new(
            sink.clone(),
            Arc::new(registry),
            ctx_factory,
            config_loader,
            &config,
        );

        bus_service.set_state_proxy(Arc::clone(&state_proxy));

        Arc::new(Self {
            config,
            sink,
            shutdown,
            api,
            bus_service,
            scheduler_service,
            websocket,
            state_proxy,
            service_watcher,
            app_handler,
            file_watcher,
            health,
        })
    }

    // --- accessors -----------------------------------------------------

    pub fn config(&self) -> &HassetteConfig {
        &self.config
    }

    /// Subscription facade for an owner (typically an app or test).
    pub fn bus(&self, owner: &str) -> BusHandle {
        self.bus_service.handle(owner)
    }

    /// Scheduling facade for an owner.
    pub fn scheduler(&self, owner: &str) -> SchedulerHandle {
        self.scheduler_service.handle(owner)
    }

    pub fn scheduler_service(&self) -> &Arc<SchedulerService> {
        &self.scheduler_service
    }

    pub fn api(&self) -> Api {
        Api::new(Arc::clone(&self.api), Arc::clone(&self.state_proxy))
    }

    pub fn state_proxy(&self) -> &Arc<StateProxy> {
        &self.state_proxy
    }

    pub fn app_handler(&self) -> &Arc<AppHandler> {
        &self.app_handler
    }

    pub fn websocket(&self) -> &Arc<WebsocketService> {
        &self.websocket
    }

    /// Publish an event into the bus.
    pub async fn send_event(&self, event: Event) -> Result<(), RuntimeError> {
        self.sink.send(event).await
    }

    /// Signal global shutdown.
    pub fn request_shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    // --- lifecycle -----------------------------------------------------

    /// Start every service in dependency order. Does not block; use
    /// [`run`](Self::run) for the full lifetime.
    pub async fn start(self: &Arc<Self>) -> Result<(), RuntimeError> {
        info!("starting hassette");

        // the watcher first, so early failures are observed
        resource::initialize(self.service_watcher.as_ref()).await?;
        self.service_watcher.attach(&self.bus_service.handle("service-watcher")).await?;

        resource::start_service(&self.bus_service).await?;

        self.state_proxy.attach(&self.bus_service.handle("state-proxy")).await?;
        resource::initialize(self.state_proxy.as_ref()).await?;

        resource::start_service(&self.scheduler_service).await?;
        resource::start_service(&self.websocket).await?;
        resource::start_service(&self.health).await?;

        self.app_handler.set_boot_dependencies(vec![
            Arc::clone(&self.websocket) as Arc<dyn Lifecycle>,
            Arc::clone(&self.bus_service) as Arc<dyn Lifecycle>,
            Arc::clone(&self.scheduler_service) as Arc<dyn Lifecycle>,
        ]);
        resource::initialize(self.app_handler.as_ref()).await?;

        let reload_enabled = self.config.dev_mode || self.config.allow_reload_in_prod;
        if reload_enabled {
            self.app_handler.attach(&self.bus_service.handle("app-handler")).await?;
            resource::start_service(&self.file_watcher).await?;
        } else {
            warn!("not watching for app changes, dev_mode is disabled");
        }

        self.service_watcher.register_target(Arc::clone(&self.bus_service) as Arc<dyn Service>);
        self.service_watcher
            .register_target(Arc::clone(&self.scheduler_service) as Arc<dyn Service>);
        self.service_watcher.register_target(Arc::clone(&self.websocket) as Arc<dyn Service>);
        self.service_watcher.register_target(Arc::clone(&self.health) as Arc<dyn Service>);
        if reload_enabled {
            self.service_watcher
                .register_target(Arc::clone(&self.file_watcher) as Arc<dyn Service>);
        }

        // boot apps in the background; they gate on dependency readiness
        let handler = Arc::clone(&self.app_handler);
        self.app_handler.resource().tasks().spawn("apps:boot", async move {
            if let Err(error) = handler.initialize_apps().await {
                error!(%error, "app boot failed");
            }
        });

        Ok(())
    }

    /// Wait for the core services to become ready, up to the startup
    /// timeout.
    pub async fn wait_until_ready(&self) -> Result<(), RuntimeError> {
        let timeout = self.config.startup_timeout();
        for component in [
            self.bus_service.resource(),
            self.scheduler_service.resource(),
            self.websocket.resource(),
        ] {
            if let Err(e) = component.wait_ready(timeout).await {
                error!(resource = component.unique_name(), error = %e, "startup gate failed");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Start, wait for readiness, then run until shutdown is requested.
    pub async fn run(self: &Arc<Self>) -> Result<(), RuntimeError> {
        self.start().await?;

        if let Err(e) = self.wait_until_ready().await {
            error!("not all resources started successfully, shutting down");
            self.stop().await;
            return Err(e);
        }

        info!("hassette is running");
        self.shutdown.cancelled().await;
        self.stop().await;
        info!("hassette stopped");
        Ok(())
    }

    /// Shut everything down in reverse dependency order and close the
    /// event streams.
    pub async fn stop(self: &Arc<Self>) {
        info!("shutting down hassette");
        self.shutdown.cancel();

        resource::shutdown(self.file_watcher.as_ref()).await;
        resource::shutdown(self.app_handler.as_ref()).await;
        resource::shutdown(self.health.as_ref()).await;
        resource::shutdown(self.websocket.as_ref()).await;
        resource::shutdown(self.scheduler_service.as_ref()).await;
        resource::shutdown(self.state_proxy.as_ref()).await;
        resource::shutdown(self.bus_service.as_ref()).await;
        resource::shutdown(self.service_watcher.as_ref()).await;

        self.sink.mark_closed();
    }
}

#[cfg(test)]
#[path = "core_tests.rs"]
mod tests;
