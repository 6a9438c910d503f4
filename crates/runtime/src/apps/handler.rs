// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App lifecycle manager.
//!
//! Boots configured apps once the websocket, API, and bus are ready,
//! watches for config/source changes, and applies the resulting change
//! set per app. A failure in one app never aborts the batch or touches
//! its peers.

use super::changes::{compute_change_set, AppChangeSet};
use super::instance::AppInstance;
use super::registry::AppRegistry;
use super::AppContext;
use crate::bus::BusHandle;
use crate::error::RuntimeError;
use crate::resource::{self, Lifecycle, Resource};
use crate::sink::EventSink;
use async_trait::async_trait;
use hassette_bus::Handler;
use hassette_core::{AppManifest, ConfigError, Event, HassetteConfig, ResourceRole};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Builds the per-instance context, owner-scoped. Installed by the
/// orchestrator.
pub type ContextFactory = dyn Fn(&str) -> AppContext + Send + Sync;

/// Reloads configuration from its source on change events. Installed by
/// the orchestrator; tests inject closures.
pub type ConfigLoader = dyn Fn() -> Result<HassetteConfig, ConfigError> + Send + Sync;

type InstanceMap = HashMap<String, BTreeMap<usize, Arc<AppInstance>>>;

pub struct AppHandler {
    resource: Resource,
    registry: Arc<AppRegistry>,
    ctx_factory: Arc<ContextFactory>,
    config_loader: Arc<ConfigLoader>,
    sink: EventSink,

    apps_config: Mutex<BTreeMap<String, AppManifest>>,
    only_app: Mutex<Option<String>>,
    apps: tokio::sync::Mutex<InstanceMap>,
    failed_apps: Mutex<HashMap<String, Vec<(usize, String)>>>,

    /// Resources whose readiness gates app boot (websocket, bus, ...).
    boot_deps: Mutex<Vec<Arc<dyn Lifecycle>>>,

    app_dir: PathBuf,
    dev_mode: bool,
    allow_only_app_in_prod: bool,
    startup_timeout: Duration,
    shutdown_timeout: Duration,
    boot_wait_timeout: Duration,
}

impl AppHandler {
    pub fn new(
        events: EventSink,
        registry: Arc<AppRegistry>,
        ctx_factory: Arc<ContextFactory>,
        config_loader: Arc<ConfigLoader>,
        config: &HassetteConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            resource: Resource::new(
                "app-handler",
                ResourceRole::Resource,
                events.clone(),
                config.task_cancellation_timeout(),
            ),
            registry,
            ctx_factory,
            config_loader,
            sink: events,
            apps_config: Mutex::new(config.apps.clone()),
            only_app: Mutex::new(None),
            apps: tokio::sync::Mutex::new(HashMap::new()),
            failed_apps: Mutex::new(HashMap::new()),
            boot_deps: Mutex::new(Vec::new()),
            app_dir: config.app_dir.clone(),
            dev_mode: config.dev_mode,
            allow_only_app_in_prod: config.allow_only_app_in_prod,
            startup_timeout: config.app_startup_timeout(),
            shutdown_timeout: config.app_shutdown_timeout(),
            boot_wait_timeout: config.startup_timeout(),
        })
    }

    pub fn set_boot_dependencies(&self, deps: Vec<Arc<dyn Lifecycle>>) {
        *self.boot_deps.lock() = deps;
    }

    // --- accessors -----------------------------------------------------

    pub async fn get(&self, app_key: &str, index: usize) -> Option<Arc<AppInstance>> {
        self.apps.lock().await.get(app_key).and_then(|g| g.get(&index)).cloned()
    }

    pub async fn all(&self) -> Vec<Arc<AppInstance>> {
        self.apps.lock().await.values().flat_map(|g| g.values().cloned()).collect()
    }

    pub async fn running_count(&self) -> usize {
        self.apps.lock().await.values().map(BTreeMap::len).sum()
    }

    /// Per-app failure slots: `(instance index, rendered error)`.
    pub fn failed_apps(&self) -> HashMap<String, Vec<(usize, String)>> {
        self.failed_apps.lock().clone()
    }

    pub fn only_app(&self) -> Option<String> {
        self.only_app.lock().clone()
    }

    fn record_failure(&self, app_key: &str, index: usize, error: String) {
        self.failed_apps.lock().entry(app_key.to_string()).or_default().push((index, error));
    }

    /// Enabled manifests, narrowed to the `only` app when one is set.
    fn active_apps_config(&self) -> BTreeMap<String, AppManifest> {
        let only = self.only_app.lock().clone();
        self.apps_config
            .lock()
            .iter()
            .filter(|(key, m)| {
                m.enabled && only.as_ref().is_none_or(|only| only == key.as_str())
            })
            .map(|(k, m)| (k.clone(), m.clone()))
            .collect()
    }

    // --- only-app ------------------------------------------------------

    /// At most one enabled app may claim `only`; two or more is a
    /// configuration error. Zero means run all. Ignored in production
    /// unless explicitly allowed.
    fn set_only_app(&self) -> Result<(), RuntimeError> {
        if !self.dev_mode && !self.allow_only_app_in_prod {
            let claimed = self
                .apps_config
                .lock()
                .values()
                .any(|m| m.enabled && self.manifest_claims_only(m));
            if claimed {
                warn!("ignoring only-app flags in production mode");
            }
            *self.only_app.lock() = None;
            return Ok(());
        }

        let claimed: Vec<String> = self
            .apps_config
            .lock()
            .iter()
            .filter(|(_, m)| m.enabled && self.manifest_claims_only(m))
            .map(|(k, _)| k.clone())
            .collect();

        match claimed.as_slice() {
            [] => {
                *self.only_app.lock() = None;
            }
            [single] => {
                warn!(app = %single, "app is marked only, skipping all others");
                *self.only_app.lock() = Some(single.clone());
            }
            many => {
                return Err(RuntimeError::Config(format!(
                    "multiple apps marked as only: {}",
                    many.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn manifest_claims_only(&self, manifest: &AppManifest) -> bool {
        manifest.only
            || self.registry.get(&manifest.class_name).is_some_and(|f| f.only())
    }

    // --- boot ----------------------------------------------------------

    /// Initialize all configured and enabled apps. Waits for the boot
    /// dependencies first, then emits the end-of-boot marker.
    pub async fn initialize_apps(self: &Arc<Self>) -> Result<(), RuntimeError> {
        if self.apps_config.lock().is_empty() {
            debug!("no apps configured, skipping initialization");
            self.sink.send_best_effort(Event::app_load_completed()).await;
            return Ok(());
        }

        let deps = self.boot_deps.lock().clone();
        for dep in deps {
            if let Err(e) = dep.resource().wait_ready(self.boot_wait_timeout).await {
                warn!(
                    dependency = dep.resource().unique_name(),
                    error = %e,
                    "dependency never became ready, skipping app startup"
                );
                return Err(e);
            }
        }

        self.set_only_app()?;

        let active = self.active_apps_config();
        for (app_key, manifest) in &active {
            self.create_app_instances(app_key, manifest, None).await;
        }
        for app_key in active.keys() {
            self.initialize_app_instances(app_key, None).await;
        }

        let started = self.running_count().await;
        if started == 0 {
            warn!("no apps were initialized successfully");
        } else {
            info!(count = started, "initialized apps");
        }

        self.sink.send_best_effort(Event::app_load_completed()).await;
        Ok(())
    }

    /// Validate configs and construct instances for one app key.
    /// Factory or validation failures land in the failure slot.
    async fn create_app_instances(
        &self,
        app_key: &str,
        manifest: &AppManifest,
        indices: Option<&BTreeSet<usize>>,
    ) {
        let Some(factory) = self.registry.get(&manifest.class_name) else {
            error!(
                app = app_key,
                class = %manifest.class_name,
                "app class is not registered"
            );
            self.record_failure(
                app_key,
                0,
                format!("class '{}' not found in registry", manifest.class_name),
            );
            return;
        };

        for (idx, config) in manifest.app_config.iter().enumerate() {
            if indices.is_some_and(|want| !want.contains(&idx)) {
                continue;
            }

            let Some(instance_name) =
                config.get("instance_name").and_then(|v| v.as_str()).map(str::to_string)
            else {
                error!(app = app_key, index = idx, "instance config is missing instance_name");
                self.record_failure(app_key, idx, "missing instance_name".to_string());
                continue;
            };

            let owner = format!("{}.{}.{}", manifest.class_name, instance_name, idx);
            match factory.build(config) {
                Ok(app) => {
                    let instance = Arc::new(AppInstance::new(
                        &manifest.class_name,
                        instance_name.clone(),
                        idx,
                        app,
                        (self.ctx_factory)(&owner),
                        self.sink.clone(),
                        self.shutdown_timeout,
                    ));
                    self.apps.lock().await.entry(app_key.to_string()).or_default().insert(idx, instance);
                }
                Err(e) => {
                    error!(
                        app = app_key,
                        instance = %instance_name,
                        error = %e,
                        "failed to validate app config"
                    );
                    self.record_failure(app_key, idx, e.to_string());
                }
            }
        }
    }

    /// Run `initialize` on instances of one app key, each under the
    /// per-app startup timeout. A timeout marks the instance STOPPED
    /// and records the failure.
    async fn initialize_app_instances(&self, app_key: &str, indices: Option<&BTreeSet<usize>>) {
        let targets: Vec<Arc<AppInstance>> = {
            let apps = self.apps.lock().await;
            match apps.get(app_key) {
                Some(group) => group
                    .iter()
                    .filter(|(idx, _)| indices.is_none_or(|want| want.contains(idx)))
                    .map(|(_, inst)| Arc::clone(inst))
                    .collect(),
                None => return,
            }
        };

        for instance in targets {
            match tokio::time::timeout(
                self.startup_timeout,
                resource::initialize(instance.as_ref()),
            )
            .await
            {
                Ok(Ok(())) => {
                    debug!(
                        app = app_key,
                        instance = instance.instance_name(),
                        "app initialized"
                    );
                }
                Ok(Err(e)) => {
                    error!(
                        app = app_key,
                        instance = instance.instance_name(),
                        error = %e,
                        "app failed to start"
                    );
                    self.record_failure(app_key, instance.index(), e.to_string());
                }
                Err(_) => {
                    error!(
                        app = app_key,
                        instance = instance.instance_name(),
                        timeout = ?self.startup_timeout,
                        "timed out while starting app"
                    );
                    instance.resource().handle_stop().await;
                    self.record_failure(
                        app_key,
                        instance.index(),
                        format!("startup timed out after {:?}", self.startup_timeout),
                    );
                }
            }
        }
    }

    // --- change handling -----------------------------------------------

    /// Reload configuration and return `(before, after)` active views.
    async fn refresh_config(&self) -> (BTreeMap<String, AppManifest>, BTreeMap<String, AppManifest>) {
        let before = self.active_apps_config();
        match (self.config_loader)() {
            Ok(config) => {
                *self.apps_config.lock() = config.apps;
            }
            Err(e) => {
                error!(error = %e, "failed to reload configuration");
            }
        }
        if let Err(e) = self.set_only_app() {
            error!(error = %e, "only-app conflict after reload, keeping previous selection");
        }
        let after = self.active_apps_config();
        (before, after)
    }

    /// Subscribe to file-watcher events so edits trigger reloads.
    pub async fn attach(self: &Arc<Self>, bus: &BusHandle) -> Result<(), RuntimeError> {
        let handler = Arc::clone(self);
        bus.on(
            hassette_core::topics::HASSETTE_EVENT_FILE_WATCHER,
            Handler::new("app-handler:file-change", move |event: Arc<Event>| {
                let handler = Arc::clone(&handler);
                async move {
                    if let Some(payload) = event.as_file_watcher() {
                        handler.handle_changes(&payload.changed_paths).await;
                    }
                    Ok::<_, std::convert::Infallible>(())
                }
            }),
        )
        .await?;
        Ok(())
    }

    /// React to a batch of changed paths from the file watcher.
    pub async fn handle_changes(self: &Arc<Self>, changed_paths: &[PathBuf]) {
        let (before, after) = self.refresh_config().await;
        let only = self.only_app();
        let changes =
            compute_change_set(&before, &after, changed_paths, &self.app_dir, only.as_deref());

        if changes.is_empty() {
            debug!("no app changes detected");
            return;
        }
        debug!(?changes, "applying app changes");
        self.apply_change_set(&changes).await;
        self.sink.send_best_effort(Event::app_load_completed()).await;
    }

    /// Apply in order: stop orphans, start new, reimport, reload.
    /// Every step is per-app; failures are logged and isolated.
    async fn apply_change_set(self: &Arc<Self>, changes: &AppChangeSet) {
        for app_key in &changes.removed_apps {
            self.stop_app(app_key).await;
        }
        for (app_key, indices) in &changes.removed_instances {
            self.stop_app_instances(app_key, indices).await;
        }

        let active = self.active_apps_config();
        for app_key in &changes.new_apps {
            if let Some(manifest) = active.get(app_key) {
                self.create_app_instances(app_key, manifest, None).await;
                self.initialize_app_instances(app_key, None).await;
            }
        }
        for (app_key, indices) in &changes.new_instances {
            if let Some(manifest) = active.get(app_key) {
                self.create_app_instances(app_key, manifest, Some(indices)).await;
                self.initialize_app_instances(app_key, Some(indices)).await;
            }
        }

        for app_key in changes.reimport_apps.iter().chain(&changes.reload_apps) {
            self.reload_app(app_key).await;
        }
        for (app_key, indices) in &changes.reload_instances {
            if changes.reload_apps.contains(app_key) {
                continue;
            }
            self.reload_app_instances(app_key, indices).await;
        }
    }

    /// Stop and restart an app from its current manifest.
    pub async fn reload_app(&self, app_key: &str) {
        debug!(app = app_key, "reloading app");
        self.stop_app(app_key).await;
        let Some(manifest) = self.active_apps_config().get(app_key).cloned() else {
            warn!(app = app_key, "cannot reload app, not enabled or not found");
            return;
        };
        self.create_app_instances(app_key, &manifest, None).await;
        self.initialize_app_instances(app_key, None).await;
    }

    /// Reload only the given instances; peers keep their listeners.
    pub async fn reload_app_instances(&self, app_key: &str, indices: &BTreeSet<usize>) {
        if indices.is_empty() {
            return;
        }
        let Some(manifest) = self.active_apps_config().get(app_key).cloned() else {
            warn!(app = app_key, "cannot reload instances, app not enabled or not found");
            return;
        };
        self.stop_app_instances(app_key, indices).await;
        self.create_app_instances(app_key, &manifest, Some(indices)).await;
        self.initialize_app_instances(app_key, Some(indices)).await;
    }

    // --- stopping ------------------------------------------------------

    pub async fn stop_app(&self, app_key: &str) {
        let indices: BTreeSet<usize> = {
            let apps = self.apps.lock().await;
            match apps.get(app_key) {
                Some(group) => group.keys().copied().collect(),
                None => {
                    warn!(app = app_key, "cannot stop app, not found");
                    return;
                }
            }
        };
        self.stop_app_instances(app_key, &indices).await;
    }

    pub async fn stop_app_instances(&self, app_key: &str, indices: &BTreeSet<usize>) {
        for idx in indices {
            let instance = {
                let mut apps = self.apps.lock().await;
                let Some(group) = apps.get_mut(app_key) else {
                    break;
                };
                let removed = group.remove(idx);
                if group.is_empty() {
                    apps.remove(app_key);
                }
                removed
            };
            let Some(instance) = instance else {
                debug!(app = app_key, index = idx, "instance not running");
                continue;
            };

            match tokio::time::timeout(
                self.shutdown_timeout,
                resource::shutdown(instance.as_ref()),
            )
            .await
            {
                Ok(()) => {
                    debug!(app = app_key, instance = instance.instance_name(), "app stopped")
                }
                Err(_) => {
                    // abandoned: the bucket cancel already fired inside
                    // the driver or will never finish; log and move on
                    error!(
                        app = app_key,
                        instance = instance.instance_name(),
                        timeout = ?self.shutdown_timeout,
                        "app did not stop within the shutdown timeout"
                    );
                }
            }
        }

        // stopped instances no longer count as failed
        let mut failed = self.failed_apps.lock();
        if let Some(entries) = failed.get_mut(app_key) {
            entries.retain(|(idx, _)| !indices.contains(idx));
            if entries.is_empty() {
                failed.remove(app_key);
            }
        }
    }
}

#[async_trait]
impl Lifecycle for AppHandler {
    fn resource(&self) -> &Resource {
        &self.resource
    }

    async fn after_initialize(&self) -> Result<(), RuntimeError> {
        self.resource.mark_ready("initialized");
        Ok(())
    }

    async fn on_shutdown(&self) -> Result<(), RuntimeError> {
        let keys: Vec<String> = self.apps.lock().await.keys().cloned().collect();
        for app_key in keys {
            self.stop_app(&app_key).await;
        }
        self.failed_apps.lock().clear();
        Ok(())
    }
}

#[cfg(test)]
#[path = "handler_tests.rs"]
mod tests;
