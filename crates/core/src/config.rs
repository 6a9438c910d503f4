// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration model for the Hassette runtime.
//!
//! Every recognized option with its default. Parsing is plain TOML; the
//! daemon crate decides where the file lives and which environment
//! variables override it.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Upstream Home Assistant credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HassConfig {
    pub url: String,
    pub token: String,
}

impl Default for HassConfig {
    fn default() -> Self {
        Self { url: "http://localhost:8123".to_string(), token: String::new() }
    }
}

/// Per-app manifest: where the app lives and how its instances are
/// configured. One app key can carry multiple indexed instance configs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppManifest {
    /// Source file the app class lives in, relative to `app_dir`.
    pub filename: PathBuf,
    /// Registered class name resolved against the app registry.
    pub class_name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Development flag: when set on exactly one enabled app, only that
    /// app runs. More than one is a configuration error.
    #[serde(default)]
    pub only: bool,
    /// One config table per instance; a bare table means one instance.
    #[serde(default, deserialize_with = "one_or_many")]
    pub app_config: Vec<Value>,
}

fn default_true() -> bool {
    true
}

/// Accept either a single table or a list of tables.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

impl AppManifest {
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.class_name)
    }

    /// Absolute path of the app source file under `app_dir`.
    pub fn full_path(&self, app_dir: &Path) -> PathBuf {
        if self.filename.is_absolute() {
            self.filename.clone()
        } else {
            app_dir.join(&self.filename)
        }
    }

    /// Manifest equality ignoring per-instance configs. Used to decide
    /// whether an app needs a full reload versus instance reloads.
    pub fn metadata_eq(&self, other: &AppManifest) -> bool {
        self.filename == other.filename
            && self.class_name == other.class_name
            && self.enabled == other.enabled
            && self.display_name == other.display_name
            && self.only == other.only
    }
}

/// Root configuration for a Hassette process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HassetteConfig {
    pub hass: HassConfig,
    /// App manifests keyed by app name.
    pub apps: BTreeMap<String, AppManifest>,

    pub app_dir: PathBuf,
    pub data_dir: PathBuf,
    pub config_dir: PathBuf,

    pub websocket_timeout_seconds: f64,
    pub run_sync_timeout_seconds: f64,
    pub task_cancellation_timeout_seconds: f64,
    pub startup_timeout_seconds: f64,
    pub app_startup_timeout_seconds: f64,
    pub app_shutdown_timeout_seconds: f64,

    pub scheduler_min_delay_seconds: f64,
    pub scheduler_max_delay_seconds: f64,
    pub scheduler_default_delay_seconds: f64,

    pub service_restart_max_attempts: u32,
    pub service_restart_backoff_seconds: f64,
    pub service_restart_backoff_multiplier: f64,
    pub service_restart_max_backoff_seconds: f64,

    pub dev_mode: bool,
    pub allow_reload_in_prod: bool,
    pub allow_only_app_in_prod: bool,

    /// Drop `call_service`/`system_log`/level=debug events at ingress.
    /// Works around upstream chattiness; on by default.
    pub drop_noisy_system_log_events: bool,

    pub log_level: String,
    pub bus_service_log_level: Option<String>,
    pub scheduler_service_log_level: Option<String>,
    pub app_handler_log_level: Option<String>,
    pub service_watcher_log_level: Option<String>,
    pub file_watcher_log_level: Option<String>,
    pub websocket_log_level: Option<String>,
    pub health_service_log_level: Option<String>,
    pub apps_log_level: Option<String>,

    pub health_service_port: u16,
    pub run_health_service: bool,
}

impl Default for HassetteConfig {
    fn default() -> Self {
        Self {
            hass: HassConfig::default(),
            apps: BTreeMap::new(),
            app_dir: PathBuf::from("apps"),
            data_dir: PathBuf::from("data"),
            config_dir: PathBuf::from("."),
            websocket_timeout_seconds: 5.0,
            run_sync_timeout_seconds: 6.0,
            task_cancellation_timeout_seconds: 5.0,
            startup_timeout_seconds: 20.0,
            app_startup_timeout_seconds: 10.0,
            app_shutdown_timeout_seconds: 10.0,
            scheduler_min_delay_seconds: 0.05,
            scheduler_max_delay_seconds: 60.0,
            scheduler_default_delay_seconds: 30.0,
            service_restart_max_attempts: 5,
            service_restart_backoff_seconds: 1.0,
            service_restart_backoff_multiplier: 2.0,
            service_restart_max_backoff_seconds: 60.0,
            dev_mode: false,
            allow_reload_in_prod: false,
            allow_only_app_in_prod: false,
            drop_noisy_system_log_events: true,
            log_level: "info".to_string(),
            bus_service_log_level: None,
            scheduler_service_log_level: None,
            app_handler_log_level: None,
            service_watcher_log_level: None,
            file_watcher_log_level: None,
            websocket_log_level: None,
            health_service_log_level: None,
            apps_log_level: None,
            health_service_port: 8126,
            run_health_service: true,
        }
    }
}

impl HassetteConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml_str(&text)
    }

    /// App manifests that are enabled.
    pub fn enabled_apps(&self) -> BTreeMap<String, AppManifest> {
        self.apps.iter().filter(|(_, m)| m.enabled).map(|(k, m)| (k.clone(), m.clone())).collect()
    }

    /// Files the reload watcher should observe: the app directory plus
    /// every configured app source file.
    pub fn watchable_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.app_dir.clone()];
        for manifest in self.apps.values() {
            paths.push(manifest.full_path(&self.app_dir));
        }
        paths.sort();
        paths.dedup();
        paths
    }

    /// Tracing directive string: the global level plus one
    /// target-scoped directive per component override.
    pub fn env_filter_directives(&self) -> String {
        let mut directives = vec![self.log_level.clone()];
        let components: [(&str, &Option<String>); 8] = [
            ("hassette_runtime::bus", &self.bus_service_log_level),
            ("hassette_runtime::scheduler", &self.scheduler_service_log_level),
            ("hassette_runtime::apps", &self.app_handler_log_level),
            ("hassette_runtime::service_watcher", &self.service_watcher_log_level),
            ("hassette_runtime::file_watcher", &self.file_watcher_log_level),
            ("hassette_runtime::websocket", &self.websocket_log_level),
            ("hassette_runtime::health", &self.health_service_log_level),
            ("hassette_runtime::apps::instance", &self.apps_log_level),
        ];
        for (target, level) in components {
            if let Some(level) = level {
                directives.push(format!("{target}={level}"));
            }
        }
        directives.join(",")
    }

    pub fn websocket_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.websocket_timeout_seconds)
    }

    pub fn run_sync_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.run_sync_timeout_seconds)
    }

    pub fn task_cancellation_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.task_cancellation_timeout_seconds)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.startup_timeout_seconds)
    }

    pub fn app_startup_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.app_startup_timeout_seconds)
    }

    pub fn app_shutdown_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.app_shutdown_timeout_seconds)
    }

    pub fn scheduler_min_delay(&self) -> Duration {
        Duration::from_secs_f64(self.scheduler_min_delay_seconds)
    }

    pub fn scheduler_max_delay(&self) -> Duration {
        Duration::from_secs_f64(self.scheduler_max_delay_seconds)
    }

    pub fn scheduler_default_delay(&self) -> Duration {
        Duration::from_secs_f64(self.scheduler_default_delay_seconds)
    }

    pub fn service_restart_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.service_restart_backoff_seconds)
    }

    pub fn service_restart_max_backoff(&self) -> Duration {
        Duration::from_secs_f64(self.service_restart_max_backoff_seconds)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
