// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration discovery.
//!
//! Search order for `hassette.toml`: `$HASSETTE_CONFIG_DIR`, the Docker
//! convention `/config`, then the working directory. Missing file means
//! defaults. `HASSETTE_TOKEN` overrides the configured credential so
//! secrets can stay out of the file.

use hassette_core::{ConfigError, HassetteConfig};
use std::path::PathBuf;
use tracing::info;

const CONFIG_FILE: &str = "hassette.toml";

fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("HASSETTE_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    let docker = PathBuf::from("/config");
    if docker.exists() {
        return docker;
    }
    PathBuf::from(".")
}

pub fn load_config() -> Result<HassetteConfig, ConfigError> {
    let dir = config_dir();
    let path = dir.join(CONFIG_FILE);

    let mut config = if path.exists() {
        info!(path = %path.display(), "loading configuration");
        HassetteConfig::load(&path)?
    } else {
        info!(path = %path.display(), "no config file found, using defaults");
        HassetteConfig::default()
    };
    config.config_dir = dir;

    if let Ok(token) = std::env::var("HASSETTE_TOKEN") {
        config.hass.token = token;
    }

    std::fs::create_dir_all(&config.data_dir)
        .map_err(|e| ConfigError::Read(config.data_dir.clone(), e))?;

    Ok(config)
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
