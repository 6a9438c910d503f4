// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hassette daemon (hassetted)
//!
//! Composition root: loads configuration, sets up logging, wires the
//! upstream Home Assistant collaborators, and runs the core until a
//! shutdown signal arrives.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod logging;
mod upstream;

use hassette_runtime::{AppRegistry, Hassette, HassetteParams};
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

use crate::upstream::UpstreamClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        match arg.as_str() {
            "--version" | "-V" | "-v" => {
                println!("hassetted {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" | "-h" | "help" => {
                println!("hassetted {}", env!("CARGO_PKG_VERSION"));
                println!("Hassette daemon - connects to Home Assistant and runs automation apps");
                println!();
                println!("USAGE:");
                println!("    hassetted");
                println!();
                println!("Configuration is read from hassette.toml (see HASSETTE_CONFIG_DIR)");
                println!("with hass.token overridable via HASSETTE_TOKEN.");
                println!();
                println!("OPTIONS:");
                println!("    -h, --help       Print help information");
                println!("    -v, --version    Print version information");
                return Ok(());
            }
            _ => {
                eprintln!("error: unexpected argument '{arg}'");
                eprintln!("Usage: hassetted [--help | --version]");
                std::process::exit(1);
            }
        }
    }

    let config = env::load_config()?;
    let _log_guard = logging::init(&config);

    info!(version = env!("CARGO_PKG_VERSION"), "starting hassette daemon");

    // Embedders register their compiled-in apps here; the stock daemon
    // starts with an empty registry and serves as the integration shell.
    let registry = AppRegistry::new();

    let client = Arc::new(UpstreamClient::new(&config)?);
    let hassette = Hassette::new(HassetteParams {
        config,
        registry,
        transport: Arc::clone(&client) as _,
        api: client as _,
        clock: None,
        config_loader: None,
    });

    spawn_signal_handler(Arc::clone(&hassette))?;

    if let Err(e) = hassette.run().await {
        error!(error = %e, "hassette exited with an error");
        return Err(e.into());
    }
    Ok(())
}

/// Request a graceful shutdown on SIGINT or SIGTERM.
fn spawn_signal_handler(hassette: Arc<Hassette>) -> Result<(), std::io::Error> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    tokio::spawn(async move {
        tokio::select! {
            _ = interrupt.recv() => info!("received SIGINT, shutting down"),
            _ = terminate.recv() => info!("received SIGTERM, shutting down"),
        }
        hassette.request_shutdown();
    });
    Ok(())
}
