// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime errors

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("{0}")]
    Message(String),

    /// A facade was called before its resource signalled readiness.
    /// Callers should wait on the resource instead of retrying blindly.
    #[error("resource not ready: {0}")]
    NotReady(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The ingress stream is closed; the runtime is tearing down.
    #[error("event stream closed")]
    StreamClosed,

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Trigger(#[from] hassette_scheduler::TriggerError),

    #[error(transparent)]
    Bus(#[from] hassette_bus::BusError),

    #[error(transparent)]
    Api(#[from] crate::api::ApiError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }
}
