// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// Invalid subscription configuration, e.g. debounce and throttle
    /// requested together.
    #[error("invalid subscription: {0}")]
    Config(String),

    #[error("invalid regex pattern: {0}")]
    Regex(#[from] regex::Error),

    /// The ingress channel is closed; the runtime is shutting down.
    #[error("event stream is closed")]
    StreamClosed,
}
