// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource status and role enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a supervised resource.
///
/// Transitions are driven by the resource framework; a resource never
/// moves backward except `Stopped`/`Failed`/`Crashed` -> `Starting` on
/// an explicit restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    NotStarted,
    Starting,
    Running,
    Stopped,
    Failed,
    Crashed,
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceStatus::NotStarted => "not_started",
            ResourceStatus::Starting => "starting",
            ResourceStatus::Running => "running",
            ResourceStatus::Stopped => "stopped",
            ResourceStatus::Failed => "failed",
            ResourceStatus::Crashed => "crashed",
        };
        f.write_str(s)
    }
}

/// Role of a supervised resource, carried in service-status events so the
/// service watcher can find restart targets by `(name, role)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceRole {
    Base,
    Core,
    Resource,
    Service,
    App,
}

impl fmt::Display for ResourceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceRole::Base => "base",
            ResourceRole::Core => "core",
            ResourceRole::Resource => "resource",
            ResourceRole::Service => "service",
            ResourceRole::App => "app",
        };
        f.write_str(s)
    }
}
