// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios against a full runtime with fake collaborators.

#[path = "specs/support.rs"]
mod support;

#[path = "specs/dispatch.rs"]
mod dispatch;
#[path = "specs/rate_limiting.rs"]
mod rate_limiting;
#[path = "specs/scheduling.rs"]
mod scheduling;
#[path = "specs/state_sync.rs"]
mod state_sync;
