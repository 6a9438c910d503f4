// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Id allocation for listeners, jobs, and resources.
//!
//! Listener and job ids are monotonically assigned process-wide counters;
//! their ordering participates in scheduler tie-breaking, so they must
//! never be reused. Resource ids are random short hex strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static LISTENER_SEQ: AtomicU64 = AtomicU64::new(1);
static JOB_SEQ: AtomicU64 = AtomicU64::new(1);

/// Stable numeric id of a bus listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListenerId(u64);

/// Stable numeric id of a scheduled job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

pub fn next_listener_id() -> ListenerId {
    ListenerId(LISTENER_SEQ.fetch_add(1, Ordering::Relaxed))
}

pub fn next_job_id() -> JobId {
    JobId(JOB_SEQ.fetch_add(1, Ordering::Relaxed))
}

/// Random 8-char hex id for a resource instance.
pub fn short_uid() -> String {
    let mut s = uuid::Uuid::new_v4().simple().to_string();
    s.truncate(8);
    s
}

/// `prefix.short_id` unique name for a resource instance.
pub fn unique_name(prefix: &str) -> String {
    format!("{prefix}.{}", short_uid())
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
