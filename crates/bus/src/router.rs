// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Topic router: three indices guarded by one fair async lock.
//!
//! Exact topics live in `exact`, patterns containing `*`/`?`/`[` in
//! `globs`, and every listener is additionally reachable from `owners`
//! for O(1) bulk removal. `tokio::sync::RwLock` hands the lock out in
//! FIFO order, so writers cannot be starved under subscription churn.

use crate::listener::Listener;
use hassette_core::{glob_match, is_glob, ListenerId};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Indices {
    exact: HashMap<String, Vec<Arc<Listener>>>,
    globs: HashMap<String, Vec<Arc<Listener>>>,
    owners: HashMap<String, Vec<Arc<Listener>>>,
}

impl Indices {
    fn bucket_mut(&mut self, topic: &str) -> &mut HashMap<String, Vec<Arc<Listener>>> {
        if is_glob(topic) {
            &mut self.globs
        } else {
            &mut self.exact
        }
    }
}

#[derive(Default)]
pub struct Router {
    indices: RwLock<Indices>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener under its topic and owner.
    pub async fn add_route(&self, listener: Arc<Listener>) {
        let mut indices = self.indices.write().await;
        let topic = listener.topic().to_string();
        indices.bucket_mut(&topic).entry(topic).or_default().push(Arc::clone(&listener));
        indices.owners.entry(listener.owner().to_string()).or_default().push(listener);
    }

    /// Remove every listener under `topic` for which `predicate` holds.
    /// Empty buckets are deleted; the owner index is rebuilt for the
    /// affected owners.
    pub async fn remove_route(&self, topic: &str, predicate: impl Fn(&Listener) -> bool) {
        let mut indices = self.indices.write().await;
        let bucket = indices.bucket_mut(topic);
        let Some(listeners) = bucket.get_mut(topic) else {
            return;
        };

        let mut removed: Vec<Arc<Listener>> = Vec::new();
        listeners.retain(|l| {
            if predicate(l) {
                removed.push(Arc::clone(l));
                false
            } else {
                true
            }
        });
        if listeners.is_empty() {
            bucket.remove(topic);
        }
        if removed.is_empty() {
            return;
        }

        for gone in &removed {
            let owner = gone.owner().to_string();
            if let Some(owned) = indices.owners.get_mut(&owner) {
                owned.retain(|l| l.listener_id() != gone.listener_id());
                if owned.is_empty() {
                    indices.owners.remove(&owner);
                }
            }
        }
    }

    pub async fn remove_listener(&self, listener: &Listener) {
        let id = listener.listener_id();
        self.remove_route(listener.topic(), |l| l.listener_id() == id).await;
    }

    pub async fn remove_listener_by_id(&self, topic: &str, listener_id: ListenerId) {
        self.remove_route(topic, |l| l.listener_id() == listener_id).await;
    }

    /// Remove all listeners belonging to `owner`.
    pub async fn clear_owner(&self, owner: &str) {
        let mut indices = self.indices.write().await;
        let Some(owned) = indices.owners.remove(owner) else {
            return;
        };

        let mut topics: Vec<String> = owned.iter().map(|l| l.topic().to_string()).collect();
        topics.sort();
        topics.dedup();

        for topic in topics {
            let bucket = indices.bucket_mut(&topic);
            if let Some(listeners) = bucket.get_mut(&topic) {
                listeners.retain(|l| l.owner() != owner);
                if listeners.is_empty() {
                    bucket.remove(&topic);
                }
            }
        }
    }

    /// Snapshot of the listeners matching `topic`: exact matches first,
    /// then glob entries whose pattern matches, de-duplicated by
    /// listener id preserving first-seen order.
    pub async fn get_matching_listeners(&self, topic: &str) -> Vec<Arc<Listener>> {
        let indices = self.indices.read().await;

        let mut out: Vec<Arc<Listener>> = Vec::new();
        if let Some(exact) = indices.exact.get(topic) {
            out.extend(exact.iter().cloned());
        }
        for (pattern, listeners) in &indices.globs {
            if glob_match(pattern, topic) {
                out.extend(listeners.iter().cloned());
            }
        }

        let mut seen = std::collections::HashSet::new();
        out.retain(|l| seen.insert(l.listener_id()));
        out
    }

    /// Total number of registered listeners.
    pub async fn len(&self) -> usize {
        let indices = self.indices.read().await;
        indices.owners.values().map(Vec::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        let indices = self.indices.read().await;
        indices.exact.is_empty() && indices.globs.is_empty() && indices.owners.is_empty()
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
