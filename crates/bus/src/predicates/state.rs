// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Predicates over state-change events.
//!
//! All of these answer `false` for events that are not state changes.

use super::{Condition, Predicate};
use async_trait::async_trait;
use hassette_core::{glob_match, is_glob, Event};

/// Entity id match, glob-aware (`light.*` subscribes a family).
#[derive(Debug, Clone)]
pub struct EntityIs {
    entity_id: String,
}

impl EntityIs {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self { entity_id: entity_id.into() }
    }
}

#[async_trait]
impl Predicate for EntityIs {
    async fn matches(&self, event: &Event) -> bool {
        let Some(payload) = event.as_state_changed() else {
            return false;
        };
        if is_glob(&self.entity_id) {
            glob_match(&self.entity_id, &payload.entity_id)
        } else {
            payload.entity_id == self.entity_id
        }
    }
}

/// Entity domain match, glob-aware.
#[derive(Debug, Clone)]
pub struct DomainIs {
    domain: String,
}

impl DomainIs {
    pub fn new(domain: impl Into<String>) -> Self {
        Self { domain: domain.into() }
    }
}

#[async_trait]
impl Predicate for DomainIs {
    async fn matches(&self, event: &Event) -> bool {
        let Some(payload) = event.as_state_changed() else {
            return false;
        };
        if is_glob(&self.domain) {
            glob_match(&self.domain, payload.domain())
        } else {
            payload.domain() == self.domain
        }
    }
}

/// The state value differs between old and new.
#[derive(Debug, Clone, Copy, Default)]
pub struct Changed;

#[async_trait]
impl Predicate for Changed {
    async fn matches(&self, event: &Event) -> bool {
        let Some(payload) = event.as_state_changed() else {
            return false;
        };
        payload.state_value_old() != payload.state_value_new()
    }
}

/// The old state value satisfies a condition. A missing old state (the
/// entity just appeared) is `None` for `Present`/`Missing` purposes.
#[derive(Debug, Clone)]
pub struct ChangedFrom {
    condition: Condition,
}

impl ChangedFrom {
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }
}

#[async_trait]
impl Predicate for ChangedFrom {
    async fn matches(&self, event: &Event) -> bool {
        let Some(payload) = event.as_state_changed() else {
            return false;
        };
        self.condition.matches(payload.state_value_old())
    }
}

/// The new state value satisfies a condition.
#[derive(Debug, Clone)]
pub struct ChangedTo {
    condition: Condition,
}

impl ChangedTo {
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }
}

#[async_trait]
impl Predicate for ChangedTo {
    async fn matches(&self, event: &Event) -> bool {
        let Some(payload) = event.as_state_changed() else {
            return false;
        };
        self.condition.matches(payload.state_value_new())
    }
}

/// A named attribute changed, optionally constrained on either side.
///
/// `from`/`to` of `None` leave that side unconstrained; use
/// `Condition::Missing`/`Condition::Present` to constrain existence.
#[derive(Debug, Clone)]
pub struct AttrChanged {
    name: String,
    from: Option<Condition>,
    to: Option<Condition>,
}

impl AttrChanged {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), from: None, to: None }
    }

    pub fn from(mut self, condition: Condition) -> Self {
        self.from = Some(condition);
        self
    }

    pub fn to(mut self, condition: Condition) -> Self {
        self.to = Some(condition);
        self
    }
}

#[async_trait]
impl Predicate for AttrChanged {
    async fn matches(&self, event: &Event) -> bool {
        let Some(payload) = event.as_state_changed() else {
            return false;
        };
        let old = payload.attr_old(&self.name);
        let new = payload.attr_new(&self.name);
        if old == new {
            return false;
        }
        if let Some(from) = &self.from {
            if !from.matches(old) {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if !to.matches(new) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
