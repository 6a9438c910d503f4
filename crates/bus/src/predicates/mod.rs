// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Predicate algebra for event filtering.
//!
//! Predicates run before a handler is invoked and decide whether the
//! event is delivered. Evaluation is async because guards may await;
//! the built-in predicates answer synchronously.

mod combinators;
mod conditions;
mod state;

pub use combinators::{AllOf, AnyOf, AsyncGuard, Guard, Not};
pub use conditions::Condition;
pub use state::{AttrChanged, Changed, ChangedFrom, ChangedTo, DomainIs, EntityIs};

use async_trait::async_trait;
use hassette_core::Event;
use std::fmt;
use std::sync::Arc;

/// A filter evaluated against an event before dispatch.
#[async_trait]
pub trait Predicate: Send + Sync + fmt::Debug {
    async fn matches(&self, event: &Event) -> bool;
}

/// Shared predicate handle as stored on listeners.
pub type Pred = Arc<dyn Predicate>;

/// Fold a `where` list into a single predicate: empty means no filter,
/// one is used as-is, several are AND-ed.
pub fn normalize_where(mut predicates: Vec<Pred>) -> Option<Pred> {
    match predicates.len() {
        0 => None,
        1 => predicates.pop(),
        _ => Some(Arc::new(AllOf::new(predicates))),
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
