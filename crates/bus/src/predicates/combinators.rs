// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Boolean combinators and guards.

use super::{Pred, Predicate};
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use hassette_core::Event;
use std::fmt;
use std::sync::Arc;

/// Short-circuit AND over the contained predicates.
#[derive(Debug)]
pub struct AllOf {
    predicates: Vec<Pred>,
}

impl AllOf {
    pub fn new(predicates: Vec<Pred>) -> Self {
        Self { predicates }
    }
}

#[async_trait]
impl Predicate for AllOf {
    async fn matches(&self, event: &Event) -> bool {
        for p in &self.predicates {
            if !p.matches(event).await {
                return false;
            }
        }
        true
    }
}

/// Short-circuit OR over the contained predicates.
#[derive(Debug)]
pub struct AnyOf {
    predicates: Vec<Pred>,
}

impl AnyOf {
    pub fn new(predicates: Vec<Pred>) -> Self {
        Self { predicates }
    }
}

#[async_trait]
impl Predicate for AnyOf {
    async fn matches(&self, event: &Event) -> bool {
        for p in &self.predicates {
            if p.matches(event).await {
                return true;
            }
        }
        false
    }
}

/// Negates the contained predicate.
#[derive(Debug)]
pub struct Not {
    predicate: Pred,
}

impl Not {
    pub fn new(predicate: Pred) -> Self {
        Self { predicate }
    }
}

#[async_trait]
impl Predicate for Not {
    async fn matches(&self, event: &Event) -> bool {
        !self.predicate.matches(event).await
    }
}

/// Wraps an arbitrary sync closure as a predicate.
pub struct Guard {
    f: Arc<dyn Fn(&Event) -> bool + Send + Sync>,
}

impl Guard {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl Predicate for Guard {
    async fn matches(&self, event: &Event) -> bool {
        (self.f)(event)
    }
}

impl fmt::Debug for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Guard")
    }
}

/// Wraps an async closure as a predicate.
pub struct AsyncGuard {
    f: Arc<dyn for<'a> Fn(&'a Event) -> BoxFuture<'a, bool> + Send + Sync>,
}

impl AsyncGuard {
    pub fn new<F>(f: F) -> Self
    where
        F: for<'a> Fn(&'a Event) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl Predicate for AsyncGuard {
    async fn matches(&self, event: &Event) -> bool {
        (self.f)(event).await
    }
}

impl fmt::Debug for AsyncGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncGuard")
    }
}

#[cfg(test)]
#[path = "combinators_tests.rs"]
mod tests;
