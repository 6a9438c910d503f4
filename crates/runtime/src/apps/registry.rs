// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App registry: compile-time replacement for dynamic class loading.
//!
//! A factory validates an instance config and builds the app. Lookup
//! or validation failures fill the per-app failure slot in the handler
//! without affecting peer apps.

use super::{App, AppError};
use crate::error::RuntimeError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Builds instances of one app class from raw config values.
pub trait AppFactory: Send + Sync {
    fn class_name(&self) -> &str;

    /// Development flag: run only this app (at most one enabled app may
    /// claim it).
    fn only(&self) -> bool {
        false
    }

    /// Validate the config and construct the app.
    fn build(&self, config: &Value) -> Result<Box<dyn App>, AppError>;
}

struct FnFactory<F> {
    class_name: String,
    only: bool,
    build: F,
}

impl<F> AppFactory for FnFactory<F>
where
    F: Fn(&Value) -> Result<Box<dyn App>, AppError> + Send + Sync,
{
    fn class_name(&self) -> &str {
        &self.class_name
    }

    fn only(&self) -> bool {
        self.only
    }

    fn build(&self, config: &Value) -> Result<Box<dyn App>, AppError> {
        (self.build)(config)
    }
}

/// Registered app factories keyed by class name.
#[derive(Default)]
pub struct AppRegistry {
    factories: HashMap<String, Arc<dyn AppFactory>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Arc<dyn AppFactory>) -> Result<(), RuntimeError> {
        let name = factory.class_name().to_string();
        if self.factories.contains_key(&name) {
            return Err(RuntimeError::Config(format!("app class '{name}' is already registered")));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Register an app with a typed config: the raw table is
    /// deserialized into `C` and handed to `build`.
    pub fn register_app<C, A, F>(
        &mut self,
        class_name: &str,
        build: F,
    ) -> Result<(), RuntimeError>
    where
        C: DeserializeOwned + 'static,
        A: App + 'static,
        F: Fn(C) -> A + Send + Sync + 'static,
    {
        self.register_app_with(class_name, false, build)
    }

    /// As [`register_app`](Self::register_app), with the `only` flag.
    pub fn register_app_with<C, A, F>(
        &mut self,
        class_name: &str,
        only: bool,
        build: F,
    ) -> Result<(), RuntimeError>
    where
        C: DeserializeOwned + 'static,
        A: App + 'static,
        F: Fn(C) -> A + Send + Sync + 'static,
    {
        let factory = FnFactory {
            class_name: class_name.to_string(),
            only,
            build: move |value: &Value| -> Result<Box<dyn App>, AppError> {
                let config: C = serde_json::from_value(value.clone())
                    .map_err(|e| -> AppError { Box::new(e) })?;
                Ok(Box::new(build(config)))
            },
        };
        self.register(Arc::new(factory))
    }

    pub fn get(&self, class_name: &str) -> Option<Arc<dyn AppFactory>> {
        self.factories.get(class_name).cloned()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
