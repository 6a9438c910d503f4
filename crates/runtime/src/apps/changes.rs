// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! App change-set computation.
//!
//! Pure diff between two manifest maps plus the set of changed source
//! paths. The handler applies the result in order: stop orphans, start
//! new, reimport changed sources, reload changed configs.

use hassette_core::AppManifest;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AppChangeSet {
    /// Present before, gone now.
    pub removed_apps: BTreeSet<String>,
    /// Same app key, fewer instance configs now.
    pub removed_instances: BTreeMap<String, BTreeSet<usize>>,
    /// Absent before, present now.
    pub new_apps: BTreeSet<String>,
    /// Same app key, more instance configs now.
    pub new_instances: BTreeMap<String, BTreeSet<usize>>,
    /// Source file on disk changed; the whole app restarts.
    pub reimport_apps: BTreeSet<String>,
    /// Manifest metadata changed (filename, enabled, display name...).
    pub reload_apps: BTreeSet<String>,
    /// Only a subset of per-instance configs changed.
    pub reload_instances: BTreeMap<String, BTreeSet<usize>>,
}

impl AppChangeSet {
    pub fn is_empty(&self) -> bool {
        self.removed_apps.is_empty()
            && self.removed_instances.is_empty()
            && self.new_apps.is_empty()
            && self.new_instances.is_empty()
            && self.reimport_apps.is_empty()
            && self.reload_apps.is_empty()
            && self.reload_instances.is_empty()
    }
}

/// Diff two manifest maps. `changed_paths` are resolved file paths from
/// the watcher; `only_app` filters the current view the same way boot
/// does.
pub fn compute_change_set(
    original: &BTreeMap<String, AppManifest>,
    current: &BTreeMap<String, AppManifest>,
    changed_paths: &[PathBuf],
    app_dir: &Path,
    only_app: Option<&str>,
) -> AppChangeSet {
    let mut changes = AppChangeSet::default();

    let original_keys: BTreeSet<&String> = original.keys().collect();
    let current_keys: BTreeSet<&String> = current
        .keys()
        .filter(|k| only_app.is_none_or(|only| only == k.as_str()))
        .collect();

    changes.removed_apps =
        original_keys.difference(&current_keys).map(|k| (*k).clone()).collect();
    changes.new_apps = current_keys.difference(&original_keys).map(|k| (*k).clone()).collect();

    changes.reimport_apps = current_keys
        .iter()
        .filter(|k| {
            let manifest = &current[**k];
            changed_paths.iter().any(|p| *p == manifest.full_path(app_dir))
        })
        .map(|k| (*k).clone())
        .collect();

    for key in original_keys.intersection(&current_keys) {
        if changes.reimport_apps.contains(key.as_str()) {
            continue;
        }
        let before = &original[*key];
        let after = &current[*key];

        if !before.metadata_eq(after) {
            changes.reload_apps.insert((*key).clone());
        }

        let before_len = before.app_config.len();
        let after_len = after.app_config.len();

        if after_len > before_len {
            changes.new_instances.insert((*key).clone(), (before_len..after_len).collect());
        }
        if before_len > after_len {
            changes.removed_instances.insert((*key).clone(), (after_len..before_len).collect());
        }

        let changed: BTreeSet<usize> = (0..before_len.min(after_len))
            .filter(|&idx| before.app_config[idx] != after.app_config[idx])
            .collect();
        if !changed.is_empty() {
            changes.reload_instances.insert((*key).clone(), changed);
        }
    }

    changes
}

#[cfg(test)]
#[path = "changes_tests.rs"]
mod tests;
