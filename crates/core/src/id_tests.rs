// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn listener_ids_are_monotonic() {
    let a = next_listener_id();
    let b = next_listener_id();
    let c = next_listener_id();
    assert!(a < b);
    assert!(b < c);
}

#[test]
fn job_ids_are_monotonic() {
    let a = next_job_id();
    let b = next_job_id();
    assert!(a < b);
}

#[test]
fn short_uid_is_8_hex_chars() {
    let id = short_uid();
    assert_eq!(id.len(), 8);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn unique_name_has_prefix() {
    let name = unique_name("bus");
    assert!(name.starts_with("bus."));
    assert_eq!(name.len(), "bus.".len() + 8);
}
