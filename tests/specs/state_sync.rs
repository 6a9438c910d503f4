// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State proxy synchronization across disconnects.

use crate::support::{rig_with, settle, state_change};
use hassette_core::{EntityState, HassetteConfig};
use hassette_runtime::Lifecycle;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn disconnect_invalidates_and_reconnect_resyncs() {
    let rig = rig_with(HassetteConfig::default(), Vec::new(), None).await;
    let proxy = Arc::clone(rig.hassette.state_proxy());

    // initial sync happened on connect (empty upstream)
    proxy.resource().wait_ready(Duration::from_secs(2)).await.unwrap();

    // pre-populate through the event stream
    rig.feed.send(state_change("light.a", None, Some("on"))).await.unwrap();
    settle().await;
    assert_eq!(
        proxy.get_state("light.a").unwrap().map(|s| s.state.clone()),
        Some(serde_json::json!("on"))
    );

    // drop the session: remote close, no replacement scripted yet
    drop(rig.feed);
    tokio::time::sleep(Duration::from_millis(200)).await;

    // cache cleared, proxy not ready, reads refuse to answer
    assert!(proxy.is_empty());
    assert!(!proxy.resource().is_ready());
    assert!(proxy.get_state("light.a").is_err());

    // upstream recovers with an authoritative snapshot
    *rig.api.states.lock().unwrap() = vec![
        EntityState::new("light.a", "off"),
        EntityState::new("light.b", "on"),
    ];
    let _feed = rig.transport.add_session();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(proxy.resource().is_ready());
    assert_eq!(proxy.len(), 2);
    assert_eq!(
        proxy.get_state("light.a").unwrap().map(|s| s.state.clone()),
        Some(serde_json::json!("off"))
    );
    assert_eq!(
        proxy.get_state("light.b").unwrap().map(|s| s.state.clone()),
        Some(serde_json::json!("on"))
    );

    rig.hassette.stop().await;
}

#[tokio::test]
async fn health_reflects_the_websocket_state() {
    // no /healthz here (the port is shared across tests); the flag the
    // endpoint reads is asserted directly
    let rig = rig_with(HassetteConfig::default(), Vec::new(), None).await;
    assert!(rig.hassette.websocket().is_connected());

    drop(rig.feed);
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!rig.hassette.websocket().is_connected());

    rig.hassette.stop().await;
}
