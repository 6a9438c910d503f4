// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn normalize_empty_is_no_filter() {
    assert!(normalize_where(vec![]).is_none());
}

#[tokio::test]
async fn normalize_single_is_passthrough() {
    let pred = normalize_where(vec![Arc::new(Guard::new(|_| true)) as Pred]);
    let event = Event::component_loaded("light");
    assert!(pred.is_some());
    if let Some(p) = pred {
        assert!(p.matches(&event).await);
    }
}

#[tokio::test]
async fn normalize_many_folds_to_all_of() {
    let preds: Vec<Pred> = vec![
        Arc::new(Guard::new(|_| true)),
        Arc::new(Guard::new(|event| event.topic().contains("component"))),
    ];
    let folded = normalize_where(preds);
    let event = Event::component_loaded("light");
    if let Some(p) = folded {
        assert!(p.matches(&event).await);
    }

    let preds: Vec<Pred> =
        vec![Arc::new(Guard::new(|_| true)), Arc::new(Guard::new(|_| false))];
    if let Some(p) = normalize_where(preds) {
        assert!(!p.matches(&event).await);
    }
}
