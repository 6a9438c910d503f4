// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{TimeZone, Utc};
use std::convert::Infallible;

fn noop() -> JobFn {
    JobFn::new(|| async { Ok::<_, Infallible>(()) })
}

fn at(secs: u32, nanos: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, secs)
        .unwrap()
        .with_nanosecond(nanos)
        .unwrap()
}

#[test]
fn next_run_is_floored_to_the_second() {
    let job = ScheduledJob::new("owner", "job", at(5, 750_000_000), noop(), None, false);
    assert_eq!(job.next_run(), at(5, 0));
}

#[test]
fn sort_key_orders_by_due_time_first() {
    let early = ScheduledJob::new("o", "early", at(5, 0), noop(), None, false);
    let late = ScheduledJob::new("o", "late", at(6, 0), noop(), None, false);
    assert!(early.sort_key() < late.sort_key());
}

#[test]
fn sort_key_breaks_second_ties_with_nanos() {
    // both floor to :05 but carry different sub-second fractions
    let a = ScheduledJob::new("o", "a", at(5, 900_000_000), noop(), None, false);
    let b = ScheduledJob::new("o", "b", at(5, 100_000_000), noop(), None, false);
    assert!(b.sort_key() < a.sort_key());
}

#[test]
fn sort_key_breaks_full_ties_with_job_id() {
    let a = ScheduledJob::new("o", "a", at(5, 0), noop(), None, false);
    let b = ScheduledJob::new("o", "b", at(5, 0), noop(), None, false);
    // a was created first, so its id is lower
    assert!(a.sort_key() < b.sort_key());
}

#[test]
fn cancel_is_sticky() {
    let job = ScheduledJob::new("o", "x", at(5, 0), noop(), None, true);
    assert!(!job.is_cancelled());
    job.cancel();
    assert!(job.is_cancelled());
    job.cancel();
    assert!(job.is_cancelled());
}

#[tokio::test]
async fn run_invokes_the_callable() {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let job = ScheduledJob::new(
        "o",
        "count",
        at(5, 0),
        JobFn::new(move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(())
            }
        }),
        None,
        false,
    );
    job.run().await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
