// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler behavior through the public facade.

use crate::support::{rig, rig_with};
use chrono::TimeZone;
use hassette_core::{Clock, FakeClock, HassetteConfig};
use hassette_scheduler::{CronArgs, JobFn};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn counting_job() -> (JobFn, Arc<AtomicUsize>) {
    let fired = Arc::new(AtomicUsize::new(0));
    let sink = Arc::clone(&fired);
    let job = JobFn::new(move || {
        let sink = Arc::clone(&sink);
        async move {
            sink.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(())
        }
    });
    (job, fired)
}

#[tokio::test]
async fn job_scheduled_during_sleep_fires_at_its_deadline() {
    let rig = rig().await;
    let scheduler = rig.hassette.scheduler("spec");

    // the scheduler loop is already asleep; a job due in 100ms must
    // not wait for the default delay
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (job, fired) = counting_job();
    let started = std::time::Instant::now();
    scheduler.run_in(job, Duration::from_millis(100), "late-add").await.unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(5));

    rig.hassette.stop().await;
}

#[tokio::test]
async fn cron_fires_on_whole_minute_boundaries() {
    // drive due-ness with a fake clock parked mid-minute
    let start = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 31).unwrap();
    let clock = Arc::new(FakeClock::new(start));
    let rig = rig_with(
        HassetteConfig::default(),
        Vec::new(),
        Some(Arc::clone(&clock) as Arc<dyn Clock>),
    )
    .await;

    let scheduler = rig.hassette.scheduler("spec");
    let (job, fired) = counting_job();
    let scheduled = scheduler
        .run_cron(job, CronArgs { minute: "*".into(), ..CronArgs::default() }, "every-minute")
        .await
        .unwrap();

    // first fire is the next whole minute
    assert_eq!(
        scheduled.next_run(),
        chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 1, 0).unwrap()
    );

    // cross the boundary and wake the loop
    clock.advance(chrono::Duration::seconds(30));
    rig.hassette.scheduler_service().kick();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // each subsequent fire is +60s
    clock.advance(chrono::Duration::seconds(60));
    rig.hassette.scheduler_service().kick();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 2);

    rig.hassette.stop().await;
}

#[tokio::test]
async fn repeating_job_survives_owner_isolation() {
    let rig = rig().await;
    let mine = rig.hassette.scheduler("app.mine");
    let theirs = rig.hassette.scheduler("app.theirs");

    let (job_a, fired_a) = counting_job();
    let (job_b, fired_b) = counting_job();
    mine.run_every(job_a, Duration::from_millis(100), None, "mine").await.unwrap();
    theirs.run_every(job_b, Duration::from_millis(100), None, "theirs").await.unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    mine.remove_all_jobs().await;
    let mine_count = fired_a.load(Ordering::SeqCst);

    tokio::time::sleep(Duration::from_millis(300)).await;
    // the swept owner stopped firing; the peer kept going
    assert_eq!(fired_a.load(Ordering::SeqCst), mine_count);
    assert!(fired_b.load(Ordering::SeqCst) > mine_count);

    rig.hassette.stop().await;
}
