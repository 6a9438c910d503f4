// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::resource::start_service;
use chrono::TimeZone;
use hassette_core::{FakeClock, SystemClock};
use hassette_scheduler::{CronArgs, JobFn};
use parking_lot::Mutex as PlMutex;
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};

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

async fn rig(clock: Arc<dyn Clock>) -> Arc<SchedulerService> {
    let mut config = HassetteConfig::default();
    config.scheduler_min_delay_seconds = 0.005;
    let (sink, _ingress) = EventSink::channel();
    let service = SchedulerService::new(sink, clock, &config);
    start_service(&service).await.unwrap();
    service
}

#[tokio::test]
async fn one_shot_job_fires_at_its_deadline() {
    let service = rig(Arc::new(SystemClock)).await;
    let handle = service.handle("test");
    let (job, fired) = counting_job();

    handle.run_in(job, Duration::from_millis(100), "one-shot").await.unwrap();

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(service.queue().is_empty().await);
}

#[tokio::test]
async fn job_added_during_sleep_wakes_the_loop() {
    let service = rig(Arc::new(SystemClock)).await;
    let handle = service.handle("test");

    // the loop is asleep on the default delay (30s); a job scheduled
    // mid-sleep for +100ms must fire at ~100ms, not at the default
    tokio::time::sleep(Duration::from_millis(50)).await;
    let (job, fired) = counting_job();
    let started = std::time::Instant::now();
    handle.run_in(job, Duration::from_millis(100), "mid-sleep").await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn earlier_job_fires_before_later_job() {
    let service = rig(Arc::new(SystemClock)).await;
    let handle = service.handle("test");

    let order: Arc<PlMutex<Vec<&'static str>>> = Arc::new(PlMutex::new(Vec::new()));
    for (name, delay) in [("late", 250u64), ("early", 100)] {
        let order = Arc::clone(&order);
        let job = JobFn::new(move || {
            let order = Arc::clone(&order);
            async move {
                order.lock().push(name);
                Ok::<_, Infallible>(())
            }
        });
        handle.run_in(job, Duration::from_millis(delay), name).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(*order.lock(), vec!["early", "late"]);
}

#[tokio::test]
async fn interval_job_keeps_firing_and_requeues() {
    let service = rig(Arc::new(SystemClock)).await;
    let handle = service.handle("test");
    let (job, fired) = counting_job();

    handle.run_every(job, Duration::from_millis(150), None, "tick").await.unwrap();

    tokio::time::sleep(Duration::from_millis(550)).await;
    let count = fired.load(Ordering::SeqCst);
    assert!((2..=4).contains(&count), "expected ~3 fires, got {count}");
    // still queued for the next run
    assert_eq!(service.queue().len().await, 1);
}

#[tokio::test]
async fn cron_job_fires_on_minute_boundaries() {
    // fake clock just before a whole minute; the loop's due-ness is
    // driven by the fake clock while kicks keep it re-evaluating
    let start = chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 58).unwrap();
    let clock = Arc::new(FakeClock::new(start));
    let service = rig(Arc::clone(&clock) as Arc<dyn Clock>).await;
    let handle = service.handle("test");
    let (job, fired) = counting_job();

    let scheduled = handle
        .run_cron(job, CronArgs { minute: "*".into(), ..CronArgs::default() }, "every-minute")
        .await
        .unwrap();
    // first fire lands on the next whole minute
    assert_eq!(
        scheduled.next_run(),
        chrono::Utc.with_ymd_and_hms(2025, 6, 1, 12, 1, 0).unwrap()
    );

    clock.advance(chrono::Duration::seconds(3));
    service.kick();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    // subsequent fires are +60s apart
    clock.advance(chrono::Duration::seconds(30));
    service.kick();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);

    clock.advance(chrono::Duration::seconds(30));
    service.kick();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cancelled_job_is_skipped_at_dispatch() {
    let service = rig(Arc::new(SystemClock)).await;
    let handle = service.handle("test");
    let (job, fired) = counting_job();

    let scheduled = handle.run_in(job, Duration::from_millis(80), "doomed").await.unwrap();
    scheduled.cancel();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remove_all_jobs_sweeps_an_owner() {
    let service = rig(Arc::new(SystemClock)).await;
    let mine = service.handle("app.mine");
    let theirs = service.handle("app.theirs");

    let (job_a, fired_a) = counting_job();
    let (job_b, fired_b) = counting_job();
    mine.run_in(job_a, Duration::from_millis(100), "a").await.unwrap();
    theirs.run_in(job_b, Duration::from_millis(100), "b").await.unwrap();

    assert_eq!(mine.remove_all_jobs().await, 1);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fired_a.load(Ordering::SeqCst), 0);
    assert_eq!(fired_b.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_job_does_not_stop_the_scheduler() {
    let service = rig(Arc::new(SystemClock)).await;
    let handle = service.handle("test");

    let bad = JobFn::new(|| async { Err::<(), _>(std::io::Error::other("job exploded")) });
    handle.run_in(bad, Duration::from_millis(50), "bad").await.unwrap();

    let (job, fired) = counting_job();
    handle.run_in(job, Duration::from_millis(150), "good").await.unwrap();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}
