//! Scheduler properties observed through the public driver surface.

use std::collections::BTreeSet;
use std::time::Duration;

use contracts::{ActionKind, DataType};
use tokio::time::Instant;

use crate::support::rig;

/// The queue holds exactly one entry per live channel after every tick
#[tokio::test(start_paused = true)]
async fn queue_tracks_live_channels() {
    let r = rig();
    r.driver.add_info_channel(&["Body/Type".to_string()]).await.unwrap();
    for (key, hz) in [("Sonar", 50.0), ("Battery", 20.0), ("Bumper", 5.0)] {
        r.driver.register_dynamic_channel(key, hz, DataType::None).await.unwrap();
    }
    let info = r.driver.with_registry(|reg| reg.index_of("info")).await.unwrap();
    let all: BTreeSet<usize> = (0..4).collect();

    let mut info_serviced = 0;
    for _ in 0..100 {
        let report = r.driver.tick().await;
        if report.channel.as_deref() == Some("info") {
            info_serviced += 1;
        }

        let mut live = all.clone();
        if info_serviced > 0 {
            live.remove(&info);
        }
        let queued = r.driver.with_registry(|reg| reg.queue().indices()).await;
        assert_eq!(queued, live.into_iter().collect::<Vec<_>>());
    }
    assert_eq!(info_serviced, 1);
}

#[tokio::test(start_paused = true)]
async fn one_shot_channel_never_returns() {
    let r = rig();
    r.driver.add_info_channel(&["Body/Type".to_string()]).await.unwrap();
    r.driver.start_publishing().await;

    let report = r.driver.tick().await;
    assert_eq!(report.channel.as_deref(), Some("info"));
    assert!(!report.rearmed);

    for _ in 0..5 {
        assert!(r.driver.tick().await.is_idle());
    }
    // latched topic: delivered without any listener
    assert_eq!(r.transport.delivered_on("info").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn channels_fire_at_their_own_rates() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 20.0, DataType::None).await.unwrap();
    r.driver.register_dynamic_channel("Battery", 5.0, DataType::None).await.unwrap();
    r.transport.add_listener("Sonar");
    r.transport.add_listener("Battery");
    r.driver.start_publishing().await;

    // due times below one second: 20 for Sonar, 5 for Battery
    let start = Instant::now();
    for _ in 0..25 {
        let report = r.driver.tick().await;
        assert!(report.dispatched.contains(ActionKind::Publish));
    }
    assert!(start.elapsed() < Duration::from_secs(1));

    assert_eq!(r.transport.delivered_on("Sonar").len(), 20);
    assert_eq!(r.transport.delivered_on("Battery").len(), 5);
}

#[tokio::test(start_paused = true)]
async fn stop_publishing_twice_is_idempotent() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    r.transport.add_listener("Sonar");
    r.driver.start_publishing().await;

    r.driver.stop_publishing().await;
    let after_first = (r.driver.is_publishing(), r.driver.subscribed_publishers().await);
    r.driver.stop_publishing().await;
    let after_second = (r.driver.is_publishing(), r.driver.subscribed_publishers().await);
    assert_eq!(after_first, after_second);
    assert!(!after_second.0);

    let report = r.driver.tick().await;
    assert!(!report.dispatched.contains(ActionKind::Publish));
    assert!(r.transport.delivered().is_empty());
}

#[tokio::test(start_paused = true)]
async fn unregister_all_twice_is_idempotent() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    r.driver.register_dynamic_event("Bumper", DataType::None).await.unwrap();

    r.driver.unregister_all().await;
    let after_first = r
        .driver
        .with_registry(|reg| (reg.channel_count(), reg.event_count(), reg.queue().len()))
        .await;
    r.driver.unregister_all().await;
    let after_second = r
        .driver
        .with_registry(|reg| (reg.channel_count(), reg.event_count(), reg.queue().len()))
        .await;

    assert_eq!(after_first, (0, 0, 0));
    assert_eq!(after_first, after_second);
    assert!(r.driver.available_channels().await.is_empty());
    assert!(r.driver.tick().await.is_idle());
}

/// Leaving the loop stops event capture and empties the registry
#[tokio::test(start_paused = true)]
async fn loop_exit_clears_registry() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    let runner = r.driver.clone();
    let handle = tokio::spawn(async move { runner.run().await });
    while !r.driver.is_running() {
        tokio::task::yield_now().await;
    }
    r.driver.register_dynamic_event("Bumper", DataType::None).await.unwrap();
    let bumper = r
        .driver
        .with_registry(|reg| reg.event("Bumper").cloned())
        .await
        .unwrap();
    assert!(bumper.is_running());

    tokio::time::sleep(Duration::from_millis(250)).await;
    r.driver.stop();
    handle.await.unwrap();

    assert!(!bumper.is_running());
    assert!(r.driver.available_channels().await.is_empty());
    assert!(r.driver.with_registry(|reg| reg.is_empty()).await);
}
