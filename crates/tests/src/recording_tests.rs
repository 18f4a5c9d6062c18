//! Recording controller: start/stop, dump, dump restricted to names.

use std::sync::Arc;

use acquisition::MockMemory;
use contracts::{now_secs, DataType, LogStorage, Payload, StampedMessage, Value};
use driver::{Driver, DriverError, DriverSettings, DumpOutcome};
use sinks::{MemoryLogStorage, MemoryTransport};

use crate::support::{rig, rig_with, topics, FlakyStorage};

#[tokio::test(start_paused = true)]
async fn round_trip_records_channels_subscribed_at_start() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    r.driver.register_dynamic_channel("Battery", 10.0, DataType::None).await.unwrap();

    let location = r.driver.start_recording().await.unwrap();
    assert!(!location.is_empty());

    // registered after the start: not part of this recording
    r.driver.add_info_channel(&["Body/Type".to_string()]).await.unwrap();

    for _ in 0..9 {
        r.driver.tick().await;
    }
    let closed = r.driver.stop_recording().await.unwrap();

    assert_eq!(closed, location);
    assert_eq!(topics(&r.storage, &location), vec!["Battery", "Sonar"]);
}

#[tokio::test(start_paused = true)]
async fn dump_refused_while_logging_disabled() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    r.driver.tick().await;
    r.driver.stop_logging().await;

    let err = r.driver.dump("snap").await.unwrap_err();
    assert!(matches!(err, DriverError::LoggingDisabled));
    assert!(err.to_string().contains("disabled"));
    assert_eq!(r.storage.opened_count(), 0);
    assert!(r.storage.list().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn dump_refused_below_storage_threshold_keeps_recording() {
    let settings = DriverSettings {
        max_folder_bytes: 10_000,
        ..DriverSettings::default()
    };
    let r = rig_with(settings);
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    let location = r.driver.start_recording().await.unwrap();
    r.driver.tick().await;

    r.storage.set_usage_bytes(50_000);
    let err = r.driver.dump("snap").await.unwrap_err();

    assert!(matches!(err, DriverError::InsufficientStorage { .. }));
    assert_eq!(r.storage.opened_count(), 1);
    assert!(r.driver.is_recording());
    assert_eq!(r.driver.recorder().location(), Some(location));
    let subscribed = r
        .driver
        .with_registry(|reg| reg.recorder("Sonar").map(|rec| rec.is_subscribed()))
        .await;
    assert_eq!(subscribed, Some(true));
}

#[tokio::test(start_paused = true)]
async fn dump_named_without_match_opens_nothing() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    r.driver.tick().await;

    let outcome = r
        .driver
        .dump_named("snap", &["camera".to_string(), "lidar".to_string()])
        .await
        .unwrap();

    assert_eq!(outcome, DumpOutcome::NothingMatched);
    assert_eq!(r.storage.opened_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dump_named_writes_only_that_channel() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    r.driver.register_dynamic_channel("Battery", 10.0, DataType::None).await.unwrap();
    for _ in 0..6 {
        r.driver.tick().await;
    }
    let buffered = r
        .driver
        .with_registry(|reg| reg.recorder("Battery").map(|rec| rec.buffer_len()))
        .await
        .unwrap();

    let outcome = r
        .driver
        .dump_named("snap", &["Battery".to_string()])
        .await
        .unwrap();
    let DumpOutcome::Written(location) = outcome else {
        panic!("expected a written dump");
    };

    assert_eq!(r.storage.opened_count(), 1);
    let messages = r.storage.messages(&location);
    assert_eq!(messages.len(), buffered);
    assert!(messages.iter().all(|m| m.topic == "Battery"));
}

#[tokio::test]
async fn buffer_duration_bounds_dumped_history() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    r.driver.set_buffer_duration(5.0).await.unwrap();

    let recorder = r
        .driver
        .with_registry(|reg| reg.recorder("Sonar").cloned())
        .await
        .unwrap();
    let now = now_secs();
    recorder.bufferize(&StampedMessage::new("Sonar", now - 10.0, Payload::Float { data: 1.0 }));
    recorder.bufferize(&StampedMessage::new("Sonar", now - 3.0, Payload::Float { data: 2.0 }));

    let location = r.driver.dump("snap").await.unwrap();
    let messages = r.storage.messages(&location);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].payload, Payload::Float { data: 2.0 });
}

#[tokio::test]
async fn dump_includes_event_history() {
    let r = rig();
    let runner = r.driver.clone();
    let handle = tokio::spawn(async move { runner.run().await });
    while !r.driver.is_running() {
        tokio::task::yield_now().await;
    }

    r.driver.register_dynamic_event("Bumper", DataType::None).await.unwrap();
    r.memory.raise_event("Bumper", Value::Float(1.0));
    r.memory.raise_event("Bumper", Value::Float(0.0));

    let location = r.driver.dump("bump").await.unwrap();
    let bumps: Vec<_> = r
        .storage
        .messages(&location)
        .into_iter()
        .filter(|m| m.topic == "Bumper")
        .collect();
    assert_eq!(bumps.len(), 2);

    r.driver.shutdown().await;
    handle.await.unwrap();
}

/// The dump lands, but reopening the interrupted recording fails: the caller
/// hears about both
#[tokio::test(start_paused = true)]
async fn dump_reports_lost_recording() {
    let memory = Arc::new(MockMemory::with_values([("Sonar", Value::Float(0.5))]));
    let storage = Arc::new(MemoryLogStorage::new());
    // opens: recording, dump, restore
    let flaky = Arc::new(FlakyStorage::new(storage.clone(), 3));
    let driver = Driver::new(
        DriverSettings::default(),
        memory,
        Arc::new(MemoryTransport::new("memory")),
        flaky,
    );
    driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    driver.tick().await;
    driver.start_recording().await.unwrap();

    let err = driver.dump("snap").await.unwrap_err();
    let DriverError::RestoreFailed { dump, .. } = err else {
        panic!("expected a restore failure");
    };
    assert_eq!(topics(&storage, &dump), vec!["Sonar"]);

    assert!(!driver.is_recording());
    assert!(!driver.recorder().is_started());
    let subscribed = driver
        .with_registry(|reg| reg.recorder("Sonar").map(|rec| rec.is_subscribed()))
        .await;
    assert_eq!(subscribed, Some(false));
    assert!(matches!(driver.stop_recording().await, Err(DriverError::NotRecording)));
}
