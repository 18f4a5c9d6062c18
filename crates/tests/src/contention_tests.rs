//! A tick racing an in-progress dump.

use std::sync::Arc;
use std::time::Duration;

use contracts::{ActionKind, DataType};
use driver::{Driver, DriverSettings};
use sinks::{MemoryLogStorage, MemoryTransport};

use crate::support::{topics, GatedStorage};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn tick_skips_record_during_dump_but_keeps_other_actions() {
    let memory = Arc::new(acquisition::MockMemory::with_values([(
        "Sonar",
        contracts::Value::Float(0.4),
    )]));
    let transport = Arc::new(MemoryTransport::new("memory"));
    let storage = Arc::new(MemoryLogStorage::new());
    let (gated, gate) = GatedStorage::new(storage.clone(), "snap");
    let driver = Driver::new(DriverSettings::default(), memory, transport.clone(), Arc::new(gated));

    driver.register_dynamic_channel("Sonar", 50.0, DataType::None).await.unwrap();
    transport.add_listener("Sonar");
    driver.start_publishing().await;
    let first = driver.start_recording().await.unwrap();

    let report = driver.tick().await;
    assert!(report.dispatched.contains(ActionKind::Record));

    // Hold a dump inside its critical section
    let dumper = driver.clone();
    let dump = tokio::spawn(async move { dumper.dump("snap").await });
    let entered = gate.entered;
    tokio::task::spawn_blocking(move || entered.recv())
        .await
        .unwrap()
        .unwrap();

    let published_before = transport.delivered_on("Sonar").len();
    let report = driver.tick().await;
    assert!(report.record_skipped);
    assert!(!report.dispatched.contains(ActionKind::Record));
    assert!(report.dispatched.contains(ActionKind::Publish));
    assert!(report.dispatched.contains(ActionKind::LogBuffer));
    assert_eq!(transport.delivered_on("Sonar").len(), published_before + 1);

    gate.release.send(()).unwrap();
    let location = dump.await.unwrap().unwrap();
    assert_eq!(topics(&storage, &location), vec!["Sonar"]);

    // recording resumes into a fresh log
    assert!(driver.is_recording());
    let resumed = driver.recorder().location().unwrap();
    assert_ne!(resumed, first);
    let report = driver.tick().await;
    assert!(!report.record_skipped);
    assert!(report.dispatched.contains(ActionKind::Record));
    assert_eq!(storage.messages(&resumed).len(), 1);
}

/// A registration racing `start_recording` waits until the session is set up
/// and stays out of it
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn registration_during_recording_start_is_ordered() {
    let memory = Arc::new(acquisition::MockMemory::with_values([
        ("Sonar", contracts::Value::Float(0.4)),
        ("Battery", contracts::Value::Float(0.9)),
    ]));
    let storage = Arc::new(MemoryLogStorage::new());
    let prefix = DriverSettings::default().record_prefix;
    let (gated, gate) = GatedStorage::new(storage.clone(), &prefix);
    let driver = Driver::new(
        DriverSettings::default(),
        memory,
        Arc::new(MemoryTransport::new("memory")),
        Arc::new(gated),
    );
    driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();

    // Hold start_recording while it opens its log
    let starter = driver.clone();
    let start = tokio::spawn(async move { starter.start_recording().await });
    let entered = gate.entered;
    tokio::task::spawn_blocking(move || entered.recv())
        .await
        .unwrap()
        .unwrap();

    let registrar = driver.clone();
    let register = tokio::spawn(async move {
        registrar
            .register_dynamic_channel("Battery", 10.0, DataType::None)
            .await
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!register.is_finished());

    gate.release.send(()).unwrap();
    start.await.unwrap().unwrap();
    register.await.unwrap().unwrap();

    let (sonar, battery) = driver
        .with_registry(|reg| {
            (
                reg.recorder("Sonar").map(|rec| rec.is_subscribed()),
                reg.recorder("Battery").map(|rec| rec.is_subscribed()),
            )
        })
        .await;
    assert_eq!(sonar, Some(true));
    assert_eq!(battery, Some(false));
}
