//! Boot from a configuration file, then drive the wired channels.

use std::io::Write;
use std::sync::Arc;

use config_loader::ConfigLoader;
use contracts::{ActionKind, DataType, Transport, TransportBinding, Value};
use driver::{Driver, DriverSettings};
use sinks::{MemoryLogStorage, MemoryTransport};

use crate::support::rig;

const CONFIG: &str = r#"
[scheduler]
idle_backoff_ms = 50
publish_on_start = true

[recording]
buffer_duration_s = 5.0
buffer_frequency_hz = "fast"

[info]
keys = ["Body/Type"]

[[channels]]
name = "battery"
key = "Battery"
frequency_hz = 10.0

[[channels]]
name = "ghost"
key = "Nowhere"

[[channels]]
name = "sonar"
key = "Sonar"
frequency_hz = -1.0

[[events]]
name = "bumper"
key = "Bumper"
data_type = "float"
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test(start_paused = true)]
async fn boot_config_wires_what_it_can() {
    let file = write_config(CONFIG);
    let config = ConfigLoader::load_boot_config(Some(file.path()));
    // malformed option falls back to its default
    assert_eq!(config.recording.buffer_frequency_hz, 10.0);
    assert_eq!(config.recording.buffer_duration_s, 5.0);

    let memory = Arc::new(acquisition::MockMemory::with_values([
        ("Battery", Value::Float(0.8)),
        ("Bumper", Value::Float(0.0)),
        ("Body/Type", Value::Str("humanoid".into())),
    ]));
    let transport = Arc::new(MemoryTransport::new("memory"));
    transport.add_listener("battery");
    let driver = Driver::new(
        DriverSettings::from(&config),
        memory,
        transport.clone(),
        Arc::new(MemoryLogStorage::new()),
    );

    let report = driver.wire(&config).await;
    assert_eq!(report.channels, vec!["info", "battery"]);
    assert_eq!(report.events, vec!["bumper"]);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].0, "ghost");
    assert!(driver.is_publishing());
    assert_eq!(driver.buffer_duration(), 5.0);
    assert_eq!(
        driver.available_channels().await,
        vec!["battery", "bumper", "info"]
    );

    let mut published = 0;
    for _ in 0..6 {
        let report = driver.tick().await;
        if report.dispatched.contains(ActionKind::Publish) {
            published += 1;
        }
    }
    assert_eq!(published, 6);
    assert_eq!(transport.delivered_on("info").len(), 1);
    assert_eq!(transport.delivered_on("battery").len(), 5);
}

#[tokio::test(start_paused = true)]
async fn memory_list_channel_from_file() {
    let r = rig();
    let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
    write!(file, r#"{{ "topic": "vitals", "frequency": 5, "memKeys": ["Sonar", "Battery"] }}"#).unwrap();

    let topic = r.driver.add_memory_channels(file.path()).await.unwrap();
    assert_eq!(topic, "vitals");
    r.transport.add_listener("vitals");
    r.driver.start_publishing().await;

    let report = r.driver.tick().await;
    assert!(report.dispatched.contains(ActionKind::Publish));
    assert_eq!(r.transport.delivered_on("vitals").len(), 1);
}

#[tokio::test]
async fn dynamic_registration_rejects_unknown_keys() {
    let r = rig();
    let err = r
        .driver
        .register_dynamic_channel("Missing/Key", 10.0, DataType::None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Missing/Key"));
    assert!(r.driver.with_registry(|reg| reg.is_empty()).await);

    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    assert!(r
        .driver
        .register_dynamic_channel("Sonar", 10.0, DataType::None)
        .await
        .is_err());
}

/// Inbound binding that counts rebinds
#[derive(Default)]
struct Counted {
    rebinds: std::sync::atomic::AtomicUsize,
}

impl TransportBinding for Counted {
    fn name(&self) -> &str {
        "teleop"
    }

    fn rebind(&self, _transport: Arc<dyn Transport>) {
        self.rebinds.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}

#[tokio::test(start_paused = true)]
async fn reset_bindings_moves_publishing_to_new_transport() {
    let r = rig();
    r.driver.register_dynamic_channel("Sonar", 10.0, DataType::None).await.unwrap();
    let binding = Arc::new(Counted::default());
    assert!(r.driver.register_subscriber(binding.clone()).await);
    assert!(!r.driver.register_subscriber(binding.clone()).await);

    let replacement = Arc::new(MemoryTransport::new("replacement"));
    replacement.add_listener("Sonar");
    r.transport.add_listener("Sonar");
    r.driver.start_publishing().await;

    r.driver.reset_bindings(replacement.clone()).await;
    assert_eq!(binding.rebinds.load(std::sync::atomic::Ordering::SeqCst), 1);

    r.driver.tick().await;
    assert!(r.transport.delivered().is_empty());
    assert_eq!(replacement.delivered_on("Sonar").len(), 1);
}
