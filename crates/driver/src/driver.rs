//! Driver - the scheduling loop, its shared state and the operator toggles

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use contracts::{DriverConfig, LogStorage, MemoryProxy, Transport, TransportBinding};
use events::EventSource;
use scheduler::Channel;
use sinks::{GlobalRecorder, PublishEndpoint, RecordEndpoint};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use crate::error::DriverError;
use crate::recording::RecordingSession;
use crate::registry::Registry;
use crate::tick::TickReport;

/// Runtime settings derived from the boot configuration
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSettings {
    /// Sleep when nothing is registered
    pub idle_backoff: Duration,
    /// Prefix of logs opened by `start_recording`
    pub record_prefix: String,
    /// Initial in-memory retention (s)
    pub buffer_duration_s: f64,
    /// Upper bound on buffered items per second and channel
    pub buffer_frequency_hz: f64,
    /// Durable storage budget
    pub max_folder_bytes: u64,
    /// Start publishing as soon as the driver is wired
    pub publish_on_start: bool,
    /// Buffer history from the first tick
    pub log_on_start: bool,
}

impl From<&DriverConfig> for DriverSettings {
    fn from(config: &DriverConfig) -> Self {
        Self {
            idle_backoff: Duration::from_millis(config.scheduler.idle_backoff_ms),
            record_prefix: config.recording.prefix.clone(),
            buffer_duration_s: config.recording.buffer_duration_s,
            buffer_frequency_hz: config.recording.buffer_frequency_hz,
            max_folder_bytes: config.recording.max_folder_bytes,
            publish_on_start: config.scheduler.publish_on_start,
            log_on_start: config.scheduler.log_on_start,
        }
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from(&DriverConfig::default())
    }
}

/// State shared by every clone of a [`Driver`]
pub(crate) struct Shared {
    pub(crate) settings: DriverSettings,
    /// Work queue and collections; one lock for both
    pub(crate) registry: Mutex<Registry>,
    /// Recording lock; the tick only ever `try_lock`s it
    pub(crate) recording: Mutex<RecordingSession>,
    pub(crate) recorder: Arc<GlobalRecorder>,
    pub(crate) storage: Arc<dyn LogStorage>,
    pub(crate) memory: Arc<dyn MemoryProxy>,
    pub(crate) transport: RwLock<Arc<dyn Transport>>,
    pub(crate) publish_enabled: AtomicBool,
    pub(crate) log_enabled: AtomicBool,
    /// Mirror of the session flag, readable without the recording lock
    pub(crate) recording_active: AtomicBool,
    pub(crate) keep_running: AtomicBool,
    /// f64 bits of the current buffer retention
    pub(crate) buffer_duration: AtomicU64,
    pub(crate) wake: Notify,
}

/// Handle to the driver core
///
/// Cheap to clone; every clone drives the same registry and recording state,
/// so one task can run the loop while others issue operator commands.
#[derive(Clone)]
pub struct Driver {
    pub(crate) shared: Arc<Shared>,
}

impl std::fmt::Debug for Driver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("running", &self.is_running())
            .field("publishing", &self.is_publishing())
            .field("logging", &self.is_logging())
            .field("recording", &self.is_recording())
            .field("buffer_duration", &self.buffer_duration())
            .finish()
    }
}

impl Driver {
    /// Driver over the given collaborators; nothing registered, loop idle
    pub fn new(
        settings: DriverSettings,
        memory: Arc<dyn MemoryProxy>,
        transport: Arc<dyn Transport>,
        storage: Arc<dyn LogStorage>,
    ) -> Self {
        let recorder = Arc::new(GlobalRecorder::new(Arc::clone(&storage)));
        let shared = Shared {
            publish_enabled: AtomicBool::new(false),
            log_enabled: AtomicBool::new(settings.log_on_start),
            recording_active: AtomicBool::new(false),
            keep_running: AtomicBool::new(false),
            buffer_duration: AtomicU64::new(settings.buffer_duration_s.to_bits()),
            registry: Mutex::new(Registry::new()),
            recording: Mutex::new(RecordingSession::default()),
            recorder,
            storage,
            memory,
            transport: RwLock::new(transport),
            wake: Notify::new(),
            settings,
        };
        Self {
            shared: Arc::new(shared),
        }
    }

    /// Settings fixed at construction
    pub fn settings(&self) -> &DriverSettings {
        &self.shared.settings
    }

    /// Shared durable-log writer
    pub fn recorder(&self) -> &Arc<GlobalRecorder> {
        &self.shared.recorder
    }

    /// Acquisition collaborator
    pub fn memory(&self) -> &Arc<dyn MemoryProxy> {
        &self.shared.memory
    }

    /// Transport new publish endpoints bind to
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(
            &self
                .shared
                .transport
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    // ========================================================================
    // Loop lifecycle
    // ========================================================================

    /// Run the scheduling loop until [`Driver::stop`]
    pub async fn run(&self) {
        self.run_with(|_| {}).await;
    }

    /// Run the scheduling loop, handing every tick report to `observer`
    ///
    /// Once [`Driver::stop`] is observed the current tick completes, every
    /// event source is stopped and the registry is cleared before returning.
    /// An open recording is left to [`Driver::shutdown`].
    #[instrument(name = "driver_run", skip(self, observer))]
    pub async fn run_with<F>(&self, mut observer: F)
    where
        F: FnMut(&TickReport),
    {
        self.shared.keep_running.store(true, Ordering::SeqCst);
        self.start_events().await;
        info!("scheduling loop started");

        while self.is_running() {
            let report = self.tick().await;
            observer(&report);
        }

        self.unregister_all().await;
        info!("scheduling loop stopped");
    }

    /// Ask the loop to return after the current tick
    pub fn stop(&self) {
        if self.shared.keep_running.swap(false, Ordering::SeqCst) {
            info!("scheduling loop stop requested");
        }
        self.shared.wake.notify_one();
    }

    /// Keep-running flag of the scheduling loop
    pub fn is_running(&self) -> bool {
        self.shared.keep_running.load(Ordering::SeqCst)
    }

    /// Close an active recording, stop the loop and clear the registry
    ///
    /// The recording is closed first, while its endpoints are still
    /// registered. Returns the location of the recording closed on the way,
    /// if any.
    #[instrument(name = "driver_shutdown", skip(self))]
    pub async fn shutdown(&self) -> Option<String> {
        let location = if self.is_recording() {
            match self.stop_recording().await {
                Ok(location) => Some(location),
                Err(e) => {
                    warn!(error = %e, "could not close recording on shutdown");
                    None
                }
            }
        } else {
            None
        };
        self.stop();
        self.unregister_all().await;
        info!("driver shut down");
        location
    }

    /// Sleep for `duration`, cut short by [`Driver::stop`]
    pub(crate) async fn pause(&self, duration: Duration) {
        self.pause_until(Instant::now() + duration).await;
    }

    pub(crate) async fn pause_until(&self, deadline: Instant) {
        if deadline <= Instant::now() {
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = self.shared.wake.notified() => {}
        }
    }

    pub(crate) async fn start_events(&self) {
        let registry = self.shared.registry.lock().await;
        let publishing = self.is_publishing();
        for event in registry.events() {
            event.set_publishing(publishing);
            event.start();
        }
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register a prebuilt channel with optional sink endpoints
    pub async fn register(
        &self,
        channel: Channel,
        publisher: Option<Arc<PublishEndpoint>>,
        recorder: Option<Arc<RecordEndpoint>>,
    ) -> Result<usize, DriverError> {
        let mut registry = self.shared.registry.lock().await;
        let index = registry.register(channel, publisher, recorder, Instant::now())?;
        observability::record_registry_size(registry.channel_count(), registry.event_count());
        Ok(index)
    }

    /// Register an event source
    ///
    /// The source inherits the current logging, publishing and buffer
    /// settings, and starts at once if the loop is running.
    pub async fn register_event(&self, event: Arc<EventSource>) -> Result<(), DriverError> {
        event.set_buffer_duration(self.buffer_duration());
        event.set_logging(self.is_logging());
        event.set_publishing(self.is_publishing());

        let mut registry = self.shared.registry.lock().await;
        registry.register_event(Arc::clone(&event))?;
        observability::record_registry_size(registry.channel_count(), registry.event_count());
        drop(registry);

        if self.is_running() {
            event.start();
        }
        Ok(())
    }

    /// Register an inbound subscriber; `false` when the name is taken
    pub async fn register_subscriber(&self, binding: Arc<dyn TransportBinding>) -> bool {
        self.shared.registry.lock().await.register_subscriber(binding)
    }

    /// Register a remote-procedure service; `false` when the name is taken
    pub async fn register_service(&self, binding: Arc<dyn TransportBinding>) -> bool {
        self.shared.registry.lock().await.register_service(binding)
    }

    /// Stop every event source and clear the registry; idempotent
    pub async fn unregister_all(&self) {
        self.shared.registry.lock().await.unregister_all();
        observability::record_registry_size(0, 0);
    }

    /// Rebind every transport-facing endpoint to `transport`
    ///
    /// Later registrations bind to it as well.
    pub async fn reset_bindings(&self, transport: Arc<dyn Transport>) -> usize {
        let mut registry = self.shared.registry.lock().await;
        *self
            .shared
            .transport
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::clone(&transport);
        registry.reset_bindings(&transport)
    }

    /// Publish endpoint bound to the current transport
    pub fn publish_endpoint(&self, name: &str) -> Arc<PublishEndpoint> {
        Arc::new(PublishEndpoint::new(name, name, self.transport()))
    }

    /// Record endpoint on the shared recorder, sized for `frequency`
    pub fn record_endpoint(&self, name: &str, frequency: f64) -> Arc<RecordEndpoint> {
        Arc::new(RecordEndpoint::new(
            name,
            Arc::clone(&self.shared.recorder),
            frequency,
            self.shared.settings.buffer_frequency_hz,
            self.buffer_duration(),
        ))
    }

    /// Run `f` against the registry under the registry lock
    pub async fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        let registry = self.shared.registry.lock().await;
        f(&registry)
    }

    // ========================================================================
    // Operator toggles
    // ========================================================================

    #[instrument(name = "driver_start_publishing", skip(self))]
    pub async fn start_publishing(&self) {
        self.set_publishing(true).await;
    }

    #[instrument(name = "driver_stop_publishing", skip(self))]
    pub async fn stop_publishing(&self) {
        self.set_publishing(false).await;
    }

    async fn set_publishing(&self, publishing: bool) {
        let registry = self.shared.registry.lock().await;
        if self.shared.publish_enabled.swap(publishing, Ordering::SeqCst) != publishing {
            info!(publishing, "publishing toggled");
        }
        for event in registry.events() {
            event.set_publishing(publishing);
        }
    }

    /// Global publish-enabled flag
    pub fn is_publishing(&self) -> bool {
        self.shared.publish_enabled.load(Ordering::SeqCst)
    }

    #[instrument(name = "driver_start_logging", skip(self))]
    pub async fn start_logging(&self) {
        self.set_logging(true).await;
    }

    #[instrument(name = "driver_stop_logging", skip(self))]
    pub async fn stop_logging(&self) {
        self.set_logging(false).await;
    }

    async fn set_logging(&self, logging: bool) {
        let registry = self.shared.registry.lock().await;
        if self.shared.log_enabled.swap(logging, Ordering::SeqCst) != logging {
            info!(logging, "log buffering toggled");
        }
        for event in registry.events() {
            event.set_logging(logging);
        }
    }

    /// Global log-buffer flag
    pub fn is_logging(&self) -> bool {
        self.shared.log_enabled.load(Ordering::SeqCst)
    }

    /// Whether a recording session is active
    pub fn is_recording(&self) -> bool {
        self.shared.recording_active.load(Ordering::SeqCst)
    }

    /// Apply a new buffer retention to every record endpoint and event source
    ///
    /// Older items leave the buffers on their next append.
    #[instrument(name = "driver_set_buffer_duration", skip(self))]
    pub async fn set_buffer_duration(&self, seconds: f64) -> Result<(), DriverError> {
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(contracts::ContractError::config_validation(
                "buffer_duration",
                format!("must be a positive number of seconds, got {seconds}"),
            )
            .into());
        }
        let registry = self.shared.registry.lock().await;
        self.shared
            .buffer_duration
            .store(seconds.to_bits(), Ordering::SeqCst);
        for recorder in registry.recorders() {
            recorder.set_buffer_duration(seconds);
        }
        for event in registry.events() {
            event.set_buffer_duration(seconds);
        }
        info!(seconds, "buffer duration set");
        Ok(())
    }

    /// Current buffer retention (s)
    pub fn buffer_duration(&self) -> f64 {
        f64::from_bits(self.shared.buffer_duration.load(Ordering::SeqCst))
    }

    /// Names of every channel and event source, sorted
    pub async fn available_channels(&self) -> Vec<String> {
        self.with_registry(Registry::available_channels).await
    }

    /// Topics with an active publish consumer, sorted
    pub async fn subscribed_publishers(&self) -> Vec<String> {
        self.with_registry(Registry::subscribed_publishers).await
    }
}
