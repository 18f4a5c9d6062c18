//! One scheduling tick
//!
//! A tick services the earliest-due channel: resolve which actions are
//! warranted right now, convert once, fan out, re-arm, then wait for the
//! entry's due time.

use std::sync::atomic::Ordering;

use contracts::{ActionKind, ActionSet, ChannelId, ContractError};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::driver::Driver;

/// Outcome of one tick
#[derive(Debug, Default)]
pub struct TickReport {
    /// Serviced channel; `None` when the queue was empty
    pub channel: Option<ChannelId>,
    /// Actions resolved for the tick
    pub requested: ActionSet,
    /// Actions actually fanned out
    pub dispatched: ActionSet,
    /// Record check lost the race for the recording lock
    pub record_skipped: bool,
    /// Whether the channel went back into the queue
    pub rearmed: bool,
    /// How late the tick started relative to the due time (ms)
    pub lateness_ms: f64,
    /// Acquisition or conversion failure
    pub error: Option<ContractError>,
}

impl TickReport {
    fn idle() -> Self {
        Self::default()
    }

    /// Nothing was queued; the tick only waited out the idle backoff
    pub fn is_idle(&self) -> bool {
        self.channel.is_none()
    }

    /// Acquisition or conversion failed; the channel still re-armed
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

impl Driver {
    /// Execute at most one unit of work
    ///
    /// With nothing queued, idles for the configured backoff. Otherwise the
    /// earliest entry is serviced and re-armed at `due + 1/frequency`
    /// (one-shot channels go dormant), and the call returns once the entry's
    /// due time has been reached. Failures are reported in the
    /// [`TickReport`]; the channel keeps its schedule.
    pub async fn tick(&self) -> TickReport {
        let shared = &self.shared;
        let mut registry = shared.registry.lock().await;

        let Some(entry) = registry.queue().peek() else {
            drop(registry);
            trace!("work queue empty");
            self.pause(shared.settings.idle_backoff).await;
            return TickReport::idle();
        };

        let Some(channel) = registry.channel(entry.index) else {
            registry.queue_mut().pop();
            warn!(index = entry.index, "queued index has no channel; entry dropped");
            return TickReport::idle();
        };
        let id = channel.id().clone();
        let frequency = channel.frequency();

        let mut report = TickReport {
            channel: Some(id.clone()),
            lateness_ms: Instant::now()
                .saturating_duration_since(entry.due)
                .as_secs_f64()
                * 1000.0,
            ..TickReport::default()
        };

        // Resolve actions
        if shared.publish_enabled.load(Ordering::SeqCst)
            && registry.publisher(&id).is_some_and(|p| p.is_subscribed())
        {
            report.requested.insert(ActionKind::Publish);
        }

        let recorder = registry.recorder(&id);
        let session = shared.recording.try_lock();
        match &session {
            Ok(session) => {
                if session.enabled && recorder.is_some_and(|r| r.is_subscribed()) {
                    report.requested.insert(ActionKind::Record);
                }
            }
            Err(_) if recorder.is_some() => {
                report.record_skipped = true;
                debug!(channel = %id, "recording lock busy; record skipped for this tick");
                observability::record_record_skipped(&id);
            }
            Err(_) => {}
        }

        if shared.log_enabled.load(Ordering::SeqCst) && recorder.is_some() && frequency > 0.0 {
            report.requested.insert(ActionKind::LogBuffer);
        }

        // Dispatch while still holding the recording guard, so no dump can
        // open or close the log under a Record callback
        let outcome = match registry.channel_mut(entry.index) {
            Some(channel) => channel.call_all(report.requested),
            None => Ok(ActionSet::empty()),
        };
        drop(session);

        match outcome {
            Ok(dispatched) => report.dispatched = dispatched,
            Err(e) => {
                warn!(channel = %id, error = %e, "channel tick failed");
                observability::record_channel_failure(&id);
                report.error = Some(e);
            }
        }

        // Re-arm
        let queue = registry.queue_mut();
        queue.pop();
        if let Some(next) = scheduler::rearm(entry.due, frequency) {
            report.rearmed = queue.push(next, entry.index);
        } else {
            debug!(channel = %id, frequency, "channel serviced; now dormant");
        }
        observability::record_queue_depth(queue.len());
        drop(registry);

        observability::record_tick(&id, report.dispatched, report.lateness_ms);
        trace!(channel = %id, requested = ?report.requested, dispatched = ?report.dispatched, "tick done");

        self.pause_until(entry.due).await;
        report
    }
}
