//! Robot simulator
//!
//! Animates a [`MockMemory`] from a background thread: battery drain, noisy
//! sonars, joint angles and occasional bumper presses raised as events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use contracts::Value;
use rand::Rng;
use tracing::{debug, info};

use crate::MockMemory;

/// Memory keys populated by the simulator
pub mod keys {
    pub const BODY_TYPE: &str = "RobotConfig/Body/Type";
    pub const BASE_VERSION: &str = "RobotConfig/Body/BaseVersion";
    pub const BATTERY: &str = "Device/SubDeviceList/Battery/Charge/Sensor/Value";
    pub const SONAR_FRONT: &str = "Device/SubDeviceList/Platform/Front/Sonar/Sensor/Value";
    pub const SONAR_BACK: &str = "Device/SubDeviceList/Platform/Back/Sonar/Sensor/Value";
    pub const HEAD_YAW: &str = "Device/SubDeviceList/HeadYaw/Position/Sensor/Value";
    pub const HEAD_TEMPERATURE: &str = "Diagnosis/Temperature/HeadYaw/Level";
    pub const MOVE_ACTIVE: &str = "ALMotion/MoveActive";
    pub const RIGHT_BUMPER: &str = "RightBumperPressed";
    pub const LEFT_BUMPER: &str = "LeftBumperPressed";
}

/// Simulator configuration
#[derive(Debug, Clone)]
pub struct SimulatorConfig {
    /// Update frequency (Hz)
    pub frequency_hz: f64,
    /// Probability of a bumper event per update
    pub bumper_probability: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            frequency_hz: 20.0,
            bumper_probability: 0.02,
        }
    }
}

/// Background robot simulator
pub struct RobotSimulator {
    memory: Arc<MockMemory>,
    config: SimulatorConfig,
    running: Arc<AtomicBool>,
}

impl RobotSimulator {
    pub fn new(memory: Arc<MockMemory>, config: SimulatorConfig) -> Self {
        Self {
            memory,
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Write the initial value of every simulated key
    pub fn seed(memory: &MockMemory) {
        memory.set(keys::BODY_TYPE, Value::Str("pepper".into()));
        memory.set(keys::BASE_VERSION, Value::Str("1.8a".into()));
        memory.set(keys::BATTERY, Value::Float(1.0));
        memory.set(keys::SONAR_FRONT, Value::Float(2.5));
        memory.set(keys::SONAR_BACK, Value::Float(2.5));
        memory.set(keys::HEAD_YAW, Value::Float(0.0));
        memory.set(keys::HEAD_TEMPERATURE, Value::Int(0));
        memory.set(keys::MOVE_ACTIVE, Value::Bool(false));
        memory.set(keys::RIGHT_BUMPER, Value::Float(0.0));
        memory.set(keys::LEFT_BUMPER, Value::Float(0.0));
    }

    pub fn memory(&self) -> &Arc<MockMemory> {
        &self.memory
    }

    /// Start the update thread; idempotent
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        Self::seed(&self.memory);

        let memory = Arc::clone(&self.memory);
        let config = self.config.clone();
        let running = Arc::clone(&self.running);
        let frequency = if config.frequency_hz > 0.0 { config.frequency_hz } else { 20.0 };
        let interval = Duration::from_secs_f64(1.0 / frequency);

        thread::spawn(move || {
            let mut rng = rand::rng();
            let mut step: u64 = 0;
            let mut battery = 1.0_f64;

            debug!(frequency_hz = frequency, "robot simulator started");

            while running.load(Ordering::Relaxed) {
                step += 1;
                let t = step as f64 / frequency;

                battery = (battery - 0.0001).max(0.05);
                memory.set(keys::BATTERY, Value::Float(battery));
                memory.set(
                    keys::SONAR_FRONT,
                    Value::Float(2.0 + rng.random_range(-0.05..0.05)),
                );
                memory.set(
                    keys::SONAR_BACK,
                    Value::Float(1.5 + rng.random_range(-0.05..0.05)),
                );
                memory.set(keys::HEAD_YAW, Value::Float((t * 0.5).sin()));
                memory.set(keys::HEAD_TEMPERATURE, Value::Int(((t / 60.0) as i64).min(3)));
                memory.set(keys::MOVE_ACTIVE, Value::Bool((t as u64 / 10) % 2 == 1));

                if rng.random_bool(config.bumper_probability.clamp(0.0, 1.0)) {
                    let key = if rng.random_bool(0.5) {
                        keys::RIGHT_BUMPER
                    } else {
                        keys::LEFT_BUMPER
                    };
                    memory.raise_event(key, Value::Float(1.0));
                    memory.raise_event(key, Value::Float(0.0));
                }

                thread::sleep(interval);
            }

            debug!(steps = step, "robot simulator stopped");
        });
        info!(frequency_hz = frequency, "robot simulator running");
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }
}

impl Drop for RobotSimulator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{MemoryProxy, PushSource};
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_seed_populates_keys() {
        let memory = MockMemory::new();
        RobotSimulator::seed(&memory);
        assert_eq!(memory.get_data(keys::BATTERY).unwrap(), Value::Float(1.0));
        assert_eq!(memory.keys().len(), 10);
    }

    #[test]
    fn test_simulator_updates_and_raises_events() {
        let memory = Arc::new(MockMemory::new());
        let watch = memory.subscribe(keys::RIGHT_BUMPER);
        let events = Arc::new(AtomicU64::new(0));
        let e = events.clone();
        watch.listen(Arc::new(move |_| {
            e.fetch_add(1, Ordering::Relaxed);
        }));
        let watch_left = memory.subscribe(keys::LEFT_BUMPER);
        let e = events.clone();
        watch_left.listen(Arc::new(move |_| {
            e.fetch_add(1, Ordering::Relaxed);
        }));

        let sim = RobotSimulator::new(
            memory.clone(),
            SimulatorConfig {
                frequency_hz: 200.0,
                bumper_probability: 1.0,
            },
        );
        sim.start();
        thread::sleep(Duration::from_millis(50));
        sim.stop();

        assert!(!sim.is_running());
        assert!(events.load(Ordering::Relaxed) > 0);
        let Value::Float(battery) = memory.get_data(keys::BATTERY).unwrap() else {
            panic!("battery is a float");
        };
        assert!(battery < 1.0);
    }
}
