use ha_bind::{Device, Sensor};
use serde_json::json;
use std::thread;
use std::time::Duration;
use sysinfo::System;
use tracing::{debug, error, info};

use crate::shutdown::ShutdownFlag;

/// One host reading at a point in time, already rounded for display.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemSnapshot {
    pub cpu_frequency_mhz: Option<u64>,
    pub cpu_load: f32,
    pub memory_free_percentage: f32,
    pub uptime_secs: u64,
}

impl SystemSnapshot {
    pub fn from_system(system: &System) -> Self {
        let cpu_frequency_mhz = system
            .cpus()
            .first()
            .map(|cpu| cpu.frequency())
            .filter(|&freq| freq > 0);

        let total_memory = system.total_memory();
        let free_percentage = if total_memory > 0 {
            system.available_memory() as f32 / total_memory as f32 * 100.0
        } else {
            0.0
        };

        Self {
            cpu_frequency_mhz,
            cpu_load: round_to_tenth(system.global_cpu_usage()),
            memory_free_percentage: round_to_tenth(free_percentage),
            uptime_secs: System::uptime(),
        }
    }
}

// Rounding keeps tiny fluctuations from defeating sensor de-duplication.
fn round_to_tenth(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Host diagnostics exposed as sensors on the device.
pub struct SystemMonitor {
    system: System,
    cpu_frequency: Sensor,
    cpu_load: Sensor,
    memory_free: Sensor,
    uptime: Sensor,
}

impl SystemMonitor {
    pub fn new(device: &Device) -> ha_bind::Result<Self> {
        let mut system = System::new();
        system.refresh_cpu_all();
        system.refresh_memory();

        Ok(Self {
            system,
            cpu_frequency: Sensor::with_fields(
                device,
                "CPU Frequency",
                json!({
                    "device_class": "frequency",
                    "unit_of_measurement": "MHz",
                    "entity_category": "diagnostic",
                }),
            )?,
            cpu_load: Sensor::with_fields(
                device,
                "CPU Load",
                json!({
                    "unit_of_measurement": "%",
                    "state_class": "measurement",
                    "entity_category": "diagnostic",
                }),
            )?,
            memory_free: Sensor::with_fields(
                device,
                "Memory Free",
                json!({
                    "unit_of_measurement": "%",
                    "state_class": "measurement",
                    "entity_category": "diagnostic",
                }),
            )?,
            uptime: Sensor::with_fields(
                device,
                "Uptime",
                json!({
                    "device_class": "duration",
                    "unit_of_measurement": "s",
                    "entity_category": "diagnostic",
                }),
            )?,
        })
    }

    pub fn publish(&mut self) -> ha_bind::Result<()> {
        self.system.refresh_cpu_all();
        self.system.refresh_memory();
        let snapshot = SystemSnapshot::from_system(&self.system);
        debug!("System snapshot: {:?}", snapshot);

        if let Some(freq) = snapshot.cpu_frequency_mhz {
            self.cpu_frequency.publish(freq)?;
        }
        self.cpu_load.publish(snapshot.cpu_load)?;
        self.memory_free.publish(snapshot.memory_free_percentage)?;
        self.uptime.publish(snapshot.uptime_secs)?;
        Ok(())
    }

    /// Publishes every `interval` on a dedicated thread until shutdown.
    pub fn spawn(
        mut self,
        interval: Duration,
        shutdown: ShutdownFlag,
    ) -> std::io::Result<thread::JoinHandle<()>> {
        thread::Builder::new()
            .name("system-monitor".to_string())
            .spawn(move || {
                info!("Starting system monitor, interval {:?}", interval);
                while !shutdown.is_requested() {
                    if let Err(e) = self.publish() {
                        error!("Failed to update system metrics: {}", e);
                    }
                    sleep_unless_shutdown(interval, &shutdown);
                }
                debug!("System monitor stopped");
            })
    }
}

fn sleep_unless_shutdown(total: Duration, shutdown: &ShutdownFlag) {
    const STEP: Duration = Duration::from_millis(250);
    let mut slept = Duration::ZERO;
    while slept < total && !shutdown.is_requested() {
        let step = STEP.min(total - slept);
        thread::sleep(step);
        slept += step;
    }
}
