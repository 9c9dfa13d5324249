use ha_bind::{Button, Device, RumqttcClient};
use serde_json::json;
use std::thread;
use std::time::Instant;
use tracing::{debug, error, info, warn};

mod commands;
mod shutdown;
mod system_monitor;
mod utils;

use commands::spawn_on_press;
use shutdown::ShutdownFlag;
use system_monitor::SystemMonitor;
use utils::{init_tracing, Config, VersionInfo};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    init_tracing(&config.log_level)?;

    let builder = Device::builder(&config.hostname).discovery_prefix(&config.discovery_prefix);
    let device = VersionInfo::get()
        .describe(builder, config.manufacturer.as_deref(), config.model.as_deref())
        .build();

    info!("Starting agent for device '{}'", device.id());
    info!(
        "Connecting to MQTT broker: {}:{}",
        config.mqtt_url, config.mqtt_port
    );
    device.connect(RumqttcClient::new(config.mqtt_options(device.id()))?)?;

    let identify = Button::with_fields(
        &device,
        "Identify",
        json!({"device_class": "identify", "entity_category": "config"}),
    )?;
    let name = device.name().to_string();
    identify.set_action(move |_payload| info!("Identify requested for '{}'", name))?;

    let mut command_buttons = Vec::new();
    for button in config.button.iter().flatten() {
        let command_button = Button::new(&device, &button.name)?;
        command_button.set_action(spawn_on_press(button.exec.clone()))?;
        command_buttons.push(command_button);
    }
    debug!("Registered {} command button(s)", command_buttons.len());

    let monitor = SystemMonitor::new(&device)?;

    device.discover_all()?;
    let mut last_discovery = Instant::now();

    let shutdown = ShutdownFlag::install()?;
    let monitor_handle = monitor.spawn(config.update_interval(), shutdown.clone())?;

    let mut recovering = false;
    while !shutdown.is_requested() {
        match device.tick() {
            Ok(dispatched) => {
                if dispatched > 0 {
                    debug!("Dispatched {} message(s)", dispatched);
                }
                if recovering {
                    recovering = !recover(&device);
                }
            }
            Err(e) if recovering => debug!("Still waiting for broker: {}", e),
            Err(e) => {
                error!("MQTT error: {}", e);
                recovering = true;
            }
        }

        if last_discovery.elapsed() >= config.discovery_interval() {
            if let Err(e) = device.discover_all() {
                warn!("Failed to refresh discovery: {}", e);
            }
            last_discovery = Instant::now();
        }

        thread::sleep(config.loop_interval());
    }

    info!("Performing graceful shutdown...");
    if monitor_handle.join().is_err() {
        error!("System monitor thread panicked");
    }
    if let Err(e) = device.shutdown() {
        error!("Error during shutdown: {}", e);
    }
    info!("Graceful shutdown completed");
    Ok(())
}

/// Restores availability, subscriptions and discovery after the connection
/// dropped. Returns true once everything was republished.
fn recover(device: &Device) -> bool {
    let restored = device
        .announce_online()
        .and_then(|()| device.resubscribe_all())
        .and_then(|subscribed| {
            debug!("Re-subscribed {} topic(s)", subscribed);
            device.discover_all()
        });

    match restored {
        Ok(()) => {
            info!("Connection restored, device '{}' is online", device.id());
            true
        }
        Err(e) => {
            warn!("Failed to restore device state: {}", e);
            false
        }
    }
}
