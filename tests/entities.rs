mod common;

use common::RecordingClient;
use ha_bind::{Button, Device, EntityKind, Error, Sensor};
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

fn connected_device(name: &str) -> (Device, RecordingClient) {
    let device = Device::new(name);
    let client = RecordingClient::new(60);
    device.connect(client.clone()).unwrap();
    (device, client)
}

#[test]
fn entity_requires_connected_device() {
    let device = Device::new("My Device");
    assert!(matches!(
        Sensor::new(&device, "CPU Frequency"),
        Err(Error::NotConnected)
    ));
    assert!(matches!(
        Button::new(&device, "Identify"),
        Err(Error::NotConnected)
    ));
    assert_eq!(device.entity_count(), 0);
}

#[test]
fn sensor_topics_and_discovery_payload() {
    let (device, client) = connected_device("My Device");
    let sensor = Sensor::with_fields(
        &device,
        "CPU Frequency",
        json!({"device_class": "frequency", "unit_of_measurement": "MHz"}),
    )
    .unwrap();

    let entity = sensor.entity();
    assert_eq!(entity.kind(), EntityKind::Sensor);
    assert_eq!(entity.slug(), "cpu_frequency");
    assert_eq!(entity.unique_id(), "my_device_cpu_frequency");
    assert_eq!(
        entity.discovery_topic(),
        "homeassistant/sensor/my_device/cpu_frequency/config"
    );
    assert_eq!(
        sensor.topic(),
        "homeassistant/sensor/my_device/state/cpu_frequency"
    );

    sensor.discover().unwrap();
    let published = client.publishes_to(entity.discovery_topic());
    assert_eq!(published.len(), 1);
    assert!(!published[0].retain);

    let payload: Value = serde_json::from_str(&published[0].payload).unwrap();
    assert_eq!(
        payload,
        json!({
            "name": "CPU Frequency",
            "dev": {"name": "My Device", "ids": "my_device"},
            "uniq_id": "my_device_cpu_frequency",
            "avty_t": "homeassistant/availability/my_device",
            "stat_t": "homeassistant/sensor/my_device/state/cpu_frequency",
            "device_class": "frequency",
            "unit_of_measurement": "MHz",
        })
    );
    assert_eq!(Value::Object(entity.config().clone()), payload);
}

#[test]
fn button_uses_command_topic_key() {
    let (device, client) = connected_device("My Device");
    let button =
        Button::with_fields(&device, "Identify", json!({"entity_category": "config"})).unwrap();

    assert_eq!(button.entity().kind(), EntityKind::Button);
    assert_eq!(
        button.topic(),
        "homeassistant/button/my_device/state/identify"
    );

    button.discover().unwrap();
    let published = client.publishes_to("homeassistant/button/my_device/identify/config");
    let payload: Value = serde_json::from_str(&published[0].payload).unwrap();
    assert_eq!(payload["cmd_t"], json!(button.topic()));
    assert_eq!(payload["entity_category"], json!("config"));
    assert!(payload.get("stat_t").is_none());
}

#[test]
fn device_metadata_is_embedded_verbatim() {
    let device = Device::builder("Kitchen Node")
        .metadata("mf", "Acme")
        .metadata("mdl", "K-1")
        .build();
    device.connect(RecordingClient::new(60)).unwrap();

    let sensor = Sensor::new(&device, "Temperature").unwrap();
    assert_eq!(
        Value::Object(sensor.entity().config()["dev"].as_object().unwrap().clone()),
        json!({"mf": "Acme", "mdl": "K-1", "name": "Kitchen Node", "ids": "kitchen_node"})
    );
}

#[test]
fn sensor_deduplicates_consecutive_values() {
    let (device, client) = connected_device("My Device");
    let mut sensor = Sensor::new(&device, "Signal Strength").unwrap();
    assert_eq!(sensor.last_payload(), None);

    assert!(sensor.publish("42").unwrap());
    assert!(!sensor.publish("42").unwrap());
    assert_eq!(client.publishes_to(sensor.topic()).len(), 1);

    assert!(sensor.publish("43").unwrap());
    let published = client.publishes_to(sensor.topic());
    assert_eq!(published.len(), 2);
    assert_eq!(published[1].payload, "43");
    assert!(!published[1].retain);
    assert_eq!(sensor.last_payload(), Some("43"));
}

#[test]
fn sensor_compares_string_form_not_number() {
    let (device, client) = connected_device("My Device");
    let mut sensor = Sensor::new(&device, "CPU Load").unwrap();

    sensor.publish(42.5).unwrap();
    sensor.publish("42.5").unwrap();
    sensor.publish("42.50").unwrap();

    let payloads: Vec<String> = client
        .publishes_to(sensor.topic())
        .into_iter()
        .map(|p| p.payload)
        .collect();
    assert_eq!(payloads, ["42.5", "42.50"]);
}

#[test]
fn empty_string_is_published_once() {
    let (device, client) = connected_device("My Device");
    let mut sensor = Sensor::new(&device, "Last Reset Cause").unwrap();

    assert!(sensor.publish("").unwrap());
    assert!(!sensor.publish("").unwrap());
    assert_eq!(client.publishes_to(sensor.topic()).len(), 1);
}

#[test]
fn failed_publish_keeps_previous_value() {
    let (device, client) = connected_device("My Device");
    let mut sensor = Sensor::new(&device, "Temperature").unwrap();
    sensor.publish(20).unwrap();

    client.set_fail_publish(true);
    assert!(sensor.publish(21).is_err());
    assert_eq!(sensor.last_payload(), Some("20"));

    client.set_fail_publish(false);
    assert!(sensor.publish(21).unwrap());
}

#[test]
fn button_action_receives_press() {
    let (device, client) = connected_device("My Device");
    let received = Arc::new(Mutex::new(Vec::new()));

    let button = Button::new(&device, "Identify").unwrap();
    let sink = Arc::clone(&received);
    button
        .set_action(move |payload| sink.lock().push(payload.to_string()))
        .unwrap();
    assert_eq!(client.subscriptions(), [button.topic().to_string()]);

    assert!(device.route_inbound(button.topic(), b"PRESS"));
    assert!(!device.route_inbound("homeassistant/button/my_device/state/other", b"PRESS"));

    assert_eq!(*received.lock(), ["PRESS"]);
}

#[test]
fn set_action_again_resubscribes_and_replaces() {
    let (device, client) = connected_device("My Device");
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    let button = Button::new(&device, "Update Firmware").unwrap();
    let counter = Arc::clone(&first);
    button
        .set_action(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let counter = Arc::clone(&second);
    button
        .set_action(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

    assert_eq!(client.subscriptions().len(), 2);
    device.route_inbound(button.topic(), b"PRESS");
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn sensor_and_button_with_same_name_do_not_collide() {
    let (device, _client) = connected_device("My Device");
    let sensor = Sensor::new(&device, "Pump").unwrap();
    let button = Button::new(&device, "Pump").unwrap();

    assert_ne!(sensor.topic(), button.topic());
    assert_eq!(sensor.entity().unique_id(), button.entity().unique_id());
}

#[test]
fn action_can_publish_sensor_state() {
    let (device, client) = connected_device("My Device");
    let sensor = Arc::new(Mutex::new(Sensor::new(&device, "Last Press").unwrap()));
    let button = Button::new(&device, "Press Me").unwrap();

    let target = Arc::clone(&sensor);
    button
        .set_action(move |payload| {
            target.lock().publish(payload).unwrap();
        })
        .unwrap();

    client.deliver(button.topic(), "PRESS");
    assert_eq!(device.tick().unwrap(), 1);

    let state_topic = sensor.lock().topic().to_string();
    assert_eq!(client.publishes_to(&state_topic).len(), 1);
}

#[test]
fn entity_outliving_device_reports_dropped() {
    let (device, _client) = connected_device("Short Lived");
    let mut sensor = Sensor::new(&device, "Temperature").unwrap();
    drop(device);

    assert!(matches!(sensor.publish(1), Err(Error::DeviceDropped)));
    assert!(matches!(sensor.discover(), Err(Error::DeviceDropped)));
    assert!(!sensor.entity().is_registered());
}

#[test]
fn timer_thread_publishes_while_loop_ticks() {
    let (device, client) = connected_device("My Device");
    let mut sensor = Sensor::new(&device, "Counter").unwrap();
    let button = Button::new(&device, "Identify").unwrap();
    let presses = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&presses);
    button
        .set_action(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
    let state_topic = sensor.topic().to_string();

    let publisher = thread::spawn(move || {
        for value in 0..200 {
            sensor.publish(value).unwrap();
        }
    });
    for _ in 0..200 {
        client.deliver(button.topic(), "PRESS");
        device.tick().unwrap();
    }
    publisher.join().unwrap();

    assert_eq!(client.publishes_to(&state_topic).len(), 200);
    assert_eq!(presses.load(Ordering::SeqCst), 200);
}
