//! Device discovery documents built from real components and published through a writer.

use async_trait::async_trait;
use hassync_core::codec::{display_marshaler, from_str_unmarshaler};
use hassync_core::{RemoteValue, TransportError, Value, WriteOptions, Writer};
use hassync_discovery::{
    Availability, BinarySensor, Component, Components, Device, DiscoveryError, FieldErrorKind,
    Light, PowerState,
};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;

#[derive(Default)]
struct RecordingWriter {
    writes: Mutex<Vec<(String, WriteOptions, Vec<u8>)>>,
}

#[async_trait]
impl Writer for RecordingWriter {
    async fn write_topic(
        &self,
        topic: &str,
        options: WriteOptions,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        self.writes.lock().push((topic.to_string(), options, payload));
        Ok(())
    }
}

fn availability() -> Arc<Value<Availability>> {
    Arc::new(Value::with_options(
        "available",
        Some(display_marshaler()),
        WriteOptions::retained(),
    ))
}

fn light() -> Component<Light> {
    let command = Arc::new(RemoteValue::new("command", from_str_unmarshaler::<PowerState>()));
    let mut light = Light::new(command);
    light.state = Some(Arc::new(Value::new("state", Some(display_marshaler()))));

    Component::new("desk.lamp", "hassync/desk_lamp", availability(), light).with_name("Lamp")
}

fn presence() -> Component<BinarySensor<()>> {
    let state = Arc::new(Value::new("state", Some(display_marshaler())));
    Component::new(
        "desk.presence",
        "hassync/desk_presence",
        availability(),
        BinarySensor::new(state, None),
    )
}

fn device() -> Device {
    Device {
        name: "Desk".to_string(),
        identifiers: vec!["hassync/desk".to_string()],
        ..Device::default()
    }
}

#[tokio::test]
async fn configure_publishes_retained_document() {
    let writer = RecordingWriter::default();
    let light = light();
    let presence = presence();

    let mut components = Components::new();
    components.insert(light.unique_id.clone(), &light);
    components.insert(presence.unique_id.clone(), &presence);

    tokio_test::assert_ok!(device().configure(&writer, "homeassistant", &components).await);

    let writes = writer.writes.lock();
    assert_eq!(writes.len(), 1);
    let (topic, options, payload) = &writes[0];
    assert_eq!(topic, "homeassistant/device/hassync__desk__Desk/config");
    assert!(options.retain);

    let document: JsonValue = serde_json::from_slice(payload).unwrap();
    assert_eq!(document["dev"], json!({ "name": "Desk", "ids": ["hassync/desk"] }));
    assert_eq!(document["o"]["name"], "hassync");
    assert_eq!(
        document["cmps"]["desk.lamp"],
        json!({
            "p": "light",
            "name": "Lamp",
            "avty_t": "hassync/desk_lamp/available",
            "uniq_id": "desk.lamp",
            "cmd_t": "hassync/desk_lamp/command",
            "stat_t": "hassync/desk_lamp/state",
        })
    );
    assert_eq!(document["cmps"]["desk.presence"]["p"], "binary_sensor");
    assert_eq!(document["cmps"]["desk.presence"]["name"], JsonValue::Null);
    assert_eq!(
        document["cmps"]["desk.presence"]["stat_t"],
        "hassync/desk_presence/state"
    );
}

#[tokio::test]
async fn invalid_device_writes_nothing() {
    let writer = RecordingWriter::default();
    let light = light();
    let mut components = Components::new();
    components.insert(light.unique_id.clone(), &light);

    let result = Device::default()
        .configure(&writer, "homeassistant", &components)
        .await;

    assert_eq!(result, Err(DiscoveryError::InvalidDevice));
    assert!(writer.writes.lock().is_empty());
}

#[tokio::test]
async fn every_missing_field_is_reported() {
    let writer = RecordingWriter::default();
    let mut light = light();
    light.unique_id = String::new();
    light.availability = None;

    let mut components = Components::new();
    components.insert("lamp".to_string(), &light);

    let err = device()
        .configure(&writer, "homeassistant", &components)
        .await
        .unwrap_err();

    let DiscoveryError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert_eq!(errors.len(), 2);
    assert!(errors.contains_field("lamp.availability", &FieldErrorKind::TopicRequired));
    assert!(errors.contains_field("lamp.unique id", &FieldErrorKind::ValueRequired));
    assert!(writer.writes.lock().is_empty());
}

#[test]
fn half_configured_pair_is_rejected() {
    let mut lamp = light();
    lamp.platform.brightness = Some(Arc::new(Value::new("brightness", Some(display_marshaler()))));

    let err = {
        let mut components = Components::new();
        components.insert(lamp.unique_id.clone(), &lamp);
        device().document(&components).unwrap_err()
    };
    let DiscoveryError::Validation(errors) = err else {
        panic!("expected validation errors, got {err:?}");
    };
    assert!(errors.contains(&FieldErrorKind::MissingPairedTopic));

    lamp.platform.brightness_command = Some(Arc::new(RemoteValue::new(
        "brightness/set",
        from_str_unmarshaler(),
    )));
    let mut components = Components::new();
    components.insert(lamp.unique_id.clone(), &lamp);
    let document = device().document(&components).unwrap();

    let record = &document["cmps"]["desk.lamp"];
    assert_eq!(record["bri_stat_t"], "hassync/desk_lamp/brightness");
    assert_eq!(record["bri_cmd_t"], "hassync/desk_lamp/brightness/set");
}

#[test]
fn removed_component_leaves_platform_marker() {
    let light = light();
    let removal = light.for_removal();

    let mut components = Components::new();
    components.insert(light.unique_id.clone(), &removal);
    let document = device().document(&components).unwrap();

    assert_eq!(document["cmps"], json!({ "desk.lamp": { "platform": "light" } }));
}

#[test]
fn discovery_topic_uses_sanitized_id() {
    let device = Device {
        identifiers: vec!["acme:lamp 1".to_string()],
        model: "L.1".to_string(),
        ..Device::default()
    };

    assert_eq!(device.id(), "acme__lamp__1__L__1");
    assert_eq!(
        device.discovery_topic("homeassistant"),
        "homeassistant/device/acme__lamp__1__L__1/config"
    );
}
