//! Devices and the device discovery document.
//!
//! A [`Device`] groups components. Its discovery document is published
//! retained to `<discovery prefix>/device/<id>/config`:
//!
//! ```json
//! { "dev": { ... }, "o": { ... }, "cmps": { "<unique id>": { ... } } }
//! ```
//!
//! See <https://www.home-assistant.io/integrations/mqtt/#device-discovery-payload>.

use crate::builder::{DocumentBuilder, ValidationErrors};
use crate::component::Discoverable;
use crate::fields::{self, sanitize_id, ID_SEPARATOR};
use hassync_core::{join_topic, TransportError, WriteOptions, Writer};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Components of one discovery document keyed by unique id.
pub type Components<'a> = BTreeMap<String, &'a dyn Discoverable>;

/// A connection of a device to the outside world, e.g. `("mac", "02:5b:26:a8:dc:12")`.
///
/// Serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceConnection {
    /// Connection type, e.g. `mac`
    pub kind: String,
    /// Connection value
    pub value: String,
}

impl DeviceConnection {
    /// Create a connection.
    #[must_use]
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for DeviceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?},{:?}]", self.kind, self.value)
    }
}

impl Serialize for DeviceConnection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.kind, &self.value).serialize(serializer)
    }
}

/// The software publishing discovery documents.
///
/// Home Assistant requires an origin for device-based discovery; devices
/// without one use [`Origin::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Origin {
    /// Application name
    pub name: String,
    /// Application version
    #[serde(rename = "sw", skip_serializing_if = "String::is_empty")]
    pub software_version: String,
    /// Support URL
    #[serde(rename = "url", skip_serializing_if = "Option::is_none")]
    pub support_url: Option<Url>,
}

impl Default for Origin {
    fn default() -> Self {
        Self {
            name: "hassync".to_string(),
            software_version: env!("CARGO_PKG_VERSION").to_string(),
            support_url: None,
        }
    }
}

/// A Home Assistant device.
///
/// Must carry at least one identifier or connection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Id used in the discovery topic. Derived from other fields when empty.
    #[serde(skip)]
    pub discovery_id: String,
    /// Device name
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Serial number
    #[serde(rename = "sn", skip_serializing_if = "String::is_empty")]
    pub serial: String,
    /// Manufacturer
    #[serde(rename = "mf", skip_serializing_if = "String::is_empty")]
    pub manufacturer: String,
    /// Model
    #[serde(rename = "mdl", skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// Model identifier
    #[serde(rename = "mdl_id", skip_serializing_if = "String::is_empty")]
    pub model_id: String,
    /// Page where the device can be configured
    #[serde(rename = "cu", skip_serializing_if = "Option::is_none")]
    pub configuration_url: Option<Url>,
    /// Connections to the outside world
    #[serde(rename = "cns", skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<DeviceConnection>,
    /// Hardware version
    #[serde(rename = "hw", skip_serializing_if = "String::is_empty")]
    pub hardware_version: String,
    /// Firmware version
    #[serde(rename = "sw", skip_serializing_if = "String::is_empty")]
    pub firmware_version: String,
    /// Ids that uniquely identify the device, e.g. a serial number
    #[serde(rename = "ids", skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
    /// Suggested area
    #[serde(rename = "sa", skip_serializing_if = "String::is_empty")]
    pub suggested_area: String,
    /// Identifier of a device routing messages for this one
    #[serde(skip_serializing_if = "String::is_empty")]
    pub via_device: String,
    /// Origin information. [`Origin::default`] is used when `None`.
    #[serde(skip)]
    pub origin: Option<Origin>,
}

impl Device {
    /// Check that the device has at least one identifier or connection.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::InvalidDevice`] otherwise.
    pub fn valid(&self) -> Result<(), DiscoveryError> {
        if self.identifiers.is_empty() && self.connections.is_empty() {
            return Err(DiscoveryError::InvalidDevice);
        }
        Ok(())
    }

    /// Id used in the discovery topic.
    ///
    /// Uses `discovery_id` when set. Otherwise joins the identifiers, name,
    /// serial, manufacturer, model and model id that are set, each sanitized,
    /// with [`ID_SEPARATOR`].
    #[must_use]
    pub fn id(&self) -> String {
        if !self.discovery_id.is_empty() {
            return self.discovery_id.clone();
        }

        self.identifiers
            .iter()
            .map(String::as_str)
            .chain([
                self.name.as_str(),
                self.serial.as_str(),
                self.manufacturer.as_str(),
                self.model.as_str(),
                self.model_id.as_str(),
            ])
            .filter(|part| !part.is_empty())
            .map(sanitize_id)
            .collect::<Vec<_>>()
            .join(ID_SEPARATOR)
    }

    /// Topic the discovery document is published to.
    #[must_use]
    pub fn discovery_topic(&self, discovery_prefix: &str) -> String {
        join_topic([discovery_prefix, "device", self.id().as_str(), "config"])
    }

    /// Build the discovery document for this device and `components`.
    ///
    /// Replace a component with its [`crate::RemoveComponent`] to retract it.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::InvalidDevice`] before any field is inspected
    /// - [`DiscoveryError::Validation`] with every field violation of the device and its components
    pub fn document(&self, components: &Components<'_>) -> Result<Map<String, JsonValue>, DiscoveryError> {
        self.valid()?;

        let origin = self.origin.clone().unwrap_or_default();

        let mut doc = DocumentBuilder::new();
        doc.required("device", fields::DEVICE, self);
        doc.required("origin", fields::ORIGIN, &origin);

        let mut records = Map::new();
        let mut errors = ValidationErrors::default();
        for (key, component) in components {
            match component.discovery_record() {
                Ok(record) => {
                    records.insert(key.clone(), record);
                }
                Err(component_errors) => errors.extend(component_errors.scoped(key)),
            }
        }
        doc.insert(fields::COMPONENTS, JsonValue::Object(records));
        doc.extend_errors(errors);

        doc.finish().map_err(DiscoveryError::from)
    }

    /// Publish the discovery document for this device, retained.
    ///
    /// Nothing is written unless the whole document is valid.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Device::document`], [`DiscoveryError::Encode`],
    /// or [`DiscoveryError::Transport`] if the publish fails.
    pub async fn configure(
        &self,
        writer: &dyn Writer,
        discovery_prefix: &str,
        components: &Components<'_>,
    ) -> Result<(), DiscoveryError> {
        let document = self.document(components)?;
        let payload =
            serde_json::to_vec(&document).map_err(|e| DiscoveryError::Encode(e.to_string()))?;
        let topic = self.discovery_topic(discovery_prefix);

        tracing::info!(
            component = "discovery.device",
            topic = %topic,
            components = components.len(),
            payload_len = payload.len(),
            "Publishing device discovery"
        );

        writer
            .write_topic(&topic, WriteOptions::retained(), payload)
            .await
            .map_err(DiscoveryError::Transport)
    }
}

/// Errors assembling or publishing a discovery document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    /// No identifier and no connection configured
    #[error("device must have at least one identifying value in 'identifiers' and/or 'connections'")]
    InvalidDevice,
    /// One or more fields are invalid
    #[error("invalid discovery document: {0}")]
    Validation(#[from] ValidationErrors),
    /// The document could not be serialized
    #[error("encode error: {0}")]
    Encode(String),
    /// The publish failed
    #[error(transparent)]
    Transport(TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device() -> Device {
        Device {
            name: "Desk Lamp".to_string(),
            identifiers: vec!["hassync/desk".to_string()],
            ..Device::default()
        }
    }

    #[test]
    fn invalid_without_identity() {
        assert_eq!(Device::default().valid(), Err(DiscoveryError::InvalidDevice));
        assert_eq!(
            Device::default().document(&Components::new()),
            Err(DiscoveryError::InvalidDevice)
        );

        let by_connection = Device {
            connections: vec![DeviceConnection::new("mac", "02:5b:26:a8:dc:12")],
            ..Device::default()
        };
        assert!(by_connection.valid().is_ok());
    }

    #[test]
    fn id_from_fields() {
        let device = Device {
            identifiers: vec!["a.b".to_string(), "c".to_string()],
            name: "Desk Lamp".to_string(),
            manufacturer: "ACME".to_string(),
            model_id: "L-1".to_string(),
            ..Device::default()
        };
        assert_eq!(device.id(), "a__b__c__Desk__Lamp__ACME__L-1");

        let explicit = Device {
            discovery_id: "lamp".to_string(),
            ..device
        };
        assert_eq!(explicit.id(), "lamp");
        assert_eq!(explicit.discovery_topic("homeassistant"), "homeassistant/device/lamp/config");
    }

    #[test]
    fn device_section_omits_empty_fields() {
        let device = Device {
            connections: vec![DeviceConnection::new("mac", "02:5b")],
            configuration_url: Some(Url::parse("http://lamp.local/").unwrap()),
            ..device()
        };

        assert_eq!(
            serde_json::to_value(&device).unwrap(),
            json!({
                "name": "Desk Lamp",
                "cu": "http://lamp.local/",
                "cns": [["mac", "02:5b"]],
                "ids": ["hassync/desk"],
            })
        );
    }

    #[test]
    fn document_uses_default_origin() {
        let document = device().document(&Components::new()).unwrap();

        assert_eq!(document[fields::ORIGIN]["name"], "hassync");
        assert_eq!(document[fields::ORIGIN]["sw"], env!("CARGO_PKG_VERSION"));
        assert!(document[fields::ORIGIN].get("url").is_none());
        assert_eq!(document[fields::COMPONENTS], json!({}));
    }

    #[test]
    fn connection_display() {
        assert_eq!(
            DeviceConnection::new("mac", "02:5b").to_string(),
            r#"["mac","02:5b"]"#
        );
    }
}
