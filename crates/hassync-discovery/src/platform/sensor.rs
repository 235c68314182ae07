//! The `sensor` platform.
//!
//! See <https://www.home-assistant.io/integrations/sensor.mqtt/>.

use crate::builder::DocumentBuilder;
use crate::component::{Platform, Route};
use crate::fields;
use crate::hass::StateClass;
use hassync_core::codec::json_marshaler;
use hassync_core::value::value_topic;
use hassync_core::{Subscription, Value};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// A read-only sensor with state of type `V` and JSON attributes of type `A`.
///
/// Sensors publish only; they have no inbound cells.
#[derive(Debug)]
pub struct Sensor<V, A> {
    /// State becomes unavailable when not updated for this long. Zero never expires.
    pub expire_after: Duration,
    /// Home Assistant records update events even for unchanged values
    pub force_update: bool,
    /// State attributes, published as a JSON object
    pub attributes: Option<Arc<Value<A>>>,
    /// Allowed states for `enum` sensors. An empty list is omitted.
    pub enum_options: Vec<V>,
    /// Decimals shown after rounding
    pub suggested_display_precision: u32,
    /// Statistics class
    pub state_class: Option<StateClass>,
    /// Current state. Required.
    pub state: Option<Arc<Value<V>>>,
    /// Unit of measurement
    pub unit_of_measurement: String,
}

impl<V, A> Default for Sensor<V, A> {
    fn default() -> Self {
        Self {
            expire_after: Duration::ZERO,
            force_update: false,
            attributes: None,
            enum_options: Vec::new(),
            suggested_display_precision: 0,
            state_class: None,
            state: None,
            unit_of_measurement: String::new(),
        }
    }
}

impl<V, A> Sensor<V, A> {
    /// A sensor with a state cell and optional attributes.
    #[must_use]
    pub fn new(state: Arc<Value<V>>, attributes: Option<Arc<Value<A>>>) -> Self {
        Self {
            state: Some(state),
            attributes,
            ..Self::default()
        }
    }
}

impl<V, A> Sensor<V, A>
where
    V: Clone + Send + Sync + Serialize,
    A: Clone + Send + Sync,
{
    pub(crate) fn marshal_sensor(&self, doc: &mut DocumentBuilder, prefix: &str) {
        doc.optional_seconds(fields::EXPIRE_AFTER, self.expire_after);
        doc.optional(fields::FORCE_UPDATE, &self.force_update);
        doc.optional_value_topic(fields::ATTRIBUTES_TOPIC, self.attributes.as_deref(), prefix);
        doc.optional(fields::OPTIONS, &self.enum_options);
        doc.optional(fields::SUGGESTED_DISPLAY_PRECISION, &self.suggested_display_precision);
        doc.optional(fields::STATE_CLASS, &self.state_class);
        doc.required_topic(
            "state",
            fields::STATE_TOPIC,
            value_topic(self.state.as_deref(), prefix),
        );
        doc.optional(fields::UNIT_OF_MEASUREMENT, &self.unit_of_measurement);
    }
}

impl<V, A> Platform for Sensor<V, A>
where
    V: Clone + Send + Sync + Serialize,
    A: Clone + Send + Sync,
{
    fn platform_name(&self) -> &'static str {
        "sensor"
    }

    fn subscriptions(&self, _prefix: &str) -> Vec<Subscription> {
        Vec::new()
    }

    fn routes(&self) -> Vec<Route> {
        Vec::new()
    }

    fn marshal_discovery(&self, doc: &mut DocumentBuilder, prefix: &str) {
        self.marshal_sensor(doc, prefix);
    }
}

/// An attributes cell publishing JSON.
#[must_use]
pub fn sensor_attributes<A>(topic: impl Into<String>) -> Value<A>
where
    A: Serialize + Clone + Send + Sync + 'static,
{
    Value::new(topic, Some(json_marshaler()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FieldErrorKind;
    use hassync_core::codec::display_marshaler;
    use serde_json::{json, Value as JsonValue};
    use std::collections::BTreeMap;

    type Attributes = BTreeMap<String, String>;

    #[test]
    fn temperature_sensor() {
        let sensor: Sensor<f64, Attributes> = Sensor {
            expire_after: Duration::from_secs(300),
            state_class: Some(StateClass::Measurement),
            suggested_display_precision: 1,
            unit_of_measurement: "°C".to_string(),
            ..Sensor::new(
                Arc::new(Value::new("temperature", Some(display_marshaler()))),
                Some(Arc::new(sensor_attributes("attributes"))),
            )
        };

        let mut doc = DocumentBuilder::new();
        sensor.marshal_discovery(&mut doc, "hassync/office");

        assert_eq!(
            JsonValue::Object(doc.finish().unwrap()),
            json!({
                "exp_after": 300,
                "json_attr_t": "hassync/office/attributes",
                "sug_dsp_prc": 1,
                "stat_cla": "measurement",
                "stat_t": "hassync/office/temperature",
                "unit_of_meas": "°C",
            })
        );
        assert!(sensor.subscriptions("hassync/office").is_empty());
        assert!(sensor.routes().is_empty());
    }

    #[test]
    fn state_is_required() {
        let sensor: Sensor<String, Attributes> = Sensor {
            enum_options: vec!["low".to_string(), "high".to_string()],
            ..Sensor::default()
        };

        let mut doc = DocumentBuilder::new();
        sensor.marshal_discovery(&mut doc, "x");
        let errors = doc.finish().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors.contains_field("state", &FieldErrorKind::TopicRequired));
    }

    #[tokio::test]
    async fn attributes_publish_json() {
        #[derive(Default)]
        struct Capture(parking_lot::Mutex<Vec<u8>>);

        #[async_trait::async_trait]
        impl hassync_core::Writer for Capture {
            async fn write_topic(
                &self,
                _topic: &str,
                _options: hassync_core::WriteOptions,
                payload: Vec<u8>,
            ) -> Result<(), hassync_core::TransportError> {
                *self.0.lock() = payload;
                Ok(())
            }
        }

        let writer = Capture::default();
        let attributes = sensor_attributes::<Attributes>("attributes");
        let mut value = Attributes::new();
        value.insert("source".to_string(), "bench".to_string());
        attributes.write(&writer, "x", value).await.unwrap();

        assert_eq!(*writer.0.lock(), br#"{"source":"bench"}"#.to_vec());
    }
}
