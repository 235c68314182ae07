//! The `binary_sensor` platform.
//!
//! See <https://www.home-assistant.io/integrations/binary_sensor.mqtt/>.

use super::sensor::Sensor;
use crate::builder::DocumentBuilder;
use crate::component::{Platform, Route};
use crate::fields;
use crate::hass::PowerState;
use hassync_core::{Subscription, Value};
use std::sync::Arc;
use std::time::Duration;

/// A sensor whose state is [`PowerState::ON`] or [`PowerState::OFF`].
#[derive(Debug)]
pub struct BinarySensor<A> {
    /// Common sensor settings
    pub sensor: Sensor<PowerState, A>,
    /// Home Assistant resets the state to off after this long. Useful for
    /// sensors that only report on, like motion detectors.
    pub off_delay: Duration,
}

impl<A> BinarySensor<A> {
    /// A binary sensor with a state cell and optional attributes.
    #[must_use]
    pub fn new(state: Arc<Value<PowerState>>, attributes: Option<Arc<Value<A>>>) -> Self {
        Self {
            sensor: Sensor::new(state, attributes),
            off_delay: Duration::ZERO,
        }
    }
}

impl<A> Platform for BinarySensor<A>
where
    A: Clone + Send + Sync,
{
    fn platform_name(&self) -> &'static str {
        "binary_sensor"
    }

    fn subscriptions(&self, prefix: &str) -> Vec<Subscription> {
        self.sensor.subscriptions(prefix)
    }

    fn routes(&self) -> Vec<Route> {
        self.sensor.routes()
    }

    fn marshal_discovery(&self, doc: &mut DocumentBuilder, prefix: &str) {
        self.sensor.marshal_sensor(doc, prefix);
        doc.optional_seconds(fields::OFF_DELAY, self.off_delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hassync_core::codec::display_marshaler;

    #[test]
    fn presence_sensor() {
        let mut sensor: BinarySensor<()> = BinarySensor::new(
            Arc::new(Value::new("state", Some(display_marshaler()))),
            None,
        );
        sensor.off_delay = Duration::from_secs(30);

        let mut doc = DocumentBuilder::new();
        sensor.marshal_discovery(&mut doc, "hassync/hall_pir");
        let fields = doc.finish().unwrap();

        assert_eq!(sensor.platform_name(), "binary_sensor");
        assert_eq!(fields["stat_t"], "hassync/hall_pir/state");
        assert_eq!(fields["off_dly"], 30);
        assert!(fields.get("json_attr_t").is_none());
    }
}
