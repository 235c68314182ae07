//! Home Assistant value vocabulary.
//!
//! These are the payloads Home Assistant understands on state and command
//! topics. Each type implements `Display` and `FromStr` with its wire form,
//! so [`hassync_core::codec::display_marshaler`] and
//! [`hassync_core::codec::from_str_unmarshaler`] work for all of them.

use hassync_core::codec::from_str_unmarshaler;
use hassync_core::{join_topic, RemoteValue};
use serde::Serialize;
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Default topic prefix Home Assistant reads discovery documents from.
pub const DEFAULT_PREFIX: &str = "homeassistant";

/// Topic under the discovery prefix where Home Assistant announces its own availability.
pub const STATUS_TOPIC: &str = "status";

/// Whether Home Assistant should consider a device or entity available.
///
/// Any string is accepted so that custom payloads (see [`CustomAvailability`])
/// round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Availability(Cow<'static, str>);

impl Availability {
    /// The device is online.
    pub const ONLINE: Self = Self(Cow::Borrowed("online"));
    /// The device is offline.
    pub const OFFLINE: Self = Self(Cow::Borrowed("offline"));

    /// A custom availability payload.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    /// Wire form of this value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Availability {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// Custom payloads Home Assistant should use to detect availability.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomAvailability {
    /// Payload meaning available
    pub available: Availability,
    /// Payload meaning unavailable
    pub unavailable: Availability,
}

/// Generic on/off state.
///
/// This is not necessarily physical power: a motion sensor reports
/// [`PowerState::ON`] while motion is detected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct PowerState(Cow<'static, str>);

impl PowerState {
    /// On
    pub const ON: Self = Self(Cow::Borrowed("ON"));
    /// Off
    pub const OFF: Self = Self(Cow::Borrowed("OFF"));
    /// Unknown state
    pub const UNKNOWN: Self = Self(Cow::Borrowed("None"));

    /// A custom power state payload.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(Cow::Owned(value.into()))
    }

    /// Wire form of this value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PowerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PowerState {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// Custom on and off payloads for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CustomPowerState {
    /// Payload meaning on
    pub on: PowerState,
    /// Payload meaning off
    pub off: PowerState,
}

/// How a light interprets the color it is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColorMode {
    /// On/off only
    #[serde(rename = "onoff")]
    OnOff,
    /// Brightness only
    #[serde(rename = "brightness")]
    Brightness,
    /// Color temperature
    #[serde(rename = "color_temp")]
    ColorTemperature,
    /// Hue and saturation
    #[serde(rename = "hs")]
    HueSat,
    /// CIE xy
    #[serde(rename = "xy")]
    Xy,
    /// Red, green, blue
    #[serde(rename = "rgb")]
    Rgb,
    /// RGB plus white
    #[serde(rename = "rgbw")]
    Rgbw,
    /// RGB plus cold and warm white
    #[serde(rename = "rgbww")]
    Rgbww,
    /// White
    #[serde(rename = "white")]
    White,
}

impl ColorMode {
    /// Wire form of this mode.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OnOff => "onoff",
            Self::Brightness => "brightness",
            Self::ColorTemperature => "color_temp",
            Self::HueSat => "hs",
            Self::Xy => "xy",
            Self::Rgb => "rgb",
            Self::Rgbw => "rgbw",
            Self::Rgbww => "rgbww",
            Self::White => "white",
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorMode {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "onoff" => Ok(Self::OnOff),
            "brightness" => Ok(Self::Brightness),
            "color_temp" => Ok(Self::ColorTemperature),
            "hs" => Ok(Self::HueSat),
            "xy" => Ok(Self::Xy),
            "rgb" => Ok(Self::Rgb),
            "rgbw" => Ok(Self::Rgbw),
            "rgbww" => Ok(Self::Rgbww),
            "white" => Ok(Self::White),
            other => Err(VocabularyError::UnknownColorMode(other.to_string())),
        }
    }
}

/// Statistics class of a sensor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// A measurement in present time, e.g. current temperature
    Measurement,
    /// A present-time measurement of an angle in degrees, e.g. wind direction
    MeasurementAngle,
    /// A total that can increase and decrease, e.g. a net energy meter
    Total,
    /// A monotonically increasing total that periodically resets to zero
    TotalIncreasing,
}

impl StateClass {
    /// Wire form of this class.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Measurement => "measurement",
            Self::MeasurementAngle => "measurement_angle",
            Self::Total => "total",
            Self::TotalIncreasing => "total_increasing",
        }
    }
}

impl fmt::Display for StateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StateClass {
    type Err = VocabularyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "measurement" => Ok(Self::Measurement),
            "measurement_angle" => Ok(Self::MeasurementAngle),
            "total" => Ok(Self::Total),
            "total_increasing" => Ok(Self::TotalIncreasing),
            other => Err(VocabularyError::UnknownStateClass(other.to_string())),
        }
    }
}

/// A cell tracking Home Assistant's own availability on `<prefix>/status`.
///
/// Watch it to learn when Home Assistant restarts and discovery must be
/// announced again.
#[must_use]
pub fn home_assistant_availability(discovery_prefix: &str) -> RemoteValue<Availability> {
    RemoteValue::new(
        join_topic([discovery_prefix, STATUS_TOPIC]),
        from_str_unmarshaler(),
    )
}

/// Errors parsing vocabulary values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VocabularyError {
    /// Not a known color mode
    #[error("unknown color mode: {0}")]
    UnknownColorMode(String),
    /// Not a known state class
    #[error("unknown state class: {0}")]
    UnknownStateClass(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use hassync_core::codec::display_marshaler;

    #[test]
    fn availability_constants() {
        assert_eq!(Availability::ONLINE.to_string(), "online");
        assert_eq!(Availability::OFFLINE.as_str(), "offline");
        assert_eq!("online".parse::<Availability>().unwrap(), Availability::ONLINE);
        assert_eq!(Availability::new("up").as_str(), "up");
    }

    #[test]
    fn power_state_codec() {
        let marshal = display_marshaler::<PowerState>();
        let unmarshal = from_str_unmarshaler::<PowerState>();

        assert_eq!(marshal(&PowerState::ON).unwrap(), b"ON");
        assert_eq!(unmarshal(b"OFF").unwrap(), PowerState::OFF);
        assert_eq!(unmarshal(b"None").unwrap(), PowerState::UNKNOWN);
    }

    #[test]
    fn color_mode_wire_form() {
        for mode in [
            ColorMode::OnOff,
            ColorMode::Brightness,
            ColorMode::ColorTemperature,
            ColorMode::HueSat,
            ColorMode::Xy,
            ColorMode::Rgb,
            ColorMode::Rgbw,
            ColorMode::Rgbww,
            ColorMode::White,
        ] {
            assert_eq!(mode.as_str().parse::<ColorMode>().unwrap(), mode);
            assert_eq!(
                serde_json::to_value(mode).unwrap(),
                serde_json::Value::String(mode.to_string())
            );
        }

        assert!(matches!(
            "sepia".parse::<ColorMode>(),
            Err(VocabularyError::UnknownColorMode(_))
        ));
    }

    #[test]
    fn state_class_wire_form() {
        assert_eq!(StateClass::TotalIncreasing.to_string(), "total_increasing");
        assert_eq!(
            serde_json::to_value(StateClass::MeasurementAngle).unwrap(),
            serde_json::json!("measurement_angle")
        );
        assert_eq!("total".parse::<StateClass>().unwrap(), StateClass::Total);
    }

    #[test]
    fn home_assistant_status_topic() {
        let status = home_assistant_availability(DEFAULT_PREFIX);
        assert_eq!(status.topic(), "homeassistant/status");

        status.deliver("homeassistant/status", b"online");
        assert_eq!(status.value(), Some(Availability::ONLINE));
    }
}
