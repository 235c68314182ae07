//! The `light` platform.
//!
//! See <https://www.home-assistant.io/integrations/light.mqtt/>.

use super::color::{HueSat, Rgb, Rgbw, Rgbww, Xy};
use crate::builder::DocumentBuilder;
use crate::component::{push_route, push_subscription, Platform, Route};
use crate::fields;
use crate::hass::{ColorMode, CustomPowerState, PowerState};
use hassync_core::remote::remote_value_topic;
use hassync_core::{RemoteValue, Subscription, Value};
use serde::Serialize;
use std::sync::Arc;

/// When Home Assistant sends the on payload relative to style commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LightOnCommandType {
    /// Style topics first, then the on payload
    #[default]
    Last,
    /// The on payload first, then style topics
    First,
    /// Only a brightness command, no on payload
    Brightness,
}

/// A light. Only `command` is required.
///
/// Every state/command pair must be configured together or not at all.
#[derive(Debug, Default)]
pub struct Light {
    /// When the on payload is sent
    pub on_command_type: LightOnCommandType,
    /// Home Assistant assumes commands succeed without waiting for state
    pub optimistic: bool,

    /// Current power state
    pub state: Option<Arc<Value<PowerState>>>,
    /// Power commands from Home Assistant. Required.
    pub command: Option<Arc<RemoteValue<PowerState>>>,
    /// Custom on/off payloads
    pub custom_power_state: CustomPowerState,

    /// Current color mode
    pub color_mode: Option<Arc<Value<ColorMode>>>,
    /// Color mode commands
    pub color_mode_command: Option<Arc<RemoteValue<ColorMode>>>,
    /// Color modes the light supports
    pub supported_color_modes: Vec<ColorMode>,

    /// Current brightness
    pub brightness: Option<Arc<Value<u32>>>,
    /// Brightness commands
    pub brightness_command: Option<Arc<RemoteValue<u32>>>,
    /// Value meaning 100% brightness. Home Assistant assumes 255 when unset.
    pub brightness_scale: u32,

    /// Current color temperature
    pub color_temperature: Option<Arc<Value<u32>>>,
    /// Color temperature commands
    pub color_temperature_command: Option<Arc<RemoteValue<u32>>>,
    /// Color temperatures are in Kelvin instead of mireds
    pub color_temperature_in_kelvin: bool,
    /// Maximum color temperature in Kelvin
    pub max_kelvin: u32,
    /// Minimum color temperature in Kelvin
    pub min_kelvin: u32,
    /// Maximum color temperature in mireds
    pub max_mireds: u32,
    /// Minimum color temperature in mireds
    pub min_mireds: u32,

    /// Current hue and saturation
    pub hue_sat: Option<Arc<Value<HueSat>>>,
    /// Hue and saturation commands
    pub hue_sat_command: Option<Arc<RemoteValue<HueSat>>>,

    /// Current xy color
    pub xy: Option<Arc<Value<Xy>>>,
    /// Xy color commands
    pub xy_command: Option<Arc<RemoteValue<Xy>>>,

    /// Current RGB color
    pub rgb: Option<Arc<Value<Rgb>>>,
    /// RGB commands
    pub rgb_command: Option<Arc<RemoteValue<Rgb>>>,

    /// Current RGBW color
    pub rgbw: Option<Arc<Value<Rgbw>>>,
    /// RGBW commands
    pub rgbw_command: Option<Arc<RemoteValue<Rgbw>>>,

    /// Current RGBWW color
    pub rgbww: Option<Arc<Value<Rgbww>>>,
    /// RGBWW commands
    pub rgbww_command: Option<Arc<RemoteValue<Rgbww>>>,

    /// Brightness commands that switch the light to white mode
    pub white_command: Option<Arc<RemoteValue<u32>>>,
    /// Value meaning 100% white. Home Assistant assumes 255 when unset.
    pub white_scale: u32,

    /// Current effect
    pub effect: Option<Arc<Value<String>>>,
    /// Effect commands
    pub effect_command: Option<Arc<RemoteValue<String>>>,
    /// Effects the light supports
    pub effect_list: Vec<String>,
}

impl Light {
    /// A light with only a power command cell.
    #[must_use]
    pub fn new(command: Arc<RemoteValue<PowerState>>) -> Self {
        Self {
            command: Some(command),
            ..Self::default()
        }
    }
}

impl Platform for Light {
    fn platform_name(&self) -> &'static str {
        "light"
    }

    fn subscriptions(&self, prefix: &str) -> Vec<Subscription> {
        let mut subscriptions = Vec::new();
        push_subscription(&mut subscriptions, self.command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.color_mode_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.brightness_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.color_temperature_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.hue_sat_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.xy_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.rgb_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.rgbw_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.rgbww_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.white_command.as_ref(), prefix);
        push_subscription(&mut subscriptions, self.effect_command.as_ref(), prefix);
        subscriptions
    }

    fn routes(&self) -> Vec<Route> {
        let mut routes = Vec::new();
        push_route(&mut routes, self.command.as_ref());
        push_route(&mut routes, self.color_mode_command.as_ref());
        push_route(&mut routes, self.brightness_command.as_ref());
        push_route(&mut routes, self.color_temperature_command.as_ref());
        push_route(&mut routes, self.hue_sat_command.as_ref());
        push_route(&mut routes, self.xy_command.as_ref());
        push_route(&mut routes, self.rgb_command.as_ref());
        push_route(&mut routes, self.rgbw_command.as_ref());
        push_route(&mut routes, self.rgbww_command.as_ref());
        push_route(&mut routes, self.white_command.as_ref());
        push_route(&mut routes, self.effect_command.as_ref());
        routes
    }

    fn marshal_discovery(&self, doc: &mut DocumentBuilder, prefix: &str) {
        doc.optional_unless(
            fields::ON_COMMAND_TYPE,
            &self.on_command_type,
            &LightOnCommandType::Last,
        );
        doc.optional(fields::OPTIMISTIC, &self.optimistic);

        doc.optional_value_topic(fields::STATE_TOPIC, self.state.as_deref(), prefix);
        doc.required_topic(
            "command",
            fields::COMMAND_TOPIC,
            remote_value_topic(self.command.as_deref(), prefix),
        );
        doc.optional(fields::PAYLOAD_ON, &self.custom_power_state.on);
        doc.optional(fields::PAYLOAD_OFF, &self.custom_power_state.off);

        doc.paired_topics(
            "color mode",
            fields::COLOR_MODE_STATE_TOPIC,
            self.color_mode.as_deref(),
            fields::COLOR_MODE_COMMAND_TOPIC,
            self.color_mode_command.as_deref(),
            prefix,
        );
        doc.optional(fields::SUPPORTED_COLOR_MODES, &self.supported_color_modes);

        doc.paired_topics(
            "brightness",
            fields::BRIGHTNESS_STATE_TOPIC,
            self.brightness.as_deref(),
            fields::BRIGHTNESS_COMMAND_TOPIC,
            self.brightness_command.as_deref(),
            prefix,
        );
        doc.optional(fields::BRIGHTNESS_SCALE, &self.brightness_scale);

        doc.paired_topics(
            "color temperature",
            fields::COLOR_TEMPERATURE_STATE_TOPIC,
            self.color_temperature.as_deref(),
            fields::COLOR_TEMPERATURE_COMMAND_TOPIC,
            self.color_temperature_command.as_deref(),
            prefix,
        );
        doc.optional(fields::COLOR_TEMPERATURE_IN_KELVIN, &self.color_temperature_in_kelvin);
        doc.optional(fields::MAX_KELVIN, &self.max_kelvin);
        doc.optional(fields::MIN_KELVIN, &self.min_kelvin);
        doc.optional(fields::MAX_MIREDS, &self.max_mireds);
        doc.optional(fields::MIN_MIREDS, &self.min_mireds);

        doc.paired_topics(
            "hue sat",
            fields::HUE_SAT_STATE_TOPIC,
            self.hue_sat.as_deref(),
            fields::HUE_SAT_COMMAND_TOPIC,
            self.hue_sat_command.as_deref(),
            prefix,
        );
        doc.paired_topics(
            "xy",
            fields::XY_STATE_TOPIC,
            self.xy.as_deref(),
            fields::XY_COMMAND_TOPIC,
            self.xy_command.as_deref(),
            prefix,
        );
        doc.paired_topics(
            "rgb",
            fields::RGB_STATE_TOPIC,
            self.rgb.as_deref(),
            fields::RGB_COMMAND_TOPIC,
            self.rgb_command.as_deref(),
            prefix,
        );
        doc.paired_topics(
            "rgbw",
            fields::RGBW_STATE_TOPIC,
            self.rgbw.as_deref(),
            fields::RGBW_COMMAND_TOPIC,
            self.rgbw_command.as_deref(),
            prefix,
        );
        doc.paired_topics(
            "rgbww",
            fields::RGBWW_STATE_TOPIC,
            self.rgbww.as_deref(),
            fields::RGBWW_COMMAND_TOPIC,
            self.rgbww_command.as_deref(),
            prefix,
        );

        doc.optional_topic(
            fields::WHITE_COMMAND_TOPIC,
            remote_value_topic(self.white_command.as_deref(), prefix),
        );
        doc.optional(fields::WHITE_SCALE, &self.white_scale);

        doc.paired_topics(
            "effect",
            fields::EFFECT_STATE_TOPIC,
            self.effect.as_deref(),
            fields::EFFECT_COMMAND_TOPIC,
            self.effect_command.as_deref(),
            prefix,
        );
        doc.optional(fields::EFFECT_LIST, &self.effect_list);
    }
}
