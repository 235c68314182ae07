//! Abbreviated discovery document keys.
//!
//! See <https://www.home-assistant.io/integrations/mqtt/#supported-abbreviations-in-mqtt-discovery-messages>.

use hassync_core::SEPARATOR;

// Document sections
/// Device section
pub const DEVICE: &str = "dev";
/// Origin section
pub const ORIGIN: &str = "o";
/// Components section
pub const COMPONENTS: &str = "cmps";

// Shared by every component
/// Platform name
pub const PLATFORM: &str = "p";
/// Entity name
pub const NAME: &str = "name";
/// Entity category
pub const ENTITY_CATEGORY: &str = "ent_cat";
/// Icon
pub const ICON: &str = "ic";
/// Picture URL
pub const PICTURE: &str = "picture";
/// Default entity id
pub const DEFAULT_ENTITY_ID: &str = "def_ent_id";
/// Unique id
pub const UNIQUE_ID: &str = "uniq_id";
/// Availability topic
pub const AVAILABILITY_TOPIC: &str = "avty_t";
/// Custom available payload
pub const PAYLOAD_AVAILABLE: &str = "pl_avail";
/// Custom unavailable payload
pub const PAYLOAD_NOT_AVAILABLE: &str = "pl_not_avail";
/// Quality of service
pub const QOS: &str = "qos";
/// Retain flag
pub const RETAIN: &str = "ret";

/// State topic
pub const STATE_TOPIC: &str = "stat_t";
/// Command topic
pub const COMMAND_TOPIC: &str = "cmd_t";
/// Custom on payload
pub const PAYLOAD_ON: &str = "pl_on";
/// Custom off payload
pub const PAYLOAD_OFF: &str = "pl_off";
/// When the on payload is sent relative to style commands
pub const ON_COMMAND_TYPE: &str = "on_cmd_type";
/// Optimistic mode
pub const OPTIMISTIC: &str = "opt";

// Light
/// Color mode state topic
pub const COLOR_MODE_STATE_TOPIC: &str = "clrm_stat_t";
/// Color mode command topic
pub const COLOR_MODE_COMMAND_TOPIC: &str = "clrm_cmd_t";
/// Supported color modes
pub const SUPPORTED_COLOR_MODES: &str = "sup_clrm";
/// Brightness command topic
pub const BRIGHTNESS_COMMAND_TOPIC: &str = "bri_cmd_t";
/// Brightness state topic
pub const BRIGHTNESS_STATE_TOPIC: &str = "bri_stat_t";
/// Brightness scale
pub const BRIGHTNESS_SCALE: &str = "bri_scl";
/// Color temperature command topic
pub const COLOR_TEMPERATURE_COMMAND_TOPIC: &str = "clr_temp_cmd_t";
/// Color temperature state topic
pub const COLOR_TEMPERATURE_STATE_TOPIC: &str = "clr_temp_stat_t";
/// Color temperature is in Kelvin
pub const COLOR_TEMPERATURE_IN_KELVIN: &str = "clr_temp_k";
/// Minimum Kelvin
pub const MIN_KELVIN: &str = "min_k";
/// Maximum Kelvin
pub const MAX_KELVIN: &str = "max_k";
/// Minimum mireds
pub const MIN_MIREDS: &str = "min_mirs";
/// Maximum mireds
pub const MAX_MIREDS: &str = "max_mirs";
/// Hue/saturation command topic
pub const HUE_SAT_COMMAND_TOPIC: &str = "hs_cmd_t";
/// Hue/saturation state topic
pub const HUE_SAT_STATE_TOPIC: &str = "hs_stat_t";
/// XY command topic
pub const XY_COMMAND_TOPIC: &str = "xy_cmd_t";
/// XY state topic
pub const XY_STATE_TOPIC: &str = "xy_stat_t";
/// RGB command topic
pub const RGB_COMMAND_TOPIC: &str = "rgb_cmd_t";
/// RGB state topic
pub const RGB_STATE_TOPIC: &str = "rgb_stat_t";
/// RGBW command topic
pub const RGBW_COMMAND_TOPIC: &str = "rgbw_cmd_t";
/// RGBW state topic
pub const RGBW_STATE_TOPIC: &str = "rgbw_stat_t";
/// RGBWW command topic
pub const RGBWW_COMMAND_TOPIC: &str = "rgbww_cmd_t";
/// RGBWW state topic
pub const RGBWW_STATE_TOPIC: &str = "rgbww_stat_t";
/// White command topic
pub const WHITE_COMMAND_TOPIC: &str = "whit_cmd_t";
/// White scale
pub const WHITE_SCALE: &str = "whit_scl";
/// Effect command topic
pub const EFFECT_COMMAND_TOPIC: &str = "fx_cmd_t";
/// Effect state topic
pub const EFFECT_STATE_TOPIC: &str = "fx_stat_t";
/// Effect list
pub const EFFECT_LIST: &str = "fx_list";

// Sensors
/// Seconds until the state expires
pub const EXPIRE_AFTER: &str = "exp_after";
/// Force update events for unchanged values
pub const FORCE_UPDATE: &str = "frc_upd";
/// JSON attributes topic
pub const ATTRIBUTES_TOPIC: &str = "json_attr_t";
/// Enum options
pub const OPTIONS: &str = "opts";
/// Suggested display precision
pub const SUGGESTED_DISPLAY_PRECISION: &str = "sug_dsp_prc";
/// State class
pub const STATE_CLASS: &str = "stat_cla";
/// Unit of measurement
pub const UNIT_OF_MEASUREMENT: &str = "unit_of_meas";
/// Seconds until a binary sensor resets to off
pub const OFF_DELAY: &str = "off_dly";

/// Separates the parts of a device id. Also replaces characters that are not
/// allowed in an id.
pub const ID_SEPARATOR: &str = "__";

/// Replace characters that are unsafe in a topic segment with [`ID_SEPARATOR`].
#[must_use]
pub fn sanitize_id(id: &str) -> String {
    let mut out = String::with_capacity(id.len());
    for c in id.chars() {
        if matches!(c, ' ' | ':' | '.' | '!' | '?') || c == SEPARATOR {
            out.push_str(ID_SEPARATOR);
        } else {
            out.push(c);
        }
    }
    out
}
