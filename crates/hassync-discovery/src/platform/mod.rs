//! Entity platforms.
//!
//! Each platform owns its typed cells and knows how to subscribe, dispatch and
//! describe them in a discovery document.

pub mod binary_sensor;
pub mod color;
pub mod light;
pub mod sensor;

pub use binary_sensor::BinarySensor;
pub use color::{ColorParseError, HueSat, Rgb, Rgbw, Rgbww, Xy};
pub use light::{Light, LightOnCommandType};
pub use sensor::{sensor_attributes, Sensor};
