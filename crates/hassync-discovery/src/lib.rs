//! # hassync Discovery
//!
//! Home Assistant MQTT device discovery built on the cells of `hassync-core`.
//!
//! This crate provides:
//! - Home Assistant vocabulary (availability, power state, color modes)
//! - [`Device`] and its retained discovery document
//! - [`Component`]: common entity settings around a [`Platform`]
//! - Platforms: [`Light`], [`Sensor`] and [`BinarySensor`]
//! - [`DocumentBuilder`]: field encoding that collects every validation error
//!   before failing

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod component;
pub mod device;
pub mod fields;
pub mod hass;
pub mod platform;

pub use builder::{DocumentBuilder, FieldError, FieldErrorKind, ValidationErrors};
pub use component::{
    push_route, push_subscription, Component, ComponentError, Discoverable, Platform,
    RemoveComponent, Route, RouteTable,
};
pub use device::{Components, Device, DeviceConnection, DiscoveryError, Origin};
pub use hass::{
    home_assistant_availability, Availability, ColorMode, CustomAvailability, CustomPowerState,
    PowerState, StateClass, VocabularyError, DEFAULT_PREFIX,
};
pub use platform::{
    sensor_attributes, BinarySensor, ColorParseError, HueSat, Light, LightOnCommandType, Rgb,
    Rgbw, Rgbww, Sensor, Xy,
};
