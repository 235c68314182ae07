//! # hassync rumqttc Adapter
//!
//! Connects the hassync cells to an MQTT broker through `rumqttc`.
//!
//! This crate provides:
//! - [`AdapterConfig`]: broker URL, client id, keep-alive and last will
//! - [`RumqttcTransport`]: the raw [`hassync_core::Transport`] over `rumqttc::AsyncClient`
//! - [`connect`]: a [`hassync_core::SubscriptionManager`] plus the
//!   [`EventLoopDriver`] that feeds it
//!
//! ## Example
//!
//! ```no_run
//! use hassync_adapter_rumqttc::{connect, AdapterConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), hassync_adapter_rumqttc::AdapterError> {
//! let (manager, driver) = connect(&AdapterConfig::default())?;
//! let cancel = CancellationToken::new();
//! tokio::spawn(driver.run(cancel.clone()));
//! // subscribe components and write values through `manager`
//! # drop(manager);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod driver;
pub mod transport;

pub use config::{parse_mqtt_url, AdapterConfig, LastWill};
pub use driver::{connect, EventLoopDriver};
pub use transport::RumqttcTransport;

/// Errors setting up the adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// The broker URL could not be parsed
    #[error("invalid MQTT broker URL: {0}")]
    InvalidBrokerUrl(String),
    /// Keep-alive must be zero (disabled) or at least one second
    #[error("invalid keep-alive interval: {0:?}")]
    InvalidKeepAlive(std::time::Duration),
    /// The client id is empty
    #[error("client id must not be empty")]
    EmptyClientId,
}
