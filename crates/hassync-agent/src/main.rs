//! # hassync Agent
//!
//! Demo agent exposing a fake light and a presence sensor to Home Assistant.
//!
//! ## Flow
//!
//! 1. Connect to the broker and wait for Home Assistant to report `online`
//! 2. Publish the device discovery document
//! 3. Mirror every light command back to its state topic
//! 4. Announce discovery and state again whenever Home Assistant restarts
//!
//! Configuration comes from `HASSYNC_*` environment variables, see
//! [`AgentConfig::from_env`].

use anyhow::{Context, Result};
use hassync_adapter_rumqttc::connect;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod config;
mod fake_light;

pub use config::AgentConfig;
pub use fake_light::FakeLight;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting hassync agent"
    );

    // Load configuration
    let config = AgentConfig::from_env()?;

    let (manager, driver) = connect(&config.adapter).context("Failed to create MQTT client")?;

    // The event loop outlives the light so the final availability writes go out.
    let connection = CancellationToken::new();
    let event_loop = tokio::spawn(driver.run(connection.clone()));

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    tracing::info!("Shutting down");
                    shutdown.cancel();
                }
                Err(err) => tracing::error!(error = %err, "Failed to listen for Ctrl+C"),
            }
        }
    });

    tracing::info!("Agent running, press Ctrl+C to stop");
    let result = FakeLight::new(&config).run(manager, shutdown).await;

    connection.cancel();
    event_loop.await.context("MQTT event loop panicked")?;

    tracing::info!("Goodbye!");
    result
}
