//! Agent configuration.

use anyhow::{Context, Result};
use hassync_adapter_rumqttc::AdapterConfig;
use hassync_discovery::DEFAULT_PREFIX;
use std::time::Duration;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// MQTT connection settings
    pub adapter: AdapterConfig,

    /// Prefix Home Assistant listens on for discovery documents
    pub discovery_prefix: String,

    /// Prefix for the state and command topics of the fake device
    pub topic_prefix: String,

    /// Device name shown in Home Assistant
    pub device_name: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            adapter: AdapterConfig {
                keep_alive: Duration::from_secs(20),
                ..AdapterConfig::default()
            },
            discovery_prefix: DEFAULT_PREFIX.to_string(),
            topic_prefix: "hassync/example".to_string(),
            device_name: "Example Device".to_string(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `HASSYNC_MQTT_BROKER`: MQTT broker URL
    /// - `HASSYNC_CLIENT_ID`: MQTT client id (random by default)
    /// - `HASSYNC_KEEP_ALIVE_SECS`: MQTT keep-alive in seconds
    /// - `HASSYNC_DISCOVERY_PREFIX`: Home Assistant discovery prefix
    /// - `HASSYNC_TOPIC_PREFIX`: prefix for the device's own topics
    /// - `HASSYNC_DEVICE_NAME`: device name
    ///
    /// # Errors
    ///
    /// Returns error if a variable cannot be parsed.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(broker) = var("HASSYNC_MQTT_BROKER") {
            config.adapter.broker = broker;
        }

        if let Some(client_id) = var("HASSYNC_CLIENT_ID") {
            config.adapter.client_id = client_id;
        }

        if let Some(secs) = var("HASSYNC_KEEP_ALIVE_SECS") {
            let secs: u64 = secs.parse().context("Invalid HASSYNC_KEEP_ALIVE_SECS")?;
            config.adapter.keep_alive = Duration::from_secs(secs);
        }

        if let Some(prefix) = var("HASSYNC_DISCOVERY_PREFIX") {
            config.discovery_prefix = prefix;
        }

        if let Some(prefix) = var("HASSYNC_TOPIC_PREFIX") {
            config.topic_prefix = prefix;
        }

        if let Some(name) = var("HASSYNC_DEVICE_NAME") {
            config.device_name = name;
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_map(vars: &[(&str, &str)]) -> Result<AgentConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AgentConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = from_map(&[]).unwrap();
        assert_eq!(config.adapter.broker, "tcp://localhost:1883");
        assert_eq!(config.adapter.keep_alive, Duration::from_secs(20));
        assert_eq!(config.discovery_prefix, "homeassistant");
        assert_eq!(config.topic_prefix, "hassync/example");
        assert_eq!(config.device_name, "Example Device");
    }

    #[test]
    fn overrides() {
        let config = from_map(&[
            ("HASSYNC_MQTT_BROKER", "mqtt://broker.lan"),
            ("HASSYNC_CLIENT_ID", "lamp-1"),
            ("HASSYNC_KEEP_ALIVE_SECS", "45"),
            ("HASSYNC_DISCOVERY_PREFIX", "ha"),
            ("HASSYNC_TOPIC_PREFIX", "home/lamp"),
            ("HASSYNC_DEVICE_NAME", "Lamp"),
        ])
        .unwrap();

        assert_eq!(config.adapter.broker, "mqtt://broker.lan");
        assert_eq!(config.adapter.client_id, "lamp-1");
        assert_eq!(config.adapter.keep_alive, Duration::from_secs(45));
        assert_eq!(config.discovery_prefix, "ha");
        assert_eq!(config.topic_prefix, "home/lamp");
        assert_eq!(config.device_name, "Lamp");
    }

    #[test]
    fn invalid_keep_alive() {
        let err = from_map(&[("HASSYNC_KEEP_ALIVE_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("HASSYNC_KEEP_ALIVE_SECS"));
    }
}
