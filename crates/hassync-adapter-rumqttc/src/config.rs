//! Adapter configuration and broker URL parsing.

use crate::AdapterError;
use hassync_core::WriteOptions;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

const DEFAULT_PORT: u16 = 1883;

/// Message the broker publishes when this client disconnects ungracefully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastWill {
    /// Full topic
    pub topic: String,
    /// Payload bytes
    pub payload: Vec<u8>,
    /// QoS and retain flag
    pub options: WriteOptions,
}

/// Connection settings for the rumqttc client.
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    /// Broker URL: `tcp://host:port`, `mqtt://host:port` or `host[:port]`
    pub broker: String,
    /// MQTT client id
    pub client_id: String,
    /// Keep-alive interval. Zero disables keep-alive.
    pub keep_alive: Duration,
    /// Capacity of the request channel between client and event loop
    pub capacity: usize,
    /// Optional last will
    pub last_will: Option<LastWill>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            broker: "tcp://localhost:1883".to_string(),
            client_id: format!("hassync-{}", Uuid::new_v4()),
            keep_alive: Duration::from_secs(30),
            capacity: 100,
            last_will: None,
        }
    }
}

impl AdapterConfig {
    /// Check the settings rumqttc would otherwise reject at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::EmptyClientId`] or [`AdapterError::InvalidKeepAlive`].
    pub fn validate(&self) -> Result<(), AdapterError> {
        if self.client_id.is_empty() {
            return Err(AdapterError::EmptyClientId);
        }
        if !self.keep_alive.is_zero() && self.keep_alive < Duration::from_secs(1) {
            return Err(AdapterError::InvalidKeepAlive(self.keep_alive));
        }
        Ok(())
    }
}

/// Parse an MQTT broker URL into host and port.
///
/// # Errors
///
/// Returns [`AdapterError::InvalidBrokerUrl`] for unsupported schemes, a
/// missing host, or a malformed port.
pub fn parse_mqtt_url(input: &str) -> Result<(String, u16), AdapterError> {
    if input.contains("://") {
        let url = Url::parse(input)
            .map_err(|e| AdapterError::InvalidBrokerUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(AdapterError::InvalidBrokerUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .filter(|host| !host.is_empty())
            .ok_or_else(|| AdapterError::InvalidBrokerUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(DEFAULT_PORT);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AdapterError::InvalidBrokerUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => DEFAULT_PORT,
        Some(port) => port.parse().map_err(|_| {
            AdapterError::InvalidBrokerUrl(format!("{input}: invalid port '{port}'"))
        })?,
    };
    if parts.next().is_some() {
        return Err(AdapterError::InvalidBrokerUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_urls() {
        assert_eq!(
            parse_mqtt_url("tcp://broker.local:1884").unwrap(),
            ("broker.local".to_string(), 1884)
        );
        assert_eq!(
            parse_mqtt_url("mqtt://broker.local").unwrap(),
            ("broker.local".to_string(), 1883)
        );
        assert_eq!(
            parse_mqtt_url("localhost").unwrap(),
            ("localhost".to_string(), 1883)
        );
        assert_eq!(
            parse_mqtt_url("10.0.0.2:8883").unwrap(),
            ("10.0.0.2".to_string(), 8883)
        );
    }

    #[test]
    fn rejected_broker_urls() {
        for input in ["ws://broker:80", ":1883", "host:port", "a:1:2", "tcp://:1883"] {
            assert!(
                matches!(parse_mqtt_url(input), Err(AdapterError::InvalidBrokerUrl(_))),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn default_config_is_valid() {
        let config = AdapterConfig::default();
        assert!(config.client_id.starts_with("hassync-"));
        assert!(config.validate().is_ok());
        assert_ne!(config.client_id, AdapterConfig::default().client_id);
    }

    #[test]
    fn invalid_settings() {
        let config = AdapterConfig {
            keep_alive: Duration::from_millis(500),
            ..AdapterConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(AdapterError::InvalidKeepAlive(Duration::from_millis(500)))
        );

        let config = AdapterConfig {
            keep_alive: Duration::ZERO,
            client_id: String::new(),
            ..AdapterConfig::default()
        };
        assert_eq!(config.validate(), Err(AdapterError::EmptyClientId));
    }
}
