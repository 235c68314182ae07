//! Client setup and the event loop that feeds the subscription manager.

use crate::config::{parse_mqtt_url, AdapterConfig};
use crate::transport::{qos, RumqttcTransport};
use crate::AdapterError;
use hassync_core::SubscriptionManager;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const RETRY_DELAY: Duration = Duration::from_secs(5);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Create a client for `config` and wrap it in a [`SubscriptionManager`].
///
/// Nothing is sent until the returned driver runs.
///
/// # Errors
///
/// Returns [`AdapterError`] if the configuration is invalid.
pub fn connect(
    config: &AdapterConfig,
) -> Result<(Arc<SubscriptionManager<RumqttcTransport>>, EventLoopDriver), AdapterError> {
    config.validate()?;
    let (host, port) = parse_mqtt_url(&config.broker)?;

    let mut mqtt_options = MqttOptions::new(config.client_id.clone(), host.clone(), port);
    mqtt_options.set_keep_alive(config.keep_alive);
    if let Some(will) = &config.last_will {
        mqtt_options.set_last_will(rumqttc::LastWill::new(
            will.topic.clone(),
            will.payload.clone(),
            qos(will.options.qos),
            will.options.retain,
        ));
    }

    let (client, eventloop) = AsyncClient::new(mqtt_options, config.capacity);
    let manager = Arc::new(SubscriptionManager::new(RumqttcTransport::new(client)));

    tracing::info!(
        component = "rumqttc",
        host = %host,
        port,
        client_id = %config.client_id,
        "MQTT client created"
    );

    Ok((
        Arc::clone(&manager),
        EventLoopDriver {
            eventloop,
            manager,
            retry_delay: RETRY_DELAY,
        },
    ))
}

/// Polls the `rumqttc` event loop.
///
/// Incoming publishes go to [`SubscriptionManager::route`]. Every reconnect
/// after the first connection re-issues the tracked subscriptions on a
/// separate task, so the event loop keeps draining the request channel the
/// re-subscribe writes to.
pub struct EventLoopDriver {
    eventloop: EventLoop,
    manager: Arc<SubscriptionManager<RumqttcTransport>>,
    retry_delay: Duration,
}

impl EventLoopDriver {
    /// Wait this long after a connection error before polling again.
    #[must_use]
    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Drive the connection until `cancel` fires, then disconnect.
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut connected_once = false;

        loop {
            let event = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                event = self.eventloop.poll() => event,
            };

            match event {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    tracing::debug!(
                        component = "rumqttc",
                        topic = %publish.topic,
                        payload_len = publish.payload.len(),
                        "Received MQTT message"
                    );
                    self.manager.route(&publish.topic, &publish.payload);
                }
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    tracing::info!(component = "rumqttc", "Connected to MQTT broker");
                    if connected_once {
                        let manager = Arc::clone(&self.manager);
                        tokio::spawn(async move { manager.on_reconnect().await });
                    }
                    connected_once = true;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::error!(component = "rumqttc", error = %e, "MQTT error");
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        self.shutdown().await;
    }

    async fn shutdown(&mut self) {
        if self.manager.transport().disconnect().await.is_err() {
            return;
        }

        let flushed = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;

        if flushed.is_err() {
            tracing::warn!(component = "rumqttc", "Timed out sending MQTT disconnect");
        }
        tracing::info!(component = "rumqttc", "MQTT event loop stopped");
    }
}

impl std::fmt::Debug for EventLoopDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoopDriver")
            .field("retry_delay", &self.retry_delay)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LastWill;
    use hassync_core::WriteOptions;

    fn unreachable_broker() -> AdapterConfig {
        AdapterConfig {
            broker: "tcp://127.0.0.1:1".to_string(),
            keep_alive: Duration::from_secs(5),
            last_will: Some(LastWill {
                topic: "hassync/test/available".to_string(),
                payload: b"offline".to_vec(),
                options: WriteOptions::retained(),
            }),
            ..AdapterConfig::default()
        }
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = AdapterConfig {
            broker: "ws://broker".to_string(),
            ..AdapterConfig::default()
        };
        assert!(matches!(connect(&config), Err(AdapterError::InvalidBrokerUrl(_))));

        let config = AdapterConfig {
            client_id: String::new(),
            ..AdapterConfig::default()
        };
        assert!(matches!(connect(&config), Err(AdapterError::EmptyClientId)));
    }

    #[tokio::test]
    async fn cancelled_driver_stops() {
        let (_manager, driver) = connect(&unreachable_broker()).unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), driver.run(cancel))
            .await
            .expect("driver should stop once cancelled");
    }

    #[tokio::test]
    async fn cancel_interrupts_retry_delay() {
        let (_manager, driver) = connect(&unreachable_broker()).unwrap();
        let driver = driver.with_retry_delay(Duration::from_secs(3600));
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(driver.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        cancel.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("driver should stop during the retry delay")
            .unwrap();
    }
}
