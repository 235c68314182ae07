//! [`Transport`] over a `rumqttc` client.

use async_trait::async_trait;
use hassync_core::{QualityOfService, RetainHandling, Subscription, Transport, TransportError, WriteOptions};
use rumqttc::{AsyncClient, QoS, SubscribeFilter};

/// Raw MQTT operations through a `rumqttc::AsyncClient`.
///
/// Requests are queued on the client's channel and sent by the event loop,
/// so a returned `Ok` means the request was accepted, not acknowledged.
#[derive(Clone)]
pub struct RumqttcTransport {
    client: AsyncClient,
}

impl RumqttcTransport {
    /// Wrap a client.
    #[must_use]
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }

    /// The wrapped client.
    #[must_use]
    pub fn client(&self) -> &AsyncClient {
        &self.client
    }

    /// Send a DISCONNECT to the broker.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Disconnected`] if the event loop is gone.
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        self.client
            .disconnect()
            .await
            .map_err(|_| TransportError::Disconnected)
    }
}

impl std::fmt::Debug for RumqttcTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RumqttcTransport").finish_non_exhaustive()
    }
}

pub(crate) fn qos(qos: QualityOfService) -> QoS {
    match qos {
        QualityOfService::AtMostOnce => QoS::AtMostOnce,
        QualityOfService::AtLeastOnce => QoS::AtLeastOnce,
        QualityOfService::ExactlyOnce => QoS::ExactlyOnce,
    }
}

fn filter(subscription: &Subscription) -> SubscribeFilter {
    let options = subscription.options;
    // MQTT 3.1.1 has no subscription options beyond QoS.
    if options.no_local
        || options.retain_as_published
        || options.retain_handling != RetainHandling::SendOnSubscribe
    {
        tracing::debug!(
            component = "rumqttc",
            topic = %subscription.topic,
            no_local = options.no_local,
            retain_as_published = options.retain_as_published,
            retain_handling = %options.retain_handling,
            "Ignoring subscription options unsupported by MQTT 3.1.1"
        );
    }
    SubscribeFilter::new(subscription.topic.clone(), qos(options.qos))
}

#[async_trait]
impl Transport for RumqttcTransport {
    async fn publish(
        &self,
        topic: &str,
        options: WriteOptions,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        tracing::debug!(
            component = "rumqttc",
            topic,
            retain = options.retain,
            payload_len = payload.len(),
            "Publishing"
        );

        self.client
            .publish(topic, qos(options.qos), options.retain, payload)
            .await
            .map_err(|e| TransportError::Publish(e.to_string()))
    }

    async fn subscribe(&self, subscriptions: &[Subscription]) -> Result<(), TransportError> {
        if subscriptions.is_empty() {
            return Ok(());
        }

        tracing::info!(
            component = "rumqttc",
            count = subscriptions.len(),
            "Subscribing to MQTT topics"
        );

        self.client
            .subscribe_many(subscriptions.iter().map(filter))
            .await
            .map_err(|e| TransportError::Subscribe(e.to_string()))
    }

    async fn unsubscribe(&self, topics: &[String]) -> Result<(), TransportError> {
        for topic in topics {
            tracing::info!(component = "rumqttc", topic = %topic, "Unsubscribing from MQTT topic");

            self.client
                .unsubscribe(topic.as_str())
                .await
                .map_err(|e| TransportError::Unsubscribe(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::MqttOptions;

    fn transport() -> (RumqttcTransport, rumqttc::EventLoop) {
        let (client, eventloop) = AsyncClient::new(MqttOptions::new("test", "localhost", 1883), 10);
        (RumqttcTransport::new(client), eventloop)
    }

    #[test]
    fn qos_levels() {
        assert_eq!(qos(QualityOfService::AtMostOnce), QoS::AtMostOnce);
        assert_eq!(qos(QualityOfService::AtLeastOnce), QoS::AtLeastOnce);
        assert_eq!(qos(QualityOfService::ExactlyOnce), QoS::ExactlyOnce);
    }

    #[tokio::test]
    async fn empty_subscribe_sends_nothing() {
        let (transport, eventloop) = transport();
        drop(eventloop);
        // Nothing is sent, so a closed event loop is not noticed.
        tokio_test::assert_ok!(transport.subscribe(&[]).await);
    }

    #[tokio::test]
    async fn closed_event_loop_is_reported() {
        let (transport, eventloop) = transport();
        drop(eventloop);

        let err = transport
            .publish("a/state", WriteOptions::default(), Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Publish(_)));

        let err = transport
            .subscribe(&[Subscription::new("a/command")])
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Subscribe(_)));
        assert_eq!(transport.disconnect().await, Err(TransportError::Disconnected));
    }
}
