//! Seams between value cells and the MQTT transport.
//!
//! - [`Writer`] publishes one message.
//! - [`Subscriber`] registers inbound handlers for topics.
//! - [`Handler`] receives inbound messages. Handlers must not block.
//! - [`Transport`] is the raw client a [`crate::SubscriptionManager`] drives.

use crate::options::{Subscription, WriteOptions};
use async_trait::async_trait;
use std::sync::Arc;

/// Callback for inbound messages on subscribed topics.
///
/// A handler may be invoked at any time from the transport's delivery task, so
/// it does not return errors and must not block. Long-running work belongs on
/// a task spawned by the handler.
pub trait Handler: Send + Sync {
    /// Handle one inbound message.
    fn serve(&self, topic: &str, payload: &[u8]);
}

impl<F> Handler for F
where
    F: Fn(&str, &[u8]) + Send + Sync,
{
    fn serve(&self, topic: &str, payload: &[u8]) {
        self(topic, payload);
    }
}

/// Minimal capability for publishing to MQTT.
#[async_trait]
pub trait Writer: Send + Sync {
    /// Publish `payload` to `topic` with the given options.
    async fn write_topic(
        &self,
        topic: &str,
        options: WriteOptions,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;
}

/// Manages inbound registrations.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Subscribe to every subscription, routing matching messages to `handler`.
    async fn subscribe(
        &self,
        handler: Arc<dyn Handler>,
        subscriptions: Vec<Subscription>,
    ) -> Result<(), TransportError>;

    /// Remove subscriptions for the given topics.
    async fn unsubscribe(&self, topics: Vec<String>) -> Result<(), TransportError>;
}

/// Raw transport operations issued by the subscription manager.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Publish one message.
    async fn publish(
        &self,
        topic: &str,
        options: WriteOptions,
        payload: Vec<u8>,
    ) -> Result<(), TransportError>;

    /// Issue a subscribe request for the given subscriptions.
    async fn subscribe(&self, subscriptions: &[Subscription]) -> Result<(), TransportError>;

    /// Issue an unsubscribe request for the given topics.
    async fn unsubscribe(&self, topics: &[String]) -> Result<(), TransportError>;
}

/// Errors surfaced by the transport. These are transient and never retried here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// Publish failed
    #[error("publish error: {0}")]
    Publish(String),
    /// Subscribe failed
    #[error("subscription error: {0}")]
    Subscribe(String),
    /// Unsubscribe failed
    #[error("unsubscribe error: {0}")]
    Unsubscribe(String),
    /// Transport is not connected
    #[error("transport disconnected")]
    Disconnected,
}
