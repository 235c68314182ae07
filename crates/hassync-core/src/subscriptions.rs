//! Subscription tracking and reconnect handling.
//!
//! The [`SubscriptionManager`] remembers every active subscription so it can
//! re-issue them when the transport reconnects with a clean session. The
//! tracked set is guarded by one async mutex that is held across the transport
//! call, so a concurrent subscribe or unsubscribe never observes a half
//! updated set. Inbound routing uses a separate lock and never waits on a
//! reconnect in progress.

use crate::options::{ReadOptions, Subscription, WriteOptions};
use crate::topic::matches_filter;
use crate::transport::{Handler, Subscriber, Transport, TransportError, Writer};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Tracks subscriptions over a [`Transport`] and routes inbound messages.
pub struct SubscriptionManager<T> {
    transport: T,
    tracked: Mutex<BTreeMap<String, ReadOptions>>,
    routes: RwLock<BTreeMap<String, Arc<dyn Handler>>>,
}

impl<T> SubscriptionManager<T>
where
    T: Transport,
{
    /// Create a manager with no subscriptions.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            tracked: Mutex::new(BTreeMap::new()),
            routes: RwLock::new(BTreeMap::new()),
        }
    }

    /// The underlying transport.
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Snapshot of the tracked subscriptions, ordered by topic.
    pub async fn tracked(&self) -> Vec<Subscription> {
        self.tracked
            .lock()
            .await
            .iter()
            .map(|(topic, options)| Subscription::with_options(topic.clone(), *options))
            .collect()
    }

    /// Re-issue every tracked subscription after the transport reconnected.
    ///
    /// Failures are logged and not retried; the next reconnect tries again.
    pub async fn on_reconnect(&self) {
        let tracked = self.tracked.lock().await;
        if tracked.is_empty() {
            return;
        }

        let subscriptions: Vec<Subscription> = tracked
            .iter()
            .map(|(topic, options)| Subscription::with_options(topic.clone(), *options))
            .collect();

        tracing::debug!(
            component = "mqtt.subscriptions",
            count = subscriptions.len(),
            "Reconnected to MQTT. Re-sending subscriptions."
        );

        if let Err(err) = self.transport.subscribe(&subscriptions).await {
            tracing::error!(
                component = "mqtt.subscriptions",
                error = %err,
                "Failed to re-subscribe to mqtt topics"
            );
        }
    }

    /// Dispatch an inbound message to every handler whose filter matches `topic`.
    pub fn route(&self, topic: &str, payload: &[u8]) {
        let handlers: Vec<Arc<dyn Handler>> = self
            .routes
            .read()
            .iter()
            .filter(|(filter, _)| matches_filter(filter, topic))
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        if handlers.is_empty() {
            tracing::debug!(component = "mqtt.subscriptions", topic, "No handler for message");
            return;
        }

        for handler in handlers {
            handler.serve(topic, payload);
        }
    }
}

#[async_trait]
impl<T> Subscriber for SubscriptionManager<T>
where
    T: Transport,
{
    async fn subscribe(
        &self,
        handler: Arc<dyn Handler>,
        subscriptions: Vec<Subscription>,
    ) -> Result<(), TransportError> {
        if subscriptions.is_empty() {
            return Ok(());
        }

        let mut tracked = self.tracked.lock().await;
        {
            let mut routes = self.routes.write();
            for subscription in &subscriptions {
                tracked.insert(subscription.topic.clone(), subscription.options);
                routes.insert(subscription.topic.clone(), Arc::clone(&handler));
            }
        }

        tracing::debug!(
            component = "mqtt.subscriptions",
            topics = ?subscriptions.iter().map(|s| s.topic.as_str()).collect::<Vec<_>>(),
            "Subscribing to MQTT Topic(s)"
        );

        self.transport.subscribe(&subscriptions).await
    }

    async fn unsubscribe(&self, topics: Vec<String>) -> Result<(), TransportError> {
        let mut tracked = self.tracked.lock().await;

        let known: Vec<String> = topics
            .into_iter()
            .filter(|topic| tracked.remove(topic).is_some())
            .collect();
        if known.is_empty() {
            return Ok(());
        }

        {
            let mut routes = self.routes.write();
            for topic in &known {
                routes.remove(topic);
            }
        }

        tracing::debug!(
            component = "mqtt.subscriptions",
            topics = ?known,
            "Unsubscribing from MQTT Topic(s)"
        );

        self.transport.unsubscribe(&known).await
    }
}

#[async_trait]
impl<T> Writer for SubscriptionManager<T>
where
    T: Transport,
{
    async fn write_topic(
        &self,
        topic: &str,
        options: WriteOptions,
        payload: Vec<u8>,
    ) -> Result<(), TransportError> {
        tracing::debug!(
            component = "mqtt.subscriptions",
            topic,
            qos = %options.qos,
            retain = options.retain,
            payload_len = payload.len(),
            "Publishing payload"
        );

        self.transport.publish(topic, options, payload).await
    }
}
