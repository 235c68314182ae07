//! Components: one Home Assistant entity backed by a [`Platform`].

use crate::builder::{DocumentBuilder, ValidationErrors};
use crate::fields;
use crate::hass::{Availability, CustomAvailability};
use hassync_core::value::value_topic;
use hassync_core::{
    trim_topic, Handler, RemoteValue, Subscriber, Subscription, TransportError, Value,
    WriteOptions,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use url::Url;

/// A relative topic and the handler that owns it.
pub type Route = (String, Arc<dyn Handler>);

/// Behavior specific to one Home Assistant entity platform (light, sensor, ...).
pub trait Platform: Send + Sync {
    /// Value of the `platform` discovery field.
    fn platform_name(&self) -> &'static str;

    /// Subscriptions for every configured inbound cell, under `prefix`.
    fn subscriptions(&self, prefix: &str) -> Vec<Subscription>;

    /// Inbound cells keyed by their topic relative to the component prefix,
    /// in dispatch order.
    fn routes(&self) -> Vec<Route>;

    /// Write platform-specific discovery fields using `prefix` for all topics.
    fn marshal_discovery(&self, doc: &mut DocumentBuilder, prefix: &str);
}

/// Anything that yields a component record for a discovery document.
pub trait Discoverable: Send + Sync {
    /// The component's discovery record.
    ///
    /// # Errors
    ///
    /// Returns every field violation of the component.
    fn discovery_record(&self) -> Result<JsonValue, ValidationErrors>;
}

/// Add the route for an optional inbound cell.
pub fn push_route<T>(routes: &mut Vec<Route>, cell: Option<&Arc<RemoteValue<T>>>)
where
    T: Clone + Send + Sync + 'static,
{
    if let Some(cell) = cell {
        if !cell.topic().is_empty() {
            let handler: Arc<dyn Handler> = Arc::clone(cell) as Arc<dyn Handler>;
            routes.push((cell.topic().to_string(), handler));
        }
    }
}

/// Add the subscription for an optional inbound cell.
pub fn push_subscription<T>(
    subscriptions: &mut Vec<Subscription>,
    cell: Option<&Arc<RemoteValue<T>>>,
    prefix: &str,
) where
    T: Clone + Send + Sync + 'static,
{
    if let Some(subscription) = cell.and_then(|c| c.subscription(prefix)) {
        subscriptions.push(subscription);
    }
}

/// Exact-match dispatch table, built once from a platform's routes.
///
/// The first route with a matching topic wins. Two cells configured with the
/// same topic is a configuration error; only the first receives messages.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    /// Build a table from `routes`, keeping their order.
    #[must_use]
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Forward the message to the first route for `topic`. Returns whether one matched.
    pub fn dispatch(&self, topic: &str, payload: &[u8]) -> bool {
        match self.routes.iter().find(|(route, _)| route == topic) {
            Some((_, handler)) => {
                handler.serve(topic, payload);
                true
            }
            None => false,
        }
    }

    /// Number of routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Whether the table has no routes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Strip `prefix` from `topic` on a segment boundary.
fn strip_topic_prefix<'a>(prefix: &str, topic: &'a str) -> Option<&'a str> {
    let prefix = trim_topic(prefix);
    if prefix.is_empty() {
        return Some(trim_topic(topic));
    }

    let rest = trim_topic(topic).strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with(hassync_core::SEPARATOR) {
        Some(trim_topic(rest))
    } else {
        None
    }
}

fn route_inbound(prefix: &str, table: &RouteTable, topic: &str, payload: &[u8]) {
    let Some(relative) = strip_topic_prefix(prefix, topic) else {
        tracing::debug!(component = "discovery.component", topic, prefix, "Dropping message outside component prefix");
        return;
    };

    if !table.dispatch(relative, payload) {
        tracing::debug!(component = "discovery.component", topic, "No cell for message");
    }
}

struct Active {
    topics: Vec<String>,
    routes: Arc<RouteTable>,
}

/// A Home Assistant entity belonging to a device.
pub struct Component<P> {
    /// Platform-specific cells and settings
    pub platform: P,
    /// Prefix for every topic of this component
    pub topic_prefix: String,
    /// Identifies the entity. Must be non-empty and unique.
    pub unique_id: String,
    /// Entity name. `None` means only the device name is relevant.
    pub name: Option<String>,
    /// Entity category, e.g. `diagnostic`
    pub entity_category: String,
    /// Frontend icon, e.g. `mdi:lightbulb`
    pub icon: String,
    /// Picture URL for the entity
    pub picture: Option<Url>,
    /// Availability of this entity. Required.
    pub availability: Option<Arc<Value<Availability>>>,
    /// Custom availability payloads
    pub custom_availability: CustomAvailability,
    /// Used instead of the name to generate the entity id, e.g. `light.lamp`
    pub default_entity_id: String,
    /// Options Home Assistant uses when publishing commands
    pub write_options: WriteOptions,
    active: Option<Active>,
}

impl<P: Platform> Component<P> {
    /// Create a component with the required fields. Everything else starts empty.
    #[must_use]
    pub fn new(
        unique_id: impl Into<String>,
        topic_prefix: impl Into<String>,
        availability: Arc<Value<Availability>>,
        platform: P,
    ) -> Self {
        Self {
            platform,
            topic_prefix: topic_prefix.into(),
            unique_id: unique_id.into(),
            name: None,
            entity_category: String::new(),
            icon: String::new(),
            picture: None,
            availability: Some(availability),
            custom_availability: CustomAvailability::default(),
            default_entity_id: String::new(),
            write_options: WriteOptions::default(),
            active: None,
        }
    }

    /// Set the entity name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Removal marker for this component.
    #[must_use]
    pub fn for_removal(&self) -> RemoveComponent {
        RemoveComponent {
            platform: self.platform.platform_name().to_string(),
        }
    }

    /// Whether [`Component::subscribe`] succeeded without a later unsubscribe.
    #[must_use]
    pub fn is_subscribed(&self) -> bool {
        self.active.is_some()
    }

    /// Subscribe every configured inbound cell through `subscriber`.
    ///
    /// Topics are recorded before the transport call, so after a transport
    /// failure the component still counts as subscribed; the subscriber keeps
    /// tracking them for the next reconnect. Call [`Component::unsubscribe`] to
    /// start over.
    ///
    /// # Errors
    ///
    /// - [`ComponentError::AlreadySubscribed`] without any transport action
    /// - [`ComponentError::Transport`] if the subscribe request fails
    pub async fn subscribe(&mut self, subscriber: &dyn Subscriber) -> Result<(), ComponentError> {
        if self.active.is_some() {
            return Err(ComponentError::AlreadySubscribed);
        }

        let subscriptions = self.platform.subscriptions(&self.topic_prefix);
        let routes = Arc::new(RouteTable::new(self.platform.routes()));
        self.active = Some(Active {
            topics: subscriptions.iter().map(|s| s.topic.clone()).collect(),
            routes: Arc::clone(&routes),
        });

        if subscriptions.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            component = "discovery.component",
            unique_id = %self.unique_id,
            count = subscriptions.len(),
            "Subscribing component"
        );

        let prefix = self.topic_prefix.clone();
        let handler: Arc<dyn Handler> = Arc::new(move |topic: &str, payload: &[u8]| {
            route_inbound(&prefix, &routes, topic, payload);
        });

        subscriber
            .subscribe(handler, subscriptions)
            .await
            .map_err(ComponentError::Transport)
    }

    /// Remove this component's subscriptions. A no-op when not subscribed.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Transport`] if the unsubscribe request fails.
    pub async fn unsubscribe(&mut self, subscriber: &dyn Subscriber) -> Result<(), ComponentError> {
        let Some(active) = self.active.take() else {
            return Ok(());
        };
        if active.topics.is_empty() {
            return Ok(());
        }

        subscriber
            .unsubscribe(active.topics)
            .await
            .map_err(ComponentError::Transport)
    }

    /// Route an inbound message on a full topic to the matching cell.
    ///
    /// Messages outside this component's prefix are dropped.
    pub fn serve_inbound(&self, topic: &str, payload: &[u8]) {
        match &self.active {
            Some(active) => route_inbound(&self.topic_prefix, &active.routes, topic, payload),
            None => {
                let table = RouteTable::new(self.platform.routes());
                route_inbound(&self.topic_prefix, &table, topic, payload);
            }
        }
    }
}

impl<P: Platform> Discoverable for Component<P> {
    fn discovery_record(&self) -> Result<JsonValue, ValidationErrors> {
        let mut doc = DocumentBuilder::new();
        let prefix = self.topic_prefix.as_str();

        doc.required("platform", fields::PLATFORM, self.platform.platform_name());

        let name = self
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .map_or(JsonValue::Null, |n| JsonValue::String(n.to_string()));
        doc.insert(fields::NAME, name);

        doc.optional(fields::ENTITY_CATEGORY, &self.entity_category);
        doc.optional(fields::ICON, &self.icon);
        doc.optional_url(fields::PICTURE, self.picture.as_ref());

        doc.required_topic(
            "availability",
            fields::AVAILABILITY_TOPIC,
            value_topic(self.availability.as_deref(), prefix),
        );
        doc.optional(fields::PAYLOAD_AVAILABLE, &self.custom_availability.available);
        doc.optional(fields::PAYLOAD_NOT_AVAILABLE, &self.custom_availability.unavailable);

        doc.optional(fields::DEFAULT_ENTITY_ID, &self.default_entity_id);
        doc.required("unique id", fields::UNIQUE_ID, &self.unique_id);
        doc.optional(fields::QOS, &self.write_options.qos);
        doc.optional(fields::RETAIN, &self.write_options.retain);

        self.platform.marshal_discovery(&mut doc, prefix);

        doc.finish().map(JsonValue::Object)
    }
}

impl<P> std::fmt::Debug for Component<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("unique_id", &self.unique_id)
            .field("topic_prefix", &self.topic_prefix)
            .field("subscribed", &self.active.is_some())
            .finish_non_exhaustive()
    }
}

/// Replaces a component in a discovery document to retract it.
///
/// The marker spells the platform key out as `platform`; Home Assistant
/// accepts it alongside the abbreviated `p` used in full component records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveComponent {
    /// Platform of the component being removed
    pub platform: String,
}

impl Discoverable for RemoveComponent {
    fn discovery_record(&self) -> Result<JsonValue, ValidationErrors> {
        let mut doc = DocumentBuilder::new();
        doc.required("platform", "platform", &self.platform);
        doc.finish().map(JsonValue::Object)
    }
}

/// Errors from component lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComponentError {
    /// `subscribe` was called twice without `unsubscribe`
    #[error("component already subscribed")]
    AlreadySubscribed,
    /// The subscriber rejected the request
    #[error(transparent)]
    Transport(TransportError),
}
