//! # hassync Core
//!
//! Typed value cells that mirror device state over MQTT topics.
//!
//! This crate provides:
//! - Topic path utilities (trim, join, filter matching)
//! - Delivery options for publishing and subscribing
//! - Pluggable payload codecs
//! - [`Value`]: an outbound cell published by this process
//! - [`RemoteValue`]: an inbound cell populated from a subscription, with observers
//! - [`SubscriptionManager`]: tracked subscriptions that survive transport reconnects
//!
//! ## Logging
//!
//! All diagnostics go through `tracing`. Nothing is printed until the host
//! application installs a subscriber.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod options;
pub mod remote;
pub mod subscriptions;
pub mod topic;
pub mod transport;
pub mod value;

pub use codec::{CodecError, Marshaler, Unmarshaler};
pub use options::{
    OptionError, QualityOfService, ReadOptions, RetainHandling, Subscription, WriteOptions,
};
pub use remote::{desired_value, AwaitError, RemoteValue, WatchId};
pub use subscriptions::SubscriptionManager;
pub use topic::{join_topic, matches_filter, trim_topic, SEPARATOR};
pub use transport::{Handler, Subscriber, Transport, TransportError, Writer};
pub use value::{Value, ValueError};
