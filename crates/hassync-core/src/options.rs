//! Delivery options attached to publish and subscribe operations.

use serde::{Serialize, Serializer};
use std::fmt;

/// Level of delivery guarantee requested from the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub enum QualityOfService {
    /// Fire and forget, no acknowledgment from the receiver.
    #[default]
    AtMostOnce,
    /// Delivered at least once, acknowledged with PUBACK.
    AtLeastOnce,
    /// Delivered exactly once using the four-step handshake.
    ExactlyOnce,
}

impl QualityOfService {
    /// Numeric level as used on the wire.
    #[must_use]
    pub fn level(self) -> u8 {
        match self {
            Self::AtMostOnce => 0,
            Self::AtLeastOnce => 1,
            Self::ExactlyOnce => 2,
        }
    }
}

impl TryFrom<u8> for QualityOfService {
    type Error = OptionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AtMostOnce),
            1 => Ok(Self::AtLeastOnce),
            2 => Ok(Self::ExactlyOnce),
            other => Err(OptionError::InvalidQos(other)),
        }
    }
}

impl fmt::Display for QualityOfService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtMostOnce => write!(f, "at most once (0)"),
            Self::AtLeastOnce => write!(f, "at least once (1)"),
            Self::ExactlyOnce => write!(f, "exactly once (2)"),
        }
    }
}

impl Serialize for QualityOfService {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.level())
    }
}

/// How the broker sends retained messages when a subscription is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RetainHandling {
    /// Send retained messages on every subscribe, including resubscribes.
    #[default]
    SendOnSubscribe,
    /// Send retained messages only for newly established subscriptions.
    SendOnNewSubscribe,
    /// Never send retained messages on subscribe.
    IgnoreRetained,
}

impl TryFrom<u8> for RetainHandling {
    type Error = OptionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::SendOnSubscribe),
            1 => Ok(Self::SendOnNewSubscribe),
            2 => Ok(Self::IgnoreRetained),
            other => Err(OptionError::InvalidRetainHandling(other)),
        }
    }
}

impl fmt::Display for RetainHandling {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendOnSubscribe => write!(f, "send on subscribe (0)"),
            Self::SendOnNewSubscribe => write!(f, "send on new subscribe (1)"),
            Self::IgnoreRetained => write!(f, "ignore retained (2)"),
        }
    }
}

/// Options for writing to a topic. The default is QoS 0 without retain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOptions {
    /// Quality of service for the publish.
    pub qos: QualityOfService,
    /// Ask the broker to keep the last message and replay it to new subscribers.
    pub retain: bool,
}

impl WriteOptions {
    /// Options with `retain` set and the default QoS.
    #[must_use]
    pub fn retained() -> Self {
        Self {
            retain: true,
            ..Self::default()
        }
    }
}

/// Options for a subscription. The default is QoS 0 with
/// [`RetainHandling::SendOnSubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadOptions {
    /// Maximum QoS accepted for this subscription.
    pub qos: QualityOfService,
    /// Do not forward messages published by this client back to it.
    pub no_local: bool,
    /// Keep the retain flag as published when forwarding.
    pub retain_as_published: bool,
    /// Retained message delivery policy.
    pub retain_handling: RetainHandling,
}

/// One desired inbound registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Topic filter to subscribe to
    pub topic: String,
    /// Subscription options
    pub options: ReadOptions,
}

impl Subscription {
    /// Create a subscription with default options.
    #[must_use]
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            options: ReadOptions::default(),
        }
    }

    /// Create a subscription with the given options.
    #[must_use]
    pub fn with_options(topic: impl Into<String>, options: ReadOptions) -> Self {
        Self {
            topic: topic.into(),
            options,
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.topic)
    }
}

/// Errors converting raw option values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    /// Quality of service outside 0..=2
    #[error("invalid quality of service value: {0}")]
    InvalidQos(u8),
    /// Retain handling outside 0..=2
    #[error("invalid subscription retain handling value: {0}")]
    InvalidRetainHandling(u8),
}
