//! Outbound value cells.
//!
//! A [`Value`] holds the last value this process published for one topic.
//! Writes are not transactional across the two steps: the stored value is
//! updated before the publish, so a transport error means local state
//! advanced while the peer state is unknown.
//!
//! Writes to one cell are serialized from encoding through the publish, so
//! the last payload handed to the transport is always the stored value.
//! Reads only take the state lock and never wait on a publish.

use crate::codec::{CodecError, Marshaler};
use crate::options::WriteOptions;
use crate::topic::{join_topic, trim_topic};
use crate::transport::{TransportError, Writer};
use parking_lot::RwLock;
use tokio::sync::Mutex;

#[derive(Debug)]
struct Slot<T> {
    value: Option<T>,
}

/// A value that can be written to an MQTT topic.
pub struct Value<T> {
    topic: String,
    marshaler: Option<Marshaler<T>>,
    options: WriteOptions,
    slot: RwLock<Slot<T>>,
    writing: Mutex<()>,
}

impl<T> Value<T>
where
    T: Clone + Send + Sync,
{
    /// Create a value for `topic` using default write options (QoS 0, no retain).
    ///
    /// A value without a marshaler can still describe a topic for discovery,
    /// but every write fails with [`ValueError::NoMarshaler`].
    #[must_use]
    pub fn new(topic: impl Into<String>, marshaler: Option<Marshaler<T>>) -> Self {
        Self::with_options(topic, marshaler, WriteOptions::default())
    }

    /// Create a value for `topic` with explicit write options.
    #[must_use]
    pub fn with_options(
        topic: impl Into<String>,
        marshaler: Option<Marshaler<T>>,
        options: WriteOptions,
    ) -> Self {
        let topic = topic.into();
        Self {
            topic: trim_topic(&topic).to_string(),
            marshaler,
            options,
            slot: RwLock::new(Slot { value: None }),
            writing: Mutex::new(()),
        }
    }

    /// Topic relative to the owning component's prefix.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Options used for every publish of this value.
    #[must_use]
    pub fn options(&self) -> WriteOptions {
        self.options
    }

    /// Full topic for this value under `prefix`.
    #[must_use]
    pub fn fully_qualified_topic(&self, prefix: &str) -> String {
        join_topic([prefix, self.topic.as_str()])
    }

    /// The most recently written value, or `None` if never written.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.slot.read().value.clone()
    }

    /// The most recently written value and whether a write ever succeeded.
    ///
    /// Before the first write this returns `T::default()` and `false`.
    #[must_use]
    pub fn get(&self) -> (T, bool)
    where
        T: Default,
    {
        match self.value() {
            Some(value) => (value, true),
            None => (T::default(), false),
        }
    }

    /// Encode `value`, store it, and publish it to `prefix` + topic.
    ///
    /// Returns the stored value. Concurrent writes to the same cell wait for
    /// each other.
    ///
    /// # Errors
    ///
    /// - [`ValueError::NoMarshaler`] if no marshaler is configured (nothing changes)
    /// - [`ValueError::Marshal`] if encoding fails (nothing changes)
    /// - [`ValueError::Transport`] if the publish fails (the value is already stored)
    pub async fn write(&self, writer: &dyn Writer, prefix: &str, value: T) -> Result<T, ValueError> {
        let marshaler = self.marshaler.as_ref().ok_or(ValueError::NoMarshaler)?;
        let _writing = self.writing.lock().await;
        let payload = marshaler(&value).map_err(ValueError::Marshal)?;

        self.slot.write().value = Some(value.clone());

        let topic = self.fully_qualified_topic(prefix);
        tracing::debug!(
            component = "mqtt.value",
            topic = %topic,
            payload_len = payload.len(),
            retain = self.options.retain,
            "Writing value"
        );

        writer
            .write_topic(&topic, self.options, payload)
            .await
            .map_err(ValueError::Transport)?;

        Ok(value)
    }

    /// Publish the stored value again, e.g. for subscribers that missed a
    /// non-retained write.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::NeverWritten`] without touching the transport if
    /// no write ever succeeded, otherwise the errors of [`Value::write`].
    pub async fn republish(&self, writer: &dyn Writer, prefix: &str) -> Result<T, ValueError> {
        // A write racing with this one may publish in between; the newer
        // value then goes out again, which is harmless.
        let current = self.value().ok_or(ValueError::NeverWritten)?;
        self.write(writer, prefix, current).await
    }
}

impl<T> std::fmt::Debug for Value<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("topic", &self.topic)
            .field("options", &self.options)
            .field("has_marshaler", &self.marshaler.is_some())
            .finish_non_exhaustive()
    }
}

/// Full topic of an optional value, or the empty string when absent.
#[must_use]
pub fn value_topic<T>(value: Option<&Value<T>>, prefix: &str) -> String
where
    T: Clone + Send + Sync,
{
    value.map(|v| v.fully_qualified_topic(prefix)).unwrap_or_default()
}

/// Errors writing a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValueError {
    /// No marshaler configured for this value
    #[error("no marshaler configured")]
    NoMarshaler,
    /// `republish` was called before any successful write
    #[error("value was never written")]
    NeverWritten,
    /// Encoding the value failed
    #[error("marshal error: {0}")]
    Marshal(CodecError),
    /// Transport rejected the publish
    #[error(transparent)]
    Transport(TransportError),
}
