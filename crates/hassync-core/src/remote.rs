//! Inbound value cells.
//!
//! A [`RemoteValue`] mirrors a value owned by someone else (usually Home
//! Assistant writing a command topic). Payloads delivered on its exact topic
//! are decoded, stored, and passed to every registered watcher in
//! registration order.
//!
//! Deliveries to one cell are serialized by a dedicated delivery lock. The
//! state lock is released before watchers run, so a watcher may read the cell
//! or register and remove watchers. A watcher must not deliver to its own cell.

use crate::codec::Unmarshaler;
use crate::options::{ReadOptions, Subscription};
use crate::topic::{join_topic, trim_topic};
use crate::transport::Handler;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

type Watcher<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifies a registered watcher. Ids are never reused by a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct State<T> {
    value: Option<T>,
    watchers: Vec<(WatchId, Watcher<T>)>,
    next_id: u64,
}

/// A value populated from an MQTT subscription.
pub struct RemoteValue<T> {
    topic: String,
    unmarshaler: Unmarshaler<T>,
    options: ReadOptions,
    state: RwLock<State<T>>,
    delivery: Mutex<()>,
}

impl<T> RemoteValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a remote value for `topic` with default read options.
    #[must_use]
    pub fn new(topic: impl Into<String>, unmarshaler: Unmarshaler<T>) -> Self {
        Self::with_options(topic, unmarshaler, ReadOptions::default())
    }

    /// Create a remote value for `topic` with explicit read options.
    #[must_use]
    pub fn with_options(
        topic: impl Into<String>,
        unmarshaler: Unmarshaler<T>,
        options: ReadOptions,
    ) -> Self {
        let topic = topic.into();
        Self {
            topic: trim_topic(&topic).to_string(),
            unmarshaler,
            options,
            state: RwLock::new(State {
                value: None,
                watchers: Vec::new(),
                next_id: 0,
            }),
            delivery: Mutex::new(()),
        }
    }

    /// Topic this cell accepts deliveries on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Read options used when subscribing.
    #[must_use]
    pub fn options(&self) -> ReadOptions {
        self.options
    }

    /// Full topic for this value under `prefix`.
    #[must_use]
    pub fn fully_qualified_topic(&self, prefix: &str) -> String {
        join_topic([prefix, self.topic.as_str()])
    }

    /// Subscription for this value under `prefix`, or `None` if the cell has no topic.
    #[must_use]
    pub fn subscription(&self, prefix: &str) -> Option<Subscription> {
        if self.topic.is_empty() {
            return None;
        }

        Some(Subscription::with_options(
            self.fully_qualified_topic(prefix),
            self.options,
        ))
    }

    /// The most recently received value, or `None` if nothing was received yet.
    #[must_use]
    pub fn value(&self) -> Option<T> {
        self.state.read().value.clone()
    }

    /// The most recently received value and whether anything was received.
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

    /// Number of registered watchers.
    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.state.read().watchers.len()
    }

    /// Decode `payload` if `topic` equals this cell's topic, store it, and
    /// notify watchers.
    ///
    /// A payload that fails to decode is logged and dropped; the previous
    /// value is kept and no watcher runs.
    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        if topic != self.topic {
            return;
        }

        let _delivery = self.delivery.lock();

        let parsed = match (self.unmarshaler)(payload) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::warn!(
                    component = "mqtt.value.remote",
                    topic = %self.topic,
                    error = %err,
                    payload_len = payload.len(),
                    "Failed to unmarshal payload from mqtt"
                );
                return;
            }
        };

        let watchers: Vec<Watcher<T>> = {
            let mut state = self.state.write();
            state.value = Some(parsed.clone());
            state
                .watchers
                .iter()
                .map(|(_, watcher)| Arc::clone(watcher))
                .collect()
        };

        tracing::debug!(
            component = "mqtt.value.remote",
            topic = %self.topic,
            count = watchers.len(),
            "Received new value from mqtt, updating watchers"
        );

        for watcher in &watchers {
            watcher(&parsed);
        }
    }

    /// Register a callback invoked with every successfully decoded value.
    ///
    /// Callbacks run synchronously on the delivery path and must not block.
    pub fn watch<F>(&self, callback: F) -> WatchId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut state = self.state.write();
        let id = WatchId(state.next_id);
        state.next_id += 1;
        state.watchers.push((id, Arc::new(callback)));

        tracing::debug!(component = "mqtt.value.remote", topic = %self.topic, %id, "Adding watcher");
        id
    }

    /// Remove a watcher. Unknown ids are logged and ignored.
    pub fn unwatch(&self, id: WatchId) {
        let mut state = self.state.write();
        match state.watchers.iter().position(|(watch_id, _)| *watch_id == id) {
            Some(index) => {
                state.watchers.remove(index);
                tracing::debug!(component = "mqtt.value.remote", topic = %self.topic, %id, "Removing watcher");
            }
            None => {
                tracing::warn!(
                    component = "mqtt.value.remote",
                    topic = %self.topic,
                    %id,
                    count = state.watchers.len(),
                    "Tried to remove an invalid watcher"
                );
            }
        }
    }

    /// Wait for the first delivered value that satisfies `predicate`, or until
    /// `cancel` fires.
    ///
    /// The returned value is the one that satisfied the predicate; the cell
    /// may already hold a newer value by the time the caller sees it. If a
    /// satisfying value and the cancellation are ready at the same time, the
    /// value is returned.
    ///
    /// # Errors
    ///
    /// Returns [`AwaitError::Cancelled`] if the token is cancelled first.
    pub async fn await_value<P>(
        &self,
        cancel: &CancellationToken,
        predicate: P,
    ) -> Result<T, AwaitError>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.await_until(cancel.cancelled(), AwaitError::Cancelled, predicate)
            .await
    }

    /// Like [`RemoteValue::await_value`] but gives up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`AwaitError::TimedOut`] if no satisfying value arrives in time.
    pub async fn await_value_timeout<P>(
        &self,
        timeout: Duration,
        predicate: P,
    ) -> Result<T, AwaitError>
    where
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.await_until(
            tokio::time::sleep(timeout),
            AwaitError::TimedOut(timeout),
            predicate,
        )
        .await
    }

    async fn await_until<F, P>(
        &self,
        cancelled: F,
        reason: AwaitError,
        predicate: P,
    ) -> Result<T, AwaitError>
    where
        F: Future<Output = ()>,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));

        tracing::debug!(component = "mqtt.value.remote", topic = %self.topic, "Awaiting value");

        let id = self.watch(move |value: &T| {
            if predicate(value) {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(value.clone());
                }
            }
        });
        let _guard = WatchGuard { cell: self, id };

        tokio::select! {
            biased;
            received = rx => received.map_err(|_| AwaitError::Closed),
            () = cancelled => {
                tracing::debug!(component = "mqtt.value.remote", topic = %self.topic, %reason, "Stopped waiting for value");
                Err(reason)
            }
        }
    }
}

impl<T> Handler for RemoteValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn serve(&self, topic: &str, payload: &[u8]) {
        self.deliver(topic, payload);
    }
}

impl<T> fmt::Debug for RemoteValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteValue")
            .field("topic", &self.topic)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Removes a transient watcher on every exit path, including drop of the
/// awaiting future.
struct WatchGuard<'a, T>
where
    T: Clone + Send + Sync + 'static,
{
    cell: &'a RemoteValue<T>,
    id: WatchId,
}

impl<T> Drop for WatchGuard<'_, T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.cell.unwatch(self.id);
    }
}

/// Full topic of an optional remote value, or the empty string when absent.
#[must_use]
pub fn remote_value_topic<T>(value: Option<&RemoteValue<T>>, prefix: &str) -> String
where
    T: Clone + Send + Sync + 'static,
{
    value
        .map(|v| v.fully_qualified_topic(prefix))
        .unwrap_or_default()
}

/// Predicate matching one specific value, for use with [`RemoteValue::await_value`].
pub fn desired_value<T>(desired: T) -> impl Fn(&T) -> bool + Send + Sync + 'static
where
    T: PartialEq + Send + Sync + 'static,
{
    move |value: &T| *value == desired
}

/// Reasons an await ended without a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AwaitError {
    /// The cancellation token fired first
    #[error("await cancelled")]
    Cancelled,
    /// The timeout elapsed first
    #[error("timed out after {0:?} waiting for value")]
    TimedOut(Duration),
    /// The transient watcher was dropped without producing a value
    #[error("watcher closed before a value was received")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{from_str_unmarshaler, string_unmarshaler};
    use crate::options::QualityOfService;

    fn brightness() -> Arc<RemoteValue<u32>> {
        Arc::new(RemoteValue::new("brightness/set", from_str_unmarshaler()))
    }

    #[test]
    fn deliver_on_exact_topic() {
        let cell = brightness();
        assert_eq!(cell.get(), (0, false));

        cell.deliver("brightness/set", b"200");
        assert_eq!(cell.get(), (200, true));
    }

    #[test]
    fn mismatched_topic_is_ignored() {
        let cell = brightness();
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        cell.watch(move |_| *counter.lock() += 1);

        cell.deliver("brightness", b"10");
        cell.deliver("brightness/set/extra", b"10");
        cell.deliver("/brightness/set", b"10");
        cell.deliver("+/set", b"10");

        assert!(cell.value().is_none());
        assert_eq!(*calls.lock(), 0);
    }

    #[test]
    fn bad_payload_keeps_last_good_value() {
        let cell = brightness();
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&calls);
        cell.watch(move |v| seen.lock().push(*v));

        cell.deliver("brightness/set", b"42");
        cell.deliver("brightness/set", b"not a number");

        assert_eq!(cell.value(), Some(42));
        assert_eq!(*calls.lock(), vec![42]);
    }

    #[test]
    fn watchers_run_in_registration_order_once_each() {
        let cell = brightness();
        let order = Arc::new(Mutex::new(Vec::new()));

        for n in 0..5 {
            let order = Arc::clone(&order);
            cell.watch(move |v| order.lock().push((n, *v)));
        }

        cell.deliver("brightness/set", b"7");

        assert_eq!(
            *order.lock(),
            vec![(0, 7), (1, 7), (2, 7), (3, 7), (4, 7)]
        );
    }

    #[test]
    fn unwatch_removes_only_that_watcher() {
        let cell = brightness();
        let order = Arc::new(Mutex::new(Vec::new()));

        let ids: Vec<WatchId> = (0..3)
            .map(|n| {
                let order = Arc::clone(&order);
                cell.watch(move |_| order.lock().push(n))
            })
            .collect();

        cell.unwatch(ids[1]);
        cell.deliver("brightness/set", b"1");
        assert_eq!(*order.lock(), vec![0, 2]);

        // Already removed: logged, no-op.
        cell.unwatch(ids[1]);
        assert_eq!(cell.watcher_count(), 2);
    }

    #[test]
    fn watcher_can_read_the_cell() {
        let cell = brightness();
        let observed = Arc::new(Mutex::new(None));

        let weak = Arc::downgrade(&cell);
        let slot = Arc::clone(&observed);
        cell.watch(move |_| {
            if let Some(cell) = weak.upgrade() {
                *slot.lock() = cell.value();
            }
        });

        cell.deliver("brightness/set", b"99");
        assert_eq!(*observed.lock(), Some(99));
    }

    #[test]
    fn subscription_uses_read_options() {
        let options = ReadOptions {
            qos: QualityOfService::AtLeastOnce,
            ..ReadOptions::default()
        };
        let cell: RemoteValue<String> =
            RemoteValue::with_options("command", string_unmarshaler(), options);

        let sub = cell.subscription("hassync/lamp").unwrap();
        assert_eq!(sub.topic, "hassync/lamp/command");
        assert_eq!(sub.options.qos, QualityOfService::AtLeastOnce);

        let empty: RemoteValue<String> = RemoteValue::new("", string_unmarshaler());
        assert!(empty.subscription("hassync/lamp").is_none());
        assert_eq!(remote_value_topic::<String>(None, "p"), "");
    }

    #[tokio::test]
    async fn await_returns_first_satisfying_value() {
        let cell = brightness();
        let token = CancellationToken::new();

        let producer = Arc::clone(&cell);
        let feed = async move {
            tokio::task::yield_now().await;
            for payload in [&b"10"[..], b"20", b"30", b"40"] {
                producer.deliver("brightness/set", payload);
            }
        };

        let (result, ()) = tokio::join!(cell.await_value(&token, |v| *v >= 20), feed);

        assert_eq!(result, Ok(20));
        assert_eq!(cell.value(), Some(40));
        assert_eq!(cell.watcher_count(), 0);
    }

    #[tokio::test]
    async fn await_with_cancelled_token_returns_cancelled() {
        let cell = brightness();
        cell.deliver("brightness/set", b"5");

        let token = CancellationToken::new();
        token.cancel();

        // The current value already satisfies the predicate, but only
        // deliveries count.
        let result = cell.await_value(&token, desired_value(5u32)).await;

        assert_eq!(result, Err(AwaitError::Cancelled));
        assert_eq!(cell.watcher_count(), 0);
    }

    #[tokio::test]
    async fn delivered_value_wins_over_simultaneous_cancel() {
        let cell = brightness();
        let token = CancellationToken::new();

        let producer = Arc::clone(&cell);
        let canceller = token.clone();
        let race = async move {
            producer.deliver("brightness/set", b"3");
            canceller.cancel();
        };

        let (result, ()) = tokio::join!(cell.await_value(&token, desired_value(3u32)), race);

        assert_eq!(result, Ok(3));
        assert_eq!(cell.watcher_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn await_timeout() {
        let cell = brightness();

        let result = cell
            .await_value_timeout(Duration::from_secs(5), desired_value(1u32))
            .await;

        assert_eq!(result, Err(AwaitError::TimedOut(Duration::from_secs(5))));
        assert_eq!(cell.watcher_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_await_removes_watcher() {
        let cell = brightness();
        let token = CancellationToken::new();

        let outer = tokio::time::timeout(
            Duration::from_millis(10),
            cell.await_value(&token, desired_value(1u32)),
        )
        .await;

        assert!(outer.is_err());
        assert_eq!(cell.watcher_count(), 0);
    }

    #[test]
    fn handler_dispatch() {
        let cell = brightness();
        let handler: Arc<dyn Handler> = cell.clone();
        handler.serve("brightness/set", b"12");
        assert_eq!(cell.value(), Some(12));
    }
}
