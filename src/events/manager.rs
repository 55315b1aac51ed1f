//! Channel registry and fan-out delivery.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use tracing::{debug, warn};

use super::config::EventManagerConfig;
use super::subscription::{Binding, Delivery, SubscriptionHandle};
use crate::error::QueueError;
use crate::queue::ServiceQueue;
use crate::task::Args;

struct Inner {
    config: EventManagerConfig,
    channels: RwLock<HashMap<String, Vec<Binding>>>,
    next_id: AtomicU64,
}

/// Routes named events to subscriber methods on their own queues.
///
/// Delivery never runs subscriber code on the sender's thread: `send`
/// enqueues one task per subscriber, in registration order, and returns.
/// Each subscriber then handles the event on its own worker.
///
/// `EventManager` is a cheap handle: clones share one registry.
///
/// ## Policies
///
/// - A channel with no subscribers is a silent no-op, unless
///   [`EventManagerConfig::strict_channels`] is set.
/// - A subscriber whose queue is stopped (or not started) misses the event.
///   It is counted in [`Delivery::dropped`] and logged; the other subscribers
///   still receive it and `send` still succeeds.
#[derive(Clone)]
pub struct EventManager {
    inner: Arc<Inner>,
}

impl Default for EventManager {
    fn default() -> Self {
        Self::new()
    }
}

impl EventManager {
    pub fn new() -> Self {
        Self::with_config(EventManagerConfig::default())
    }

    pub fn with_config(config: EventManagerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                channels: RwLock::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &EventManagerConfig {
        &self.inner.config
    }

    /// Bind `method` on `queue` to `channel`.
    ///
    /// Subscribing the same (channel, queue, method) again returns the
    /// existing handle.
    pub fn subscribe(
        &self,
        channel: &str,
        queue: &ServiceQueue,
        method: &str,
    ) -> Result<SubscriptionHandle, QueueError> {
        let mut channels = self.write()?;
        let bindings = channels.entry(channel.to_string()).or_default();

        if let Some(existing) = bindings.iter().find(|b| b.matches(queue.id(), method)) {
            return Ok(existing.handle.clone());
        }

        let handle = SubscriptionHandle {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            channel: channel.to_string(),
            queue_id: queue.id(),
            queue_name: queue.name().to_string(),
            method: method.to_string(),
        };
        bindings.push(Binding {
            handle: handle.clone(),
            queue: queue.clone(),
        });

        debug!(channel, queue = queue.name(), method, "subscribed");
        Ok(handle)
    }

    /// Remove one binding. Returns whether it was present.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> Result<bool, QueueError> {
        let mut channels = self.write()?;
        let Some(bindings) = channels.get_mut(&handle.channel) else {
            return Ok(false);
        };

        let before = bindings.len();
        bindings.retain(|b| b.handle.id != handle.id);
        let removed = bindings.len() != before;
        if bindings.is_empty() {
            channels.remove(&handle.channel);
        }
        Ok(removed)
    }

    /// Remove every binding that targets `queue`. Returns how many went.
    pub fn unsubscribe_queue(&self, queue: &ServiceQueue) -> Result<usize, QueueError> {
        let mut channels = self.write()?;
        let mut removed = 0;
        channels.retain(|_, bindings| {
            let before = bindings.len();
            bindings.retain(|b| b.handle.queue_id != queue.id());
            removed += before - bindings.len();
            !bindings.is_empty()
        });
        Ok(removed)
    }

    /// Publish `payload` on `channel`. Subscribers receive it as their only
    /// argument.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        channel: &str,
        payload: &T,
    ) -> Result<Delivery, QueueError> {
        self.send_args(channel, Args::single(payload)?)
    }

    /// Publish a tuple on `channel`. Subscribers receive one argument per
    /// element, positionally.
    ///
    /// ```
    /// # use service_queue::EventManager;
    /// let events = EventManager::new();
    /// events.send_array("payroll", &("Rick", 100)).unwrap();
    /// ```
    pub fn send_array<T: Serialize + ?Sized>(
        &self,
        channel: &str,
        payloads: &T,
    ) -> Result<Delivery, QueueError> {
        self.send_args(channel, Args::encode(payloads)?)
    }

    /// Publish pre-encoded arguments on `channel`.
    pub fn send_args(&self, channel: &str, args: Args) -> Result<Delivery, QueueError> {
        // Snapshot, then deliver without holding the lock.
        let bindings = self.read()?.get(channel).cloned().unwrap_or_default();

        if bindings.is_empty() {
            if self.inner.config.strict_channels {
                return Err(QueueError::UnknownChannel(channel.to_string()));
            }
            debug!(channel, "no subscribers");
            return Ok(Delivery::default());
        }

        let mut delivery = Delivery::default();
        for binding in bindings {
            match binding.queue.enqueue(binding.handle.method.as_str(), args.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(err) => {
                    warn!(
                        channel,
                        queue = binding.queue.name(),
                        method = %binding.handle.method,
                        error = %err,
                        "dropping event for unavailable subscriber"
                    );
                    delivery.dropped += 1;
                }
            }
        }

        debug!(channel, delivered = delivery.delivered, dropped = delivery.dropped, "sent");
        Ok(delivery)
    }

    /// Current subscribers of `channel`, in delivery order.
    pub fn subscribers(&self, channel: &str) -> Result<Vec<SubscriptionHandle>, QueueError> {
        Ok(self
            .read()?
            .get(channel)
            .map(|bindings| bindings.iter().map(|b| b.handle.clone()).collect())
            .unwrap_or_default())
    }

    /// Channels with at least one subscriber, sorted.
    pub fn channels(&self) -> Result<Vec<String>, QueueError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Vec<Binding>>>, QueueError> {
        self.inner
            .channels
            .read()
            .map_err(|_| QueueError::LockPoisoned("event registry"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Vec<Binding>>>, QueueError> {
        self.inner
            .channels
            .write()
            .map_err(|_| QueueError::LockPoisoned("event registry"))
    }
}

impl fmt::Debug for EventManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventManager")
            .field("config", &self.inner.config)
            .field("channels", &self.channels().unwrap_or_default())
            .finish()
    }
}
