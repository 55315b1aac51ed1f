//! Service registration and process-wide lifecycle.
//!
//! `ServiceRegistry` is the runtime context: it owns the shared
//! [`EventManager`] and every queue registered with it. Registering a
//! service creates its queue, starts it, and binds its declared event
//! handlers. `stop_all` tears everything down again.

use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};

use crate::error::QueueError;
use crate::events::{EventManager, SubscriptionHandle};
use crate::queue::{QueueConfig, QueueStats, ServiceQueue};
use crate::service::Service;

/// Owns the event bus and the queues of every registered service.
///
/// ## Example
///
/// ```
/// use service_queue::{ServiceRegistry, Service};
/// use serde_json::Value;
///
/// let registry = ServiceRegistry::new();
/// let audit = registry
///     .register(Service::new(Vec::<String>::new()).on_event("login", "record", |log, ctx| {
///         log.push(ctx.arg(0)?);
///         Ok(Value::Null)
///     }))
///     .unwrap();
///
/// registry.events().send("login", "rick").unwrap();
/// audit.flush().unwrap();
/// registry.stop_all().unwrap();
/// ```
pub struct ServiceRegistry {
    events: EventManager,
    queues: Mutex<Vec<ServiceQueue>>,
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::with_events(EventManager::new())
    }

    /// Use an existing event bus.
    pub fn with_events(events: EventManager) -> Self {
        Self {
            events,
            queues: Mutex::new(Vec::new()),
        }
    }

    /// The shared event bus.
    pub fn events(&self) -> &EventManager {
        &self.events
    }

    /// Register and start a service with default queue configuration.
    pub fn register<S: Send + 'static>(
        &self,
        service: Service<S>,
    ) -> Result<ServiceQueue, QueueError> {
        self.register_with(service, QueueConfig::default())
    }

    /// Register and start a service with explicit queue configuration.
    pub fn register_with<S: Send + 'static>(
        &self,
        service: Service<S>,
        config: QueueConfig,
    ) -> Result<ServiceQueue, QueueError> {
        let queue = self.add(service, config)?;
        queue.start()?;
        Ok(queue)
    }

    /// Register a service and bind its event handlers without starting its
    /// queue. Events sent before [`start_all`](Self::start_all) are dropped
    /// for this subscriber.
    pub fn add<S: Send + 'static>(
        &self,
        service: Service<S>,
        config: QueueConfig,
    ) -> Result<ServiceQueue, QueueError> {
        let bindings = service.event_bindings().to_vec();
        let queue = ServiceQueue::with_events(service, config, self.events.clone());

        let mut handles: Vec<SubscriptionHandle> = Vec::with_capacity(bindings.len());
        for binding in &bindings {
            match self.events.subscribe(&binding.channel, &queue, &binding.method) {
                Ok(handle) => handles.push(handle),
                Err(err) => {
                    for handle in &handles {
                        let _ = self.events.unsubscribe(handle);
                    }
                    return Err(err);
                }
            }
        }

        info!(
            queue = queue.name(),
            channels = ?bindings.iter().map(|b| b.channel.as_str()).collect::<Vec<_>>(),
            "service registered"
        );
        self.lock()?.push(queue.clone());
        Ok(queue)
    }

    /// Start every registered queue that is not running yet.
    pub fn start_all(&self) -> Result<(), QueueError> {
        for queue in self.queues()? {
            if !queue.state().is_started() {
                queue.start()?;
            }
        }
        Ok(())
    }

    /// Flush every registered queue once, in registration order.
    ///
    /// This is a single pass: events published while flushing a queue land
    /// on queues that may already have been flushed.
    pub fn flush_all(&self) -> Result<(), QueueError> {
        for queue in self.queues()? {
            if queue.state().is_started() {
                queue.flush()?;
            }
        }
        Ok(())
    }

    /// Stop every queue in registration order, unbind its handlers, and
    /// forget it. Returns each queue's final counters.
    ///
    /// A queue that fails to stop does not keep the rest running: every
    /// queue is stopped and unbound, and the first error is returned.
    pub fn stop_all(&self) -> Result<Vec<(String, QueueStats)>, QueueError> {
        let queues = std::mem::take(&mut *self.lock()?);
        let mut stats = Vec::with_capacity(queues.len());
        let mut first_error = None;

        for queue in queues {
            match queue.stop() {
                Ok(final_stats) => stats.push((queue.name().to_string(), final_stats)),
                Err(err) => {
                    warn!(queue = queue.name(), error = %err, "service failed to stop cleanly");
                    first_error.get_or_insert(err);
                }
            }
            if let Err(err) = self.events.unsubscribe_queue(&queue) {
                first_error.get_or_insert(err);
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }
        info!(services = stats.len(), "all services stopped");
        Ok(stats)
    }

    /// Stop one queue, unbind its handlers, and forget it.
    pub fn unregister(&self, queue: &ServiceQueue) -> Result<QueueStats, QueueError> {
        self.lock()?.retain(|q| q != queue);
        let stats = queue.stop()?;
        self.events.unsubscribe_queue(queue)?;
        info!(queue = queue.name(), "service unregistered");
        Ok(stats)
    }

    /// Registered queues, in registration order.
    pub fn queues(&self) -> Result<Vec<ServiceQueue>, QueueError> {
        Ok(self.lock()?.clone())
    }

    /// Find a registered queue by name.
    pub fn get(&self, name: &str) -> Option<ServiceQueue> {
        self.lock().ok()?.iter().find(|q| q.name() == name).cloned()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<ServiceQueue>>, QueueError> {
        self.queues
            .lock()
            .map_err(|_| QueueError::LockPoisoned("service registry"))
    }
}

impl Drop for ServiceRegistry {
    fn drop(&mut self) {
        let _ = self.stop_all();
    }
}
