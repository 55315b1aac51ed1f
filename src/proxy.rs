//! Client-side proxies.
//!
//! A proxy turns method calls into tasks on a service queue. Calls that
//! return nothing are fire-and-forget; calls that need a value block until
//! the task has run on the service's worker.
//!
//! Typed clients implement [`ServiceClient`] over a [`ServiceProxy`]. They
//! are usually generated from an interface trait with
//! [`#[service_client]`](crate::service_client):
//!
//! ```ignore
//! #[service_client]
//! pub trait HiringClient {
//!     fn hire_employee(&self, employee: Employee);
//!     fn headcount(&self) -> Result<u32, QueueError>;
//! }
//!
//! let client: HiringClientProxy = hiring_queue.create_proxy();
//! client.hire_employee(rick);
//! flush_service_proxy(&client)?;
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::QueueError;
use crate::queue::ServiceQueue;
use crate::task::Args;

/// Untyped client handle for a service queue.
///
/// Holds nothing but the queue reference; any number of proxies may target
/// the same queue.
#[derive(Clone, Debug)]
pub struct ServiceProxy {
    queue: ServiceQueue,
}

impl ServiceProxy {
    pub fn new(queue: ServiceQueue) -> Self {
        Self { queue }
    }

    /// The queue this proxy submits to.
    pub fn queue(&self) -> &ServiceQueue {
        &self.queue
    }

    /// Enqueue `method` with `args` spread positionally. Does not wait.
    pub fn call<A: Serialize + ?Sized>(&self, method: &str, args: &A) -> Result<(), QueueError> {
        self.queue.enqueue(method, Args::encode(args)?)
    }

    /// Like [`call`](Self::call), but failures to enqueue are logged
    /// instead of returned.
    pub fn call_detached<A: Serialize + ?Sized>(&self, method: &str, args: &A) {
        if let Err(err) = self.call(method, args) {
            warn!(queue = self.queue.name(), method, error = %err, "proxy call dropped");
        }
    }

    /// Enqueue `method` and block for its result, decoded into `R`.
    pub fn call_and_wait<R, A>(&self, method: &str, args: &A) -> Result<R, QueueError>
    where
        R: DeserializeOwned,
        A: Serialize + ?Sized,
    {
        let value = self.queue.enqueue_and_wait(method, Args::encode(args)?)?;
        serde_json::from_value(value).map_err(|e| QueueError::Decode(e.to_string()))
    }

    /// Block until every call made so far through any proxy of this queue
    /// has run.
    pub fn flush(&self) -> Result<(), QueueError> {
        self.queue.flush()
    }
}

/// A typed client backed by a [`ServiceProxy`].
pub trait ServiceClient: Sized {
    fn from_proxy(proxy: ServiceProxy) -> Self;

    fn service_proxy(&self) -> &ServiceProxy;
}

impl ServiceClient for ServiceProxy {
    fn from_proxy(proxy: ServiceProxy) -> Self {
        proxy
    }

    fn service_proxy(&self) -> &ServiceProxy {
        self
    }
}

/// Flush the queue behind a typed client.
///
/// Only the client's own queue is flushed. Events its service published to
/// other queues may still be pending there.
pub fn flush_service_proxy<C: ServiceClient>(client: &C) -> Result<(), QueueError> {
    client.service_proxy().flush()
}
