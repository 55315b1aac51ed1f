//! `ServiceQueue`: the handle to a service's private worker.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, info_span};

use super::config::{QueueConfig, StopPolicy};
use super::stats::{Counters, QueueStats};
use super::worker::{Message, Worker};
use crate::error::{HandlerError, QueueError};
use crate::events::EventManager;
use crate::proxy::{ServiceClient, ServiceProxy};
use crate::service::{Dispatch, Service};
use crate::task::{Args, Task};

static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(1);

/// Observable lifecycle of a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    /// Built but not started; enqueue is rejected.
    Created,
    /// Started, no task executing.
    Idle,
    /// Started, a task is executing.
    Running,
    /// Terminal.
    Stopped,
}

impl QueueState {
    /// Whether the queue currently accepts tasks.
    pub fn is_started(self) -> bool {
        matches!(self, QueueState::Idle | QueueState::Running)
    }
}

enum Lifecycle {
    Created {
        service: Box<dyn Dispatch>,
        events: EventManager,
    },
    Started {
        sender: mpsc::Sender<Message>,
    },
    Stopped,
}

struct Shared {
    id: u64,
    name: String,
    config: QueueConfig,
    lifecycle: Mutex<Lifecycle>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_thread: OnceLock<ThreadId>,
    abandon: Arc<AtomicBool>,
    counters: Arc<Counters>,
}

/// A single-consumer work queue bound to one service object.
///
/// Every task submitted to the queue is executed by one dedicated worker
/// thread, one at a time, in submission order. The service object is moved
/// onto that thread at `start()` and never shared, so handlers mutate it
/// without locks.
///
/// `ServiceQueue` is a cheap handle: clones refer to the same queue.
///
/// ## Example
///
/// ```
/// use service_queue::{Args, Service, ServiceQueue};
/// use serde_json::Value;
///
/// let service = Service::new(0u64).method("add", |total, ctx| {
///     *total += ctx.arg::<u64>(0)?;
///     Ok(Value::from(*total))
/// });
///
/// let queue = ServiceQueue::new(service);
/// queue.start().unwrap();
///
/// queue.enqueue("add", Args::encode(&(2,)).unwrap()).unwrap();
/// let total = queue.enqueue_and_wait("add", Args::encode(&(3,)).unwrap()).unwrap();
/// assert_eq!(total, Value::from(5));
///
/// let stats = queue.stop().unwrap();
/// assert_eq!(stats.tasks_handled, 2);
/// ```
#[derive(Clone)]
pub struct ServiceQueue {
    shared: Arc<Shared>,
}

impl ServiceQueue {
    /// Create a queue for `service` with default configuration and a
    /// private event bus.
    pub fn new<S: Send + 'static>(service: Service<S>) -> Self {
        Self::with_config(service, QueueConfig::default())
    }

    pub fn with_config<S: Send + 'static>(service: Service<S>, config: QueueConfig) -> Self {
        Self::with_events(service, config, EventManager::new())
    }

    /// Create a queue whose handlers publish through `events`.
    pub fn with_events<S: Send + 'static>(
        service: Service<S>,
        config: QueueConfig,
        events: EventManager,
    ) -> Self {
        let name = config
            .name
            .clone()
            .unwrap_or_else(|| service.name().to_string());
        Self::from_dispatch(name, Box::new(service), config, events)
    }

    /// Create a queue around any [`Dispatch`] implementation.
    pub fn from_dispatch(
        name: impl Into<String>,
        service: Box<dyn Dispatch>,
        config: QueueConfig,
        events: EventManager,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: NEXT_QUEUE_ID.fetch_add(1, Ordering::Relaxed),
                name: name.into(),
                config,
                lifecycle: Mutex::new(Lifecycle::Created { service, events }),
                worker: Mutex::new(None),
                worker_thread: OnceLock::new(),
                abandon: Arc::new(AtomicBool::new(false)),
                counters: Arc::new(Counters::default()),
            }),
        }
    }

    /// Process-unique queue identity.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn config(&self) -> &QueueConfig {
        &self.shared.config
    }

    pub fn state(&self) -> QueueState {
        let lifecycle = match self.shared.lifecycle.lock() {
            Ok(lifecycle) => lifecycle,
            Err(_) => return QueueState::Stopped,
        };
        match &*lifecycle {
            Lifecycle::Created { .. } => QueueState::Created,
            Lifecycle::Started { .. } if self.shared.counters.is_busy() => QueueState::Running,
            Lifecycle::Started { .. } => QueueState::Idle,
            Lifecycle::Stopped => QueueState::Stopped,
        }
    }

    /// Current counters.
    pub fn stats(&self) -> QueueStats {
        self.shared.counters.snapshot()
    }

    /// Spawn the worker thread. Starting a started queue is a no-op.
    pub fn start(&self) -> Result<(), QueueError> {
        let mut lifecycle = self.lock_lifecycle()?;
        let (service, events) = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
            Lifecycle::Created { service, events } => (service, events),
            started @ Lifecycle::Started { .. } => {
                *lifecycle = started;
                return Ok(());
            }
            Lifecycle::Stopped => return Err(self.closed()),
        };

        let (sender, receiver) = mpsc::channel();
        let worker = Worker {
            name: self.shared.name.clone(),
            span: info_span!("service_queue", queue = %self.shared.name),
            service,
            events,
            receiver,
            abandon: Arc::clone(&self.shared.abandon),
            counters: Arc::clone(&self.shared.counters),
        };

        let handle = thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || worker.run())
            .map_err(|e| QueueError::Spawn {
                queue: self.shared.name.clone(),
                reason: e.to_string(),
            })?;

        let _ = self.shared.worker_thread.set(handle.thread().id());
        *self
            .shared
            .worker
            .lock()
            .map_err(|_| QueueError::LockPoisoned("worker handle"))? = Some(handle);
        *lifecycle = Lifecycle::Started { sender };

        info!(queue = %self.shared.name, id = self.shared.id, "service queue started");
        Ok(())
    }

    /// Append a task. Never blocks.
    pub fn enqueue(&self, method: impl Into<String>, args: Args) -> Result<(), QueueError> {
        self.submit(Task::new(method, args))
    }

    /// Append a prebuilt task. Never blocks.
    pub fn submit(&self, task: Task) -> Result<(), QueueError> {
        debug!(queue = %self.shared.name, method = task.method(), "enqueue");
        self.post(Message::Task(task))
    }

    /// Append a task and block until it has run, returning its result.
    ///
    /// Uses the configured call timeout, if any.
    pub fn enqueue_and_wait(
        &self,
        method: impl Into<String>,
        args: Args,
    ) -> Result<Value, QueueError> {
        let method = method.into();
        let receiver = self.submit_awaited(&method, args)?;
        self.await_reply(method, receiver, self.shared.config.call_timeout())
    }

    /// Like [`enqueue_and_wait`](Self::enqueue_and_wait) with an explicit
    /// bound. On timeout the task stays queued and will still run.
    pub fn enqueue_and_wait_timeout(
        &self,
        method: impl Into<String>,
        args: Args,
        timeout: Duration,
    ) -> Result<Value, QueueError> {
        let method = method.into();
        let receiver = self.submit_awaited(&method, args)?;
        self.await_reply(method, receiver, Some(timeout))
    }

    /// Block until every task enqueued before this call has finished.
    ///
    /// Tasks enqueued concurrently after the call begins are not waited on.
    /// Flushing from the queue's own worker returns immediately.
    pub fn flush(&self) -> Result<(), QueueError> {
        self.flush_within(self.shared.config.call_timeout())
    }

    /// Like [`flush`](Self::flush) with an explicit bound.
    pub fn flush_timeout(&self, timeout: Duration) -> Result<(), QueueError> {
        self.flush_within(Some(timeout))
    }

    /// Stop the queue.
    ///
    /// No task begins executing after this returns, except when called from
    /// the queue's own worker: the worker cannot wait for itself, so it
    /// finishes the current task and then applies the stop policy. Stopping
    /// twice is a no-op.
    pub fn stop(&self) -> Result<QueueStats, QueueError> {
        let previous = {
            let mut lifecycle = self.lock_lifecycle()?;
            std::mem::replace(&mut *lifecycle, Lifecycle::Stopped)
        };

        if let Lifecycle::Started { sender } = previous {
            if self.shared.config.stop_policy == StopPolicy::Discard {
                self.shared.abandon.store(true, Ordering::Release);
            }
            drop(sender);
        }

        if self.on_worker_thread() {
            return Ok(self.stats());
        }

        // Concurrent stoppers wait here until the worker is gone.
        let mut worker = self
            .shared
            .worker
            .lock()
            .map_err(|_| QueueError::LockPoisoned("worker handle"))?;
        if let Some(handle) = worker.take() {
            handle.join().map_err(|_| QueueError::WorkerLost {
                queue: self.shared.name.clone(),
            })?;
            let stats = self.stats();
            info!(
                queue = %self.shared.name,
                handled = stats.tasks_handled,
                failed = stats.tasks_failed,
                discarded = stats.tasks_discarded,
                "service queue stopped"
            );
        }

        Ok(self.stats())
    }

    /// An untyped proxy bound to this queue.
    pub fn proxy(&self) -> ServiceProxy {
        ServiceProxy::new(self.clone())
    }

    /// A typed client bound to this queue.
    pub fn create_proxy<C: ServiceClient>(&self) -> C {
        C::from_proxy(self.proxy())
    }

    fn submit_awaited(
        &self,
        method: &str,
        args: Args,
    ) -> Result<mpsc::Receiver<Result<Value, HandlerError>>, QueueError> {
        if self.on_worker_thread() {
            return Err(QueueError::Reentrant {
                queue: self.shared.name.clone(),
            });
        }
        let (reply, receiver) = mpsc::channel();
        debug!(queue = %self.shared.name, method, "enqueue and wait");
        self.post(Message::Task(Task::with_reply(method, args, reply)))?;
        Ok(receiver)
    }

    fn await_reply(
        &self,
        method: String,
        receiver: mpsc::Receiver<Result<Value, HandlerError>>,
        timeout: Option<Duration>,
    ) -> Result<Value, QueueError> {
        let outcome = match timeout {
            Some(waited) => receiver.recv_timeout(waited).map_err(|e| match e {
                RecvTimeoutError::Timeout => QueueError::Timeout {
                    queue: self.shared.name.clone(),
                    waited,
                },
                RecvTimeoutError::Disconnected => self.closed(),
            })?,
            None => receiver.recv().map_err(|_| self.closed())?,
        };

        outcome.map_err(|source| QueueError::Invocation {
            queue: self.shared.name.clone(),
            method,
            source,
        })
    }

    fn flush_within(&self, timeout: Option<Duration>) -> Result<(), QueueError> {
        if self.on_worker_thread() {
            return Ok(());
        }

        let (done, receiver) = mpsc::channel();
        match self.post(Message::Flush(done)) {
            Ok(()) => {}
            // Nothing can be pending on a queue that never started.
            Err(QueueError::NotStarted { .. }) => return Ok(()),
            Err(err) => return Err(err),
        }

        match timeout {
            Some(waited) => receiver.recv_timeout(waited).map_err(|e| match e {
                RecvTimeoutError::Timeout => QueueError::Timeout {
                    queue: self.shared.name.clone(),
                    waited,
                },
                RecvTimeoutError::Disconnected => self.closed(),
            }),
            None => receiver.recv().map_err(|_| self.closed()),
        }
    }

    fn post(&self, message: Message) -> Result<(), QueueError> {
        // The lifecycle lock is held across the send so `stop` cannot slip
        // in between the state check and the send.
        let lifecycle = self.lock_lifecycle()?;
        match &*lifecycle {
            Lifecycle::Started { sender } => sender.send(message).map_err(|_| QueueError::WorkerLost {
                queue: self.shared.name.clone(),
            }),
            Lifecycle::Created { .. } => Err(QueueError::NotStarted {
                queue: self.shared.name.clone(),
            }),
            Lifecycle::Stopped => Err(self.closed()),
        }
    }

    fn on_worker_thread(&self) -> bool {
        self.shared
            .worker_thread
            .get()
            .is_some_and(|id| *id == thread::current().id())
    }

    fn lock_lifecycle(&self) -> Result<MutexGuard<'_, Lifecycle>, QueueError> {
        self.shared
            .lifecycle
            .lock()
            .map_err(|_| QueueError::LockPoisoned("queue lifecycle"))
    }

    fn closed(&self) -> QueueError {
        QueueError::Closed {
            queue: self.shared.name.clone(),
        }
    }
}

impl PartialEq for ServiceQueue {
    fn eq(&self, other: &Self) -> bool {
        self.shared.id == other.shared.id
    }
}

impl Eq for ServiceQueue {}

impl fmt::Debug for ServiceQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceQueue")
            .field("id", &self.shared.id)
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .finish()
    }
}
