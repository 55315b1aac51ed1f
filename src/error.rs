//! Error types for service queues, proxies, and the event bus.
//!
//! Two layers:
//! - [`QueueError`] is what callers of the runtime see (enqueue, wait,
//!   flush, send, lifecycle).
//! - [`HandlerError`] is what a service method returns. When a caller is
//!   waiting on the task it comes back wrapped in
//!   [`QueueError::Invocation`]; otherwise it is logged by the worker.

use std::error::Error as StdError;
use std::time::Duration;

use thiserror::Error;

/// Error returned by queue, proxy, and event bus operations.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue has been stopped and accepts no further tasks.
    #[error("service queue `{queue}` is closed")]
    Closed { queue: String },

    /// The queue exists but `start()` has not been called yet.
    #[error("service queue `{queue}` has not been started")]
    NotStarted { queue: String },

    /// The service method ran and failed.
    #[error("`{queue}::{method}` failed: {source}")]
    Invocation {
        queue: String,
        method: String,
        #[source]
        source: HandlerError,
    },

    /// A bounded wait expired. The task stays queued.
    #[error("timed out after {waited:?} waiting on service queue `{queue}`")]
    Timeout { queue: String, waited: Duration },

    /// A blocking call was made from the queue's own worker thread.
    #[error("blocking call into service queue `{queue}` from its own worker")]
    Reentrant { queue: String },

    /// `send` on a channel with no subscribers while strict channels are on.
    #[error("no subscribers on channel `{0}`")]
    UnknownChannel(String),

    /// Arguments could not be converted into task arguments.
    #[error("failed to encode arguments: {0}")]
    Encode(String),

    /// A returned value could not be converted into the caller's type.
    #[error("failed to decode result: {0}")]
    Decode(String),

    /// The worker thread went away without answering.
    #[error("worker for service queue `{queue}` exited unexpectedly")]
    WorkerLost { queue: String },

    /// The worker thread could not be spawned.
    #[error("failed to spawn worker for service queue `{queue}`: {reason}")]
    Spawn { queue: String, reason: String },

    /// A shared lock was poisoned by a panicking thread.
    #[error("lock poisoned during {0}")]
    LockPoisoned(&'static str),
}

impl QueueError {
    /// True for [`QueueError::Closed`].
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::Closed { .. })
    }

    /// True for [`QueueError::Timeout`].
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueueError::Timeout { .. })
    }

    /// The handler failure behind an [`QueueError::Invocation`], if any.
    pub fn handler_error(&self) -> Option<&HandlerError> {
        match self {
            QueueError::Invocation { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Error type for service method handlers.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// No handler registered under this method name.
    #[error("unknown method: {0}")]
    UnknownMethod(String),

    /// The task carried fewer arguments than the handler asked for.
    #[error("missing argument {index} for `{method}`")]
    MissingArgument { method: String, index: usize },

    /// An argument could not be decoded into the requested type.
    #[error("decode failed: {0}")]
    DecodeFailed(String),

    /// Business logic rejected the call.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The handler panicked. The worker survives and moves on.
    #[error("handler panicked: {0}")]
    Panicked(String),

    /// Publishing an event or calling another queue failed.
    #[error("publish failed: {0}")]
    Publish(#[source] Box<QueueError>),

    /// Other error.
    #[error("handler error: {0}")]
    Other(#[source] Box<dyn StdError + Send + Sync>),
}

impl HandlerError {
    /// Shorthand for [`HandlerError::Rejected`].
    pub fn rejected(reason: impl Into<String>) -> Self {
        HandlerError::Rejected(reason.into())
    }
}

impl From<QueueError> for HandlerError {
    fn from(err: QueueError) -> Self {
        HandlerError::Publish(Box::new(err))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::DecodeFailed(err.to_string())
    }
}
