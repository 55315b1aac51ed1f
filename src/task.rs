//! Tasks: deferred method invocations submitted to a service queue.

use std::fmt;
use std::sync::mpsc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{HandlerError, QueueError};
use crate::finite;

/// One-shot reply slot for a task somebody is waiting on.
pub(crate) type Reply = mpsc::Sender<Result<Value, HandlerError>>;

/// Positional arguments of a task.
///
/// Arguments are held as JSON values so that a single queue can carry calls
/// for any method signature. Build them from a serializable tuple and read
/// them back by position:
///
/// ```
/// use service_queue::Args;
///
/// let args = Args::encode(&("Rick", 100)).unwrap();
/// assert_eq!(args.len(), 2);
/// assert_eq!(args.decode::<u32>(1).unwrap(), Some(100));
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Args(Vec<Value>);

impl Args {
    /// No arguments.
    pub fn empty() -> Self {
        Args(Vec::new())
    }

    /// Wrap already-encoded values.
    pub fn from_values(values: Vec<Value>) -> Self {
        Args(values)
    }

    /// A single argument, whatever its shape.
    pub fn single<T: Serialize + ?Sized>(value: &T) -> Result<Self, QueueError> {
        finite::check(value)?;
        let value = serde_json::to_value(value).map_err(|e| QueueError::Encode(e.to_string()))?;
        Ok(Args(vec![value]))
    }

    /// Spread a tuple (or sequence) into positional arguments.
    ///
    /// `()` yields no arguments and a non-sequence value yields one. Values
    /// holding NaN or infinite floats are rejected with
    /// [`QueueError::Encode`] rather than silently becoming `null`.
    pub fn encode<T: Serialize + ?Sized>(values: &T) -> Result<Self, QueueError> {
        finite::check(values)?;
        match serde_json::to_value(values).map_err(|e| QueueError::Encode(e.to_string()))? {
            Value::Null => Ok(Args::empty()),
            Value::Array(values) => Ok(Args(values)),
            other => Ok(Args(vec![other])),
        }
    }

    /// Decode the argument at `index`. `Ok(None)` if there is no such argument.
    pub fn decode<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, HandlerError> {
        match self.0.get(index) {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

/// An immutable unit of work: a method name plus its arguments.
///
/// Tasks are created by [`ServiceQueue::enqueue`](crate::ServiceQueue::enqueue),
/// by proxies, and by event delivery. They are consumed by the queue's worker.
pub struct Task {
    method: String,
    args: Args,
    reply: Option<Reply>,
}

impl Task {
    pub fn new(method: impl Into<String>, args: Args) -> Self {
        Self {
            method: method.into(),
            args,
            reply: None,
        }
    }

    pub(crate) fn with_reply(method: impl Into<String>, args: Args, reply: Reply) -> Self {
        Self {
            method: method.into(),
            args,
            reply: Some(reply),
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &Args {
        &self.args
    }

    /// Whether a caller is blocked on this task's result.
    pub fn is_awaited(&self) -> bool {
        self.reply.is_some()
    }

    pub(crate) fn into_parts(self) -> (String, Args, Option<Reply>) {
        (self.method, self.args, self.reply)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("method", &self.method)
            .field("args", &self.args)
            .field("awaited", &self.reply.is_some())
            .finish()
    }
}
