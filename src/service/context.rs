//! Context passed to service method handlers.
//!
//! Carries the method name, the task arguments, and the event bus the
//! service was registered with. Handlers reach everything they need through
//! the context instead of a global.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{HandlerError, QueueError};
use crate::events::{Delivery, EventManager};
use crate::task::Args;

/// The context passed to every service method handler.
///
/// ## Example
///
/// ```ignore
/// fn hire(svc: &mut Hiring, ctx: &Context<'_>) -> Result<Value, HandlerError> {
///     let employee: Employee = ctx.arg(0)?;
///     ctx.send(NEW_HIRE_CHANNEL, &employee)?;
///     Ok(Value::Null)
/// }
/// ```
pub struct Context<'a> {
    queue: &'a str,
    method: &'a str,
    args: &'a Args,
    events: &'a EventManager,
}

impl<'a> Context<'a> {
    pub(crate) fn new(
        queue: &'a str,
        method: &'a str,
        args: &'a Args,
        events: &'a EventManager,
    ) -> Self {
        Self {
            queue,
            method,
            args,
            events,
        }
    }

    /// Decode the argument at `index` into a typed value.
    pub fn arg<T: DeserializeOwned>(&self, index: usize) -> Result<T, HandlerError> {
        self.args
            .decode(index)?
            .ok_or_else(|| HandlerError::MissingArgument {
                method: self.method.to_string(),
                index,
            })
    }

    /// Decode an optional trailing argument.
    pub fn opt_arg<T: DeserializeOwned>(&self, index: usize) -> Result<Option<T>, HandlerError> {
        self.args.decode(index)
    }

    /// The raw positional arguments.
    pub fn args(&self) -> &Args {
        self.args
    }

    /// The method being invoked.
    pub fn method(&self) -> &str {
        self.method
    }

    /// Name of the queue running this handler.
    pub fn queue_name(&self) -> &str {
        self.queue
    }

    /// The event bus this service is registered with.
    pub fn events(&self) -> &EventManager {
        self.events
    }

    /// Publish `payload` on `channel` as a single argument.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        channel: &str,
        payload: &T,
    ) -> Result<Delivery, QueueError> {
        self.events.send(channel, payload)
    }

    /// Publish a tuple on `channel`, one task argument per element.
    pub fn send_array<T: Serialize + ?Sized>(
        &self,
        channel: &str,
        payloads: &T,
    ) -> Result<Delivery, QueueError> {
        self.events.send_array(channel, payloads)
    }
}
