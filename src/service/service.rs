//! Service object plus method table.
//!
//! A `Service<S>` holds a service object and a map of named handlers. Each
//! handler is a closure that receives `&mut S` and a [`Context`], and returns
//! `Result<Value, HandlerError>`. Mutable access is safe without locks
//! because a service is only ever driven by its own queue worker.

use std::collections::HashMap;

use serde_json::Value;

use super::context::Context;
use crate::error::HandlerError;

type Handler<S> = Box<dyn Fn(&mut S, &Context<'_>) -> Result<Value, HandlerError> + Send>;

/// A method that should receive every event published on `channel`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventBinding {
    pub channel: String,
    pub method: String,
}

/// Type-erased view of a service, as driven by a queue worker.
pub trait Dispatch: Send {
    /// Invoke `method` with the arguments carried by `ctx`.
    fn dispatch(&mut self, method: &str, ctx: &Context<'_>) -> Result<Value, HandlerError>;

    /// Registered method names.
    fn methods(&self) -> Vec<&str>;
}

/// A service object and the methods callable on it.
pub struct Service<S> {
    name: String,
    state: S,
    handlers: HashMap<String, Handler<S>>,
    bindings: Vec<EventBinding>,
}

impl<S: Send + 'static> Service<S> {
    /// Wrap a service object. The service is named after its type.
    pub fn new(state: S) -> Self {
        Self {
            name: short_type_name::<S>().to_string(),
            state,
            handlers: HashMap::new(),
            bindings: Vec::new(),
        }
    }

    /// Override the service name (used as the queue and worker thread name).
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a method handler.
    ///
    /// Uses builder pattern; returns `self` for chaining. Registering the
    /// same name twice replaces the earlier handler.
    pub fn method<F>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(&mut S, &Context<'_>) -> Result<Value, HandlerError> + Send + 'static,
    {
        self.handlers.insert(name.to_string(), Box::new(handler));
        self
    }

    /// Register a method handler and declare it a subscriber of `channel`.
    ///
    /// The binding is made when the service is registered with a
    /// [`ServiceRegistry`](crate::ServiceRegistry) and lasts for the
    /// lifetime of the registration.
    pub fn on_event<F>(mut self, channel: &str, method: &str, handler: F) -> Self
    where
        F: Fn(&mut S, &Context<'_>) -> Result<Value, HandlerError> + Send + 'static,
    {
        self = self.method(method, handler);
        self.subscribe(channel, method)
    }

    /// Declare an already registered method a subscriber of `channel`.
    pub fn subscribe(mut self, channel: &str, method: &str) -> Self {
        let binding = EventBinding {
            channel: channel.to_string(),
            method: method.to_string(),
        };
        if !self.bindings.contains(&binding) {
            self.bindings.push(binding);
        }
        self
    }

    /// Invoke a method directly on the calling thread.
    pub fn handle(&mut self, method: &str, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        let handler = self
            .handlers
            .get(method)
            .ok_or_else(|| HandlerError::UnknownMethod(method.to_string()))?;
        handler(&mut self.state, ctx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared event bindings, in declaration order.
    pub fn event_bindings(&self) -> &[EventBinding] {
        &self.bindings
    }

    /// Get a reference to the underlying service object.
    pub fn state(&self) -> &S {
        &self.state
    }

    pub fn into_state(self) -> S {
        self.state
    }
}

impl<S: Send + 'static> Dispatch for Service<S> {
    fn dispatch(&mut self, method: &str, ctx: &Context<'_>) -> Result<Value, HandlerError> {
        self.handle(method, ctx)
    }

    fn methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
