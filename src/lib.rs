//! In-process service queues and a channel-based event bus.
//!
//! Each service is a plain Rust value driven by exactly one worker thread.
//! Callers talk to it through a proxy that turns method calls into queued
//! tasks; services talk to each other by publishing events on named
//! channels.
//!
//! ```
//! use service_queue::{flush_service_proxy, service_client, QueueError, Service, ServiceRegistry};
//! use serde_json::Value;
//!
//! #[service_client]
//! pub trait GreeterClient {
//!     fn greet(&self, name: String);
//!     fn greeted(&self) -> Result<usize, QueueError>;
//! }
//!
//! let registry = ServiceRegistry::new();
//! let queue = registry
//!     .register(
//!         Service::new(Vec::<String>::new())
//!             .method("greet", |names, ctx| {
//!                 names.push(ctx.arg(0)?);
//!                 Ok(Value::Null)
//!             })
//!             .method("greeted", |names, _ctx| Ok(names.len().into())),
//!     )
//!     .unwrap();
//!
//! let client: GreeterClientProxy = queue.create_proxy();
//! client.greet("Rick".to_string());
//! flush_service_proxy(&client).unwrap();
//! assert_eq!(client.greeted().unwrap(), 1);
//!
//! registry.stop_all().unwrap();
//! ```

// Lets `#[service_client]` expansions name this crate from inside it.
extern crate self as service_queue;

mod error;
mod finite;
mod proxy;
mod registry;
mod task;

pub mod events;
pub mod queue;
pub mod service;

pub use error::{HandlerError, QueueError};
pub use events::{Delivery, EventManager, EventManagerConfig, SubscriptionHandle};
pub use proxy::{flush_service_proxy, ServiceClient, ServiceProxy};
pub use queue::{QueueConfig, QueueState, QueueStats, ServiceQueue, StopPolicy};
pub use registry::ServiceRegistry;
pub use service::{Context, Dispatch, EventBinding, Service};
pub use task::{Args, Task};

// Re-export the client generator from the service_queue_macros crate
pub use service_queue_macros::service_client;
