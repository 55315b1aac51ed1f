//! Services: plain business objects plus an explicit method table.
//!
//! A `Service<S>` owns a service object `S` and maps method names to handler
//! closures. Event handlers are declared up front with `on_event`, so the
//! registry knows which channels to bind without inspecting the object.
//!
//! ## Quick Start
//!
//! ```
//! use service_queue::{Service, HandlerError};
//! use serde_json::Value;
//!
//! #[derive(Default)]
//! struct Benefits {
//!     enrolled: Vec<String>,
//! }
//!
//! let service = Service::new(Benefits::default())
//!     .on_event("employee.new", "enroll", |benefits, ctx| {
//!         let name: String = ctx.arg(0)?;
//!         benefits.enrolled.push(name);
//!         Ok(Value::Null)
//!     })
//!     .method("count", |benefits, _ctx| Ok(benefits.enrolled.len().into()));
//!
//! assert_eq!(service.event_bindings()[0].channel, "employee.new");
//! ```

mod context;
mod service;

pub use context::Context;
pub use service::{Dispatch, EventBinding, Service};
