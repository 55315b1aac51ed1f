//! Event bus: channel-based fan-out between service queues.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  send("employee.new", e)  ┌───────────────────────────┐
//! │ HiringService│ ────────────────────────▶ │       EventManager        │
//! │   (queue H)  │                           │ channel → [bindings...]   │
//! └──────────────┘                           └───────────────────────────┘
//!                                                │               │
//!                               Task("enroll",[e])│               │Task("invite",[e])
//!                                                ▼               ▼
//!                                   ┌────────────────┐  ┌────────────────┐
//!                                   │ BenefitsService│  │VolunteerService│
//!                                   │   (queue B)    │  │   (queue V)    │
//!                                   └────────────────┘  └────────────────┘
//! ```
//!
//! A binding is (channel, queue, method). Delivery enqueues a task on the
//! subscriber's own queue, so every subscriber sees events in the order they
//! were sent to it, and no subscriber code ever runs on the sender's thread.
//!
//! `flush` on the publishing queue does not wait for subscribers: callers
//! that need end-to-end completion flush every queue along the chain.

mod config;
mod manager;
mod subscription;

pub use config::EventManagerConfig;
pub use manager::EventManager;
pub use subscription::{Delivery, SubscriptionHandle};
