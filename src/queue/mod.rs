//! Service queues: one worker thread per service.
//!
//! Every service runs behind its own `ServiceQueue`. Calls become tasks
//! that the queue's worker executes one at a time, in arrival order, so the
//! service object needs no internal locking.
//!
//! ```text
//!   caller ──enqueue──▶ [ t1 | t2 | t3 | flush ] ──▶ worker ──▶ service
//!                                         │
//!   caller ◀──────── flush returns ◀──────┘
//! ```
//!
//! Lifecycle: `Created → Started (Idle ⇄ Running) → Stopped`. Only a started
//! queue accepts tasks. `stop` either drains or discards what is left,
//! according to [`StopPolicy`].

mod config;
mod service_queue;
mod stats;
mod worker;

pub use config::{QueueConfig, StopPolicy};
pub use service_queue::{QueueState, ServiceQueue};
pub use stats::QueueStats;
