//! The single consumer behind a service queue.
//!
//! One worker per queue, on its own thread. It receives messages strictly in
//! send order and runs each task to completion before looking at the next.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;

use tracing::{debug, warn, Span};

use super::stats::Counters;
use crate::error::HandlerError;
use crate::events::EventManager;
use crate::service::{Context, Dispatch};
use crate::task::Task;

/// What travels through a queue's channel.
pub(crate) enum Message {
    Task(Task),
    /// Answered once every message sent before it has been processed.
    Flush(Sender<()>),
}

pub(crate) struct Worker {
    pub(crate) name: String,
    /// Created on the starting thread so worker logs nest under the caller's span.
    pub(crate) span: Span,
    pub(crate) service: Box<dyn Dispatch>,
    pub(crate) events: EventManager,
    pub(crate) receiver: Receiver<Message>,
    pub(crate) abandon: Arc<AtomicBool>,
    pub(crate) counters: Arc<Counters>,
}

impl Worker {
    /// Process messages until every sender is gone.
    pub(crate) fn run(mut self) {
        let span = self.span.clone();
        let _entered = span.enter();
        debug!(queue = %self.name, "worker started");

        while let Ok(message) = self.receiver.recv() {
            let abandoning = self.abandon.load(Ordering::Acquire);
            match message {
                Message::Task(task) if abandoning => {
                    debug!(queue = %self.name, method = task.method(), "discarding task");
                    self.counters.discarded();
                }
                Message::Task(task) => self.execute(task),
                // Dropping the marker wakes the flusher with a disconnect.
                Message::Flush(_) if abandoning => {}
                Message::Flush(done) => {
                    self.counters.flushed();
                    let _ = done.send(());
                }
            }
        }

        debug!(queue = %self.name, "worker exiting");
    }

    fn execute(&mut self, task: Task) {
        let (method, args, reply) = task.into_parts();
        self.counters.set_busy(true);

        let ctx = Context::new(&self.name, &method, &args, &self.events);
        let service = &mut self.service;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| service.dispatch(&method, &ctx)))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload))));

        self.counters.set_busy(false);

        match &outcome {
            Ok(_) => self.counters.handled(),
            Err(err) => {
                self.counters.failed();
                if reply.is_none() {
                    warn!(queue = %self.name, method = %method, error = %err, "task failed");
                }
            }
        }

        if let Some(reply) = reply {
            // The caller may have given up after a timeout.
            let _ = reply.send(outcome);
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
