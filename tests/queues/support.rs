//! Shared services for queue tests.

#![allow(dead_code)]

use std::sync::mpsc::Receiver;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use service_queue::{HandlerError, Service};

/// A service that records every number it is given, in arrival order.
#[derive(Default)]
pub struct Ledger {
    pub entries: Vec<u32>,
}

pub fn ledger_service() -> Service<Ledger> {
    Service::new(Ledger::default())
        .named("ledger")
        .method("record", |ledger, ctx| {
            ledger.entries.push(ctx.arg(0)?);
            Ok(Value::Null)
        })
        .method("entries", |ledger, _ctx| {
            Ok(serde_json::to_value(&ledger.entries)?)
        })
        .method("count", |ledger, _ctx| Ok(ledger.entries.len().into()))
        .method("pause", |_, ctx| {
            let millis: u64 = ctx.arg(0)?;
            thread::sleep(Duration::from_millis(millis));
            Ok(Value::Null)
        })
        .method("reject", |_, ctx| {
            let reason: String = ctx.arg(0)?;
            Err(HandlerError::rejected(reason))
        })
        .method("explode", |_, _ctx| panic!("ledger exploded"))
}

/// A service whose `pass` method blocks until a permit arrives on `gate`.
pub fn gated_service(gate: Receiver<()>) -> Service<Receiver<()>> {
    Service::new(gate).named("gated").method("pass", |gate, _ctx| {
        gate.recv()
            .map_err(|_| HandlerError::rejected("gate closed"))?;
        Ok(Value::Null)
    })
}
