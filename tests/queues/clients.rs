//! Typed clients generated by `#[service_client]`.

use service_queue::{
    flush_service_proxy, service_client, QueueError, ServiceClient, ServiceQueue,
};

use crate::support::ledger_service;

#[service_client]
pub trait LedgerClient {
    fn record(&self, entry: u32);
    fn count(&self) -> Result<usize, QueueError>;
    fn entries(&self) -> Result<Vec<u32>, QueueError>;
}

#[service_client(CheckedLedger)]
pub trait CheckedLedgerClient {
    fn record(&self, entry: u32) -> Result<(), QueueError>;
    fn reject(&self, reason: String) -> Result<(), QueueError>;
    fn pause(&self, millis: u64) -> Result<(), QueueError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PayrollError {
    #[error("queue: {0}")]
    Queue(#[from] QueueError),
}

#[service_client]
pub trait PayrollLedgerClient {
    fn count(&self) -> Result<usize, PayrollError>;
}

#[test]
fn unit_methods_enqueue_without_waiting() {
    let queue = ServiceQueue::new(ledger_service());
    queue.start().unwrap();
    let client: LedgerClientProxy = queue.create_proxy();

    for entry in [3, 1, 2] {
        client.record(entry);
    }
    flush_service_proxy(&client).unwrap();

    assert_eq!(client.entries().unwrap(), vec![3, 1, 2]);
    assert_eq!(client.count().unwrap(), 3);
    queue.stop().unwrap();
}

#[test]
fn unit_methods_swallow_enqueue_failures() {
    let queue = ServiceQueue::new(ledger_service());
    queue.start().unwrap();
    let client: LedgerClientProxy = queue.create_proxy();
    queue.stop().unwrap();

    // Logged, not returned.
    client.record(1);
    assert!(client.count().unwrap_err().is_closed());
}

#[test]
fn result_unit_methods_report_enqueue_failures_only() {
    let queue = ServiceQueue::new(ledger_service());
    queue.start().unwrap();
    let client: CheckedLedger = queue.create_proxy();

    client.record(5).unwrap();
    // Handler failures are not seen by fire-and-forget callers.
    client.reject("ignored".to_string()).unwrap();
    flush_service_proxy(&client).unwrap();

    let stats = queue.stop().unwrap();
    assert_eq!(stats.tasks_handled, 1);
    assert_eq!(stats.tasks_failed, 1);

    assert!(client.record(6).unwrap_err().is_closed());
}

#[test]
fn custom_error_types_convert_from_queue_errors() {
    let queue = ServiceQueue::new(ledger_service());
    queue.start().unwrap();
    let client: PayrollLedgerClientProxy = queue.create_proxy();
    assert_eq!(client.count().unwrap(), 0);

    queue.stop().unwrap();
    let PayrollError::Queue(err) = client.count().unwrap_err();
    assert!(err.is_closed());
}

#[test]
fn clients_share_their_queue() {
    let queue = ServiceQueue::new(ledger_service());
    queue.start().unwrap();
    let writer: CheckedLedger = queue.create_proxy();
    let reader: LedgerClientProxy = queue.create_proxy();

    writer.pause(20).unwrap();
    writer.record(11).unwrap();
    // Waiting calls queue behind earlier fire-and-forget ones.
    assert_eq!(reader.entries().unwrap(), vec![11]);

    assert_eq!(writer.service_proxy().queue(), reader.service_proxy().queue());
    queue.stop().unwrap();
}
