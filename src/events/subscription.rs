use crate::queue::ServiceQueue;

/// Handle returned by [`EventManager::subscribe`](super::EventManager::subscribe).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) id: u64,
    pub(crate) channel: String,
    pub(crate) queue_id: u64,
    pub(crate) queue_name: String,
    pub(crate) method: String,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn queue_id(&self) -> u64 {
        self.queue_id
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    pub fn method(&self) -> &str {
        &self.method
    }
}

/// A registered (channel, queue, method) triple.
#[derive(Clone, Debug)]
pub(crate) struct Binding {
    pub(crate) handle: SubscriptionHandle,
    pub(crate) queue: ServiceQueue,
}

impl Binding {
    pub(crate) fn matches(&self, queue_id: u64, method: &str) -> bool {
        self.handle.queue_id == queue_id && self.handle.method == method
    }
}

/// Outcome of a `send`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Subscribers whose queue accepted the task.
    pub delivered: usize,
    /// Subscribers whose queue was stopped or not yet started.
    pub dropped: usize,
}
