use serde::{Deserialize, Serialize};

/// Event bus configuration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventManagerConfig {
    /// Fail `send` with `QueueError::UnknownChannel` when a channel has no
    /// subscribers, instead of treating it as a no-op.
    pub strict_channels: bool,
}

impl EventManagerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set strict channel handling.
    pub fn with_strict_channels(mut self, strict: bool) -> Self {
        self.strict_channels = strict;
        self
    }
}
