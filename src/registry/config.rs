//! Registry configuration

use std::time::Duration;

/// Configuration for a [`StreamRegistry`](super::StreamRegistry)
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Messages buffered per connection before sends start waiting
    pub sink_capacity: usize,

    /// How long a single recipient may take to accept a message before the
    /// delivery counts as failed and the connection is dropped
    pub send_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            sink_capacity: 64,
            send_timeout: Duration::from_secs(2),
        }
    }
}

impl RegistryConfig {
    /// Set the per-connection buffer size (at least 1)
    pub fn sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity.max(1);
        self
    }

    /// Set the per-recipient send timeout
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }
}
