//! Service configuration

use std::time::Duration;

use crate::registry::RegistryConfig;
use crate::round::KeywordSelection;
use crate::sync::RetryPolicy;

/// Configuration shared by the round and chat services
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Time between round rotations, per room
    pub round_interval: Duration,

    /// Keyword limit and confidence threshold
    pub selection: KeywordSelection,

    /// Per-connection buffering and send timeout
    pub registry: RegistryConfig,

    /// Retry policy for startup dependencies
    pub bootstrap: RetryPolicy,

    /// Send a private welcome message to each new chat subscriber
    pub welcome_messages: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            round_interval: Duration::from_secs(30),
            selection: KeywordSelection::default(),
            registry: RegistryConfig::default(),
            bootstrap: RetryPolicy::default(),
            welcome_messages: true,
        }
    }
}

impl GameConfig {
    /// Set the round interval (at least 1ms)
    pub fn round_interval(mut self, interval: Duration) -> Self {
        self.round_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Set the maximum keywords per round (at least 1)
    pub fn keyword_limit(mut self, limit: usize) -> Self {
        self.selection.limit = limit.max(1);
        self
    }

    /// Set the minimum keyword confidence
    pub fn min_confidence(mut self, confidence: f32) -> Self {
        self.selection.min_confidence = confidence;
        self
    }

    /// Set the registry configuration
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Set the bootstrap retry policy
    pub fn bootstrap(mut self, policy: RetryPolicy) -> Self {
        self.bootstrap = policy;
        self
    }

    /// Disable private welcome messages
    pub fn disable_welcome_messages(mut self) -> Self {
        self.welcome_messages = false;
        self
    }
}
