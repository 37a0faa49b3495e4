//! Per-connection guess history

use std::collections::HashSet;

/// Keywords a connection has already been credited for in the current round
#[derive(Debug, Clone, Default)]
pub struct GuessHistory {
    guessed: HashSet<String>,
}

impl GuessHistory {
    /// Record a keyword. Returns `false` if it was already recorded.
    pub fn record(&mut self, keyword: &str) -> bool {
        if self.guessed.contains(keyword) {
            return false;
        }
        self.guessed.insert(keyword.to_string())
    }

    /// Whether `keyword` was already credited
    pub fn contains(&self, keyword: &str) -> bool {
        self.guessed.contains(keyword)
    }

    /// Number of keywords credited
    pub fn len(&self) -> usize {
        self.guessed.len()
    }

    /// Whether nothing has been credited yet
    pub fn is_empty(&self) -> bool {
        self.guessed.is_empty()
    }
}
