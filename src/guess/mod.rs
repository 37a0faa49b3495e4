//! Guess evaluation
//!
//! Every chat line is also a guess. After normalisation (trim, lowercase) it
//! is compared for exact equality against the room's keywords:
//!
//! - new match: credited once, answered privately, never broadcast
//! - repeat match: answered privately, nothing changes
//! - no match: ordinary chat for the whole room
//! - empty or whitespace-only: dropped

pub mod engine;
pub mod history;
pub mod room;

pub use engine::{evaluate, GuessOutcome};
pub use history::GuessHistory;
pub use room::ChatRoom;

/// Normalise text for keyword comparison
///
/// Returns `None` for text that is empty after trimming.
pub fn normalize(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}
