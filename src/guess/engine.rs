//! Guess classification

use crate::round::Round;

use super::history::GuessHistory;
use super::normalize;

/// How a submitted message was classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuessOutcome {
    /// First correct guess of `keyword` by this connection this round
    Correct {
        /// The matched keyword
        keyword: String,
    },
    /// `keyword` was already credited to this connection this round
    AlreadyGuessed {
        /// The matched keyword
        keyword: String,
    },
    /// Not a keyword: ordinary chat
    Chat,
    /// Empty or whitespace-only input, dropped
    Ignored,
}

impl GuessOutcome {
    /// Whether the text matched a keyword (new or repeated)
    pub fn is_match(&self) -> bool {
        matches!(self, GuessOutcome::Correct { .. } | GuessOutcome::AlreadyGuessed { .. })
    }
}

/// Classify `text` against the active round and the submitter's history
///
/// Records the keyword in `history` on a first correct guess. With no round
/// installed every non-empty message is chat.
pub fn evaluate(round: Option<&Round>, history: &mut GuessHistory, text: &str) -> GuessOutcome {
    let Some(guess) = normalize(text) else {
        return GuessOutcome::Ignored;
    };

    match round {
        Some(round) if round.has_keyword(&guess) => {
            if history.record(&guess) {
                GuessOutcome::Correct { keyword: guess }
            } else {
                GuessOutcome::AlreadyGuessed { keyword: guess }
            }
        }
        _ => GuessOutcome::Chat,
    }
}
