//! Round state
//!
//! A [`Round`] is replaced wholesale on every tick. Whoever holds a round
//! for a room implements [`RoundHolder`], whose `install_round` is the one
//! place where a new round becomes visible together with any reset that
//! must accompany it.

use serde::{Deserialize, Serialize};

use crate::guess::normalize;
use crate::registry::RoomState;

/// Round phase of a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoundPhase {
    /// No round has been installed yet
    #[default]
    Idle,
    /// A round is in play
    Active,
}

/// The active content and keyword set of a room
#[derive(Debug, Clone)]
pub struct Round {
    /// Content (image) URL shown to players
    pub content_url: String,
    /// Keywords, normalised, de-duplicated, in provider order
    pub keywords: Vec<String>,
}

impl Round {
    /// Create a round, normalising keywords
    ///
    /// Keywords that normalise to nothing are dropped, as are duplicates.
    pub fn new(
        content_url: impl Into<String>,
        keywords: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Self {
        let mut normalized: Vec<String> = Vec::new();
        for keyword in keywords {
            if let Some(keyword) = normalize(keyword.as_ref()) {
                if !normalized.contains(&keyword) {
                    normalized.push(keyword);
                }
            }
        }

        Self {
            content_url: content_url.into(),
            keywords: normalized,
        }
    }

    /// Check if `keyword` (already normalised) belongs to this round
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.keywords.iter().any(|k| k == keyword)
    }

    /// Wire representation of this round
    pub fn payload(&self) -> RoundPayload {
        RoundPayload {
            content_url: self.content_url.clone(),
            keywords: self.keywords.clone(),
        }
    }
}

impl From<RoundPayload> for Round {
    fn from(payload: RoundPayload) -> Self {
        Round::new(payload.content_url, payload.keywords)
    }
}

/// Round as delivered to viewers and to downstream services
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundPayload {
    /// Content (image) URL
    pub content_url: String,
    /// Keyword set
    pub keywords: Vec<String>,
}

/// Per-room round slot
#[derive(Debug, Default)]
pub struct RoundBoard {
    phase: RoundPhase,
    round: Option<Round>,
    rounds_played: u64,
}

impl RoundBoard {
    /// Current phase
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Current round, if any
    pub fn current(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    /// Wire form of the current round, if any
    pub fn payload(&self) -> Option<RoundPayload> {
        self.round.as_ref().map(Round::payload)
    }

    /// Number of rounds installed so far
    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    fn replace(&mut self, round: Round) {
        self.round = Some(round);
        self.phase = RoundPhase::Active;
        self.rounds_played += 1;
    }
}

impl RoomState for RoundBoard {}

/// Room state that carries a round
pub trait RoundHolder: RoomState {
    /// The room's round slot
    fn board(&self) -> &RoundBoard;

    /// Replace the current round, together with any state that must reset
    fn install_round(&mut self, round: Round);
}

impl RoundHolder for RoundBoard {
    fn board(&self) -> &RoundBoard {
        self
    }

    fn install_round(&mut self, round: Round) {
        self.replace(round);
    }
}
