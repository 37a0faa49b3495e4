//! Chat-side room state

use std::collections::HashMap;

use crate::registry::{ConnectionId, RoomState};
use crate::round::{Round, RoundBoard, RoundHolder};

use super::engine::{evaluate, GuessOutcome};
use super::history::GuessHistory;

/// Everything the chat service keeps per room, under the room guard
#[derive(Debug, Default)]
pub struct ChatRoom {
    board: RoundBoard,
    histories: HashMap<ConnectionId, GuessHistory>,
    names: HashMap<ConnectionId, String>,
}

impl ChatRoom {
    /// Record a connection's display name for chat attribution
    pub fn join(&mut self, id: &ConnectionId, display_name: impl Into<String>) {
        self.names.insert(id.clone(), display_name.into());
    }

    /// Display name of a connection, if it is in the room
    pub fn display_name(&self, id: &ConnectionId) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    /// Guess history of a connection for the current round
    pub fn history(&self, id: &ConnectionId) -> Option<&GuessHistory> {
        self.histories.get(id)
    }

    /// Total keywords credited in the current round, across connections
    pub fn credited_count(&self) -> usize {
        self.histories.values().map(GuessHistory::len).sum()
    }

    /// Classify a message from `id` against the current round
    pub fn evaluate(&mut self, id: &ConnectionId, text: &str) -> GuessOutcome {
        let history = self.histories.entry(id.clone()).or_default();
        evaluate(self.board.current(), history, text)
    }
}

impl RoomState for ChatRoom {
    fn on_disconnect(&mut self, connection: &ConnectionId) {
        self.names.remove(connection);
        self.histories.remove(connection);
    }
}

impl RoundHolder for ChatRoom {
    fn board(&self) -> &RoundBoard {
        &self.board
    }

    fn install_round(&mut self, round: Round) {
        self.board.install_round(round);
        self.histories.clear();
    }
}
