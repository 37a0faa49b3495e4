//! Chat-facing service
//!
//! Viewers subscribe to a room's chat stream and submit guesses. Every
//! submission is classified under the room guard; the reply (private or
//! room-wide) is delivered after the guard is released.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::GameConfig;
use crate::error::Result;
use crate::guess::{ChatRoom, GuessOutcome};
use crate::registry::{ConnectionId, DeliveryReport, RegistryError, RoomKey, StreamRegistry};
use crate::round::{publish_round, Round, RoundHolder, RoundPayload};
use crate::sync::{bootstrap_rooms, connect_upstream, RoomDirectory, RoundUpstream};

use super::message::{ChatEvent, ChatMessage, GuessReply};

const CORRECT_REPLY: &str = "Your guess is correct!";
const ALREADY_GUESSED_REPLY: &str = "You already guessed that word!";

/// Chat and guessing for every room
pub struct ChatService {
    registry: Arc<StreamRegistry<ChatEvent, ChatRoom>>,
    config: GameConfig,
    followers: Vec<JoinHandle<()>>,
}

impl ChatService {
    /// Load rooms from `directory` and follow `upstream` for round updates
    ///
    /// Fails with a bootstrap error if the directory or any room's update
    /// stream stays unreachable.
    pub async fn bootstrap(
        directory: &dyn RoomDirectory,
        upstream: &dyn RoundUpstream,
        config: GameConfig,
    ) -> Result<Self> {
        let rooms = bootstrap_rooms(directory, &config.bootstrap).await?;
        let mut service = Self::new(rooms, config);

        service.followers =
            connect_upstream(upstream, &service.registry, &service.config.bootstrap).await?;
        tracing::info!(rooms = service.registry.room_count(), "Chat service ready");

        Ok(service)
    }

    /// Build a service over a known room list, without an upstream
    ///
    /// Rounds are then installed with [`install_round`](Self::install_round).
    pub fn new(rooms: impl IntoIterator<Item = RoomKey>, config: GameConfig) -> Self {
        Self {
            registry: Arc::new(StreamRegistry::new(rooms, config.registry.clone())),
            config,
            followers: Vec::new(),
        }
    }

    /// The underlying room registry
    pub fn registry(&self) -> &Arc<StreamRegistry<ChatEvent, ChatRoom>> {
        &self.registry
    }

    /// Join a room's chat
    ///
    /// The receiver first yields the room's current round (if any), then a
    /// private welcome (if enabled), then live traffic.
    pub async fn subscribe(
        &self,
        room: &RoomKey,
        id: ConnectionId,
        display_name: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<ChatEvent>> {
        let display_name = display_name.into();

        let rx = {
            let name = display_name.clone();
            let joining = id.clone();
            self.registry
                .attach_with(room, id.clone(), cancel, move |state| {
                    state.join(&joining, name);
                    state.board().payload().map(ChatEvent::Round)
                })
                .await?
        };

        tracing::info!(room = %room, connection = %id, name = %display_name, "Viewer joined");

        if self.config.welcome_messages {
            let welcome = ChatMessage::server(format!("Welcome {display_name}"));
            self.reply(room, &id, welcome).await;
        }

        Ok(rx)
    }

    /// Submit a chat line, which is also a guess
    pub async fn submit_guess(
        &self,
        room: &RoomKey,
        id: &ConnectionId,
        text: &str,
    ) -> Result<GuessReply> {
        let outcome = self.submit_guess_detailed(room, id, text).await?;
        Ok(GuessReply {
            matched: outcome.is_match(),
        })
    }

    /// Like [`submit_guess`](Self::submit_guess), returning the full classification
    pub async fn submit_guess_detailed(
        &self,
        room: &RoomKey,
        id: &ConnectionId,
        text: &str,
    ) -> Result<GuessOutcome> {
        let (outcome, sender_name) = {
            let mut entry = self.registry.lock(room).await?;
            if !entry.contains(id) {
                return Err(RegistryError::ConnectionNotFound {
                    room: room.clone(),
                    connection: id.clone(),
                }
                .into());
            }

            let outcome = entry.state.evaluate(id, text);
            let sender_name = entry.state.display_name(id).unwrap_or(id.as_str()).to_string();
            (outcome, sender_name)
        };

        match &outcome {
            GuessOutcome::Correct { keyword } => {
                tracing::info!(
                    room = %room,
                    connection = %id,
                    keyword = %keyword,
                    "Keyword guessed"
                );
                self.reply(room, id, ChatMessage::server(CORRECT_REPLY)).await;
            }
            GuessOutcome::AlreadyGuessed { keyword } => {
                tracing::debug!(
                    room = %room,
                    connection = %id,
                    keyword = %keyword,
                    "Repeated guess"
                );
                self.reply(room, id, ChatMessage::server(ALREADY_GUESSED_REPLY)).await;
            }
            GuessOutcome::Chat => {
                let message = ChatMessage::new(sender_name, text);
                self.registry.broadcast(room, message.into()).await?;
            }
            GuessOutcome::Ignored => {
                tracing::trace!(room = %room, connection = %id, "Empty message dropped");
            }
        }

        Ok(outcome)
    }

    /// Install a round in `room`, resetting guess histories, and show it to viewers
    pub async fn install_round(
        &self,
        room: &RoomKey,
        payload: RoundPayload,
    ) -> Result<DeliveryReport> {
        Ok(publish_round(&self.registry, room, Round::from(payload)).await?)
    }

    async fn reply(&self, room: &RoomKey, id: &ConnectionId, message: ChatMessage) {
        // The connection may have left since the guard was released.
        if let Err(e) = self.registry.send_to_one(room, id, message.into()).await {
            tracing::debug!(room = %room, connection = %id, error = %e, "Private reply not sent");
        }
    }
}

impl Drop for ChatService {
    fn drop(&mut self) {
        for follower in &self.followers {
            follower.abort();
        }
    }
}
