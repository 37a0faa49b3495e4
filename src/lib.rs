//! Real-time multiplayer word guessing core
//!
//! Players in a room see an image and try to guess the keywords attached to
//! it. Rounds rotate on a fixed interval per room. Correct guesses are
//! acknowledged privately; everything else is room chat.
//!
//! # Architecture
//!
//! ```text
//!   RoomDirectory ──► bootstrap_rooms() ──┬──────────────────────┐
//!                                         ▼                      ▼
//!   ContentProvider ──► RoundService                        ChatService
//!                       RoundManager (tick per room)        StreamRegistry<ChatEvent, ChatRoom>
//!                       StreamRegistry<RoundPayload,           ▲       │
//!                                      RoundBoard>             │       ├─► guess evaluation
//!                            │                                 │       │   (private reply or
//!                            ├──► round viewers                │       │    room broadcast)
//!                            └──► RoundUpstream ──► follower ──┘       └─► chat viewers
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tokio_util::sync::CancellationToken;
//! use wordcast::{
//!     ChatService, ConnectionId, GameConfig, InMemoryContentProvider, RoomDetail, RoomKey,
//!     RoundService, StaticRoomDirectory,
//! };
//!
//! #[tokio::main]
//! async fn main() -> wordcast::Result<()> {
//!     let directory = StaticRoomDirectory::new(vec![RoomDetail::new("Animals", "animals")]);
//!     let provider = Arc::new(InMemoryContentProvider::from_json("[]")?);
//!
//!     let config = GameConfig::default();
//!     let rounds = Arc::new(RoundService::bootstrap(&directory, provider, config.clone()).await?);
//!     let chat = ChatService::bootstrap(&directory, rounds.as_ref(), config).await?;
//!     let _schedule = rounds.spawn_schedule();
//!
//!     let room = RoomKey::new("animals");
//!     let id = ConnectionId::generate();
//!     let mut events = chat
//!         .subscribe(&room, id.clone(), "alice", CancellationToken::new())
//!         .await?;
//!     chat.submit_guess(&room, &id, "cat").await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod guess;
pub mod registry;
pub mod round;
pub mod service;
pub mod sync;

pub use config::GameConfig;
pub use error::{Error, Result};
pub use guess::GuessOutcome;
pub use registry::{ConnectionId, DeliveryReport, RegistryConfig, RoomKey, StreamRegistry};
pub use round::{ContentProvider, InMemoryContentProvider, RoundPayload, RoundPhase};
pub use service::{ChatEvent, ChatMessage, ChatService, GuessReply, RoundService};
pub use sync::{RetryPolicy, RoomDetail, RoomDirectory, RoundUpstream, StaticRoomDirectory};
