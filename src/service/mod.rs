//! Service facades
//!
//! [`RoundService`] owns rounds and streams them. [`ChatService`] carries
//! chat and guessing, and follows a [`RoundUpstream`](crate::sync::RoundUpstream)
//! (in-process, a `RoundService`) for the rounds it evaluates against.

pub mod chat;
pub mod message;
pub mod round;

pub use chat::ChatService;
pub use message::{ChatEvent, ChatMessage, GuessReply, SERVER_SENDER};
pub use round::RoundService;
