//! Stream registry and broadcast engine
//!
//! The registry tracks, per room, the live outbound channel of every
//! connected client, and fans messages out to them.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<StreamRegistry<M, S>>
//!                ┌──────────────────────────────────┐
//!                │ rooms: HashMap<RoomKey,          │  fixed at bootstrap,
//!                │   Arc<Mutex<RoomEntry {          │  no global lock
//!                │     connections: id -> Sink<M>,  │
//!                │     state: S,                    │  round, histories, names
//!                │   }>>                            │
//!                └───────────────┬──────────────────┘
//!                                │
//!        ┌───────────────────────┼───────────────────────┐
//!        │                       │                       │
//!        ▼                       ▼                       ▼
//!   attach()              broadcast()              watcher task
//!   register sink         snapshot under guard,    cancel.cancelled()
//!   + spawn watcher       release, send in         -> unregister
//!                         parallel
//! ```
//!
//! Every mutation of a room, and every snapshot taken for delivery, happens
//! under that room's guard. Sends happen after the guard is released.

pub mod config;
pub mod entry;
pub mod error;
pub mod fanout;
pub mod key;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{RoomEntry, RoomState, Sink};
pub use error::RegistryError;
pub use fanout::DeliveryReport;
pub use key::{ConnectionId, RoomKey};
pub use store::StreamRegistry;
