//! Registry error types
//!
//! Both variants are protocol violations: they are reported to the request
//! that named the unknown room or connection and never affect anyone else.

use thiserror::Error;

use super::key::{ConnectionId, RoomKey};

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Room was not part of the directory at bootstrap
    #[error("Room not found: {0}")]
    RoomNotFound(RoomKey),
    /// Connection is not registered in the room
    #[error("Connection {connection} not registered in room {room}")]
    ConnectionNotFound {
        /// Room that was addressed
        room: RoomKey,
        /// Connection that was missing
        connection: ConnectionId,
    },
}
