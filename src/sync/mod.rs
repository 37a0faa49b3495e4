//! Inter-service synchronisation
//!
//! Both services learn their rooms from the room directory at startup. The
//! chat-facing service additionally follows the round-owning service's
//! per-room update streams.
//!
//! Startup dependencies are retried with bounded exponential backoff and
//! reported as a bootstrap failure once retries run out. After startup,
//! losing an update stream only stops that room's updates.

pub mod directory;
pub mod retry;
pub mod upstream;

pub use directory::{RoomDetail, RoomDirectory, StaticRoomDirectory};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use upstream::{connect_upstream, spawn_follower, RoundUpstream};

use crate::error::Result;
use crate::registry::RoomKey;

/// Fetch the room list from the directory, retrying per `policy`
pub async fn bootstrap_rooms(
    directory: &dyn RoomDirectory,
    policy: &RetryPolicy,
) -> Result<Vec<RoomKey>> {
    let rooms = retry_with_backoff(policy, "room directory", || directory.list_rooms()).await?;

    tracing::info!(rooms = rooms.len(), "Room directory loaded");
    for room in &rooms {
        tracing::debug!(room = %room.key, name = %room.name, "Room");
    }

    Ok(rooms.into_iter().map(|room| room.key).collect())
}
