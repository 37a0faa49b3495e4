//! Room directory capability

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::registry::RoomKey;

/// A room as listed by the directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomDetail {
    /// Human-readable room name
    pub name: String,
    /// Unique room key
    pub key: RoomKey,
}

impl RoomDetail {
    /// Create a room detail
    pub fn new(name: impl Into<String>, key: impl Into<RoomKey>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

/// Authoritative list of rooms, queried once at startup
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// List every room
    async fn list_rooms(&self) -> Result<Vec<RoomDetail>>;
}

/// Directory over a fixed room list, ordered by name
#[derive(Debug, Clone, Default)]
pub struct StaticRoomDirectory {
    rooms: Vec<RoomDetail>,
}

impl StaticRoomDirectory {
    /// Create a directory from a room list
    pub fn new(mut rooms: Vec<RoomDetail>) -> Self {
        rooms.sort_by(|a, b| a.name.cmp(&b.name));
        Self { rooms }
    }

    /// Load a directory from a JSON array of `{"name", "key"}` objects
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }
}

#[async_trait]
impl RoomDirectory for StaticRoomDirectory {
    async fn list_rooms(&self) -> Result<Vec<RoomDetail>> {
        Ok(self.rooms.clone())
    }
}
