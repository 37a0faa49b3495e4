//! Round update subscription between services
//!
//! The round-owning service exposes a per-room stream of round payloads.
//! A consuming service opens one subscription per room at startup and runs
//! a follower task for each: every payload received is installed locally
//! and re-broadcast to the local room.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::registry::{RoomKey, StreamRegistry};
use crate::round::{publish_round, Round, RoundHolder, RoundPayload};

use super::retry::{retry_with_backoff, RetryPolicy};

/// Source of round updates for a room
#[async_trait]
pub trait RoundUpstream: Send + Sync {
    /// Open a stream of round updates for `room`
    ///
    /// The stream yields the room's current round first, if it has one.
    async fn subscribe_round_updates(&self, room: &RoomKey) -> Result<mpsc::Receiver<RoundPayload>>;
}

/// Subscribe every room of `registry` to `upstream` and follow the updates
///
/// Each subscription is retried per `policy`; a room that cannot be
/// subscribed fails the whole bootstrap. Returns one follower handle per
/// room.
pub async fn connect_upstream<M, S>(
    upstream: &dyn RoundUpstream,
    registry: &Arc<StreamRegistry<M, S>>,
    policy: &RetryPolicy,
) -> Result<Vec<JoinHandle<()>>>
where
    M: From<RoundPayload> + Clone + Send + 'static,
    S: RoundHolder,
{
    let rooms: Vec<RoomKey> = registry.room_keys().cloned().collect();
    let mut followers = Vec::with_capacity(rooms.len());

    for key in rooms {
        let updates = retry_with_backoff(policy, "round upstream", || {
            upstream.subscribe_round_updates(&key)
        })
        .await?;
        tracing::info!(room = %key, "Subscribed to round updates");
        followers.push(spawn_follower(Arc::clone(registry), key, updates));
    }

    Ok(followers)
}

/// Follow one room's round updates until the stream ends
pub fn spawn_follower<M, S>(
    registry: Arc<StreamRegistry<M, S>>,
    key: RoomKey,
    mut updates: mpsc::Receiver<RoundPayload>,
) -> JoinHandle<()>
where
    M: From<RoundPayload> + Clone + Send + 'static,
    S: RoundHolder,
{
    tokio::spawn(async move {
        while let Some(payload) = updates.recv().await {
            tracing::debug!(
                room = %key,
                keywords = payload.keywords.len(),
                "Round update received"
            );

            if let Err(e) = publish_round(&registry, &key, Round::from(payload)).await {
                tracing::warn!(room = %key, error = %e, "Cannot apply round update");
                break;
            }
        }

        tracing::warn!(room = %key, "Round update stream ended, room will not rotate");
    })
}
