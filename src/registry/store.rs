//! Stream registry implementation
//!
//! The set of rooms is fixed when the registry is built (rooms come from the
//! directory at bootstrap and are never deleted), so the outer map needs no
//! lock. Every room has its own guard; rooms never contend with each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use super::config::RegistryConfig;
use super::entry::{RoomEntry, RoomState, Sink};
use super::error::RegistryError;
use super::key::{ConnectionId, RoomKey};

/// One room: its entry guard and its delivery order guard
struct RoomSlot<M, S> {
    entry: Mutex<RoomEntry<M, S>>,

    /// Held for the whole of a delivery, from snapshot to the last send.
    /// Never acquired while `entry` is held.
    delivery: Mutex<()>,
}

/// Per-room registry of live outbound channels
///
/// `M` is the message type delivered to connections, `S` the per-room state
/// the owning service keeps under the same guard.
pub struct StreamRegistry<M, S = ()> {
    /// Room key to room slot. Immutable after construction.
    rooms: HashMap<RoomKey, RoomSlot<M, S>>,

    /// Source of registration generations
    next_generation: AtomicU64,

    /// Configuration
    config: RegistryConfig,
}

impl<M, S> StreamRegistry<M, S>
where
    M: Send + 'static,
    S: RoomState,
{
    /// Create a registry for `rooms`, each starting with `S::default()`
    pub fn new(rooms: impl IntoIterator<Item = RoomKey>, config: RegistryConfig) -> Self
    where
        S: Default,
    {
        Self::with_state(rooms, config, |_| S::default())
    }

    /// Create a registry for `rooms`, building each room's state with `init`
    pub fn with_state<F>(
        rooms: impl IntoIterator<Item = RoomKey>,
        config: RegistryConfig,
        mut init: F,
    ) -> Self
    where
        F: FnMut(&RoomKey) -> S,
    {
        let rooms = rooms
            .into_iter()
            .map(|key| {
                let slot = RoomSlot {
                    entry: Mutex::new(RoomEntry::new(init(&key))),
                    delivery: Mutex::new(()),
                };
                tracing::debug!(room = %key, "Room registered");
                (key, slot)
            })
            .collect();

        Self {
            rooms,
            next_generation: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Keys of every room in the registry
    pub fn room_keys(&self) -> impl Iterator<Item = &RoomKey> {
        self.rooms.keys()
    }

    /// Check if a room exists
    pub fn has_room(&self, key: &RoomKey) -> bool {
        self.rooms.contains_key(key)
    }

    /// Get total number of rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn slot(&self, key: &RoomKey) -> Result<&RoomSlot<M, S>, RegistryError> {
        self.rooms
            .get(key)
            .ok_or_else(|| RegistryError::RoomNotFound(key.clone()))
    }

    /// Acquire a room's guard
    ///
    /// Everything a service reads or writes about a room happens while
    /// holding this guard. Do not hold it across per-recipient sends.
    pub async fn lock(
        &self,
        key: &RoomKey,
    ) -> Result<MutexGuard<'_, RoomEntry<M, S>>, RegistryError> {
        Ok(self.slot(key)?.entry.lock().await)
    }

    /// Acquire a room's delivery order guard
    ///
    /// Deliveries to one room run one at a time, so every connection sees
    /// messages in the order their snapshots were taken.
    pub(super) async fn lock_delivery(
        &self,
        key: &RoomKey,
    ) -> Result<MutexGuard<'_, ()>, RegistryError> {
        Ok(self.slot(key)?.delivery.lock().await)
    }

    /// Register a sink for a connection
    ///
    /// Overwrites any previous sink for the same id (reconnect), releasing
    /// it. Returns the generation assigned to this registration.
    pub async fn register(
        &self,
        key: &RoomKey,
        id: ConnectionId,
        tx: mpsc::Sender<M>,
    ) -> Result<u64, RegistryError> {
        let mut room = self.lock(key).await?;
        Ok(self.insert_locked(&mut room, key, id, tx, CancellationToken::new()))
    }

    fn insert_locked(
        &self,
        room: &mut RoomEntry<M, S>,
        key: &RoomKey,
        id: ConnectionId,
        tx: mpsc::Sender<M>,
        released: CancellationToken,
    ) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let sink = Sink {
            tx,
            generation,
            released,
        };
        let replaced = room.insert(id.clone(), sink);

        tracing::info!(
            room = %key,
            connection = %id,
            replaced,
            connections = room.connection_count(),
            "Connection registered"
        );

        generation
    }

    /// Unregister a connection
    ///
    /// Idempotent: unregistering an absent connection (or an unknown room)
    /// is a no-op that returns `false`.
    pub async fn unregister(&self, key: &RoomKey, id: &ConnectionId) -> bool {
        let Ok(mut room) = self.lock(key).await else {
            return false;
        };

        let removed = room.remove(id);
        if removed {
            tracing::info!(
                room = %key,
                connection = %id,
                connections = room.connection_count(),
                "Connection unregistered"
            );
        }
        removed
    }

    /// Unregister a connection only if its current sink is from `generation`
    pub(crate) async fn unregister_generation(
        &self,
        key: &RoomKey,
        id: &ConnectionId,
        generation: u64,
    ) -> bool {
        let Ok(mut room) = self.lock(key).await else {
            return false;
        };

        let removed = room.remove_generation(id, generation);
        if removed {
            tracing::info!(
                room = %key,
                connection = %id,
                connections = room.connection_count(),
                "Connection unregistered"
            );
        }
        removed
    }

    /// Visit every connection registered at the moment of the call
    ///
    /// `f` runs over a snapshot taken under the room guard, so connections
    /// that leave concurrently are still visited and iteration never sees a
    /// half-updated set. Returns the number of connections visited.
    pub async fn for_each<F>(&self, key: &RoomKey, mut f: F) -> Result<usize, RegistryError>
    where
        F: FnMut(&ConnectionId, &mpsc::Sender<M>),
    {
        let snapshot = self.lock(key).await?.snapshot();

        for (id, sink) in &snapshot {
            f(id, &sink.tx);
        }

        Ok(snapshot.len())
    }

    /// Number of connections in a room (0 for unknown rooms)
    pub async fn connection_count(&self, key: &RoomKey) -> usize {
        match self.lock(key).await {
            Ok(room) => room.connection_count(),
            Err(_) => 0,
        }
    }

    /// Check if a connection is registered in a room
    pub async fn contains(&self, key: &RoomKey, id: &ConnectionId) -> bool {
        match self.lock(key).await {
            Ok(room) => room.contains(id),
            Err(_) => false,
        }
    }

    /// Open a live subscription for a connection
    ///
    /// Registers a fresh bounded channel and spawns the connection's watcher
    /// task. The connection is unregistered when `cancel` fires or the
    /// returned receiver is dropped. When the registry drops the connection
    /// itself (failed delivery, reconnect under the same id) the receiver
    /// ends.
    pub async fn attach(
        self: &Arc<Self>,
        key: &RoomKey,
        id: ConnectionId,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<M>, RegistryError> {
        self.attach_with(key, id, cancel, |_| None).await
    }

    /// Like [`attach`](Self::attach), running `on_join` under the room guard
    ///
    /// `on_join` may update the room state (e.g. record a display name) and
    /// may return a catch-up message. The catch-up message is queued before
    /// the connection becomes visible to broadcasts, so it is always the
    /// first thing the subscriber receives.
    pub async fn attach_with<F>(
        self: &Arc<Self>,
        key: &RoomKey,
        id: ConnectionId,
        cancel: CancellationToken,
        on_join: F,
    ) -> Result<mpsc::Receiver<M>, RegistryError>
    where
        F: FnOnce(&mut S) -> Option<M>,
    {
        let (tx, rx) = mpsc::channel(self.config.sink_capacity);
        let released = cancel.child_token();

        let generation = {
            let mut room = self.lock(key).await?;

            if let Some(catchup) = on_join(&mut room.state) {
                // Fresh channel with capacity >= 1, cannot be full.
                let _ = tx.try_send(catchup);
            }

            self.insert_locked(&mut room, key, id.clone(), tx.clone(), released.clone())
        };

        let registry = Arc::clone(self);
        let key = key.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = released.cancelled() => {}
                _ = tx.closed() => {}
            }

            drop(tx);

            if registry.unregister_generation(&key, &id, generation).await {
                tracing::debug!(room = %key, connection = %id, "Connection disconnected");
            }
        });

        Ok(rx)
    }
}
