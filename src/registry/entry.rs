//! Room entry types
//!
//! A [`RoomEntry`] is everything one room owns: its live connection sinks and
//! the owning service's per-room state. Both sit behind the same per-room
//! guard, so a mutation of either is never observed half-done.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::key::ConnectionId;

/// Per-room service state stored next to the connection set
pub trait RoomState: Send + 'static {
    /// Called under the room guard when a connection leaves the room
    fn on_disconnect(&mut self, _connection: &ConnectionId) {}
}

impl RoomState for () {}

/// A registered outbound channel for one connection
///
/// `generation` is unique per registration, so cleanup triggered by an old
/// registration never removes a newer sink registered under the same id.
/// `released` fires when the sink leaves the room, which stops the
/// connection's watcher so the last sender goes away with the map entry.
#[derive(Debug)]
pub struct Sink<M> {
    pub(super) tx: mpsc::Sender<M>,
    pub(super) generation: u64,
    pub(super) released: CancellationToken,
}

impl<M> Clone for Sink<M> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            generation: self.generation,
            released: self.released.clone(),
        }
    }
}

impl<M> Sink<M> {
    /// Registration generation of this sink
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Entry for a single room in the registry
pub struct RoomEntry<M, S> {
    /// Live sinks keyed by connection id. Absence means "not connected".
    connections: HashMap<ConnectionId, Sink<M>>,

    /// Service-specific room state (round, guess histories, names)
    pub state: S,
}

impl<M, S: RoomState> RoomEntry<M, S> {
    pub(super) fn new(state: S) -> Self {
        Self {
            connections: HashMap::new(),
            state,
        }
    }

    /// Number of connected clients
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Whether `id` currently has a live sink
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Insert a sink, releasing any previous one for `id`
    ///
    /// Returns whether a previous sink was replaced.
    pub(super) fn insert(&mut self, id: ConnectionId, sink: Sink<M>) -> bool {
        match self.connections.insert(id, sink) {
            Some(previous) => {
                previous.released.cancel();
                true
            }
            None => false,
        }
    }

    /// Remove whatever sink `id` has. Runs the disconnect hook if one was present.
    pub(super) fn remove(&mut self, id: &ConnectionId) -> bool {
        match self.connections.remove(id) {
            Some(sink) => {
                sink.released.cancel();
                self.state.on_disconnect(id);
                true
            }
            None => false,
        }
    }

    /// Remove `id` only if its sink is still the one from `generation`
    pub(super) fn remove_generation(&mut self, id: &ConnectionId, generation: u64) -> bool {
        match self.connections.get(id) {
            Some(sink) if sink.generation == generation => self.remove(id),
            _ => false,
        }
    }

    pub(super) fn sink(&self, id: &ConnectionId) -> Option<Sink<M>> {
        self.connections.get(id).cloned()
    }

    /// Copy out every `(id, sink)` pair so sends can happen without the guard
    pub(super) fn snapshot(&self) -> Vec<(ConnectionId, Sink<M>)> {
        self.connections
            .iter()
            .map(|(id, sink)| (id.clone(), sink.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Departures(Vec<ConnectionId>);

    impl RoomState for Departures {
        fn on_disconnect(&mut self, connection: &ConnectionId) {
            self.0.push(connection.clone());
        }
    }

    fn sink(generation: u64) -> (Sink<u32>, mpsc::Receiver<u32>) {
        let (tx, rx) = mpsc::channel(4);
        let released = CancellationToken::new();
        (Sink { tx, generation, released }, rx)
    }

    #[test]
    fn test_insert_replaces_previous_sink() {
        let mut entry = RoomEntry::new(());
        let id = ConnectionId::from("a");
        let (first, _rx1) = sink(1);
        let (second, _rx2) = sink(2);
        let first_released = first.released.clone();

        assert!(!entry.insert(id.clone(), first));
        assert!(entry.insert(id.clone(), second));

        assert!(first_released.is_cancelled());
        assert_eq!(entry.connection_count(), 1);
        assert_eq!(entry.sink(&id).unwrap().generation(), 2);
    }

    #[test]
    fn test_stale_generation_is_not_removed() {
        let mut entry = RoomEntry::new(Departures::default());
        let id = ConnectionId::from("a");
        let (first, _rx1) = sink(1);
        let (second, _rx2) = sink(2);
        entry.insert(id.clone(), first);
        entry.insert(id.clone(), second);

        assert!(!entry.remove_generation(&id, 1));
        assert!(entry.contains(&id));
        assert!(entry.state.0.is_empty());

        assert!(entry.remove_generation(&id, 2));
        assert!(!entry.contains(&id));
        assert_eq!(entry.state.0, vec![id]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut entry = RoomEntry::new(Departures::default());
        let id = ConnectionId::from("a");
        let (s, _rx) = sink(1);
        let released = s.released.clone();
        entry.insert(id.clone(), s);

        assert!(entry.remove(&id));
        assert!(released.is_cancelled());
        assert!(!entry.remove(&id));
        assert_eq!(entry.state.0.len(), 1);
    }
}
