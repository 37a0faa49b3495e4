//! Broadcast engine
//!
//! Delivery takes a snapshot of a room's sinks under the room guard, drops
//! the guard, and only then sends. Sends to different recipients run
//! concurrently and each is bounded by the registry's send timeout, so one
//! slow or dead client cannot hold up the rest of the room for longer than
//! that timeout.
//!
//! Deliveries to the same room are serialised: a delivery holds the room's
//! delivery guard from snapshot to its last send, so no sink is written by
//! two deliveries at once and every connection sees one room order.
//!
//! A failed delivery is never an error for the caller: the recipient is
//! logged, unregistered, and listed in the returned [`DeliveryReport`].

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinSet;

use super::entry::{RoomState, Sink};
use super::error::RegistryError;
use super::key::{ConnectionId, RoomKey};
use super::store::StreamRegistry;

/// Outcome of a broadcast or single-target send
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Recipients that accepted the message
    pub delivered: usize,
    /// Recipients whose delivery failed (and were unregistered)
    pub failed: Vec<ConnectionId>,
}

impl DeliveryReport {
    /// Total recipients attempted
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

impl<M, S> StreamRegistry<M, S>
where
    M: Clone + Send + 'static,
    S: RoomState,
{
    /// Deliver `message` to every connection currently in the room
    pub async fn broadcast(
        &self,
        key: &RoomKey,
        message: M,
    ) -> Result<DeliveryReport, RegistryError> {
        let _order = self.lock_delivery(key).await?;
        let recipients = self.lock(key).await?.snapshot();
        Ok(self.deliver(key, recipients, message).await)
    }

    /// Update the room state and broadcast the message `f` builds from it
    ///
    /// The update and the recipient snapshot happen under one guard, so
    /// every connection present when the state changed gets the message and
    /// connections that join afterwards see only the new state.
    pub async fn broadcast_with<F>(
        &self,
        key: &RoomKey,
        f: F,
    ) -> Result<DeliveryReport, RegistryError>
    where
        F: FnOnce(&mut S) -> M,
    {
        let _order = self.lock_delivery(key).await?;
        let (message, recipients) = {
            let mut room = self.lock(key).await?;
            let message = f(&mut room.state);
            (message, room.snapshot())
        };

        Ok(self.deliver(key, recipients, message).await)
    }

    /// Deliver `message` to every connection in the room except `skip`
    pub async fn broadcast_except(
        &self,
        key: &RoomKey,
        skip: &ConnectionId,
        message: M,
    ) -> Result<DeliveryReport, RegistryError> {
        let _order = self.lock_delivery(key).await?;
        let mut recipients = self.lock(key).await?.snapshot();
        recipients.retain(|(id, _)| id != skip);
        Ok(self.deliver(key, recipients, message).await)
    }

    /// Deliver `message` to a single connection
    ///
    /// Same failure isolation as [`broadcast`](Self::broadcast). Returns
    /// `ConnectionNotFound` only if the connection is not registered at all.
    pub async fn send_to_one(
        &self,
        key: &RoomKey,
        id: &ConnectionId,
        message: M,
    ) -> Result<DeliveryReport, RegistryError> {
        let _order = self.lock_delivery(key).await?;
        let sink = self
            .lock(key)
            .await?
            .sink(id)
            .ok_or_else(|| RegistryError::ConnectionNotFound {
                room: key.clone(),
                connection: id.clone(),
            })?;

        let mut report = DeliveryReport::default();
        match sink.tx.send_timeout(message, self.config().send_timeout).await {
            Ok(()) => report.delivered = 1,
            Err(e) => {
                self.drop_recipient(key, id, sink.generation, failure_reason(&e))
                    .await;
                report.failed.push(id.clone());
            }
        }

        Ok(report)
    }

    async fn deliver(
        &self,
        key: &RoomKey,
        recipients: Vec<(ConnectionId, Sink<M>)>,
        message: M,
    ) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        if recipients.is_empty() {
            return report;
        }

        let timeout = self.config().send_timeout;
        let mut sends = JoinSet::new();

        for (id, sink) in recipients {
            let message = message.clone();
            sends.spawn(async move {
                let result = sink
                    .tx
                    .send_timeout(message, timeout)
                    .await
                    .map_err(|e| failure_reason(&e));
                (id, sink.generation, result)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((_, _, Ok(()))) => report.delivered += 1,
                Ok((id, generation, Err(reason))) => {
                    self.drop_recipient(key, &id, generation, reason).await;
                    report.failed.push(id);
                }
                Err(e) => {
                    tracing::error!(room = %key, error = %e, "Delivery task failed");
                }
            }
        }

        tracing::debug!(
            room = %key,
            delivered = report.delivered,
            failed = report.failed.len(),
            "Broadcast complete"
        );

        report
    }

    async fn drop_recipient(
        &self,
        key: &RoomKey,
        id: &ConnectionId,
        generation: u64,
        reason: &'static str,
    ) {
        tracing::warn!(
            room = %key,
            connection = %id,
            reason,
            "Delivery failed, dropping connection"
        );
        self.unregister_generation(key, id, generation).await;
    }
}

fn failure_reason<T>(error: &SendTimeoutError<T>) -> &'static str {
    match error {
        SendTimeoutError::Timeout(_) => "timed out",
        SendTimeoutError::Closed(_) => "receiver closed",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;
    use tokio_test::assert_ok;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::registry::RegistryConfig;

    fn registry(config: RegistryConfig) -> Arc<StreamRegistry<String>> {
        Arc::new(StreamRegistry::new([RoomKey::new("r1"), RoomKey::new("r2")], config))
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_connection_once() {
        let registry = registry(RegistryConfig::default());
        let key = RoomKey::new("r1");
        let mut receivers = Vec::new();
        for i in 0..5 {
            let rx = registry
                .attach(&key, ConnectionId::new(format!("c{i}")), CancellationToken::new())
                .await
                .unwrap();
            receivers.push(rx);
        }

        let report = assert_ok!(registry.broadcast(&key, "hello".to_string()).await);

        assert_eq!(report.delivered, 5);
        assert!(report.failed.is_empty());
        for rx in &mut receivers {
            assert_eq!(rx.recv().await.as_deref(), Some("hello"));
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_broadcast_is_scoped_to_room() {
        let registry = registry(RegistryConfig::default());
        let mut in_r1 = registry
            .attach(&RoomKey::new("r1"), ConnectionId::from("a"), CancellationToken::new())
            .await
            .unwrap();
        let mut in_r2 = registry
            .attach(&RoomKey::new("r2"), ConnectionId::from("b"), CancellationToken::new())
            .await
            .unwrap();

        registry
            .broadcast(&RoomKey::new("r1"), "only r1".to_string())
            .await
            .unwrap();

        assert_eq!(in_r1.recv().await.as_deref(), Some("only r1"));
        assert!(in_r2.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_recipient_is_isolated_and_dropped() {
        let registry = registry(RegistryConfig::default());
        let key = RoomKey::new("r1");

        let (dead_tx, dead_rx) = mpsc::channel(1);
        registry
            .register(&key, ConnectionId::from("dead"), dead_tx)
            .await
            .unwrap();
        drop(dead_rx);

        let mut alive = registry
            .attach(&key, ConnectionId::from("alive"), CancellationToken::new())
            .await
            .unwrap();

        let report = registry.broadcast(&key, "msg".to_string()).await.unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, vec![ConnectionId::from("dead")]);
        assert_eq!(alive.recv().await.as_deref(), Some("msg"));
        assert!(!registry.contains(&key, &ConnectionId::from("dead")).await);
        assert!(registry.contains(&key, &ConnectionId::from("alive")).await);
    }

    #[tokio::test]
    async fn test_slow_recipient_times_out() {
        let config = RegistryConfig::default()
            .sink_capacity(1)
            .send_timeout(Duration::from_millis(20));
        let registry = registry(config);
        let key = RoomKey::new("r1");

        // Never drained: second message cannot fit.
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        registry
            .register(&key, ConnectionId::from("slow"), slow_tx)
            .await
            .unwrap();

        let first = registry.broadcast(&key, "one".to_string()).await.unwrap();
        assert_eq!(first.delivered, 1);

        let second = registry.broadcast(&key, "two".to_string()).await.unwrap();
        assert_eq!(second.failed, vec![ConnectionId::from("slow")]);
        assert_eq!(registry.connection_count(&key).await, 0);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_stream_ends() {
        let config = RegistryConfig::default()
            .sink_capacity(1)
            .send_timeout(Duration::from_millis(20));
        let registry = registry(config);
        let key = RoomKey::new("r1");
        let slow = ConnectionId::from("slow");
        let mut rx = registry
            .attach(&key, slow.clone(), CancellationToken::new())
            .await
            .unwrap();

        registry.broadcast(&key, "one".to_string()).await.unwrap();
        let report = registry.broadcast(&key, "two".to_string()).await.unwrap();
        assert_eq!(report.failed, vec![slow.clone()]);
        assert!(!registry.contains(&key, &slow).await);

        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        let ended = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(matches!(ended, Ok(None)));
    }

    #[tokio::test]
    async fn test_concurrent_broadcasts_keep_room_order() {
        let config = RegistryConfig::default().sink_capacity(1);
        let registry = registry(config);
        let key = RoomKey::new("r1");
        let mut rx = registry
            .attach(&key, ConnectionId::from("a"), CancellationToken::new())
            .await
            .unwrap();

        // Fills the sink, so the next delivery waits for the reader.
        registry.broadcast(&key, "one".to_string()).await.unwrap();

        let mut pending = Vec::new();
        for message in ["two", "three", "four"] {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            pending.push(tokio::spawn(async move {
                registry.broadcast(&key, message.to_string()).await.unwrap()
            }));
            for _ in 0..5 {
                tokio::task::yield_now().await;
            }
        }

        // A stalled delivery holds the delivery guard, not the room guard.
        let count =
            tokio::time::timeout(Duration::from_millis(100), registry.connection_count(&key)).await;
        assert_eq!(count.unwrap(), 1);

        let mut received = Vec::new();
        for _ in 0..4 {
            received.push(rx.recv().await.unwrap());
        }
        for task in pending {
            assert_eq!(task.await.unwrap().delivered, 1);
        }

        assert_eq!(received, vec!["one", "two", "three", "four"]);
    }

    #[tokio::test]
    async fn test_broadcast_with_updates_state_first() {
        let registry: StreamRegistry<u32, Counter> =
            StreamRegistry::new([RoomKey::new("r1")], RegistryConfig::default());
        let key = RoomKey::new("r1");
        let (tx, mut rx) = mpsc::channel(4);
        registry.register(&key, ConnectionId::from("a"), tx).await.unwrap();

        registry
            .broadcast_with(&key, |counter| {
                counter.0 += 1;
                counter.0
            })
            .await
            .unwrap();

        assert_eq!(rx.recv().await, Some(1));
        assert_eq!(registry.lock(&key).await.unwrap().state.0, 1);
    }

    #[derive(Default)]
    struct Counter(u32);

    impl RoomState for Counter {}

    #[tokio::test]
    async fn test_broadcast_except_skips_sender() {
        let registry = registry(RegistryConfig::default());
        let key = RoomKey::new("r1");
        let mut a = registry
            .attach(&key, ConnectionId::from("a"), CancellationToken::new())
            .await
            .unwrap();
        let mut b = registry
            .attach(&key, ConnectionId::from("b"), CancellationToken::new())
            .await
            .unwrap();

        let report = registry
            .broadcast_except(&key, &ConnectionId::from("a"), "joined".to_string())
            .await
            .unwrap();

        assert_eq!(report.attempted(), 1);
        assert_eq!(b.recv().await.as_deref(), Some("joined"));
        assert!(a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_send_to_one() {
        let registry = registry(RegistryConfig::default());
        let key = RoomKey::new("r1");
        let mut a = registry
            .attach(&key, ConnectionId::from("a"), CancellationToken::new())
            .await
            .unwrap();
        let mut b = registry
            .attach(&key, ConnectionId::from("b"), CancellationToken::new())
            .await
            .unwrap();

        let report = registry
            .send_to_one(&key, &ConnectionId::from("a"), "private".to_string())
            .await
            .unwrap();

        assert_eq!(report.delivered, 1);
        assert_eq!(a.recv().await.as_deref(), Some("private"));
        assert!(b.try_recv().is_err());

        let missing = registry
            .send_to_one(&key, &ConnectionId::from("zz"), "x".to_string())
            .await;
        assert!(matches!(missing, Err(RegistryError::ConnectionNotFound { .. })));
    }

    #[tokio::test]
    async fn test_broadcast_under_concurrent_churn() {
        let registry = registry(RegistryConfig::default());
        let key = RoomKey::new("r1");
        let mut stable = Vec::new();
        for i in 0..10 {
            let rx = registry
                .attach(&key, ConnectionId::new(format!("stable-{i}")), CancellationToken::new())
                .await
                .unwrap();
            stable.push(rx);
        }

        let churn = {
            let registry = Arc::clone(&registry);
            let key = key.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    let cancel = CancellationToken::new();
                    let _rx = registry
                        .attach(&key, ConnectionId::new(format!("churn-{i}")), cancel.clone())
                        .await
                        .unwrap();
                    cancel.cancel();
                    tokio::task::yield_now().await;
                }
            })
        };

        for n in 0..20 {
            registry.broadcast(&key, format!("m{n}")).await.unwrap();
        }
        churn.await.unwrap();

        for rx in &mut stable {
            for n in 0..20 {
                assert_eq!(rx.recv().await, Some(format!("m{n}")));
            }
        }
    }
}
