//! Round-owning service

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::GameConfig;
use crate::error::Result;
use crate::registry::{ConnectionId, RoomKey, StreamRegistry};
use crate::round::{
    ContentProvider, RoundBoard, RoundManager, RoundPayload, RoundPhase, ScheduleHandle,
    TickReport,
};
use crate::sync::{bootstrap_rooms, RoomDirectory, RoundUpstream};

/// Owns the rounds of every room and streams them to subscribers
///
/// Viewers and downstream services subscribe the same way and share one
/// registry, so both see exactly the same sequence of rounds.
pub struct RoundService {
    manager: Arc<RoundManager>,
}

impl RoundService {
    /// Load rooms from `directory` and build the service
    pub async fn bootstrap(
        directory: &dyn RoomDirectory,
        provider: Arc<dyn ContentProvider>,
        config: GameConfig,
    ) -> Result<Self> {
        let rooms = bootstrap_rooms(directory, &config.bootstrap).await?;
        Ok(Self::new(rooms, provider, &config))
    }

    /// Build the service over a known room list
    pub fn new(
        rooms: impl IntoIterator<Item = RoomKey>,
        provider: Arc<dyn ContentProvider>,
        config: &GameConfig,
    ) -> Self {
        let registry = Arc::new(StreamRegistry::new(rooms, config.registry.clone()));
        let manager = Arc::new(RoundManager::new(registry, provider, config));

        Self { manager }
    }

    fn registry(&self) -> &Arc<StreamRegistry<RoundPayload, RoundBoard>> {
        self.manager.registry()
    }

    /// Rooms served
    pub fn rooms(&self) -> impl Iterator<Item = &RoomKey> {
        self.registry().room_keys()
    }

    /// Subscribe to a room's rounds
    ///
    /// The current round, if any, is the first message received. The
    /// subscription ends when `cancel` fires or the receiver is dropped.
    pub async fn subscribe_round(
        &self,
        room: &RoomKey,
        id: ConnectionId,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RoundPayload>> {
        tracing::debug!(room = %room, connection = %id, "Round subscriber joined");

        let rx = self
            .registry()
            .attach_with(room, id, cancel, |board| board.payload())
            .await?;

        Ok(rx)
    }

    /// The round currently in play in `room`
    pub async fn current_round(&self, room: &RoomKey) -> Result<Option<RoundPayload>> {
        Ok(self.registry().lock(room).await?.state.payload())
    }

    /// Round phase of `room`
    pub async fn phase(&self, room: &RoomKey) -> Result<RoundPhase> {
        Ok(self.registry().lock(room).await?.state.phase())
    }

    /// Rotate `room` immediately
    pub async fn tick(&self, room: &RoomKey) -> Result<TickReport> {
        self.manager.tick(room).await
    }

    /// Start periodic rotation of every room
    pub fn spawn_schedule(&self) -> ScheduleHandle {
        self.manager.spawn_schedule()
    }
}

#[async_trait]
impl RoundUpstream for RoundService {
    async fn subscribe_round_updates(
        &self,
        room: &RoomKey,
    ) -> Result<mpsc::Receiver<RoundPayload>> {
        // Cleanup happens when the subscriber drops the receiver.
        let id = ConnectionId::new(format!("upstream-{}", ConnectionId::generate()));
        self.subscribe_round(room, id, CancellationToken::new()).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_test::assert_ok;

    use super::*;
    use crate::error::Error;
    use crate::registry::{RegistryConfig, RegistryError};
    use crate::round::{CatalogEntry, ContentItem, InMemoryContentProvider, KeywordCandidate};
    use crate::sync::{RoomDetail, StaticRoomDirectory};

    fn provider() -> Arc<dyn ContentProvider> {
        Arc::new(InMemoryContentProvider::new(vec![CatalogEntry {
            item: ContentItem {
                item_id: "p1".into(),
                content_url: "https://img/p1.jpg".into(),
            },
            keywords: vec![
                KeywordCandidate::scored("cat", 95.0),
                KeywordCandidate::scored("box", 80.0),
            ],
        }]))
    }

    fn service() -> RoundService {
        RoundService::new(
            [RoomKey::new("r1"), RoomKey::new("r2")],
            provider(),
            &GameConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_bootstrap_from_directory() {
        let directory = StaticRoomDirectory::new(vec![
            RoomDetail::new("Animals", "r1"),
            RoomDetail::new("Food", "r2"),
        ]);

        let service = assert_ok!(
            RoundService::bootstrap(&directory, provider(), GameConfig::default()).await
        );

        assert_eq!(service.rooms().count(), 2);
        assert_eq!(service.phase(&RoomKey::new("r1")).await.unwrap(), RoundPhase::Idle);
    }

    #[tokio::test]
    async fn test_late_subscriber_gets_current_round() {
        let service = service();
        let room = RoomKey::new("r1");

        assert_eq!(service.current_round(&room).await.unwrap(), None);
        let report = service.tick(&room).await.unwrap();

        let mut late = service
            .subscribe_round(&room, ConnectionId::from("late"), CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(late.recv().await, Some(report.payload.clone()));
        assert_eq!(service.current_round(&room).await.unwrap(), Some(report.payload));
        assert_eq!(service.phase(&room).await.unwrap(), RoundPhase::Active);
    }

    #[tokio::test]
    async fn test_upstream_subscribers_share_the_round_stream() {
        let service = service();
        let room = RoomKey::new("r1");

        let mut viewer = service
            .subscribe_round(&room, ConnectionId::from("viewer"), CancellationToken::new())
            .await
            .unwrap();
        let mut downstream = service.subscribe_round_updates(&room).await.unwrap();

        let report = service.tick(&room).await.unwrap();

        assert_eq!(report.delivery.delivered, 2);
        assert_eq!(viewer.recv().await, Some(report.payload.clone()));
        assert_eq!(downstream.recv().await, Some(report.payload));
    }

    #[tokio::test]
    async fn test_confidence_threshold_comes_from_config() {
        let config = GameConfig::default().min_confidence(80.0);
        let service = RoundService::new([RoomKey::new("r1")], provider(), &config);

        let report = service.tick(&RoomKey::new("r1")).await.unwrap();

        assert_eq!(report.payload.keywords, vec!["cat"]);
    }

    #[tokio::test]
    async fn test_slow_downstream_stream_is_ended() {
        let registry = RegistryConfig::default()
            .sink_capacity(1)
            .send_timeout(Duration::from_millis(20));
        let config = GameConfig::default().registry(registry);
        let service = RoundService::new([RoomKey::new("r1")], provider(), &config);
        let room = RoomKey::new("r1");
        let mut downstream = service.subscribe_round_updates(&room).await.unwrap();

        service.tick(&room).await.unwrap();
        let report = service.tick(&room).await.unwrap();
        assert_eq!(report.delivery.failed.len(), 1);

        assert!(downstream.recv().await.is_some());
        let ended = tokio::time::timeout(Duration::from_millis(500), downstream.recv()).await;
        assert!(matches!(ended, Ok(None)));
    }

    #[tokio::test]
    async fn test_unknown_room() {
        let service = service();

        let result = service
            .subscribe_round(
                &RoomKey::new("nope"),
                ConnectionId::from("a"),
                CancellationToken::new(),
            )
            .await;

        assert!(matches!(result, Err(Error::Registry(RegistryError::RoomNotFound(_)))));
    }
}
