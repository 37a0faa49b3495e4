//! Round lifecycle manager
//!
//! Each room rotates independently: a tick asks the provider for fresh
//! content, installs it as the room's round, and pushes it to everyone
//! subscribed to the room's round stream (viewers and downstream services
//! alike). A failed tick leaves the previous round in place and the schedule
//! keeps running.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::GameConfig;
use crate::error::{Error, Result};
use crate::registry::{DeliveryReport, RegistryError, RoomKey, StreamRegistry};

use super::provider::{ContentProvider, KeywordSelection};
use super::state::{Round, RoundBoard, RoundHolder, RoundPayload};

/// Install `round` in a room and broadcast it to the room's connections
///
/// Installation (including whatever reset the holder performs) and the
/// recipient snapshot happen under one acquisition of the room guard.
pub async fn publish_round<M, S>(
    registry: &StreamRegistry<M, S>,
    key: &RoomKey,
    round: Round,
) -> std::result::Result<DeliveryReport, RegistryError>
where
    M: From<RoundPayload> + Clone + Send + 'static,
    S: RoundHolder,
{
    let keywords = round.keywords.len();
    let report = registry
        .broadcast_with(key, move |state| {
            let payload = round.payload();
            state.install_round(round);
            M::from(payload)
        })
        .await?;

    tracing::info!(
        room = %key,
        keywords,
        delivered = report.delivered,
        failed = report.failed.len(),
        "Round installed"
    );

    Ok(report)
}

/// Result of a successful tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// The round that was installed
    pub payload: RoundPayload,
    /// Delivery to the room's round subscribers
    pub delivery: DeliveryReport,
}

/// Drives round rotation for every room of a round registry
pub struct RoundManager {
    registry: Arc<StreamRegistry<RoundPayload, RoundBoard>>,
    provider: Arc<dyn ContentProvider>,
    selection: KeywordSelection,
    interval: Duration,
}

impl RoundManager {
    /// Create a manager over `registry`
    pub fn new(
        registry: Arc<StreamRegistry<RoundPayload, RoundBoard>>,
        provider: Arc<dyn ContentProvider>,
        config: &GameConfig,
    ) -> Self {
        Self {
            registry,
            provider,
            selection: config.selection,
            interval: config.round_interval,
        }
    }

    /// The registry this manager rotates
    pub fn registry(&self) -> &Arc<StreamRegistry<RoundPayload, RoundBoard>> {
        &self.registry
    }

    /// Rotate one room now
    ///
    /// On error the room's previous round is untouched.
    pub async fn tick(&self, key: &RoomKey) -> Result<TickReport> {
        if !self.registry.has_room(key) {
            return Err(RegistryError::RoomNotFound(key.clone()).into());
        }

        let round = self.fetch_round().await?;
        let payload = round.payload();
        let delivery = publish_round(&self.registry, key, round).await?;

        Ok(TickReport { payload, delivery })
    }

    async fn fetch_round(&self) -> Result<Round> {
        let item = self.provider.random_item().await?.ok_or(Error::NoContent)?;
        let candidates = self.provider.keywords_for(&item.item_id).await?;

        let round = Round::new(item.content_url, self.selection.select(&candidates));

        if round.keywords.is_empty() {
            tracing::debug!(item = %item.item_id, "Item has no usable keywords");
            return Err(Error::NoContent);
        }

        Ok(round)
    }

    /// Spawn one rotation task per room
    ///
    /// The first tick fires immediately. Ticks that fall behind are delayed
    /// rather than bunched up. Dropping the handle stops every task.
    pub fn spawn_schedule(self: &Arc<Self>) -> ScheduleHandle {
        let cancel = CancellationToken::new();
        let tasks = self
            .registry
            .room_keys()
            .cloned()
            .map(|key| self.spawn_room(key, cancel.clone()))
            .collect();

        tracing::info!(
            rooms = self.registry.room_count(),
            interval_ms = self.interval.as_millis() as u64,
            "Round schedule started"
        );

        ScheduleHandle { cancel, tasks }
    }

    fn spawn_room(self: &Arc<Self>, key: RoomKey, cancel: CancellationToken) -> JoinHandle<()> {
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if let Err(e) = manager.tick(&key).await {
                    tracing::warn!(
                        room = %key,
                        error = %e,
                        "Round tick failed, keeping previous round"
                    );
                }
            }

            tracing::debug!(room = %key, "Round schedule stopped");
        })
    }
}

/// Handle to the per-room rotation tasks
pub struct ScheduleHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ScheduleHandle {
    /// Number of rooms being rotated
    pub fn room_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop every rotation task and wait for them to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
