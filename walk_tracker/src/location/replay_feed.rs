use std::sync::Arc;

use chrono::Utc;
use tokio::{sync::watch, time::{Duration, Instant}};
use walk_tracker_lib::coordinate::Coordinate;

use super::{ActiveSensors, FeedConfig, FeedEvent, LocationError, LocationFeed, Permission, SampleFilter, Subscription};

pub const DEFAULT_REPLAY_PACE: Duration = Duration::from_millis(1000);

/// Simulated device that walks a recorded list of positions, one every `pace`.
/// Each replayed sample is stamped with the time it is delivered.
#[derive(Clone)]
pub struct ReplayFeed {
    points: Arc<Vec<Coordinate>>,
    pace: Duration,
    permission: Permission,
    sensors: ActiveSensors,
    exhausted: Arc<watch::Sender<bool>>,
}

impl ReplayFeed {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self {
            points: Arc::new(points),
            pace: DEFAULT_REPLAY_PACE,
            permission: Permission::Granted,
            sensors: ActiveSensors::default(),
            exhausted: Arc::new(watch::channel(false).0),
        }
    }

    pub fn with_pace(mut self, pace: Duration) -> Self {
        self.pace = pace;
        self
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = permission;
        self
    }

    pub fn active_subscriptions(&self) -> usize {
        self.sensors.count()
    }

    /// Resolves once a replay has delivered its last point or was cancelled.
    pub async fn exhausted(&self) {
        let mut rx = self.exhausted.subscribe();
        // Only fails if the sender is gone, and self holds it
        let _ = rx.wait_for(|done| *done).await;
    }
}

#[async_trait::async_trait]
impl LocationFeed for ReplayFeed {
    async fn request_access(&self) -> Permission {
        self.permission
    }

    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        if self.permission != Permission::Granted {
            return Err(LocationError::PermissionDenied);
        }
        self.points.first()
            .map(|point| point.with_timestamp(Utc::now()))
            .ok_or(LocationError::PositionUnavailable)
    }

    async fn subscribe(&self, config: FeedConfig) -> Result<Subscription, LocationError> {
        if self.permission != Permission::Granted {
            return Err(LocationError::PermissionDenied);
        }

        let (subscription, tx, token) = Subscription::open(&self.sensors);
        let points = self.points.clone();
        let pace = self.pace;
        let exhausted = self.exhausted.clone();
        exhausted.send_replace(false);

        tokio::spawn(async move {
            let mut filter = SampleFilter::new(config);
            let mut delivered = 0;

            for point in points.iter() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(pace) => {}
                }

                let sample = point.with_timestamp(Utc::now());
                if !filter.admit(Instant::now(), &sample) {
                    continue;
                }
                if tx.send(FeedEvent::Sample(sample)).await.is_err() {
                    break;
                }
                delivered += 1;
            }

            tracing::debug!("Replay finished, delivered {} of {} points", delivered, points.len());
            exhausted.send_replace(true);
        });

        Ok(subscription)
    }
}
