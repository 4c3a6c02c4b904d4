use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use tokio::{sync::mpsc, time::{Duration, Instant}};
use tokio_util::sync::CancellationToken;
use walk_tracker_lib::coordinate::Coordinate;

mod push_feed;
mod replay_feed;

pub use push_feed::{PushFeed, PushFeedHandle};
pub use replay_feed::{ReplayFeed, DEFAULT_REPLAY_PACE};

/// Buffered samples per subscription.
pub const SAMPLE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accuracy {
    Low,
    Balanced,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedConfig {
    pub accuracy: Accuracy,
    pub min_interval: Duration,
    pub min_distance_m: f64,
}

impl FeedConfig {
    /// What the route tracker asks for while a walk is recorded.
    pub const TRACKING: FeedConfig = FeedConfig {
        accuracy: Accuracy::High,
        min_interval: Duration::from_millis(1000),
        min_distance_m: 2.0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Sample(Coordinate),
    /// Stream level error reported by the platform. The stream may carry on afterwards.
    Interrupted(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
}

/// Device permission state plus its continuous position stream. Feeds apply the
/// interval and displacement limits of the [`FeedConfig`] themselves.
#[async_trait::async_trait]
pub trait LocationFeed: Send + Sync {
    /// Must be awaited before any positioning call.
    async fn request_access(&self) -> Permission;

    /// One-shot read of the current position.
    async fn current_position(&self) -> Result<Coordinate, LocationError>;

    /// Starts continuous delivery of samples honoring `config`.
    async fn subscribe(&self, config: FeedConfig) -> Result<Subscription, LocationError>;
}

/// Counts open sensor handles of a feed.
#[derive(Debug, Clone, Default)]
pub struct ActiveSensors(Arc<AtomicUsize>);

impl ActiveSensors {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn acquire(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct Subscription {
    samples: mpsc::Receiver<FeedEvent>,
    handle: SubscriptionHandle,
}

impl Subscription {
    /// Opens a sensor handle on `sensors` and the channel the feed delivers into.
    pub(crate) fn open(sensors: &ActiveSensors) -> (Self, mpsc::Sender<FeedEvent>, CancellationToken) {
        let (tx, samples) = mpsc::channel(SAMPLE_CHANNEL_CAPACITY);
        let token = CancellationToken::new();

        sensors.acquire();
        let handle = SubscriptionHandle {
            token: token.clone(),
            released: AtomicBool::new(false),
            sensors: sensors.clone(),
        };

        (Self { samples, handle }, tx, token)
    }

    pub async fn recv(&mut self) -> Option<FeedEvent> {
        self.samples.recv().await
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    /// Separates the receiving end from the handle that stops delivery.
    pub fn split(self) -> (mpsc::Receiver<FeedEvent>, SubscriptionHandle) {
        (self.samples, self.handle)
    }
}

/// Stops delivery of a subscription. Cancelling is idempotent and also happens on drop.
#[derive(Debug)]
pub struct SubscriptionHandle {
    token: CancellationToken,
    released: AtomicBool,
    sensors: ActiveSensors,
}

impl SubscriptionHandle {
    pub fn cancel(&self) {
        self.token.cancel();
        if !self.released.swap(true, Ordering::SeqCst) {
            self.sensors.release();
            tracing::debug!("Location subscription cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Suppresses a sample unless both the minimum interval and the minimum
/// displacement since the last delivered sample are met.
#[derive(Debug, Clone)]
pub struct SampleFilter {
    config: FeedConfig,
    last: Option<(Instant, Coordinate)>,
}

impl SampleFilter {
    pub fn new(config: FeedConfig) -> Self {
        Self { config, last: None }
    }

    /// Checks a sample without remembering it.
    pub fn accepts(&self, at: Instant, sample: &Coordinate) -> bool {
        match &self.last {
            Some((last_at, last_sample)) => {
                at.duration_since(*last_at) >= self.config.min_interval
                    && last_sample.distance_to(sample) >= self.config.min_distance_m
            }
            None => true,
        }
    }

    /// Remembers `sample` as delivered.
    pub fn mark(&mut self, at: Instant, sample: &Coordinate) {
        self.last = Some((at, *sample));
    }

    pub fn admit(&mut self, at: Instant, sample: &Coordinate) -> bool {
        if !self.accepts(at, sample) {
            return false;
        }
        self.mark(at, sample);
        true
    }
}
