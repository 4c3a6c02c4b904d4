use std::sync::{Arc, Mutex, MutexGuard};

use tokio::{sync::mpsc, time::Instant};
use tokio_util::sync::CancellationToken;
use walk_tracker_lib::coordinate::Coordinate;

use super::{ActiveSensors, FeedConfig, FeedEvent, LocationError, LocationFeed, Permission, SampleFilter, Subscription};

/// Feed driven by a platform callback API.
///
/// The platform side owns a [`PushFeedHandle`] and reports permission changes and
/// raw fixes through it. Fixes are filtered and forwarded to the current subscriber.
#[derive(Clone, Default)]
pub struct PushFeed {
    shared: Arc<Shared>,
}

#[derive(Default)]
struct Shared {
    sensors: ActiveSensors,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    permission: Option<Permission>,
    last_fix: Option<Coordinate>,
    subscriber: Option<Subscriber>,
}

struct Subscriber {
    tx: mpsc::Sender<FeedEvent>,
    filter: SampleFilter,
    token: CancellationToken,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        !self.token.is_cancelled() && !self.tx.is_closed()
    }
}

/// The platform's end of a [`PushFeed`].
#[derive(Clone)]
pub struct PushFeedHandle {
    shared: Arc<Shared>,
}

impl PushFeed {
    pub fn new() -> (Self, PushFeedHandle) {
        let feed = Self::default();
        let handle = PushFeedHandle { shared: feed.shared.clone() };
        (feed, handle)
    }

    pub fn active_subscriptions(&self) -> usize {
        self.shared.sensors.count()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The state stays consistent even if a holder panicked
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PushFeedHandle {
    /// Answer the platform gave to the permission prompt.
    pub fn set_permission(&self, permission: Permission) {
        self.shared.lock().permission = Some(permission);
    }

    /// Reports a raw fix. Returns whether it was delivered to a subscriber.
    pub fn push_fix(&self, latitude: f64, longitude: f64) -> bool {
        self.push(Coordinate::now(latitude, longitude))
    }

    pub fn push(&self, fix: Coordinate) -> bool {
        let mut inner = self.shared.lock();
        inner.last_fix = Some(fix);

        if !inner.subscriber.as_ref().is_some_and(Subscriber::is_live) {
            inner.subscriber = None;
            return false;
        }
        let Some(subscriber) = inner.subscriber.as_mut() else {
            return false;
        };

        let now = Instant::now();
        if !subscriber.filter.accepts(now, &fix) {
            tracing::trace!("Fix filtered: {:?}", fix);
            return false;
        }

        // Only a fix the subscriber actually got counts for later filtering
        match subscriber.tx.try_send(FeedEvent::Sample(fix)) {
            Ok(()) => {
                subscriber.filter.mark(now, &fix);
                true
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Subscriber is not keeping up, dropping fix");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                inner.subscriber = None;
                false
            }
        }
    }

    /// Reports a stream level error to the subscriber, if any.
    pub fn interrupt(&self, reason: impl Into<String>) {
        let inner = self.shared.lock();
        if let Some(subscriber) = inner.subscriber.as_ref().filter(|s| s.is_live()) {
            if subscriber.tx.try_send(FeedEvent::Interrupted(reason.into())).is_err() {
                tracing::warn!("Could not deliver stream interruption");
            }
        }
    }

    pub fn has_subscriber(&self) -> bool {
        self.shared.lock().subscriber.as_ref().is_some_and(Subscriber::is_live)
    }
}

#[async_trait::async_trait]
impl LocationFeed for PushFeed {
    async fn request_access(&self) -> Permission {
        // No answer from the platform counts as a denial
        self.shared.lock().permission.unwrap_or(Permission::Denied)
    }

    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        let inner = self.shared.lock();
        if inner.permission != Some(Permission::Granted) {
            return Err(LocationError::PermissionDenied);
        }
        inner.last_fix.ok_or(LocationError::PositionUnavailable)
    }

    async fn subscribe(&self, config: FeedConfig) -> Result<Subscription, LocationError> {
        let mut inner = self.shared.lock();
        if inner.permission != Some(Permission::Granted) {
            return Err(LocationError::PermissionDenied);
        }

        if inner.subscriber.as_ref().is_some_and(Subscriber::is_live) {
            tracing::warn!("Replacing an existing location subscriber");
        }

        let (subscription, tx, token) = Subscription::open(&self.shared.sensors);
        inner.subscriber = Some(Subscriber {
            tx,
            filter: SampleFilter::new(config),
            token,
        });

        Ok(subscription)
    }
}
