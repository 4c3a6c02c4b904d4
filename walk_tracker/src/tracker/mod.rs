use std::sync::Arc;

use chrono::Utc;
use tokio::{sync::{mpsc, watch}, task::JoinHandle, time::{Duration, Instant}};
use tokio_util::sync::CancellationToken;
use walk_tracker_data_management::{DataManager, KeyValueStore};
use walk_tracker_lib::{coordinate::Coordinate, route_record::RouteRecord};

use crate::location::{FeedConfig, FeedEvent, LocationFeed, Permission, SubscriptionHandle};

mod outcome;
mod session;

pub use outcome::{Notice, SavedRoute, TrackerError};
pub use session::{Session, SessionSnapshot};

pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Idle,
    Tracking,
}

enum Phase {
    Idle,
    Tracking(ActiveTracking),
}

struct ActiveTracking {
    started_at: Instant,
    stop: CancellationToken,
    subscription: SubscriptionHandle,
    consumer: JoinHandle<Session>,
    ticker: JoinHandle<()>,
}

impl ActiveTracking {
    fn abort(self) {
        self.stop.cancel();
        self.subscription.cancel();
        self.consumer.abort();
        self.ticker.abort();
    }
}

/// Records walks from a location feed. While tracking, one task owns the session and
/// another republishes the elapsed time every second.
pub struct RouteTracker<F, S> {
    feed: F,
    data_manager: DataManager<S>,
    permission: Option<Permission>,
    phase: Phase,
    snapshot: Arc<watch::Sender<SessionSnapshot>>,
}

impl<F: LocationFeed, S: KeyValueStore> RouteTracker<F, S> {
    pub fn new(feed: F, data_manager: DataManager<S>) -> Self {
        Self {
            feed,
            data_manager,
            permission: None,
            phase: Phase::Idle,
            snapshot: Arc::new(watch::channel(SessionSnapshot::default()).0),
        }
    }

    pub fn state(&self) -> TrackerState {
        match self.phase {
            Phase::Idle => TrackerState::Idle,
            Phase::Tracking(_) => TrackerState::Tracking,
        }
    }

    pub fn watch(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn data_manager(&self) -> &DataManager<S> {
        &self.data_manager
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }

    /// Asks the feed for location access and remembers the answer.
    pub async fn request_access(&mut self) -> Permission {
        let permission = self.feed.request_access().await;
        if permission == Permission::Denied {
            tracing::warn!("Location permission denied");
        }
        self.permission = Some(permission);
        permission
    }

    /// One-shot position, e.g. to center a map before the walk starts.
    pub async fn locate(&self) -> Result<Coordinate, TrackerError> {
        if self.permission != Some(Permission::Granted) {
            return Err(TrackerError::PermissionDenied);
        }

        self.feed.current_position().await.map_err(|err| {
            tracing::debug!("No position yet: {err}");
            TrackerError::from(err)
        })
    }

    pub async fn start(&mut self) -> Result<(), TrackerError> {
        if let Phase::Tracking(_) = self.phase {
            return Err(TrackerError::AlreadyTracking);
        }
        if self.permission != Some(Permission::Granted) {
            return Err(TrackerError::PermissionDenied);
        }

        let subscription = self.feed.subscribe(FeedConfig::TRACKING).await?;
        let (samples, subscription) = subscription.split();

        self.snapshot.send_replace(SessionSnapshot {
            tracking: true,
            ..SessionSnapshot::default()
        });

        let started_at = Instant::now();
        let stop = CancellationToken::new();
        let ticker = tokio::spawn(run_ticker(started_at, stop.clone(), self.snapshot.clone()));
        let consumer = tokio::spawn(consume_samples(samples, stop.clone(), self.snapshot.clone()));

        self.phase = Phase::Tracking(ActiveTracking {
            started_at,
            stop,
            subscription,
            consumer,
            ticker,
        });

        tracing::info!("Tracking started");
        Ok(())
    }

    /// Ends the walk and stores it. The tracker is idle afterwards, whatever the outcome.
    pub async fn stop(&mut self) -> Result<SavedRoute, TrackerError> {
        let Phase::Tracking(active) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return Err(TrackerError::NotTracking);
        };
        self.snapshot.send_modify(|snapshot| snapshot.tracking = false);

        let ActiveTracking { started_at, stop, subscription, consumer, ticker } = active;
        let elapsed_seconds = elapsed_seconds(started_at);

        stop.cancel();
        subscription.cancel();
        if let Err(err) = ticker.await {
            tracing::warn!("Tick task did not end cleanly: {err}");
        }

        let session = consumer.await.map_err(|err| {
            tracing::error!("Sample consumer failed: {err}");
            TrackerError::SessionLost(err.to_string())
        })?;

        tracing::info!("Tracking stopped after {}s with {} samples", elapsed_seconds, session.path().len());

        if session.is_empty() {
            return Err(TrackerError::EmptySession);
        }

        let earned_xp = session.xp();
        let now = Utc::now();
        let record = RouteRecord::new(now.timestamp_millis(), now, session.distance_km(), elapsed_seconds, session.into_path());

        let record = self.data_manager.prepend_route(record).await.map_err(|err| {
            tracing::error!("Failed to save route: {err}");
            TrackerError::PersistenceFailure(err)
        })?;
        let total_xp = self.data_manager.add_xp(earned_xp).await.map_err(|err| {
            tracing::error!("Failed to save xp: {err}");
            TrackerError::PersistenceFailure(err)
        })?;

        tracing::info!("Saved route {} ({} km, +{} XP)", record.id, record.distance_km, earned_xp);

        Ok(SavedRoute { record, earned_xp, total_xp })
    }

    /// Drops a walk in progress without saving it.
    pub fn shutdown(&mut self) {
        if let Phase::Tracking(active) = std::mem::replace(&mut self.phase, Phase::Idle) {
            tracing::info!("Tracking abandoned");
            active.abort();
            self.snapshot.send_modify(|snapshot| snapshot.tracking = false);
        }
    }
}

impl<F, S> Drop for RouteTracker<F, S> {
    fn drop(&mut self) {
        if let Phase::Tracking(active) = std::mem::replace(&mut self.phase, Phase::Idle) {
            active.abort();
        }
    }
}

fn elapsed_seconds(started_at: Instant) -> u64 {
    started_at.elapsed().as_secs()
}

async fn run_ticker(started_at: Instant, stop: CancellationToken, snapshot: Arc<watch::Sender<SessionSnapshot>>) {
    let mut interval = tokio::time::interval_at(started_at + TICK_INTERVAL, TICK_INTERVAL);
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = interval.tick() => {
                let elapsed = elapsed_seconds(started_at);
                snapshot.send_modify(|snapshot| snapshot.elapsed_seconds = elapsed);
            }
        }
    }
}

async fn consume_samples(mut samples: mpsc::Receiver<FeedEvent>, stop: CancellationToken, snapshot: Arc<watch::Sender<SessionSnapshot>>) -> Session {
    let mut session = Session::new();

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            event = samples.recv() => match event {
                Some(event) => apply_event(&mut session, event, &snapshot),
                None => {
                    tracing::debug!("Location feed closed");
                    stop.cancelled().await;
                    break;
                }
            }
        }
    }

    // No new samples from here on, but keep the ones already queued
    samples.close();
    while let Some(event) = samples.recv().await {
        apply_event(&mut session, event, &snapshot);
    }

    session
}

fn apply_event(session: &mut Session, event: FeedEvent, snapshot: &watch::Sender<SessionSnapshot>) {
    match event {
        FeedEvent::Sample(sample) => {
            let step = session.record(sample);
            tracing::debug!("Sample {:.6},{:.6} step {:?} m", sample.latitude, sample.longitude, step);

            let distance_km = session.distance_km();
            let xp = session.xp();
            snapshot.send_modify(|snapshot| {
                snapshot.path.push(sample);
                snapshot.distance_km = distance_km;
                snapshot.xp = xp;
            });
        }
        FeedEvent::Interrupted(reason) => {
            tracing::warn!("Location stream interrupted: {reason}");
        }
    }
}

#[cfg(test)]
mod tests;
