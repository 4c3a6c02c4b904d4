use tokio::time::Duration;
use walk_tracker_data_management::{storage::constants::{ROUTES_KEY, XP_KEY}, DataManagerError, MemoryStore};
use walk_tracker_lib::distance::{haversine_distance, path_length, EARTH_RADIUS_M};

use crate::location::{PushFeed, PushFeedHandle};

use super::*;

const A: (f64, f64) = (55.0, 12.0);
const B: (f64, f64) = (55.0005, 12.0);
const C: (f64, f64) = (55.0005, 12.001);

async fn granted_tracker(store: MemoryStore) -> (RouteTracker<PushFeed, MemoryStore>, PushFeedHandle) {
    let (feed, handle) = PushFeed::new();
    handle.set_permission(Permission::Granted);

    let mut tracker = RouteTracker::new(feed, DataManager::new(store));
    assert_eq!(tracker.request_access().await, Permission::Granted);
    (tracker, handle)
}

/// Pushes one fix per second so the feed's filter lets all of them through.
async fn walk(handle: &PushFeedHandle, points: &[(f64, f64)]) {
    for (latitude, longitude) in points {
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(handle.push_fix(*latitude, *longitude), "fix {latitude},{longitude} was not delivered");
    }
}

#[tokio::test(start_paused = true)]
async fn stop_persists_route_and_xp() {
    let store = MemoryStore::new();
    let (mut tracker, handle) = granted_tracker(store.clone()).await;

    tracker.start().await.unwrap();
    assert_eq!(tracker.state(), TrackerState::Tracking);
    walk(&handle, &[A, B, C]).await;

    let saved = tracker.stop().await.unwrap();
    assert_eq!(tracker.state(), TrackerState::Idle);

    let ab = haversine_distance(A, B);
    let bc = haversine_distance(B, C);
    assert_eq!(saved.record.distance_km, format!("{:.2}", (ab + bc) / 1000.));
    assert_eq!(saved.earned_xp, ab.floor() as u64 + bc.floor() as u64);
    assert_eq!(saved.total_xp, saved.earned_xp);

    let path: Vec<(f64, f64)> = saved.record.path.iter().map(|p| (p.latitude, p.longitude)).collect();
    assert_eq!(path, vec![A, B, C]);
    assert_eq!(saved.record.distance_km, format!("{:.2}", path_length(&saved.record.path) / 1000.));

    let routes = tracker.data_manager().get_routes().await.unwrap();
    assert_eq!(routes, vec![saved.record.clone()]);
    assert_eq!(store.get(XP_KEY).await.unwrap(), Some(saved.earned_xp.to_string()));
    assert_eq!(Notice::from(&saved), Notice::RouteSaved { earned_xp: saved.earned_xp });
}

#[tokio::test(start_paused = true)]
async fn empty_session_writes_nothing() {
    let store = MemoryStore::new();
    let (mut tracker, _handle) = granted_tracker(store.clone()).await;

    tracker.start().await.unwrap();
    let result = tracker.stop().await;

    assert!(matches!(result, Err(TrackerError::EmptySession)));
    assert_eq!(tracker.state(), TrackerState::Idle);
    assert_eq!(store.get(ROUTES_KEY).await.unwrap(), None);
    assert_eq!(store.get(XP_KEY).await.unwrap(), None);
}

#[tokio::test(start_paused = true)]
async fn xp_adds_to_stored_total() {
    let store = MemoryStore::with_values([(XP_KEY, "500")]);
    let (mut tracker, handle) = granted_tracker(store.clone()).await;

    // One step of 120.5 m north along the prime meridian
    let step_deg = (120.5 / EARTH_RADIUS_M).to_degrees();
    tracker.start().await.unwrap();
    walk(&handle, &[(0.0, 0.0), (step_deg, 0.0)]).await;

    let saved = tracker.stop().await.unwrap();
    assert_eq!(saved.earned_xp, 120);
    assert_eq!(saved.total_xp, 620);
    assert_eq!(store.get(XP_KEY).await.unwrap().as_deref(), Some("620"));
}

#[tokio::test(start_paused = true)]
async fn routes_are_stored_newest_first() {
    let (mut tracker, handle) = granted_tracker(MemoryStore::new()).await;

    let mut saved_ids = Vec::new();
    for _ in 0..3 {
        tracker.start().await.unwrap();
        walk(&handle, &[A, B]).await;
        saved_ids.push(tracker.stop().await.unwrap().record.id);
    }

    let routes = tracker.data_manager().get_routes().await.unwrap();
    assert_eq!(routes.len(), 3);
    assert_eq!(routes[0].id, saved_ids[2]);
    let ids: Vec<i64> = routes.iter().map(|r| r.id).collect();
    assert!(ids.windows(2).all(|pair| pair[0] > pair[1]), "ids not newest first: {ids:?}");

    // Three walks of A -> B
    let expected_xp = 3 * haversine_distance(A, B).floor() as u64;
    assert_eq!(tracker.data_manager().get_xp().await.unwrap(), expected_xp);
}

#[tokio::test]
async fn transitions_are_guarded() {
    let (mut tracker, _handle) = granted_tracker(MemoryStore::new()).await;

    assert!(matches!(tracker.stop().await, Err(TrackerError::NotTracking)));

    tracker.start().await.unwrap();
    assert!(matches!(tracker.start().await, Err(TrackerError::AlreadyTracking)));
    assert_eq!(tracker.state(), TrackerState::Tracking);
    assert_eq!(tracker.feed().active_subscriptions(), 1);

    assert!(matches!(tracker.stop().await, Err(TrackerError::EmptySession)));
    assert!(matches!(tracker.stop().await, Err(TrackerError::NotTracking)));
}

#[tokio::test]
async fn denied_permission_blocks_tracking() {
    let (feed, handle) = PushFeed::new();
    handle.set_permission(Permission::Denied);
    let mut tracker = RouteTracker::new(feed, DataManager::new(MemoryStore::new()));

    // Not asked yet
    assert!(matches!(tracker.start().await, Err(TrackerError::PermissionDenied)));

    assert_eq!(tracker.request_access().await, Permission::Denied);
    let err = tracker.start().await.unwrap_err();
    assert_eq!(err.notice(), Notice::PermissionDenied);
    assert!(matches!(tracker.locate().await, Err(TrackerError::PermissionDenied)));
    assert_eq!(tracker.state(), TrackerState::Idle);

    // The user changes their mind
    handle.set_permission(Permission::Granted);
    assert_eq!(tracker.request_access().await, Permission::Granted);
    tracker.start().await.unwrap();
}

#[tokio::test]
async fn locate_waits_for_a_fix() {
    let (tracker, handle) = granted_tracker(MemoryStore::new()).await;

    let err = tracker.locate().await.unwrap_err();
    assert_eq!(err.notice(), Notice::WaitingForFix);

    handle.push_fix(55.0, 12.0);
    let position = tracker.locate().await.unwrap();
    assert_eq!((position.latitude, position.longitude), A);
}

struct ReadOnlyStore;

#[async_trait::async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, DataManagerError> {
        Ok(None)
    }

    async fn set(&self, key: &str, _value: String) -> Result<(), DataManagerError> {
        Err(DataManagerError::Storage(format!("{key} is read only")))
    }

    async fn remove(&self, _key: &str) -> Result<(), DataManagerError> {
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn save_failure_leaves_tracker_usable() {
    let (feed, handle) = PushFeed::new();
    handle.set_permission(Permission::Granted);
    let mut tracker = RouteTracker::new(feed, DataManager::new(ReadOnlyStore));
    tracker.request_access().await;

    tracker.start().await.unwrap();
    walk(&handle, &[A, B]).await;

    let err = tracker.stop().await.unwrap_err();
    assert!(matches!(err, TrackerError::PersistenceFailure(_)));
    assert_eq!(err.notice(), Notice::SaveFailed);
    assert_eq!(tracker.state(), TrackerState::Idle);
    assert_eq!(tracker.feed().active_subscriptions(), 0);

    tracker.start().await.unwrap();
    assert_eq!(tracker.state(), TrackerState::Tracking);
}

#[tokio::test(start_paused = true)]
async fn snapshot_follows_the_walk() {
    let (mut tracker, handle) = granted_tracker(MemoryStore::new()).await;
    let mut updates = tracker.watch();
    assert!(!updates.borrow().tracking);

    tracker.start().await.unwrap();
    assert!(updates.borrow_and_update().tracking);

    tokio::time::sleep(Duration::from_millis(3500)).await;
    assert_eq!(updates.borrow().elapsed_seconds, 3);

    handle.push_fix(A.0, A.1);
    tokio::time::advance(Duration::from_secs(1)).await;
    handle.push_fix(B.0, B.1);
    let snapshot = updates.wait_for(|snapshot| snapshot.path.len() == 2).await.unwrap().clone();
    assert_eq!(snapshot.xp, haversine_distance(A, B).floor() as u64);
    assert!((snapshot.distance_km - haversine_distance(A, B) / 1000.).abs() < 1e-12);
    assert_eq!(snapshot.last_position().map(|p| p.latitude), Some(B.0));

    let saved = tracker.stop().await.unwrap();
    assert_eq!(saved.record.duration_seconds, 4);
    assert!(!updates.borrow().tracking);
}

#[tokio::test(start_paused = true)]
async fn interruptions_do_not_end_the_walk() {
    let (mut tracker, handle) = granted_tracker(MemoryStore::new()).await;

    tracker.start().await.unwrap();
    walk(&handle, &[A]).await;
    handle.interrupt("signal lost");
    walk(&handle, &[B]).await;

    let saved = tracker.stop().await.unwrap();
    assert_eq!(saved.record.path.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn teardown_releases_the_sensor() {
    let store = MemoryStore::new();
    let (mut tracker, handle) = granted_tracker(store.clone()).await;

    tracker.start().await.unwrap();
    walk(&handle, &[A, B]).await;
    tracker.shutdown();

    assert_eq!(tracker.state(), TrackerState::Idle);
    assert_eq!(tracker.feed().active_subscriptions(), 0);
    assert!(!handle.has_subscriber());
    assert_eq!(store.get(ROUTES_KEY).await.unwrap(), None);

    tracker.start().await.unwrap();
    let feed = tracker.feed().clone();
    drop(tracker);
    assert_eq!(feed.active_subscriptions(), 0);
}
