use std::path::Path;

use walk_tracker_lib::{progress::ProfileSummary, route_record::RouteRecord};

use crate::{storage::constants::{ROUTES_KEY, XP_KEY}, DataManagerError, FileStore, KeyValueStore};

#[derive(Clone, Debug)]
pub struct DataManager<S> {
    pub(crate) store: S,
}

impl DataManager<FileStore> {
    /// File backed data manager rooted at `data_dir`.
    pub async fn start(data_dir: impl AsRef<Path>) -> Result<Self, DataManagerError> {
        Ok(Self::new(FileStore::open(data_dir).await?))
    }
}

/// The public interface for all walk tracker data management.
impl<S: KeyValueStore> DataManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stored routes, newest first.
    pub async fn get_routes(&self) -> Result<Vec<RouteRecord>, DataManagerError> {
        let Some(stored) = self.store.get(ROUTES_KEY).await? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&stored)
            .map_err(|err| DataManagerError::Serialization(format!("Failed to parse stored routes: {err}")))
    }

    /// Puts the record in front of the stored routes. The id is bumped if it would
    /// not be newer than every stored one. Returns the record as stored.
    pub async fn prepend_route(&self, mut record: RouteRecord) -> Result<RouteRecord, DataManagerError> {
        let mut routes = self.get_routes().await?;

        if let Some(newest_id) = routes.iter().map(|route| route.id).max() {
            if record.id <= newest_id {
                tracing::debug!("Route id {} already taken, using {}", record.id, newest_id + 1);
                record.id = newest_id + 1;
            }
        }

        routes.insert(0, record.clone());

        let serialized = serde_json::to_string(&routes)
            .map_err(|err| DataManagerError::Serialization(format!("Failed to serialize routes: {err}")))?;
        self.store.set(ROUTES_KEY, serialized).await?;

        tracing::info!("Stored route {} ({} routes total)", record.id, routes.len());

        Ok(record)
    }

    /// Deletes the route history. Cumulative XP is kept.
    pub async fn clear_routes(&self) -> Result<(), DataManagerError> {
        self.store.remove(ROUTES_KEY).await?;
        tracing::info!("Cleared route history");
        Ok(())
    }

    pub async fn get_xp(&self) -> Result<u64, DataManagerError> {
        let Some(stored) = self.store.get(XP_KEY).await? else {
            return Ok(0);
        };

        stored.trim().parse()
            .map_err(|_| DataManagerError::Serialization(format!("Stored xp is not a number: {:?}", stored)))
    }

    /// Adds to the cumulative XP and returns the new total.
    pub async fn add_xp(&self, earned: u64) -> Result<u64, DataManagerError> {
        let total = self.get_xp().await?.saturating_add(earned);
        self.store.set(XP_KEY, total.to_string()).await?;
        Ok(total)
    }

    pub async fn profile_summary(&self) -> Result<ProfileSummary, DataManagerError> {
        let xp = self.get_xp().await?;
        let routes = self.get_routes().await?;
        Ok(ProfileSummary::new(xp, &routes))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use walk_tracker_lib::coordinate::Coordinate;

    use crate::MemoryStore;

    use super::*;

    fn record(id: i64) -> RouteRecord {
        RouteRecord::new(id, Utc::now(), 0.42, 300, vec![Coordinate::now(55.0, 12.0)])
    }

    #[tokio::test]
    async fn empty_store_defaults() {
        let data_manager = DataManager::new(MemoryStore::new());
        assert!(data_manager.get_routes().await.unwrap().is_empty());
        assert_eq!(data_manager.get_xp().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn routes_are_newest_first() {
        let data_manager = DataManager::new(MemoryStore::new());
        data_manager.prepend_route(record(10)).await.unwrap();
        data_manager.prepend_route(record(20)).await.unwrap();
        data_manager.prepend_route(record(30)).await.unwrap();

        let ids: Vec<i64> = data_manager.get_routes().await.unwrap().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![30, 20, 10]);
    }

    #[tokio::test]
    async fn colliding_ids_are_bumped() {
        let data_manager = DataManager::new(MemoryStore::new());
        data_manager.prepend_route(record(100)).await.unwrap();
        let stored = data_manager.prepend_route(record(100)).await.unwrap();
        assert_eq!(stored.id, 101);

        let stored = data_manager.prepend_route(record(50)).await.unwrap();
        assert_eq!(stored.id, 102);
        assert_eq!(data_manager.get_routes().await.unwrap()[0].id, 102);
    }

    #[tokio::test]
    async fn xp_accumulates() {
        let data_manager = DataManager::new(MemoryStore::with_values([(XP_KEY, "500")]));
        assert_eq!(data_manager.add_xp(120).await.unwrap(), 620);
        assert_eq!(data_manager.store().get(XP_KEY).await.unwrap().as_deref(), Some("620"));
    }

    #[tokio::test]
    async fn clearing_routes_keeps_xp() {
        let data_manager = DataManager::new(MemoryStore::new());
        data_manager.prepend_route(record(1)).await.unwrap();
        data_manager.add_xp(75).await.unwrap();

        data_manager.clear_routes().await.unwrap();

        assert!(data_manager.get_routes().await.unwrap().is_empty());
        assert_eq!(data_manager.get_xp().await.unwrap(), 75);
    }

    #[tokio::test]
    async fn garbage_is_reported() {
        let data_manager = DataManager::new(MemoryStore::with_values([(XP_KEY, "lots"), (ROUTES_KEY, "{")]));
        assert!(matches!(data_manager.get_xp().await, Err(DataManagerError::Serialization(_))));
        assert!(matches!(data_manager.get_routes().await, Err(DataManagerError::Serialization(_))));
    }

    #[tokio::test]
    async fn summary() {
        let data_manager = DataManager::new(MemoryStore::new());
        data_manager.prepend_route(record(1)).await.unwrap();
        data_manager.prepend_route(record(2)).await.unwrap();
        data_manager.add_xp(1500).await.unwrap();

        let summary = data_manager.profile_summary().await.unwrap();
        assert_eq!(summary.route_count, 2);
        assert_eq!(summary.xp.level, 2);
        assert!((summary.walks.total_km - 0.84).abs() < 1e-9);
    }

    #[tokio::test]
    async fn file_backed() {
        let dir = tempfile::tempdir().unwrap();
        let data_manager = DataManager::start(dir.path()).await.unwrap();
        data_manager.prepend_route(record(7)).await.unwrap();
        data_manager.add_xp(3).await.unwrap();

        let reopened = DataManager::start(dir.path()).await.unwrap();
        let routes = reopened.get_routes().await.unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].id, 7);
        assert_eq!(routes[0].distance_km, "0.42");
        assert_eq!(reopened.get_xp().await.unwrap(), 3);
    }
}
