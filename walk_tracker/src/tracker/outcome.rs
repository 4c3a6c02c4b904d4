use std::fmt;

use walk_tracker_data_management::DataManagerError;
use walk_tracker_lib::route_record::RouteRecord;

use crate::location::LocationError;

#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("position unavailable")]
    PositionUnavailable,
    #[error("no data was recorded")]
    EmptySession,
    #[error("failed to save route: {0}")]
    PersistenceFailure(#[from] DataManagerError),
    #[error("tracking session was lost: {0}")]
    SessionLost(String),
    #[error("already tracking")]
    AlreadyTracking,
    #[error("not tracking")]
    NotTracking,
}

impl From<LocationError> for TrackerError {
    fn from(value: LocationError) -> Self {
        match value {
            LocationError::PermissionDenied => TrackerError::PermissionDenied,
            LocationError::PositionUnavailable => TrackerError::PositionUnavailable,
        }
    }
}

impl TrackerError {
    pub fn notice(&self) -> Notice {
        Notice::from(self)
    }
}

/// A walk that made it to storage.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedRoute {
    pub record: RouteRecord,
    pub earned_xp: u64,
    pub total_xp: u64,
}

/// Something the user should be told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    PermissionDenied,
    WaitingForFix,
    NoDataRecorded,
    RouteSaved { earned_xp: u64 },
    SaveFailed,
    AlreadyTracking,
    NotTracking,
}

impl From<&TrackerError> for Notice {
    fn from(value: &TrackerError) -> Self {
        match value {
            TrackerError::PermissionDenied => Notice::PermissionDenied,
            TrackerError::PositionUnavailable => Notice::WaitingForFix,
            TrackerError::EmptySession => Notice::NoDataRecorded,
            TrackerError::PersistenceFailure(_) | TrackerError::SessionLost(_) => Notice::SaveFailed,
            TrackerError::AlreadyTracking => Notice::AlreadyTracking,
            TrackerError::NotTracking => Notice::NotTracking,
        }
    }
}

impl From<&SavedRoute> for Notice {
    fn from(value: &SavedRoute) -> Self {
        Notice::RouteSaved { earned_xp: value.earned_xp }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::PermissionDenied => write!(f, "Location permission was denied"),
            Notice::WaitingForFix => write!(f, "Waiting for your location..."),
            Notice::NoDataRecorded => write!(f, "No route was recorded"),
            Notice::RouteSaved { earned_xp } => write!(f, "Route saved! +{earned_xp} XP earned"),
            Notice::SaveFailed => write!(f, "Could not save the route"),
            Notice::AlreadyTracking => write!(f, "A walk is already being tracked"),
            Notice::NotTracking => write!(f, "No walk is being tracked"),
        }
    }
}
