use serde::{Deserialize, Serialize};

use crate::route_record::RouteRecord;

pub const XP_PER_LEVEL: u64 = 1000;
pub const WALK_GOAL_SPAN_KM: f64 = 6.0;
pub const WALK_GOALS_KM: [u32; 4] = [2, 5, 8, 10];

/// Where a cumulative XP total sits on the level ladder. Levels start at 1.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct XpProgress {
    pub level: u64,
    pub xp_into_level: u64,
    pub fraction: f64,
}

impl XpProgress {
    pub fn from_xp(xp: u64) -> Self {
        let xp_into_level = xp % XP_PER_LEVEL;
        Self {
            level: xp / XP_PER_LEVEL + 1,
            xp_into_level,
            fraction: xp_into_level as f64 / XP_PER_LEVEL as f64,
        }
    }
}

/// Progress bar over the walk goals. Wraps every 6 km.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct WalkGoalProgress {
    pub total_km: f64,
    pub fraction: f64,
}

impl WalkGoalProgress {
    pub fn from_total_km(total_km: f64) -> Self {
        Self {
            total_km,
            fraction: ((total_km % WALK_GOAL_SPAN_KM) / WALK_GOAL_SPAN_KM).min(1.0),
        }
    }
}

pub fn total_distance_km(routes: &[RouteRecord]) -> f64 {
    routes.iter().map(|route| route.kilometres()).sum()
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProfileSummary {
    pub total_xp: u64,
    pub xp: XpProgress,
    pub walks: WalkGoalProgress,
    pub route_count: usize,
}

impl ProfileSummary {
    pub fn new(total_xp: u64, routes: &[RouteRecord]) -> Self {
        Self {
            total_xp,
            xp: XpProgress::from_xp(total_xp),
            walks: WalkGoalProgress::from_total_km(total_distance_km(routes)),
            route_count: routes.len(),
        }
    }
}

/// `HH:MM:SS`. Hours keep counting past 24.
pub fn format_duration(seconds: u64) -> String {
    let h = seconds / 3600;
    let m = (seconds % 3600) / 60;
    let s = seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}
