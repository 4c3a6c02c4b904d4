use walk_tracker_lib::coordinate::Coordinate;

/// Accumulators of one walk. Only the sample consumer owns it while tracking.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    path: Vec<Coordinate>,
    distance_km: f64,
    xp: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a sample. Returns the length in metres of the step it completes, if any.
    ///
    /// Every step earns one XP per whole metre. Fractions are dropped per step.
    pub fn record(&mut self, sample: Coordinate) -> Option<f64> {
        let step = self.path.last().map(|last| last.distance_to(&sample));
        self.path.push(sample);

        let step_m = step?;
        self.distance_km += step_m / 1000.;
        self.xp += step_m.floor() as u64;
        Some(step_m)
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn distance_km(&self) -> f64 {
        self.distance_km
    }

    pub fn xp(&self) -> u64 {
        self.xp
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    pub fn into_path(self) -> Vec<Coordinate> {
        self.path
    }
}

/// What observers see of the walk in progress.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub tracking: bool,
    pub path: Vec<Coordinate>,
    pub distance_km: f64,
    pub xp: u64,
    pub elapsed_seconds: u64,
}

impl SessionSnapshot {
    pub fn last_position(&self) -> Option<&Coordinate> {
        self.path.last()
    }
}
