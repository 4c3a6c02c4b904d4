use crate::coordinate::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in metres between two (latitude, longitude) pairs given in degrees.
pub fn haversine_distance(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::atan2(f64::sqrt(a), f64::sqrt(1. - a));

    EARTH_RADIUS_M * c
}

impl Coordinate {
    /// Distance in metres to another reading.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        haversine_distance((self.latitude, self.longitude), (other.latitude, other.longitude))
    }
}

/// Total length in metres of a path, summed over consecutive points.
pub fn path_length(path: &[Coordinate]) -> f64 {
    path.windows(2).map(|pair| pair[0].distance_to(&pair[1])).sum()
}
