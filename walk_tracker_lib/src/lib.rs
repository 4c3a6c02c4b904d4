pub mod coordinate;
pub mod distance;
pub mod progress;
pub mod route_record;
