pub mod configuration;
pub mod core;
pub mod location;
pub mod tracker;
