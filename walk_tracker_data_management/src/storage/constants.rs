pub const ROUTES_KEY: &str = "routes";
pub const XP_KEY: &str = "xp";

// Written next to the value, then renamed over it
pub const TEMP_SUFFIX: &str = ".tmp";
