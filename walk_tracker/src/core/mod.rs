pub mod gpx_util;
