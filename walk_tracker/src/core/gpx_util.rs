use std::{io::{BufReader, Read}, path::Path};

use anyhow::Context;
use chrono::{DateTime, Utc};
use gpx::Waypoint;
use walk_tracker_lib::coordinate::Coordinate;

/// Positions loaded from a GPX file, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct GpxTrack {
    pub name: String,
    pub points: Vec<Coordinate>,
}

pub fn read_gpx(path: impl AsRef<Path>) -> anyhow::Result<GpxTrack> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    parse_gpx(BufReader::new(file)).with_context(|| format!("failed to read {}", path.display()))
}

/// Track points are used when the file has any, route points otherwise.
pub fn parse_gpx<R: Read>(reader: R) -> anyhow::Result<GpxTrack> {
    let gpx = gpx::read(reader)?;

    let mut name = gpx.metadata.and_then(|meta| meta.name);

    let mut points: Vec<Coordinate> = Vec::new();
    for track in gpx.tracks {
        if name.is_none() {
            name = track.name;
        }
        for segment in track.segments {
            points.extend(segment.points.iter().map(to_coordinate));
        }
    }

    if points.is_empty() {
        for route in gpx.routes {
            if name.is_none() {
                name = route.name;
            }
            points.extend(route.points.iter().map(to_coordinate));
        }
    }

    tracing::debug!("Read {} points from gpx", points.len());

    Ok(GpxTrack {
        name: name.unwrap_or_else(|| "Unnamed".to_string()),
        points,
    })
}

fn to_coordinate(waypoint: &Waypoint) -> Coordinate {
    let coordinate = Coordinate::from(waypoint.point());
    match waypoint.time.as_ref().and_then(|time| time.format().ok()) {
        Some(time) => match DateTime::parse_from_rfc3339(&time) {
            Ok(time) => coordinate.with_timestamp(time.with_timezone(&Utc)),
            Err(_) => coordinate,
        },
        None => coordinate,
    }
}
