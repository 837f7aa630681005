//! GPX loading into plain (lon, lat) polylines

use crate::error::{CliError, Result};
use geo::Point;
use rayon::prelude::*;
use std::path::Path;

/// One drawable line read from a GPX file
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub name: String,
    /// Points as (lon, lat) in degrees
    pub points: Vec<Point<f64>>,
}

/// Load every track segment and route of the given files in parallel
pub fn load_tracks<P: AsRef<Path> + Sync>(paths: &[P]) -> Result<Vec<Track>> {
    let per_file: Result<Vec<Vec<Track>>> = paths
        .par_iter()
        .map(|path| {
            let path = path.as_ref();
            let file = std::fs::File::open(path)?;
            let reader = std::io::BufReader::new(file);
            let gpx = gpx::read(reader)?;
            let source = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            Ok(tracks_from_gpx(&source, gpx))
        })
        .collect();

    let tracks: Vec<Track> = per_file?.into_iter().flatten().collect();
    if tracks.is_empty() {
        return Err(CliError::NoTracks);
    }

    tracing::info!(
        "Loaded {} tracks with {} points from {} files",
        tracks.len(),
        tracks.iter().map(|t| t.points.len()).sum::<usize>(),
        paths.len()
    );
    Ok(tracks)
}

/// Split parsed GPX data into one line per track segment and per route
pub fn tracks_from_gpx(source: &str, gpx: gpx::Gpx) -> Vec<Track> {
    let mut tracks = Vec::new();
    let mut push = |name: String, waypoints: &[gpx::Waypoint]| {
        if waypoints.len() < 2 {
            tracing::warn!("Skipping {}: fewer than 2 points", name);
            return;
        }
        tracks.push(Track {
            name,
            points: waypoints.iter().map(|waypoint| waypoint.point()).collect(),
        });
    };

    for (track_index, track) in gpx.tracks.iter().enumerate() {
        let base = track
            .name
            .clone()
            .unwrap_or_else(|| format!("{}#{}", source, track_index));
        for (segment_index, segment) in track.segments.iter().enumerate() {
            let name = if track.segments.len() > 1 {
                format!("{}/{}", base, segment_index)
            } else {
                base.clone()
            };
            push(name, &segment.points);
        }
    }

    for (route_index, route) in gpx.routes.iter().enumerate() {
        let name = route
            .name
            .clone()
            .unwrap_or_else(|| format!("{}@route{}", source, route_index));
        push(name, &route.points);
    }

    tracks
}
