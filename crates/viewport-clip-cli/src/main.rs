//! `viewport-clip` - replay viewport changes over GPX tracks
//!
//! Loads the tracks, then drives the clipping pipeline through a refresh frame, a number
//! of pan frames and a final end-of-transition frame, and prints a JSON report.

mod error;
mod load;
mod report;
mod settings;

use crate::error::{CliError, Result};
use crate::load::Track;
use crate::report::{FrameReport, LatLon, Report, SummarySink};
use crate::settings::Settings;
use clap::Parser;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing_subscriber::prelude::*;
use viewport_clip_lib::{
    BoundingRectangle, Shape, ShapeRenderPipeline, UpdateTrigger, ViewTransform, ViewportContext,
    WebMercatorView,
};

/// Log to stderr, stdout carries the report. Defaults to INFO unless `RUST_LOG` is set.
fn setup_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter);
    tracing_subscriber::registry().with(fmt_layer).init();
}

fn main() -> ExitCode {
    setup_logging();
    let settings = Settings::parse();

    match run(&settings) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(settings: &Settings) -> Result<()> {
    let tracks = load::load_tracks(&settings.gpx_files)?;
    let report = replay(settings, tracks)?;

    let mut stdout = std::io::stdout().lock();
    if settings.pretty {
        serde_json::to_writer_pretty(&mut stdout, &report)?;
    } else {
        serde_json::to_writer(&mut stdout, &report)?;
    }
    writeln!(stdout)?;
    Ok(())
}

/// Sequence of (trigger, horizontal offset in pixels) replayed by the tool
fn frame_plan(pan_steps: usize, pan_pixels: f64) -> Vec<(UpdateTrigger, f64)> {
    let mut frames = Vec::with_capacity(pan_steps + 2);
    frames.push((UpdateTrigger::Refresh, 0.0));
    frames.extend((1..=pan_steps).map(|step| (UpdateTrigger::Pan, step as f64 * pan_pixels)));
    frames.push((UpdateTrigger::EndTransition, pan_steps as f64 * pan_pixels));
    frames
}

/// Initial viewport center: explicit coordinates, or the center of all tracks
fn resolve_center(settings: &Settings, tracks: &[Track]) -> Result<LatLon> {
    let bounds = BoundingRectangle::from_points(
        tracks.iter().flat_map(|track| track.points.iter().copied()),
    );
    let (lat, lon) = match (settings.center_lat, settings.center_lon) {
        (Some(lat), Some(lon)) => (lat, lon),
        _ if bounds.is_empty() => return Err(CliError::NoTracks),
        (lat, lon) => {
            let center = bounds.center();
            (lat.unwrap_or(center.y()), lon.unwrap_or(center.x()))
        }
    };
    if !(lat.is_finite() && lon.is_finite()) {
        return Err(CliError::InvalidCenter { lat, lon });
    }
    Ok(LatLon { lat, lon })
}

fn replay(settings: &Settings, tracks: Vec<Track>) -> Result<Report> {
    let config = settings.config();
    let mut pipeline = ShapeRenderPipeline::new(config.clone())?;

    let view = WebMercatorView::new(settings.zoom);
    let transform: Arc<dyn ViewTransform> = Arc::new(view);
    let center = resolve_center(settings, &tracks)?;

    let input_points = tracks.iter().map(|track| track.points.len()).sum();
    for track in tracks {
        tracing::debug!("Adding track {} ({} points)", track.name, track.points.len());
        pipeline.add_shape(
            Shape::polyline(track.points, transform.clone())
                .with_stroke_thickness(settings.line_width),
        );
    }

    // View space is world pixels, so one view unit is one device pixel
    let surface = settings.surface();
    let start = ViewportContext::new(
        view.visible_rect(center.lat, center.lon, surface),
        surface,
        1.0,
    )?;

    let mut frames = Vec::new();
    for (index, (trigger, offset)) in frame_plan(settings.pan_steps, settings.pan_pixels)
        .into_iter()
        .enumerate()
    {
        let ctx = start.panned(offset, 0.0);
        let mut sink = SummarySink::default();

        let started = Instant::now();
        let stats = pipeline.render(&ctx, trigger, &mut sink);
        let elapsed_us = started.elapsed().as_micros() as u64;

        tracing::info!(
            "Frame {} ({:?}, offset {} px): {} points in {} pieces, {} us",
            index,
            trigger,
            offset,
            stats.points,
            stats.pieces,
            elapsed_us
        );
        frames.push(FrameReport {
            index,
            trigger: format!("{:?}", trigger),
            offset_pixels: offset,
            stats,
            emitted: sink.summary(&view),
            invalidated: sink.invalidated(),
            elapsed_us,
        });
    }

    Ok(Report {
        shapes: pipeline.len(),
        input_points,
        zoom: settings.zoom,
        center,
        surface,
        config,
        frames,
    })
}
