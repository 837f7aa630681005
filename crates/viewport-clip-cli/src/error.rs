use viewport_clip_lib::ClipError;

/// Error types for the command line tool
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GPX parsing error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),

    #[error("Clipping error: {0}")]
    Clip(#[from] ClipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No track points found in the given files")]
    NoTracks,

    #[error("Invalid viewport center: {lat}, {lon}")]
    InvalidCenter { lat: f64, lon: f64 },
}

pub type Result<T> = std::result::Result<T, CliError>;
