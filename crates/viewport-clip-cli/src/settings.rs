use clap::Parser;
use std::path::PathBuf;
use viewport_clip_lib::{Config, SurfaceSize};

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Viewport Clip - Replay map viewport changes over GPX tracks and report what gets drawn
pub struct Settings {
    /// GPX files to load
    #[clap(short, long, value_name = "FILE", num_args = 1.., required = true)]
    pub gpx_files: Vec<PathBuf>,

    /// Latitude of the initial viewport center (default: center of all tracks)
    #[clap(long, allow_hyphen_values = true)]
    pub center_lat: Option<f64>,

    /// Longitude of the initial viewport center (default: center of all tracks)
    #[clap(long, allow_hyphen_values = true)]
    pub center_lon: Option<f64>,

    /// Map zoom level (the world is 256 * 2^zoom pixels wide)
    #[clap(short, long, default_value = "12")]
    pub zoom: f64,

    /// Surface width in pixels
    #[clap(long, default_value = "1920")]
    pub width: f64,

    /// Surface height in pixels
    #[clap(long, default_value = "1080")]
    pub height: f64,

    /// Track line width in pixels
    #[clap(long, default_value = "2.0")]
    pub line_width: f64,

    /// Points closer than this many pixels to the previous kept point are dropped
    #[clap(long, default_value = "1.0")]
    pub pixel_tolerance: f64,

    /// Number of pan frames to replay after the initial refresh
    #[clap(long, default_value = "0")]
    pub pan_steps: usize,

    /// Horizontal distance in pixels moved by each pan frame
    #[clap(long, default_value = "100", allow_hyphen_values = true)]
    pub pan_pixels: f64,

    /// Minimum number of shapes before updates run in parallel
    #[clap(long, default_value = "64")]
    pub parallel_threshold: usize,

    /// Always redo the clipping, even when nothing changed
    #[clap(long, default_value = "false")]
    pub no_lazy: bool,

    /// Pretty-print the JSON report
    #[clap(long, default_value = "false")]
    pub pretty: bool,
}

impl Settings {
    pub fn config(&self) -> Config {
        Config {
            pixel_tolerance: self.pixel_tolerance,
            lazy_updates: !self.no_lazy,
            parallel_threshold: self.parallel_threshold,
        }
    }

    pub fn surface(&self) -> SurfaceSize {
        SurfaceSize::new(self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::parse_from(["viewport-clip", "--gpx-files", "a.gpx", "b.gpx"]);
        assert_eq!(settings.gpx_files.len(), 2);
        assert_eq!(settings.zoom, 12.0);
        assert_eq!(settings.surface(), SurfaceSize::new(1920.0, 1080.0));
        assert_eq!(settings.pan_steps, 0);
        assert!(settings.center_lat.is_none());
        assert_eq!(settings.config(), Config::default());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::parse_from([
            "viewport-clip",
            "-g",
            "track.gpx",
            "--center-lat",
            "-33.86",
            "--center-lon",
            "151.2",
            "--pan-steps",
            "5",
            "--pan-pixels",
            "-40",
            "--pixel-tolerance",
            "0",
            "--no-lazy",
        ]);
        assert_eq!(settings.center_lat, Some(-33.86));
        assert_eq!(settings.center_lon, Some(151.2));
        assert_eq!(settings.pan_pixels, -40.0);
        let config = settings.config();
        assert!(!config.lazy_updates);
        assert_eq!(config.pixel_tolerance, 0.0);
    }

    #[test]
    fn test_files_required() {
        assert!(Settings::try_parse_from(["viewport-clip"]).is_err());
    }
}
