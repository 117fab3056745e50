//! Chessboard grid detection for camera calibration.
//!
//! The crate ties the workspace together: image preprocessing (histogram
//! equalization, CLAHE and box blur), the pyramid chessboard detector from
//! `gingham-chessboard` (which also finds circle grids), JSON configuration
//! and debug dumps. The `gingham`
//! binary (feature `cli`) runs it over image files.
//!
//! ## Quickstart
//!
//! ```no_run
//! use gingham::detect;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let image = detect::load_gray(std::path::Path::new("board.png"))?;
//! let points = detect::detect_chessboard(&image, true, 1, true)?;
//! for p in &points {
//!     println!("{} {} {}", p.x, p.y, p.refinement_level);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `gingham::core`: image container, preprocessing filters, pyramid, homography.
//! - `gingham::chessboard`: the detector and its parameters.
//! - `gingham::detect`: the entry points used by the CLI and the bindings.

pub use gingham_chessboard as chessboard;
pub use gingham_core as core;

pub use gingham_chessboard::{ChessboardDetection, DetectorConfig, GridSize};
pub use gingham_core::{DetectedCorner, GrayImage, PointWithRefinement};

mod config;
#[cfg(feature = "image")]
pub mod debug;
pub mod detect;
mod preprocess;

pub use config::Config;
pub use detect::{detect_chessboard, detect_chessboard_with_config, DetectError};
pub use preprocess::{preprocess, PreprocessParams};

/// Install a `tracing` subscriber at `default_level` (overridden by
/// `RUST_LOG`) and route `log` records into it.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_level: log::LevelFilter) {
    gingham_core::init_tracing(json, default_level);
    let _ = tracing_log::LogTracer::init();
}
