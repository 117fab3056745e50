//! Run the chessboard detector on one image described by a JSON config and
//! write candidates plus the detection as JSON.
//!
//! ```text
//! cargo run -p gingham-chessboard --example chessboard -- config.json
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use gingham_chessboard::{find_candidates, ChessboardDetection, ChessboardDetector, DetectorConfig};
use gingham_core::GrayImage;
use image::ImageReader;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
struct ExampleConfig {
    image_path: String,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default)]
    detector: DetectorConfig,
}

#[derive(Debug, Serialize)]
struct ChessboardReport {
    image_path: String,
    config_path: String,
    /// Level-0 candidates, before any grid logic.
    raw_candidates: Vec<Point2<f64>>,
    detection: Option<ChessboardDetection>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = parse_config_path();
    let cfg: ExampleConfig = {
        let raw = fs::read_to_string(&config_path)?;
        serde_json::from_str(&raw)?
    };

    let img = load_image(Path::new(&cfg.image_path))?;
    let raw_candidates = find_candidates(&img, 0, &cfg.detector.corners)
        .into_iter()
        .map(|c| c.position)
        .collect();

    let detector = ChessboardDetector::new(cfg.detector)?;
    let detection = detector.detect(&img)?;

    let report = ChessboardReport {
        image_path: cfg.image_path.clone(),
        config_path: config_path.to_string_lossy().into_owned(),
        raw_candidates,
        detection,
    };

    let output_path = cfg
        .output_path
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("chessboard_detection.json"));

    fs::write(&output_path, serde_json::to_string_pretty(&report)?)?;
    println!("wrote detection JSON to {}", output_path.display());
    Ok(())
}

fn parse_config_path() -> PathBuf {
    env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("chessboard_config.json"))
}

fn load_image(path: &Path) -> Result<GrayImage, Box<dyn std::error::Error>> {
    let img = ImageReader::open(path)?.decode()?.to_luma8();
    let (w, h) = img.dimensions();
    Ok(GrayImage::new(w as usize, h as usize, img.into_raw())?)
}
