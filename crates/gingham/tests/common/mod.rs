#![allow(dead_code)]

use gingham::core::synthetic::{ChessboardTarget, DotGridTarget};
use gingham::GrayImage;

/// The default test scene: 640x480, an 8x8-square board with 36 px squares
/// at (100, 40), so 7x7 interior corners at (136 + 36i, 76 + 36j).
pub fn default_scene() -> GrayImage {
    ChessboardTarget::new((100.0, 40.0), 36.0, (8, 8)).render(640, 480)
}

/// 7x7 dark dots 40 px apart, first centre at (120, 80).
pub fn dot_scene() -> GrayImage {
    DotGridTarget::new((120.0, 80.0), 40.0, 16.0, (7, 7)).render(480, 400)
}

pub fn save_png(img: &GrayImage, path: &std::path::Path) {
    image::save_buffer(
        path,
        &img.data,
        img.width as u32,
        img.height as u32,
        image::ExtendedColorType::L8,
    )
    .unwrap();
}
