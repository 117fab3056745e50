//! Debug image dumps.

use crate::DetectError;
use gingham_chessboard::chess_response;
use gingham_core::GrayImage;
use std::path::{Path, PathBuf};

fn save_png(path: &Path, img: &GrayImage) -> Result<(), DetectError> {
    ::image::save_buffer(
        path,
        &img.data,
        img.width as u32,
        img.height as u32,
        ::image::ExtendedColorType::L8,
    )?;
    Ok(())
}

/// Write `<stem>_preprocessed.png` and `<stem>_response.png` (min-max
/// normalized ChESS response) into `dir`. `stem` is the input file name
/// without directory and extension.
pub fn write_debug_images(
    dir: &Path,
    source: &Path,
    preprocessed: &GrayImage,
) -> Result<Vec<PathBuf>, DetectError> {
    std::fs::create_dir_all(dir)?;
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());

    let pre_path = dir.join(format!("{stem}_preprocessed.png"));
    save_png(&pre_path, preprocessed)?;
    log::info!("wrote preprocessed image to {}", pre_path.display());

    let resp_path = dir.join(format!("{stem}_response.png"));
    save_png(&resp_path, &chess_response(preprocessed).to_normalized_image())?;
    log::info!("wrote normalized ChESS response to {}", resp_path.display());

    Ok(vec![pre_path, resp_path])
}
