//! The detection entry points.

use crate::preprocess::{preprocess, PreprocessParams};
use gingham_chessboard::{ChessboardDetection, ChessboardDetector, ChessboardError, DetectorConfig};
use gingham_core::{GrayImage, ImageError, PointWithRefinement};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("blur radius must be non-negative, got {0}")]
    NegativeBlurRadius(i32),

    #[error("image {width}x{height} is too small, need at least {min}x{min}")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min: usize,
    },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Chessboard(#[from] ChessboardError),

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[cfg(feature = "image")]
    #[error(transparent)]
    Decode(#[from] ::image::ImageError),
}

/// Wrap a row-major 8-bit buffer.
pub fn gray_image_from_slice(
    width: usize,
    height: usize,
    data: &[u8],
) -> Result<GrayImage, DetectError> {
    Ok(GrayImage::new(width, height, data.to_vec())?)
}

/// Convert an `image::GrayImage`.
#[cfg(feature = "image")]
pub fn gray_from_image(img: &::image::GrayImage) -> Result<GrayImage, DetectError> {
    gray_image_from_slice(img.width() as usize, img.height() as usize, img.as_raw())
}

/// Load any image format supported by `image` as 8-bit grayscale.
#[cfg(feature = "image")]
pub fn load_gray(path: &std::path::Path) -> Result<GrayImage, DetectError> {
    let img = ::image::ImageReader::open(path)?.decode()?.to_luma8();
    gray_from_image(&img)
}

/// Reject images with no room for a single candidate inside the margin.
pub fn check_image_size(image: &GrayImage, config: &DetectorConfig) -> Result<(), DetectError> {
    let min = 2 * config.corners.margin + 3;
    if image.width < min || image.height < min {
        return Err(DetectError::ImageTooSmall {
            width: image.width,
            height: image.height,
            min,
        });
    }
    Ok(())
}

/// Preprocess a copy of `image` and run the detector on it.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(image, preprocess_params, config),
        fields(width = image.width, height = image.height)
    )
)]
pub fn detect_board(
    image: &GrayImage,
    preprocess_params: &PreprocessParams,
    config: &DetectorConfig,
) -> Result<Option<ChessboardDetection>, DetectError> {
    check_image_size(image, config)?;
    let detector = ChessboardDetector::new(config.clone())?;
    let prepared = preprocess(image, preprocess_params);
    Ok(detector.detect(&prepared)?)
}

/// [`detect_board`] flattened to points; no board gives an empty vector.
pub fn detect_chessboard_with_config(
    image: &GrayImage,
    preprocess_params: &PreprocessParams,
    config: &DetectorConfig,
) -> Result<Vec<PointWithRefinement>, DetectError> {
    Ok(detect_board(image, preprocess_params, config)?
        .map(|d| d.points())
        .unwrap_or_default())
}

/// Detect the default 7x7-corner chessboard.
///
/// The caller's image is not modified. An empty vector means no board was
/// found; `Err` is reserved for invalid input.
pub fn detect_chessboard(
    image: &GrayImage,
    do_contrast_enhancement: bool,
    blur_radius: i32,
    do_subpixel_refinement: bool,
) -> Result<Vec<PointWithRefinement>, DetectError> {
    let blur_radius =
        u32::try_from(blur_radius).map_err(|_| DetectError::NegativeBlurRadius(blur_radius))?;
    let preprocess_params = PreprocessParams {
        contrast_enhancement: do_contrast_enhancement,
        blur_radius,
        ..Default::default()
    };
    let mut config = DetectorConfig::default();
    config.refine.enabled = do_subpixel_refinement;
    detect_chessboard_with_config(image, &preprocess_params, &config)
}
