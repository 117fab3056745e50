//! Core types and image utilities for chessboard grid detection.
//!
//! Nothing in here knows about chessboards: it provides the grayscale image
//! container, preprocessing filters, the image pyramid, homographies and the
//! point records shared by the detector and its bindings.

mod enhance;
mod filter;
mod homography;
mod image;
mod logger;
mod point;
mod pyramid;
pub mod synthetic;

pub use enhance::{enhance_contrast, equalize_hist, Clahe, ClaheParams};
pub use filter::{box_blur, MAX_BLUR_RADIUS};
pub use homography::{
    estimate_homography_rect_to_img, homography_from_4pt, reprojection_errors, Homography,
};
pub use image::{GrayImage, ImageError};
pub use point::{DetectedCorner, PointWithRefinement};
pub use pyramid::{downsample_2x, full_to_level, level_to_full, Pyramid};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, parse_level};
