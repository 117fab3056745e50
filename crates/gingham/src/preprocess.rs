use gingham_core::{box_blur, enhance_contrast, ClaheParams, GrayImage};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Image preparation ahead of corner detection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessParams {
    /// Histogram equalization followed by CLAHE.
    pub contrast_enhancement: bool,
    /// Box blur radius; the kernel is `2r+1` pixels wide. `0` disables it.
    pub blur_radius: u32,
    pub clahe: ClaheParams,
}

impl Default for PreprocessParams {
    fn default() -> Self {
        Self {
            contrast_enhancement: true,
            blur_radius: 1,
            clahe: ClaheParams::default(),
        }
    }
}

/// Return a preprocessed copy of `image`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(image, params), fields(w = image.width, h = image.height))
)]
pub fn preprocess(image: &GrayImage, params: &PreprocessParams) -> GrayImage {
    let mut out = image.clone();
    if params.contrast_enhancement {
        enhance_contrast(&mut out, &params.clahe);
    }
    if params.blur_radius > 0 {
        box_blur(&mut out, params.blur_radius as usize);
    }
    out
}
