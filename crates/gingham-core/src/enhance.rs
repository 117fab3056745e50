//! Global and local (CLAHE) histogram equalization for 8-bit images.
//!
//! CLAHE on its own does not always stretch the output over the full dynamic
//! range, so the usual contrast-enhancement step runs [`equalize_hist`] first
//! and then [`Clahe::apply`] (see [`enhance_contrast`]).

use crate::GrayImage;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

const BINS: usize = 256;

/// Parameters of contrast-limited adaptive histogram equalization.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaheParams {
    /// Histogram clip limit, relative to a uniform histogram.
    pub clip_limit: f32,
    /// Number of tiles along x and y.
    pub tiles: [usize; 2],
}

impl Default for ClaheParams {
    fn default() -> Self {
        Self {
            clip_limit: 8.0,
            tiles: [8, 8],
        }
    }
}

fn histogram(data: &[u8]) -> [u32; BINS] {
    let mut hist = [0u32; BINS];
    for &v in data {
        hist[v as usize] += 1;
    }
    hist
}

/// Global histogram equalization.
///
/// The lowest occupied intensity maps to 0 and the cumulative histogram is
/// scaled onto `[0, 255]`. An image with a single intensity is left as is.
pub fn equalize_hist(img: &mut GrayImage) {
    let hist = histogram(&img.data);
    let total = img.data.len() as u64;

    let Some(first) = hist.iter().position(|&c| c > 0) else {
        return;
    };
    if hist[first] as u64 == total {
        return;
    }

    let scale = 255.0 / (total - hist[first] as u64) as f32;
    let mut lut = [0u8; BINS];
    let mut sum = 0u64;
    for i in (first + 1)..BINS {
        sum += hist[i] as u64;
        lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
    }

    for v in img.data.iter_mut() {
        *v = lut[*v as usize];
    }
}

/// Contrast-limited adaptive histogram equalization engine.
///
/// A value type: callers create one per use, there is no shared state.
#[derive(Clone, Debug)]
pub struct Clahe {
    params: ClaheParams,
}

impl Clahe {
    pub fn new(params: ClaheParams) -> Self {
        Self { params }
    }

    /// Equalize `img` in place.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, img), fields(w = img.width, h = img.height))
    )]
    pub fn apply(&self, img: &mut GrayImage) {
        let w = img.width;
        let h = img.height;
        if w == 0 || h == 0 {
            return;
        }
        let tiles_x = self.params.tiles[0].clamp(1, w);
        let tiles_y = self.params.tiles[1].clamp(1, h);

        let bounds = |k: usize, n: usize, len: usize| (k * len / n, (k + 1) * len / n);

        // One lookup table per tile.
        let mut luts = vec![[0u8; BINS]; tiles_x * tiles_y];
        for ty in 0..tiles_y {
            let (y0, y1) = bounds(ty, tiles_y, h);
            for tx in 0..tiles_x {
                let (x0, x1) = bounds(tx, tiles_x, w);
                let mut hist = [0u32; BINS];
                for y in y0..y1 {
                    for &v in &img.data[y * w + x0..y * w + x1] {
                        hist[v as usize] += 1;
                    }
                }
                let area = ((x1 - x0) * (y1 - y0)) as u32;
                luts[ty * tiles_x + tx] = self.tile_lut(hist, area);
            }
        }

        let tile_w = w as f32 / tiles_x as f32;
        let tile_h = h as f32 / tiles_y as f32;

        let src = img.data.clone();
        for y in 0..h {
            let tyf = (y as f32 + 0.5) / tile_h - 0.5;
            let ty1 = tyf.floor();
            let ya = tyf - ty1;
            let ty2 = ((ty1 as i64 + 1).min(tiles_y as i64 - 1)).max(0) as usize;
            let ty1 = (ty1 as i64).max(0) as usize;

            for x in 0..w {
                let txf = (x as f32 + 0.5) / tile_w - 0.5;
                let tx1 = txf.floor();
                let xa = txf - tx1;
                let tx2 = ((tx1 as i64 + 1).min(tiles_x as i64 - 1)).max(0) as usize;
                let tx1 = (tx1 as i64).max(0) as usize;

                let v = src[y * w + x] as usize;
                let l11 = luts[ty1 * tiles_x + tx1][v] as f32;
                let l12 = luts[ty1 * tiles_x + tx2][v] as f32;
                let l21 = luts[ty2 * tiles_x + tx1][v] as f32;
                let l22 = luts[ty2 * tiles_x + tx2][v] as f32;

                let top = l11 * (1.0 - xa) + l12 * xa;
                let bottom = l21 * (1.0 - xa) + l22 * xa;
                let out = top * (1.0 - ya) + bottom * ya;
                img.data[y * w + x] = out.round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    fn tile_lut(&self, mut hist: [u32; BINS], area: u32) -> [u8; BINS] {
        let mut lut = [0u8; BINS];
        if area == 0 {
            return lut;
        }

        if self.params.clip_limit > 0.0 {
            let clip = ((self.params.clip_limit * area as f32 / BINS as f32) as u32).max(1);
            let mut clipped = 0u32;
            for c in hist.iter_mut() {
                if *c > clip {
                    clipped += *c - clip;
                    *c = clip;
                }
            }

            // Redistribute the clipped mass uniformly, then spread the remainder.
            let batch = clipped / BINS as u32;
            let mut residual = clipped - batch * BINS as u32;
            for c in hist.iter_mut() {
                *c += batch;
            }
            if residual > 0 {
                let step = (BINS as u32 / residual).max(1) as usize;
                let mut i = 0;
                while i < BINS && residual > 0 {
                    hist[i] += 1;
                    residual -= 1;
                    i += step;
                }
            }
        }

        let scale = 255.0 / area as f32;
        let mut sum = 0u32;
        for (i, &c) in hist.iter().enumerate() {
            sum += c;
            lut[i] = (sum as f32 * scale).round().clamp(0.0, 255.0) as u8;
        }
        lut
    }
}

/// Histogram equalization followed by CLAHE.
pub fn enhance_contrast(img: &mut GrayImage, params: &ClaheParams) {
    equalize_hist(img);
    Clahe::new(*params).apply(img);
}
