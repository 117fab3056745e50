//! ChESS corner response on 8-bit images.

use gingham_core::GrayImage;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Radius of the sampling ring.
pub const RING_RADIUS: usize = 5;

/// 16 ring offsets, clockwise from the top, radius 5.
pub const RING5: [(i32, i32); 16] = [
    (0, -5),
    (2, -5),
    (3, -3),
    (5, -2),
    (5, 0),
    (5, 2),
    (3, 3),
    (2, 5),
    (0, 5),
    (-2, 5),
    (-3, 3),
    (-5, 2),
    (-5, 0),
    (-5, -2),
    (-3, -3),
    (-2, -5),
];

/// Dense per-pixel ChESS response, row-major.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<i16>,
}

impl ResponseMap {
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> i16 {
        self.data[y * self.width + x]
    }

    /// Replace negative responses by zero.
    pub fn clamp_negative(&mut self) {
        for v in self.data.iter_mut() {
            if *v < 0 {
                *v = 0;
            }
        }
    }

    /// Min-max normalize onto `[0, 255]` for visualization.
    pub fn to_normalized_image(&self) -> GrayImage {
        let min = self.data.iter().copied().min().unwrap_or(0) as i32;
        let max = self.data.iter().copied().max().unwrap_or(0) as i32;
        let range = (max - min).max(1) as f32;
        GrayImage {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| ((v as i32 - min) as f32 * 255.0 / range).round() as u8)
                .collect(),
        }
    }
}

#[inline]
fn ring_samples(img: &GrayImage, x: usize, y: usize) -> [i32; 16] {
    let mut s = [0i32; 16];
    for (k, &(dx, dy)) in RING5.iter().enumerate() {
        let xx = (x as i32 + dx) as usize;
        let yy = (y as i32 + dy) as usize;
        s[k] = img.data[yy * img.width + xx] as i32;
    }
    s
}

/// Response at `(x, y)`; the caller guarantees the ring fits.
#[inline]
fn response_at(img: &GrayImage, x: usize, y: usize) -> i16 {
    let s = ring_samples(img, x, y);

    let mut sr = 0i32;
    for k in 0..4 {
        sr += ((s[k] + s[k + 8]) - (s[k + 4] + s[k + 12])).abs();
    }

    let mut dr = 0i32;
    for k in 0..8 {
        dr += (s[k] - s[k + 8]).abs();
    }

    let w = img.width;
    let row = y * w;
    let cross = img.data[row + x] as i32
        + img.data[row - w + x] as i32
        + img.data[row + w + x] as i32
        + img.data[row + x - 1] as i32
        + img.data[row + x + 1] as i32;
    let ring_sum: i32 = s.iter().sum();

    // 16 * |mean(ring) - mean(cross)|
    let mean_diff = (5 * ring_sum - 16 * cross).abs() / 5;

    (sr - dr - mean_diff).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}

/// Compute the response over the whole image. Pixels where the ring does
/// not fit are 0.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img), fields(w = img.width, h = img.height))
)]
pub fn chess_response(img: &GrayImage) -> ResponseMap {
    let w = img.width;
    let h = img.height;
    let mut data = vec![0i16; w * h];
    let r = RING_RADIUS;

    if w > 2 * r && h > 2 * r {
        for y in r..h - r {
            for x in r..w - r {
                data[y * w + x] = response_at(img, x, y);
            }
        }
    }

    ResponseMap {
        width: w,
        height: h,
        data,
    }
}

/// Dominant diagonal through the bright sectors of the ring around `(x, y)`,
/// in `[0, π)`. Returns `None` if the ring does not fit.
pub fn ring_orientation(img: &GrayImage, x: usize, y: usize) -> Option<f32> {
    let r = RING_RADIUS;
    if x < r || y < r || x + r >= img.width || y + r >= img.height {
        return None;
    }
    let s = ring_samples(img, x, y);
    let mean = s.iter().sum::<i32>() as f32 / 16.0;

    let mut c2 = 0.0f32;
    let mut s2 = 0.0f32;
    for (&v, &(dx, dy)) in s.iter().zip(RING5.iter()) {
        let a2 = 2.0 * (dy as f32).atan2(dx as f32);
        c2 += (v as f32 - mean) * a2.cos();
        s2 += (v as f32 - mean) * a2.sin();
    }

    let mut theta = 0.5 * s2.atan2(c2);
    if theta < 0.0 {
        theta += std::f32::consts::PI;
    }
    if !theta.is_finite() {
        theta = 0.0;
    }
    Some(theta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_4, PI};

    /// Four quadrants meeting at pixel (cx, cy) with an anti-aliased seam.
    fn x_junction(size: usize, cx: usize, cy: usize, swap: bool) -> GrayImage {
        let mut img = GrayImage::filled(size, size, 0);
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 - cx as f32;
                let dy = y as f32 - cy as f32;
                let v = if dx == 0.0 || dy == 0.0 {
                    125
                } else if (dx > 0.0) == (dy > 0.0) {
                    230
                } else {
                    20
                };
                let v = if swap && v != 125 { 250 - v } else { v };
                img.set(x, y, v);
            }
        }
        img
    }

    #[test]
    fn peaks_at_junction() {
        let img = x_junction(31, 15, 15, false);
        let resp = chess_response(&img);

        let peak = resp.at(15, 15);
        assert!(peak > 1000, "peak {peak}");
        for (x, y) in [(10, 15), (15, 8), (20, 20), (25, 25)] {
            assert!(resp.at(x, y) < peak, "({x},{y})");
        }
    }

    #[test]
    fn straight_edge_scores_negative() {
        let mut img = GrayImage::filled(21, 21, 20);
        for y in 0..21 {
            for x in 11..21 {
                img.set(x, y, 230);
            }
        }
        let resp = chess_response(&img);
        assert!(resp.at(10, 10) < 0);
    }

    #[test]
    fn ring_border_is_zero() {
        let img = x_junction(21, 10, 10, false);
        let resp = chess_response(&img);
        assert_eq!(resp.at(4, 10), 0);
        assert_eq!(resp.at(10, 16), 0);
        assert_eq!(resp.width * resp.height, resp.data.len());
    }

    #[test]
    fn orientation_follows_bright_diagonal() {
        let a = ring_orientation(&x_junction(21, 10, 10, false), 10, 10).unwrap();
        let b = ring_orientation(&x_junction(21, 10, 10, true), 10, 10).unwrap();
        assert!((a - FRAC_PI_4).abs() < 1e-3, "{a}");
        assert!((b - 3.0 * FRAC_PI_4).abs() < 1e-3, "{b}");
        assert!((0.0..PI).contains(&a));
        assert!(ring_orientation(&x_junction(21, 10, 10, false), 3, 10).is_none());
    }

    #[test]
    fn normalized_image_spans_full_range() {
        let map = ResponseMap {
            width: 3,
            height: 1,
            data: vec![-100, 0, 100],
        };
        let img = map.to_normalized_image();
        assert_eq!(img.data, vec![0, 128, 255]);
    }
}
