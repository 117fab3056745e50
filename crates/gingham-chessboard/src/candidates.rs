//! Corner candidates from connected components of the ChESS response.
//!
//! Every pixel above the response threshold seeds a 4-connected flood fill.
//! Pixels are consumed as they join a component, so each pixel belongs to at
//! most one component. A component becomes a candidate when it stays clear of
//! the image margin, has a strong enough peak, and the image around the peak
//! is not flat.

use crate::params::CornerParams;
use crate::response::{chess_response, ring_orientation, ResponseMap};
use gingham_core::{level_to_full, GrayImage};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A corner candidate in full-resolution pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub position: Point2<f64>,
    /// Diagonal through the bright sectors, in `[0, π)`.
    pub orientation: f32,
    /// Peak response of the component.
    pub strength: f32,
    /// Pyramid level the candidate was measured at.
    pub level: u32,
}

/// Accumulated statistics of one connected component, in level pixels.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct Component {
    sum_w_x: u64,
    sum_w_y: u64,
    sum_w: u64,
    n: usize,
    pub peak: (usize, usize),
    pub response_max: i16,
}

impl Component {
    fn accumulate(&mut self, x: usize, y: usize, response: i16) {
        if response > self.response_max {
            self.response_max = response;
            self.peak = (x, y);
        }
        let r = response as u64;
        self.sum_w_x += r * x as u64;
        self.sum_w_y += r * y as u64;
        self.sum_w += r;
        self.n += 1;
    }

    pub fn centroid(&self) -> Point2<f64> {
        let w = self.sum_w as f64;
        Point2::new(self.sum_w_x as f64 / w, self.sum_w_y as f64 / w)
    }
}

#[inline]
fn is_valid(response: i16, component: Option<&Component>, params: &CornerParams) -> bool {
    response > params.response_threshold
        && component.is_none_or(|c| response as i32 > ((c.response_max as u16) >> 4) as i32)
}

/// True if the intensity standard deviation in the window around `(x, y)`
/// exceeds the threshold. Windows that leave the image fail.
pub(crate) fn high_variance(img: &GrayImage, x: usize, y: usize, params: &CornerParams) -> bool {
    let r = params.variance_window_radius;
    if x < r || y < r || x + r >= img.width || y + r >= img.height {
        return false;
    }
    let side = 2 * r + 1;
    let count = (side * side) as i64;

    let window = || {
        (y - r..=y + r).flat_map(move |yy| {
            let row = yy * img.width;
            img.data[row + x - r..=row + x + r].iter().map(|&v| v as i64)
        })
    };
    let mean = window().sum::<i64>() / count;
    let var = window().map(|v| (v - mean) * (v - mean)).sum::<i64>() / count;

    var > (params.stdev_threshold as i64) * (params.stdev_threshold as i64)
}

/// Flood-fill the component seeded at `seed`, zeroing consumed pixels.
///
/// Returns the component if it passes validation.
pub(crate) fn follow_component(
    response: &mut ResponseMap,
    img: &GrayImage,
    seed: (usize, usize),
    params: &CornerParams,
) -> Option<Component> {
    let w = response.width;
    let h = response.height;
    let margin = params.margin;

    let mut component = Component::default();
    let mut touched_margin = false;
    let mut stack = vec![seed];

    while let Some((x, y)) = stack.pop() {
        let r = response.at(x, y);
        if !is_valid(r, Some(&component), params) {
            continue;
        }
        component.accumulate(x, y, r);
        response.data[y * w + x] = 0;

        let neighbours = [
            (x as i64 + 1, y as i64),
            (x as i64 - 1, y as i64),
            (x as i64, y as i64 + 1),
            (x as i64, y as i64 - 1),
        ];
        for (nx, ny) in neighbours {
            let inside = nx >= margin as i64
                && nx < (w - margin) as i64
                && ny >= margin as i64
                && ny < (h - margin) as i64;
            if !inside {
                touched_margin = true;
                continue;
            }
            let (nx, ny) = (nx as usize, ny as usize);
            if response.at(nx, ny) > 0 {
                stack.push((nx, ny));
            }
        }
    }

    let accepted = !touched_margin
        && component.n > 1
        && component.response_max > params.peak_threshold
        && high_variance(img, component.peak.0, component.peak.1, params);
    accepted.then_some(component)
}

/// The image must leave room for the margin plus one scan pixel per side.
pub(crate) fn fits_margin(width: usize, height: usize, params: &CornerParams) -> bool {
    width > 2 * params.margin + 2 && height > 2 * params.margin + 2
}

/// Find corner candidates in `img`, the pyramid image at `level`.
///
/// Positions are returned at full resolution.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, params), fields(w = img.width, h = img.height))
)]
pub fn find_candidates(img: &GrayImage, level: u32, params: &CornerParams) -> Vec<Candidate> {
    if !fits_margin(img.width, img.height, params) {
        return Vec::new();
    }
    let mut response = chess_response(img);
    response.clamp_negative();

    let margin = params.margin;
    let mut out = Vec::new();
    for y in margin + 1..img.height - margin - 1 {
        for x in margin + 1..img.width - margin - 1 {
            if !is_valid(response.at(x, y), None, params) {
                continue;
            }
            let Some(component) = follow_component(&mut response, img, (x, y), params) else {
                continue;
            };
            let c = component.centroid();
            let (px, py) = component.peak;
            out.push(Candidate {
                position: Point2::new(level_to_full(c.x, level), level_to_full(c.y, level)),
                orientation: ring_orientation(img, px, py).unwrap_or(0.0),
                strength: component.response_max as f32,
                level,
            });
        }
    }

    log::debug!("level {level}: {} corner candidates", out.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gingham_core::synthetic::ChessboardTarget;

    fn small_board() -> GrayImage {
        ChessboardTarget::new((20.0, 20.0), 24.0, (5, 5)).render(160, 160)
    }

    #[test]
    fn finds_interior_corners_of_small_board() {
        let img = small_board();
        let found = find_candidates(&img, 0, &CornerParams::default());
        assert_eq!(found.len(), 16, "{found:?}");

        for c in &found {
            // Square edges run through pixel centres at 20 + 24k.
            let gx = (c.position.x - 20.0) / 24.0;
            let gy = (c.position.y - 20.0) / 24.0;
            assert!((gx - gx.round()).abs() * 24.0 < 0.25, "{c:?}");
            assert!((gy - gy.round()).abs() * 24.0 < 0.25, "{c:?}");
            assert!(c.strength > 200.0);
        }
    }

    #[test]
    fn adjacent_corners_have_orthogonal_orientations() {
        let img = small_board();
        let mut found = find_candidates(&img, 0, &CornerParams::default());
        found.sort_by(|a, b| {
            (a.position.y.round(), a.position.x.round())
                .partial_cmp(&(b.position.y.round(), b.position.x.round()))
                .unwrap()
        });
        let d = (found[0].orientation - found[1].orientation).abs();
        assert!((d - std::f32::consts::FRAC_PI_2).abs() < 0.1, "{d}");
    }

    #[test]
    fn positions_scale_with_level() {
        let img = small_board();
        let at0 = find_candidates(&img, 0, &CornerParams::default());
        let at1 = find_candidates(&img, 1, &CornerParams::default());
        assert_eq!(at0.len(), at1.len());
        for (a, b) in at0.iter().zip(&at1) {
            assert!((level_to_full(a.position.x, 0) * 2.0 + 0.5 - b.position.x).abs() < 1e-9);
            assert_eq!(b.level, 1);
        }
    }

    #[test]
    fn flat_image_has_no_candidates() {
        let img = GrayImage::filled(64, 64, 128);
        assert!(find_candidates(&img, 0, &CornerParams::default()).is_empty());
        let tiny = GrayImage::filled(12, 12, 0);
        assert!(find_candidates(&tiny, 0, &CornerParams::default()).is_empty());
    }

    #[test]
    fn variance_window_must_fit() {
        let img = GrayImage::filled(20, 20, 0);
        let params = CornerParams::default();
        assert!(!high_variance(&img, 3, 10, &params));
        assert!(!high_variance(&img, 10, 10, &params));
    }
}
