//! Coarse-to-fine re-measurement of board corners.
//!
//! A board found at pyramid level `L` is only as precise as that level. Each
//! corner is measured again at `L-1, ..., 0`: the ChESS response is computed
//! on a patch around the predicted position and the strongest response near
//! the prediction seeds the same component follow used for detection.

use crate::candidates::{fits_margin, follow_component};
use crate::params::{CornerParams, GridSize, RefineParams};
use crate::response::chess_response;
use gingham_core::{full_to_level, level_to_full, DetectedCorner, Pyramid};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Distance from each corner to its nearest grid neighbour, full resolution.
fn local_spacing(corners: &[DetectedCorner], size: GridSize) -> Vec<f64> {
    let rows = size.rows as usize;
    let cols = size.cols as usize;
    let mut out = Vec::with_capacity(corners.len());
    for r in 0..rows {
        for c in 0..cols {
            let p = corners[r * cols + c].position;
            let mut best = f64::INFINITY;
            let mut consider = |rr: usize, cc: usize| {
                best = best.min((corners[rr * cols + cc].position - p).norm());
            };
            if r > 0 {
                consider(r - 1, c);
            }
            if r + 1 < rows {
                consider(r + 1, c);
            }
            if c > 0 {
                consider(r, c - 1);
            }
            if c + 1 < cols {
                consider(r, c + 1);
            }
            out.push(best);
        }
    }
    out
}

/// Measure one corner at `level`. Returns the new full-resolution position.
fn measure_at_level(
    pyramid: &Pyramid,
    level: u32,
    full: Point2<f64>,
    radius: f64,
    corner_params: &CornerParams,
) -> Option<Point2<f64>> {
    let img = pyramid.level(level)?;
    let pred = Point2::new(full_to_level(full.x, level), full_to_level(full.y, level));

    let half = radius.ceil() as i64 + corner_params.margin as i64 + 2;
    let (patch, origin) = img.crop(
        pred.x.round() as i64 - half,
        pred.y.round() as i64 - half,
        (2 * half + 1) as usize,
        (2 * half + 1) as usize,
    );
    if !fits_margin(patch.width, patch.height, corner_params) {
        return None;
    }
    let local = Point2::new(pred.x - origin[0] as f64, pred.y - origin[1] as f64);

    let mut response = chess_response(&patch);
    response.clamp_negative();

    let m = corner_params.margin;
    let mut seed = None;
    let mut strongest = corner_params.response_threshold;
    for y in m..patch.height - m {
        for x in m..patch.width - m {
            let d2 = (x as f64 - local.x).powi(2) + (y as f64 - local.y).powi(2);
            if d2 > radius * radius {
                continue;
            }
            let r = response.at(x, y);
            if r > strongest {
                strongest = r;
                seed = Some((x, y));
            }
        }
    }

    let component = follow_component(&mut response, &patch, seed?, corner_params)?;
    let c = component.centroid();
    if (c - local).norm() > radius {
        return None;
    }
    Some(Point2::new(
        level_to_full(c.x + origin[0] as f64, level),
        level_to_full(c.y + origin[1] as f64, level),
    ))
}

/// Refine `corners` (row-major `size` board) in place.
///
/// Each corner descends from its current level towards 0 and stops at the
/// first level where no acceptable measurement is found.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(pyramid, corners, params, corner_params), fields(n = corners.len()))
)]
pub fn refine_corners(
    pyramid: &Pyramid,
    corners: &mut [DetectedCorner],
    size: GridSize,
    params: &RefineParams,
    corner_params: &CornerParams,
) {
    if corners.len() != size.count() {
        log::warn!(
            "refinement skipped: {} corners for a {}x{} board",
            corners.len(),
            size.rows,
            size.cols
        );
        return;
    }
    let spacing = local_spacing(corners, size);

    let mut passes = 0usize;
    for (corner, &spacing_full) in corners.iter_mut().zip(&spacing) {
        for level in (0..corner.level).rev() {
            let scale = (1u64 << level) as f64;
            let radius = (params.search_radius_rel as f64 * spacing_full / scale)
                .max(params.min_search_radius_pix as f64);
            let Some(position) =
                measure_at_level(pyramid, level, corner.position, radius, corner_params)
            else {
                break;
            };
            corner.position = position;
            corner.level = level;
            corner.refinement_passes += 1;
            passes += 1;
        }
    }
    log::debug!("refinement accepted {passes} passes over {} corners", corners.len());
}
