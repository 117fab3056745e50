//! Dark blob centres for circle-grid targets.
//!
//! The image is binarized at a ladder of thresholds. Every threshold yields
//! 8-connected dark components, filtered by area and elongation. Components
//! from different thresholds whose centres lie closer than
//! `min_dist_between_blobs` are merged, and a blob is kept once it was seen at
//! `min_repeatability` thresholds. Its centre is the mean of the merged
//! centroids.

use crate::candidates::Candidate;
use crate::params::BlobParams;
use gingham_core::GrayImage;
use kiddo::{KdTree, SquaredEuclidean};
use log::debug;
use nalgebra::Point2;
use std::f64::consts::{FRAC_PI_4, PI};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Blob {
    pub center: Point2<f64>,
    /// Radius of a disc with the blob's median area.
    pub radius: f64,
    /// Number of thresholds the blob was seen at.
    pub repeatability: usize,
}

/// Raw moments of one dark component.
#[derive(Clone, Copy, Debug, Default)]
struct Moments {
    n: usize,
    sx: f64,
    sy: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
    touches_border: bool,
}

impl Moments {
    fn add(&mut self, x: usize, y: usize, width: usize, height: usize) {
        let (fx, fy) = (x as f64, y as f64);
        self.n += 1;
        self.sx += fx;
        self.sy += fy;
        self.sxx += fx * fx;
        self.syy += fy * fy;
        self.sxy += fx * fy;
        if x == 0 || y == 0 || x + 1 == width || y + 1 == height {
            self.touches_border = true;
        }
    }

    fn centroid(&self) -> Point2<f64> {
        let n = self.n as f64;
        Point2::new(self.sx / n, self.sy / n)
    }

    /// Ratio of the minor to the major second moment, 1 for a disc.
    fn inertia_ratio(&self) -> f64 {
        let n = self.n as f64;
        let c = self.centroid();
        let a = self.sxx / n - c.x * c.x;
        let b = self.sxy / n - c.x * c.y;
        let d = self.syy / n - c.y * c.y;
        let root = ((a - d).powi(2) + 4.0 * b * b).sqrt();
        let major = (a + d + root) / 2.0;
        let minor = (a + d - root) / 2.0;
        if major <= f64::EPSILON {
            1.0
        } else {
            minor / major
        }
    }
}

/// 8-connected components of pixels `<= threshold`.
fn dark_components(img: &GrayImage, threshold: u8) -> Vec<Moments> {
    let (w, h) = (img.width, img.height);
    let mut seen = vec![false; w * h];
    let mut stack = Vec::new();
    let mut components = Vec::new();

    for start in 0..w * h {
        if seen[start] || img.data[start] > threshold {
            continue;
        }
        seen[start] = true;
        stack.push(start);
        let mut m = Moments::default();
        while let Some(p) = stack.pop() {
            let (x, y) = (p % w, p / w);
            m.add(x, y, w, h);
            for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                    let q = ny * w + nx;
                    if !seen[q] && img.data[q] <= threshold {
                        seen[q] = true;
                        stack.push(q);
                    }
                }
            }
        }
        components.push(m);
    }
    components
}

struct Group {
    centers: Vec<Point2<f64>>,
    areas: Vec<usize>,
}

impl Group {
    fn blob(&self) -> Blob {
        let n = self.centers.len() as f64;
        let sum = self
            .centers
            .iter()
            .fold(nalgebra::Vector2::zeros(), |acc, c| acc + c.coords);
        let mut areas = self.areas.clone();
        areas.sort_unstable();
        let median = areas[areas.len() / 2] as f64;
        Blob {
            center: Point2::from(sum / n),
            radius: (median / PI).sqrt(),
            repeatability: self.centers.len(),
        }
    }
}

/// Dark, roughly round blobs of `img`, sorted top to bottom, then left to right.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(img, params), fields(w = img.width, h = img.height))
)]
pub fn find_blobs(img: &GrayImage, params: &BlobParams) -> Vec<Blob> {
    if img.width == 0 || img.height == 0 || params.threshold_step == 0 {
        return Vec::new();
    }

    let mut groups: Vec<Group> = Vec::new();
    let mut threshold = params.min_threshold;
    while threshold < params.max_threshold {
        let mut accepted = 0usize;
        for m in dark_components(img, threshold) {
            if m.touches_border
                || m.n < params.min_area
                || m.n > params.max_area
                || m.inertia_ratio() < params.min_inertia_ratio
            {
                continue;
            }
            let c = m.centroid();
            // Rings and crescents have a light centre.
            if img.at(c.x.round() as usize, c.y.round() as usize) > threshold {
                continue;
            }
            accepted += 1;

            let nearest = groups
                .iter()
                .enumerate()
                .filter_map(|(k, g)| {
                    let last = g.centers.last()?;
                    Some((k, (*last - c).norm()))
                })
                .filter(|&(_, d)| d < params.min_dist_between_blobs)
                .min_by(|a, b| a.1.total_cmp(&b.1))
                .map(|(k, _)| k);
            match nearest {
                Some(k) => {
                    groups[k].centers.push(c);
                    groups[k].areas.push(m.n);
                }
                None => groups.push(Group {
                    centers: vec![c],
                    areas: vec![m.n],
                }),
            }
        }
        debug!("blob threshold {threshold}: {accepted} components");
        threshold = match threshold.checked_add(params.threshold_step) {
            Some(t) => t,
            None => break,
        };
    }

    let mut blobs: Vec<Blob> = groups
        .iter()
        .filter(|g| g.centers.len() >= params.min_repeatability)
        .map(Group::blob)
        .collect();
    blobs.sort_by(|a, b| {
        a.center
            .y
            .total_cmp(&b.center.y)
            .then(a.center.x.total_cmp(&b.center.x))
    });
    debug!("{} blobs from {} groups", blobs.len(), groups.len());
    blobs
}

/// Direction of the dominant grid axis in `(-π/4, π/4]`, from the
/// nearest-neighbour edges of `points`. `None` for fewer than two points or
/// when the edge directions cancel out.
pub fn dominant_axis(points: &[Point2<f64>]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let coords = points
        .iter()
        .map(|p| [p.x as f32, p.y as f32])
        .collect::<Vec<_>>();
    let tree: KdTree<f32, 2> = (&coords).into();

    // Grid edges repeat every quarter turn.
    let (mut c4, mut s4) = (0.0f64, 0.0f64);
    for (i, p) in points.iter().enumerate() {
        let nearest = tree
            .nearest_n::<SquaredEuclidean>(&coords[i], 2)
            .into_iter()
            .find(|nn| nn.item as usize != i);
        let Some(nn) = nearest else {
            continue;
        };
        let q = points[nn.item as usize];
        let phi = (q.y - p.y).atan2(q.x - p.x);
        c4 += (4.0 * phi).cos();
        s4 += (4.0 * phi).sin();
    }
    if c4.hypot(s4) <= 1e-9 * points.len() as f64 {
        return None;
    }
    Some(s4.atan2(c4) / 4.0)
}

/// Blob centres as grid-graph candidates sharing the diagonal of the
/// dominant axis as orientation.
pub fn blob_candidates(blobs: &[Blob]) -> Option<Vec<Candidate>> {
    let centers: Vec<Point2<f64>> = blobs.iter().map(|b| b.center).collect();
    let axis = dominant_axis(&centers)?;
    let orientation = (axis + FRAC_PI_4).rem_euclid(PI) as f32;
    Some(
        blobs
            .iter()
            .map(|b| Candidate {
                position: b.center,
                orientation,
                strength: b.repeatability as f32,
                level: 0,
            })
            .collect(),
    )
}
