use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One detected chessboard-grid intersection, in full-resolution pixels.
///
/// `refinement_level` counts the refinement passes applied to the point;
/// `0` is the raw detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointWithRefinement {
    pub x: f64,
    pub y: f64,
    pub refinement_level: i32,
}

/// A grid corner together with where its position was last measured.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedCorner {
    /// Full-resolution position.
    pub position: Point2<f64>,
    /// Pyramid level of the final measurement.
    pub level: u32,
    /// Number of accepted refinement passes.
    pub refinement_passes: u32,
}

impl DetectedCorner {
    pub fn raw(position: Point2<f64>, level: u32) -> Self {
        Self {
            position,
            level,
            refinement_passes: 0,
        }
    }
}

impl From<&DetectedCorner> for PointWithRefinement {
    fn from(c: &DetectedCorner) -> Self {
        Self {
            x: c.position.x,
            y: c.position.y,
            refinement_level: c.refinement_passes as i32,
        }
    }
}
