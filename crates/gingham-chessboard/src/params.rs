use crate::error::ChessboardError;
use serde::{Deserialize, Serialize};

/// Highest pyramid level that can be requested explicitly.
pub const MAX_PYRAMID_LEVEL: u32 = 10;

/// Number of interior corners of the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub rows: u32,
    pub cols: u32,
}

impl GridSize {
    pub fn new(rows: u32, cols: u32) -> Result<Self, ChessboardError> {
        let size = Self { rows, cols };
        size.validate()?;
        Ok(size)
    }

    pub fn square(n: u32) -> Self {
        Self { rows: n, cols: n }
    }

    pub fn count(&self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub fn is_square(&self) -> bool {
        self.rows == self.cols
    }

    pub fn validate(&self) -> Result<(), ChessboardError> {
        if self.rows < 2 || self.cols < 2 {
            return Err(ChessboardError::InvalidGridSize {
                rows: self.rows,
                cols: self.cols,
            });
        }
        Ok(())
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::square(7)
    }
}

/// Kind of calibration target to look for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    /// Chessboard; the grid points are the interior corners.
    #[default]
    Chessboard,
    /// Dark dots on a light background; the grid points are the dot centres.
    CircleGrid,
}

/// Thresholds for turning the ChESS response into corner candidates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CornerParams {
    /// Minimal response for a pixel to join a component.
    pub response_threshold: i16,
    /// Minimal peak response of an accepted component.
    pub peak_threshold: i16,
    /// Components touching this border are rejected.
    pub margin: usize,
    /// Half-size of the window used by the flatness check.
    pub variance_window_radius: usize,
    /// Minimal intensity standard deviation around the peak.
    pub stdev_threshold: i32,
}

impl Default for CornerParams {
    fn default() -> Self {
        Self {
            response_threshold: 20,
            peak_threshold: 200,
            margin: 7,
            variance_window_radius: 5,
            stdev_threshold: 25,
        }
    }
}

/// Neighbour search between candidates. Spacings are in pixels of the
/// pyramid level the candidates came from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridGraphParams {
    pub min_spacing_pix: f32,
    pub max_spacing_pix: f32,
    pub k_neighbors: usize,
    pub orientation_tolerance_deg: f32,
}

impl Default for GridGraphParams {
    fn default() -> Self {
        Self {
            min_spacing_pix: 6.0,
            max_spacing_pix: 150.0,
            k_neighbors: 8,
            orientation_tolerance_deg: 22.5,
        }
    }
}

/// Dark blob detection for circle grids. Thresholds and areas are in
/// full-resolution intensity levels and pixels.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlobParams {
    pub min_threshold: u8,
    /// Exclusive.
    pub max_threshold: u8,
    pub threshold_step: u8,
    /// Number of thresholds a blob must be seen at.
    pub min_repeatability: usize,
    pub min_area: usize,
    pub max_area: usize,
    /// Minor over major second moment; 1 for a disc.
    pub min_inertia_ratio: f64,
    /// Centres closer than this at different thresholds are the same blob.
    pub min_dist_between_blobs: f64,
}

impl Default for BlobParams {
    fn default() -> Self {
        Self {
            min_threshold: 50,
            max_threshold: 220,
            threshold_step: 10,
            min_repeatability: 2,
            min_area: 40,
            max_area: 80000,
            min_inertia_ratio: 0.1,
            min_dist_between_blobs: 15.0,
        }
    }
}

impl BlobParams {
    pub fn validate(&self) -> Result<(), ChessboardError> {
        if self.threshold_step == 0 || self.min_threshold >= self.max_threshold {
            return Err(ChessboardError::InvalidParams(format!(
                "blob thresholds [{}, {}) step {}",
                self.min_threshold, self.max_threshold, self.threshold_step
            )));
        }
        if self.min_area == 0 || self.min_area > self.max_area {
            return Err(ChessboardError::InvalidParams(format!(
                "blob area [{}, {}]",
                self.min_area, self.max_area
            )));
        }
        if self.min_repeatability == 0 {
            return Err(ChessboardError::InvalidParams(
                "min_repeatability must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Acceptance of a fitted board.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GridParams {
    /// Maximal reprojection error of the grid homography, relative to the
    /// median corner spacing.
    pub max_residual_rel: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            max_residual_rel: 0.3,
        }
    }
}

/// Coarse-to-fine re-measurement of board corners.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RefineParams {
    pub enabled: bool,
    /// Search radius as a fraction of the local corner spacing.
    pub search_radius_rel: f32,
    /// Lower bound on the search radius, in level pixels.
    pub min_search_radius_pix: f32,
}

impl Default for RefineParams {
    fn default() -> Self {
        Self {
            enabled: true,
            search_radius_rel: 0.25,
            min_search_radius_pix: 2.0,
        }
    }
}

/// Everything the chessboard detector needs.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub pattern: Pattern,
    pub grid: GridSize,
    /// Detect at this pyramid level only; `None` searches from
    /// `max_pyramid_level` down to 0.
    pub pyramid_level: Option<u32>,
    pub max_pyramid_level: u32,
    pub corners: CornerParams,
    pub graph: GridGraphParams,
    pub fit: GridParams,
    pub refine: RefineParams,
    pub blobs: BlobParams,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            pattern: Pattern::default(),
            grid: GridSize::default(),
            pyramid_level: None,
            max_pyramid_level: 3,
            corners: CornerParams::default(),
            graph: GridGraphParams::default(),
            fit: GridParams::default(),
            refine: RefineParams::default(),
            blobs: BlobParams::default(),
        }
    }
}

impl DetectorConfig {
    pub fn validate(&self) -> Result<(), ChessboardError> {
        self.grid.validate()?;
        if let Some(level) = self.pyramid_level {
            if level > MAX_PYRAMID_LEVEL {
                return Err(ChessboardError::InvalidPyramidLevel(level));
            }
        }
        if self.max_pyramid_level > MAX_PYRAMID_LEVEL {
            return Err(ChessboardError::InvalidPyramidLevel(self.max_pyramid_level));
        }
        if self.pattern == Pattern::CircleGrid {
            if let Some(level) = self.pyramid_level.filter(|&l| l > 0) {
                return Err(ChessboardError::LevelNotSupported(level));
            }
            self.blobs.validate()?;
        }
        if !(self.graph.min_spacing_pix > 0.0 && self.graph.min_spacing_pix < self.graph.max_spacing_pix)
        {
            return Err(ChessboardError::InvalidParams(format!(
                "spacing window [{}, {}]",
                self.graph.min_spacing_pix, self.graph.max_spacing_pix
            )));
        }
        if self.graph.k_neighbors < 2 {
            return Err(ChessboardError::InvalidParams(
                "k_neighbors must be at least 2".to_string(),
            ));
        }
        if self.fit.max_residual_rel <= 0.0 {
            return Err(ChessboardError::InvalidParams(
                "max_residual_rel must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_board_is_seven_by_seven() {
        let cfg = DetectorConfig::default();
        assert_eq!(cfg.grid, GridSize::square(7));
        assert_eq!(cfg.grid.count(), 49);
        assert_eq!(cfg.pattern, Pattern::Chessboard);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn circle_grid_is_searched_at_full_resolution_only() {
        let mut cfg: DetectorConfig =
            serde_json::from_str(r#"{"pattern":"circle_grid"}"#).unwrap();
        assert_eq!(cfg.pattern, Pattern::CircleGrid);
        assert_eq!(cfg.blobs, BlobParams::default());
        assert!(cfg.validate().is_ok());

        cfg.pyramid_level = Some(0);
        assert!(cfg.validate().is_ok());
        cfg.pyramid_level = Some(2);
        assert_eq!(cfg.validate(), Err(ChessboardError::LevelNotSupported(2)));

        cfg.pyramid_level = None;
        cfg.blobs.threshold_step = 0;
        assert!(matches!(cfg.validate(), Err(ChessboardError::InvalidParams(_))));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: DetectorConfig =
            serde_json::from_str(r#"{"grid":{"rows":6,"cols":9},"refine":{"enabled":false}}"#)
                .unwrap();
        assert_eq!(cfg.grid, GridSize { rows: 6, cols: 9 });
        assert!(!cfg.refine.enabled);
        assert_eq!(cfg.refine.search_radius_rel, 0.25);
        assert_eq!(cfg.corners, CornerParams::default());
        assert_eq!(cfg.max_pyramid_level, 3);
    }

    #[test]
    fn rejects_out_of_range_level_and_tiny_grid() {
        let cfg = DetectorConfig {
            pyramid_level: Some(11),
            ..Default::default()
        };
        assert_eq!(cfg.validate(), Err(ChessboardError::InvalidPyramidLevel(11)));
        assert!(GridSize::new(1, 5).is_err());
        assert!(GridSize::new(2, 5).is_ok());
    }
}
