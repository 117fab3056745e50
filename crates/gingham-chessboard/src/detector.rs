use crate::blobs::{blob_candidates, find_blobs};
use crate::candidates::{find_candidates, fits_margin, Candidate};
use crate::error::ChessboardError;
use crate::grid::extract_board;
use crate::gridgraph::{connected_components, GridGraph};
use crate::params::{DetectorConfig, GridSize, Pattern};
use crate::refine::refine_corners;
use gingham_core::{DetectedCorner, GrayImage, PointWithRefinement, Pyramid};
use log::{debug, info};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// A detected board.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChessboardDetection {
    /// `grid.rows` rows of `grid.cols` corners.
    pub corners: Vec<DetectedCorner>,
    pub grid: GridSize,
    /// Pyramid level the grid was found at.
    pub level: u32,
    /// Maximal grid-fit reprojection error at detection time, full-res pixels.
    pub residual: f64,
}

impl ChessboardDetection {
    pub fn points(&self) -> Vec<PointWithRefinement> {
        self.corners.iter().map(PointWithRefinement::from).collect()
    }
}

/// Chessboard detector over a grayscale image pyramid. With
/// [`Pattern::CircleGrid`] it finds dot grids on the full-resolution image
/// instead.
#[derive(Clone, Debug, Default)]
pub struct ChessboardDetector {
    pub config: DetectorConfig,
}

impl ChessboardDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, ChessboardError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Levels to try, coarsest first.
    fn levels(&self) -> Vec<u32> {
        match self.config.pyramid_level {
            Some(level) => vec![level],
            None => (0..=self.config.max_pyramid_level).rev().collect(),
        }
    }

    /// Find the board in `image`. `Ok(None)` means no board was found.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(w = image.width, h = image.height))
    )]
    pub fn detect(&self, image: &GrayImage) -> Result<Option<ChessboardDetection>, ChessboardError> {
        self.config.validate()?;
        if self.config.pattern == Pattern::CircleGrid {
            return Ok(self.detect_circle_grid(image));
        }
        let levels = self.levels();
        let top = levels.iter().copied().max().unwrap_or(0);
        let pyramid = Pyramid::build(image, top);

        for level in levels {
            let Some(img) = pyramid.level(level) else {
                debug!("level {level}: image too small for this pyramid level");
                continue;
            };
            if !fits_margin(img.width, img.height, &self.config.corners) {
                debug!("level {level}: {}x{} is inside the working margin", img.width, img.height);
                continue;
            }

            if let Some(mut detection) = self.detect_at_level(img, level) {
                if self.config.refine.enabled && level > 0 {
                    refine_corners(
                        &pyramid,
                        &mut detection.corners,
                        detection.grid,
                        &self.config.refine,
                        &self.config.corners,
                    );
                }
                info!(
                    "found {}x{} board at level {} (residual {:.3}px)",
                    detection.grid.rows, detection.grid.cols, level, detection.residual
                );
                return Ok(Some(detection));
            }
        }

        info!("no {}x{} board found", self.config.grid.rows, self.config.grid.cols);
        Ok(None)
    }

    /// Candidates, graph and board extraction on one pyramid image.
    pub fn detect_at_level(&self, img: &GrayImage, level: u32) -> Option<ChessboardDetection> {
        let candidates: Vec<Candidate> = find_candidates(img, level, &self.config.corners);
        let grid = self.config.grid;
        if candidates.len() < grid.count() {
            debug!(
                "level {level}: {} candidates, need {}",
                candidates.len(),
                grid.count()
            );
            return None;
        }

        let graph = GridGraph::new(&candidates, &self.config.graph, level);
        let components = connected_components(&graph);
        debug!(
            "level {level}: {} components, largest {}",
            components.len(),
            components.iter().map(Vec::len).max().unwrap_or(0)
        );

        let fit = extract_board(&graph, &candidates, &components, grid, &self.config.fit)?;
        Some(ChessboardDetection {
            corners: fit
                .indices
                .iter()
                .map(|&k| DetectedCorner::raw(candidates[k].position, level))
                .collect(),
            grid,
            level,
            residual: fit.max_error,
        })
    }

    /// Dot centres linked by spacing and edge direction, then the same board
    /// extraction as for corners. Points are never refined.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(w = image.width, h = image.height))
    )]
    pub fn detect_circle_grid(&self, image: &GrayImage) -> Option<ChessboardDetection> {
        let grid = self.config.grid;
        let blobs = find_blobs(image, &self.config.blobs);
        if blobs.len() < grid.count() {
            info!(
                "{} blobs, need {} for a {}x{} grid",
                blobs.len(),
                grid.count(),
                grid.rows,
                grid.cols
            );
            return None;
        }
        let candidates = blob_candidates(&blobs)?;

        let graph = GridGraph::spacing_only(&candidates, &self.config.graph, 0);
        let components = connected_components(&graph);
        debug!(
            "{} blob components, largest {}",
            components.len(),
            components.iter().map(Vec::len).max().unwrap_or(0)
        );

        let Some(fit) = extract_board(&graph, &candidates, &components, grid, &self.config.fit)
        else {
            info!("no {}x{} circle grid found", grid.rows, grid.cols);
            return None;
        };
        info!(
            "found {}x{} circle grid (residual {:.3}px)",
            grid.rows, grid.cols, fit.max_error
        );
        Some(ChessboardDetection {
            corners: fit
                .indices
                .iter()
                .map(|&k| DetectedCorner::raw(candidates[k].position, 0))
                .collect(),
            grid,
            level: 0,
            residual: fit.max_error,
        })
    }
}
