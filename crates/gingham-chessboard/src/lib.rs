//! Chessboard grid detection on grayscale images.
//!
//! Pipeline, per pyramid level (coarsest first):
//! 1. ChESS response (16-sample ring of radius 5).
//! 2. Corner candidates from connected components of strong responses.
//! 3. Neighbour graph from orientation and spacing consistency.
//! 4. Integer grid coordinates per component and a homography-checked
//!    board window.
//! 5. Coarse-to-fine refinement of the board corners down to level 0.
//!
//! Circle grids ([`Pattern::CircleGrid`]) skip the pyramid: dark blob centres
//! of the full-resolution image go through steps 3 and 4 with a graph that
//! only checks spacing and edge direction.
//!
//! ```
//! use gingham_chessboard::{ChessboardDetector, DetectorConfig};
//! use gingham_core::GrayImage;
//!
//! let detector = ChessboardDetector::new(DetectorConfig::default()).unwrap();
//! let image = GrayImage::filled(64, 48, 0);
//! assert!(detector.detect(&image).unwrap().is_none());
//! ```

mod blobs;
mod candidates;
mod detector;
mod error;
mod geom;
mod grid;
mod gridgraph;
mod params;
mod refine;
mod response;

pub use blobs::{blob_candidates, dominant_axis, find_blobs, Blob};
pub use candidates::{find_candidates, Candidate};
pub use detector::{ChessboardDetection, ChessboardDetector};
pub use error::ChessboardError;
pub use grid::{assign_grid_coordinates, canonical_order, extract_board, BoardFit};
pub use gridgraph::{connected_components, GridGraph, NeighborSlot, NodeNeighbor};
pub use params::{
    BlobParams, CornerParams, DetectorConfig, GridGraphParams, GridParams, GridSize, Pattern,
    RefineParams, MAX_PYRAMID_LEVEL,
};
pub use refine::refine_corners;
pub use response::{chess_response, ring_orientation, ResponseMap, RING5, RING_RADIUS};
