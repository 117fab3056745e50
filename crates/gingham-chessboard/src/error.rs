#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ChessboardError {
    #[error("pyramid level {0} is out of range (expected 0..=10)")]
    InvalidPyramidLevel(u32),

    #[error("invalid grid size {rows}x{cols} (need at least 2x2 interior corners)")]
    InvalidGridSize { rows: u32, cols: u32 },

    #[error("circle grids are detected at pyramid level 0 only (got {0})")]
    LevelNotSupported(u32),

    #[error("invalid detector parameter: {0}")]
    InvalidParams(String),
}
