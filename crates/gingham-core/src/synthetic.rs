//! Rendered calibration targets for tests, benchmarks and demos.
//!
//! Targets are drawn dark-on-light with 4x4 supersampling per pixel, so edges
//! are anti-aliased the way a camera would see them.

use crate::GrayImage;
use nalgebra::Point2;

/// Intensity of dark squares and dots.
pub const DARK: u8 = 20;
/// Intensity of light squares and the background.
pub const LIGHT: u8 = 230;

const SUPERSAMPLE: usize = 4;

/// Rigid placement of a target: `origin` in image pixels, rotation `angle`
/// (radians, image coordinates) about the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Placement {
    origin: Point2<f64>,
    angle: f64,
}

impl Placement {
    fn to_target(&self, x: f64, y: f64) -> (f64, f64) {
        let (s, c) = self.angle.sin_cos();
        let (dx, dy) = (x - self.origin.x, y - self.origin.y);
        (c * dx + s * dy, -s * dx + c * dy)
    }

    fn to_image(&self, u: f64, v: f64) -> Point2<f64> {
        let (s, c) = self.angle.sin_cos();
        Point2::new(self.origin.x + c * u - s * v, self.origin.y + s * u + c * v)
    }
}

fn render(
    width: usize,
    height: usize,
    placement: &Placement,
    dark: impl Fn(f64, f64) -> bool,
) -> GrayImage {
    let mut img = GrayImage::filled(width, height, LIGHT);
    let ss = SUPERSAMPLE as f64;
    for y in 0..height {
        for x in 0..width {
            let mut acc = 0u32;
            for sy in 0..SUPERSAMPLE {
                for sx in 0..SUPERSAMPLE {
                    let px = x as f64 - 0.5 + (sx as f64 + 0.5) / ss;
                    let py = y as f64 - 0.5 + (sy as f64 + 0.5) / ss;
                    let (u, v) = placement.to_target(px, py);
                    acc += u32::from(if dark(u, v) { DARK } else { LIGHT });
                }
            }
            let n = (SUPERSAMPLE * SUPERSAMPLE) as f64;
            img.set(x, y, (acc as f64 / n).round() as u8);
        }
    }
    img
}

/// A chessboard of `squares.0` columns by `squares.1` rows of squares with
/// its top-left corner at the origin. The top-left square is dark. When not
/// rotated, square edges pass through pixel centres at `origin + k * square`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChessboardTarget {
    placement: Placement,
    pub square: f64,
    pub squares: (usize, usize),
}

impl ChessboardTarget {
    pub fn new(origin: (f64, f64), square: f64, squares: (usize, usize)) -> Self {
        Self {
            placement: Placement {
                origin: Point2::new(origin.0, origin.1),
                angle: 0.0,
            },
            square,
            squares,
        }
    }

    /// Rotate the board about its top-left corner.
    pub fn rotated(mut self, angle: f64) -> Self {
        self.placement.angle = angle;
        self
    }

    /// Interior corners, row by row from the top-left one:
    /// `(squares.1 - 1)` rows of `(squares.0 - 1)` points.
    pub fn interior_corners(&self) -> Vec<Point2<f64>> {
        let (cols, rows) = self.squares;
        (1..rows)
            .flat_map(|j| (1..cols).map(move |i| (i, j)))
            .map(|(i, j)| {
                self.placement
                    .to_image(i as f64 * self.square, j as f64 * self.square)
            })
            .collect()
    }

    pub fn render(&self, width: usize, height: usize) -> GrayImage {
        let (cols, rows) = (self.squares.0 as f64, self.squares.1 as f64);
        render(width, height, &self.placement, |u, v| {
            let (i, j) = ((u / self.square).floor(), (v / self.square).floor());
            let on_board = i >= 0.0 && j >= 0.0 && i < cols && j < rows;
            on_board && (i as i64 + j as i64) % 2 == 0
        })
    }
}

/// A grid of `grid.0` columns by `grid.1` rows of dark dots, centres
/// `spacing` apart, the first centre at the origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DotGridTarget {
    placement: Placement,
    pub spacing: f64,
    pub diameter: f64,
    pub grid: (usize, usize),
}

impl DotGridTarget {
    pub fn new(origin: (f64, f64), spacing: f64, diameter: f64, grid: (usize, usize)) -> Self {
        Self {
            placement: Placement {
                origin: Point2::new(origin.0, origin.1),
                angle: 0.0,
            },
            spacing,
            diameter,
            grid,
        }
    }

    pub fn rotated(mut self, angle: f64) -> Self {
        self.placement.angle = angle;
        self
    }

    /// Dot centres, row by row.
    pub fn centers(&self) -> Vec<Point2<f64>> {
        let (cols, rows) = self.grid;
        (0..rows)
            .flat_map(|j| (0..cols).map(move |i| (i, j)))
            .map(|(i, j)| {
                self.placement
                    .to_image(i as f64 * self.spacing, j as f64 * self.spacing)
            })
            .collect()
    }

    pub fn render(&self, width: usize, height: usize) -> GrayImage {
        let (cols, rows) = (self.grid.0 as f64, self.grid.1 as f64);
        let r2 = (self.diameter / 2.0).powi(2);
        render(width, height, &self.placement, |u, v| {
            let (i, j) = ((u / self.spacing).round(), (v / self.spacing).round());
            if i < 0.0 || j < 0.0 || i >= cols || j >= rows {
                return false;
            }
            let (du, dv) = (u - i * self.spacing, v - j * self.spacing);
            du * du + dv * dv <= r2
        })
    }
}
