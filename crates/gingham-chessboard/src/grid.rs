//! Integer grid coordinates for graph components, board extraction and the
//! canonical output order.

use crate::candidates::Candidate;
use crate::geom::{angle_to_unit, perp};
use crate::gridgraph::GridGraph;
use crate::params::{GridParams, GridSize};
use gingham_core::{estimate_homography_rect_to_img, reprojection_errors};
use nalgebra::{Point2, Vector2};
use std::collections::{HashMap, VecDeque};
use std::f32::consts::FRAC_PI_4;

/// A board extracted from a component.
#[derive(Clone, Debug, PartialEq)]
pub struct BoardFit {
    /// Candidate indices, `rows` rows of `cols` each, in output order.
    pub indices: Vec<usize>,
    /// Maximal reprojection error of the grid homography, in pixels.
    pub max_error: f64,
    /// Median distance between adjacent corners, in pixels.
    pub spacing: f64,
}

impl BoardFit {
    fn relative_error(&self) -> f64 {
        self.max_error / self.spacing
    }
}

fn to_vec(c: &Candidate) -> Vector2<f32> {
    Vector2::new(c.position.x as f32, c.position.y as f32)
}

/// BFS over one component, assigning `(i, j)` to each reachable node.
///
/// Every edge is projected onto the grid axes carried along from its source
/// node, so the frame follows perspective and lens distortion. A node whose
/// target cell is already taken is left out.
pub fn assign_grid_coordinates(
    graph: &GridGraph,
    candidates: &[Candidate],
    component: &[usize],
) -> HashMap<(i32, i32), usize> {
    let mut cells = HashMap::new();
    let Some(&start) = component
        .iter()
        .max_by_key(|&&n| (graph.neighbors[n].len(), std::cmp::Reverse(n)))
    else {
        return cells;
    };

    let mut placed = vec![false; graph.neighbors.len()];
    let u0 = angle_to_unit(candidates[start].orientation - FRAC_PI_4);
    let mut queue = VecDeque::new();
    queue.push_back((start, 0i32, 0i32, u0, perp(u0)));
    placed[start] = true;
    cells.insert((0, 0), start);

    while let Some((node, i, j, u, v)) = queue.pop_front() {
        let p = to_vec(&candidates[node]);
        for neighbor in &graph.neighbors[node] {
            let n = neighbor.index;
            if placed[n] {
                continue;
            }
            let e = to_vec(&candidates[n]) - p;
            let len = e.norm();
            if len <= f32::EPSILON {
                continue;
            }
            let dir = e / len;
            let (a, b) = (dir.dot(&u), dir.dot(&v));

            let (cell, nu, nv) = if a.abs() >= b.abs() {
                let s = a.signum();
                let nu = dir * s;
                ((i + s as i32, j), nu, perp(nu))
            } else {
                let s = b.signum();
                let nv = dir * s;
                ((i, j + s as i32), Vector2::new(nv.y, -nv.x), nv)
            };

            if cells.contains_key(&cell) {
                continue;
            }
            cells.insert(cell, n);
            placed[n] = true;
            queue.push_back((n, cell.0, cell.1, nu, nv));
        }
    }

    cells
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Some(values[values.len() / 2])
}

/// Fit a `w x h` window whose top-left cell is `(i0, j0)`. Returns the
/// candidate indices, row-major with `h` rows.
fn fit_window(
    cells: &HashMap<(i32, i32), usize>,
    candidates: &[Candidate],
    origin: (i32, i32),
    w: usize,
    h: usize,
) -> Option<BoardFit> {
    let mut indices = Vec::with_capacity(w * h);
    for j in 0..h as i32 {
        for i in 0..w as i32 {
            indices.push(*cells.get(&(origin.0 + i, origin.1 + j))?);
        }
    }

    let rect: Vec<Point2<f32>> = (0..h)
        .flat_map(|j| (0..w).map(move |i| Point2::new(i as f32, j as f32)))
        .collect();
    let img: Vec<Point2<f32>> = indices
        .iter()
        .map(|&k| {
            let p = candidates[k].position;
            Point2::new(p.x as f32, p.y as f32)
        })
        .collect();

    let h_mat = estimate_homography_rect_to_img(&rect, &img)?;
    let errors = reprojection_errors(&h_mat, &rect, &img)?;
    let max_error = errors.iter().copied().fold(0.0f32, f32::max) as f64;

    let pos = |r: usize, c: usize| candidates[indices[r * w + c]].position;
    let mut gaps = Vec::with_capacity(2 * w * h);
    for r in 0..h {
        for c in 0..w {
            if c + 1 < w {
                gaps.push((pos(r, c + 1) - pos(r, c)).norm());
            }
            if r + 1 < h {
                gaps.push((pos(r + 1, c) - pos(r, c)).norm());
            }
        }
    }
    let spacing = median(gaps)?;
    if !max_error.is_finite() || spacing <= 0.0 {
        return None;
    }

    Some(BoardFit {
        indices,
        max_error,
        spacing,
    })
}

/// Transpose a row-major `rows x cols` index list.
fn transpose(indices: &[usize], rows: usize, cols: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(indices.len());
    for c in 0..cols {
        for r in 0..rows {
            out.push(indices[r * cols + c]);
        }
    }
    out
}

/// Reorder a `rows x cols` board so that the first point is the one closest
/// to the image origin (smallest `x + y`). When several layouts share that
/// first point, the one whose first row heads most to the right wins.
pub fn canonical_order(indices: &[usize], candidates: &[Candidate], size: GridSize) -> Vec<usize> {
    let rows = size.rows as usize;
    let cols = size.cols as usize;

    let mut layouts: Vec<Vec<usize>> = Vec::with_capacity(8);
    let mut bases = vec![indices.to_vec()];
    if size.is_square() {
        bases.push(transpose(indices, rows, cols));
    }
    for base in &bases {
        for flip_r in [false, true] {
            for flip_c in [false, true] {
                let mut layout = Vec::with_capacity(base.len());
                for r in 0..rows {
                    let rr = if flip_r { rows - 1 - r } else { r };
                    for c in 0..cols {
                        let cc = if flip_c { cols - 1 - c } else { c };
                        layout.push(base[rr * cols + cc]);
                    }
                }
                layouts.push(layout);
            }
        }
    }

    let key = |layout: &[usize]| {
        let first = candidates[layout[0]].position;
        let last = candidates[layout[cols - 1]].position;
        let d = last - first;
        let heading = d.x / d.norm().max(f64::EPSILON);
        (first.x + first.y, heading)
    };

    layouts
        .into_iter()
        .min_by(|a, b| {
            let (sa, ha) = key(a);
            let (sb, hb) = key(b);
            sa.total_cmp(&sb).then(hb.total_cmp(&ha))
        })
        .unwrap_or_else(|| indices.to_vec())
}

/// Find the best-fitting `size` board among the graph components.
///
/// Both board orientations are tried for non-square sizes. The result is in
/// canonical order.
pub fn extract_board(
    graph: &GridGraph,
    candidates: &[Candidate],
    components: &[Vec<usize>],
    size: GridSize,
    params: &GridParams,
) -> Option<BoardFit> {
    let rows = size.rows as usize;
    let cols = size.cols as usize;
    let mut shapes = vec![(cols, rows, false)];
    if !size.is_square() {
        shapes.push((rows, cols, true));
    }

    let mut best: Option<BoardFit> = None;
    for component in components.iter().filter(|c| c.len() >= size.count()) {
        let cells = assign_grid_coordinates(graph, candidates, component);
        if cells.len() < size.count() {
            continue;
        }
        let (mut imin, mut imax, mut jmin, mut jmax) = (i32::MAX, i32::MIN, i32::MAX, i32::MIN);
        for &(i, j) in cells.keys() {
            imin = imin.min(i);
            imax = imax.max(i);
            jmin = jmin.min(j);
            jmax = jmax.max(j);
        }

        for &(w, h, transposed) in &shapes {
            for j0 in jmin..=jmax - h as i32 + 1 {
                for i0 in imin..=imax - w as i32 + 1 {
                    let Some(mut fit) = fit_window(&cells, candidates, (i0, j0), w, h) else {
                        continue;
                    };
                    if fit.max_error >= params.max_residual_rel as f64 * fit.spacing {
                        log::trace!(
                            "window ({i0},{j0}) {w}x{h} rejected: error {:.2}px, spacing {:.2}px",
                            fit.max_error,
                            fit.spacing
                        );
                        continue;
                    }
                    if transposed {
                        fit.indices = transpose(&fit.indices, h, w);
                    }
                    if best
                        .as_ref()
                        .is_none_or(|b| fit.relative_error() < b.relative_error())
                    {
                        best = Some(fit);
                    }
                }
            }
        }
    }

    best.map(|mut fit| {
        fit.indices = canonical_order(&fit.indices, candidates, size);
        fit
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gridgraph::connected_components;
    use crate::params::GridGraphParams;
    use std::f32::consts::FRAC_PI_4;

    /// Grid corners rotated by `angle` about (100, 100).
    fn rotated_grid(cols: usize, rows: usize, spacing: f64, angle: f64) -> Vec<Candidate> {
        let (s, c) = angle.sin_cos();
        let mut out = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let (x, y) = (i as f64 * spacing, j as f64 * spacing);
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                } + angle as f32;
                out.push(Candidate {
                    position: Point2::new(100.0 + c * x - s * y, 100.0 + s * x + c * y),
                    orientation: orientation.rem_euclid(std::f32::consts::PI),
                    strength: 1000.0,
                    level: 0,
                });
            }
        }
        out
    }

    fn graph_params() -> GridGraphParams {
        GridGraphParams {
            min_spacing_pix: 5.0,
            max_spacing_pix: 30.0,
            ..Default::default()
        }
    }

    fn extract(candidates: &[Candidate], size: GridSize) -> Option<BoardFit> {
        let graph = GridGraph::new(candidates, &graph_params(), 0);
        let components = connected_components(&graph);
        extract_board(&graph, candidates, &components, size, &GridParams::default())
    }

    #[test]
    fn assigns_consistent_coordinates() {
        let candidates = rotated_grid(4, 3, 20.0, 0.3);
        let graph = GridGraph::new(&candidates, &graph_params(), 0);
        let components = connected_components(&graph);
        assert_eq!(components.len(), 1);

        let cells = assign_grid_coordinates(&graph, &candidates, &components[0]);
        assert_eq!(cells.len(), 12);
        let is: Vec<i32> = cells.keys().map(|k| k.0).collect();
        let js: Vec<i32> = cells.keys().map(|k| k.1).collect();
        let span_i = is.iter().max().unwrap() - is.iter().min().unwrap() + 1;
        let span_j = js.iter().max().unwrap() - js.iter().min().unwrap() + 1;
        assert_eq!(span_i * span_j, 12);
    }

    #[test]
    fn extracts_exact_board_in_row_major_order() {
        let candidates = rotated_grid(5, 4, 20.0, 0.0);
        let fit = extract(&candidates, GridSize { rows: 4, cols: 5 }).expect("board");
        assert_eq!(fit.indices, (0..20).collect::<Vec<_>>());
        assert!(fit.max_error < 1e-2);
        assert!((fit.spacing - 20.0).abs() < 1e-9);
    }

    #[test]
    fn upside_down_board_starts_at_top_left() {
        let candidates = rotated_grid(5, 4, 20.0, std::f64::consts::PI);
        let fit = extract(&candidates, GridSize { rows: 4, cols: 5 }).expect("board");
        let first = candidates[fit.indices[0]].position;
        let second = candidates[fit.indices[1]].position;
        assert!((first.x - 20.0).abs() < 1e-6 && (first.y - 40.0).abs() < 1e-6);
        assert!(second.x > first.x);
    }

    #[test]
    fn portrait_board_matches_landscape_size() {
        // 3 columns x 6 rows in the image, requested as 6 columns x 3 rows.
        let candidates = rotated_grid(3, 6, 20.0, 0.0);
        let fit = extract(&candidates, GridSize { rows: 3, cols: 6 }).expect("board");
        assert_eq!(fit.indices.len(), 18);
        let first = candidates[fit.indices[0]].position;
        assert!((first.x - 100.0).abs() < 1e-6 && (first.y - 100.0).abs() < 1e-6);
    }

    #[test]
    fn finds_sub_board_in_larger_component() {
        let candidates = rotated_grid(6, 6, 20.0, 0.1);
        let fit = extract(&candidates, GridSize::square(4)).expect("board");
        assert_eq!(fit.indices.len(), 16);
    }

    #[test]
    fn too_small_component_has_no_board() {
        let candidates = rotated_grid(3, 3, 20.0, 0.0);
        assert!(extract(&candidates, GridSize::square(4)).is_none());
    }

    #[test]
    fn square_board_prefers_rows_running_right() {
        let candidates = rotated_grid(3, 3, 20.0, 0.0);
        let natural: Vec<usize> = (0..9).collect();
        let t = transpose(&natural, 3, 3);
        let order = canonical_order(&t, &candidates, GridSize::square(3));
        assert_eq!(order, natural);
    }
}
