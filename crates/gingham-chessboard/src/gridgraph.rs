use crate::candidates::Candidate;
use crate::geom::{angle_diff_abs, angle_to_unit, axis_vec_diff, is_orthogonal};
use crate::params::GridGraphParams;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;
use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

/// Half-axis of the local grid frame of a corner. The frame is rotated 45°
/// from the corner orientation: `U` at `θ - π/4`, `V` at `θ + π/4`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborSlot {
    PlusU,
    MinusU,
    PlusV,
    MinusV,
}

impl NeighborSlot {
    fn index(self) -> usize {
        match self {
            NeighborSlot::PlusU => 0,
            NeighborSlot::MinusU => 1,
            NeighborSlot::PlusV => 2,
            NeighborSlot::MinusV => 3,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NodeNeighbor {
    pub slot: NeighborSlot,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

fn slot_for(orientation: f32, edge: &Vector2<f32>) -> NeighborSlot {
    let du = edge.dot(&angle_to_unit(orientation - FRAC_PI_4));
    let dv = edge.dot(&angle_to_unit(orientation + FRAC_PI_4));
    if du.abs() >= dv.abs() {
        if du >= 0.0 {
            NeighborSlot::PlusU
        } else {
            NeighborSlot::MinusU
        }
    } else if dv >= 0.0 {
        NeighborSlot::PlusV
    } else {
        NeighborSlot::MinusV
    }
}

fn is_good_neighbor(
    corner: &Candidate,
    neighbor: &Candidate,
    neighbor_index: usize,
    params: &GridGraphParams,
    scale: f32,
) -> Option<NodeNeighbor> {
    let tol = params.orientation_tolerance_deg.to_radians();

    // Adjacent corners see the bright diagonal swapped.
    if !is_orthogonal(corner.orientation, neighbor.orientation, tol) {
        return None;
    }

    let edge = Vector2::new(
        (neighbor.position.x - corner.position.x) as f32,
        (neighbor.position.y - corner.position.y) as f32,
    );
    let distance = edge.norm();
    if distance < params.min_spacing_pix * scale || distance > params.max_spacing_pix * scale {
        return None;
    }

    // The edge runs along a grid axis, 45° from both diagonals.
    let edge_angle = edge.y.atan2(edge.x);
    let score_corner = (axis_vec_diff(corner.orientation, edge_angle) - FRAC_PI_4).abs();
    let score_neighbor = (axis_vec_diff(neighbor.orientation, edge_angle) - FRAC_PI_4).abs();
    if score_corner > tol || score_neighbor > tol {
        return None;
    }

    let score_orientation =
        (FRAC_PI_2 - angle_diff_abs(corner.orientation, neighbor.orientation)).abs();

    Some(NodeNeighbor {
        slot: slot_for(corner.orientation, &edge),
        index: neighbor_index,
        distance,
        score: score_corner + score_neighbor + score_orientation,
    })
}

type NeighborCheck =
    fn(&Candidate, &Candidate, usize, &GridGraphParams, f32) -> Option<NodeNeighbor>;

fn is_spacing_neighbor(
    point: &Candidate,
    neighbor: &Candidate,
    neighbor_index: usize,
    params: &GridGraphParams,
    scale: f32,
) -> Option<NodeNeighbor> {
    let tol = params.orientation_tolerance_deg.to_radians();
    let edge = Vector2::new(
        (neighbor.position.x - point.position.x) as f32,
        (neighbor.position.y - point.position.y) as f32,
    );
    let distance = edge.norm();
    if distance < params.min_spacing_pix * scale || distance > params.max_spacing_pix * scale {
        return None;
    }

    let edge_angle = edge.y.atan2(edge.x);
    if (axis_vec_diff(point.orientation, edge_angle) - FRAC_PI_4).abs() > tol {
        return None;
    }

    // Points further along the same axis pass the direction gate too; the
    // closest one wins its slot.
    Some(NodeNeighbor {
        slot: slot_for(point.orientation, &edge),
        index: neighbor_index,
        distance,
        score: distance,
    })
}

/// Keep at most one neighbor per slot, choosing the lowest-score candidate
/// and then the closest one.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates {
        let slot = &mut best[candidate.slot.index()];
        let replace = match slot {
            None => true,
            Some(current) => {
                candidate.score < current.score
                    || (candidate.score == current.score && candidate.distance < current.distance)
            }
        };
        if replace {
            *slot = Some(candidate);
        }
    }

    best.into_iter().flatten().collect()
}

/// 4-connected neighbour graph over corner candidates. Edges are mutual:
/// `j` is listed for `i` only if `i` also selected `j`.
pub struct GridGraph {
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

impl GridGraph {
    /// Graph over ChESS corners. `level` scales the spacing window to
    /// full-resolution pixels.
    pub fn new(candidates: &[Candidate], params: &GridGraphParams, level: u32) -> Self {
        Self::build(candidates, params, level, is_good_neighbor)
    }

    /// Graph over featureless points such as dot centres. Every candidate
    /// carries the same orientation, the diagonal of the grid axes, so only
    /// spacing and edge direction are checked.
    pub fn spacing_only(candidates: &[Candidate], params: &GridGraphParams, level: u32) -> Self {
        Self::build(candidates, params, level, is_spacing_neighbor)
    }

    fn build(
        candidates: &[Candidate],
        params: &GridGraphParams,
        level: u32,
        accept: NeighborCheck,
    ) -> Self {
        if candidates.is_empty() {
            return Self {
                neighbors: Vec::new(),
            };
        }
        let scale = (1u64 << level) as f32;
        let coords = candidates
            .iter()
            .map(|c| [c.position.x as f32, c.position.y as f32])
            .collect::<Vec<_>>();
        let tree: KdTree<f32, 2> = (&coords).into();

        let mut neighbors = Vec::with_capacity(candidates.len());
        for (i, corner) in candidates.iter().enumerate() {
            let mut node_neighbors = Vec::new();
            let results = tree.nearest_n::<SquaredEuclidean>(&coords[i], params.k_neighbors);
            for nn in results {
                let neighbor_index = nn.item as usize;
                if neighbor_index == i {
                    continue;
                }
                if let Some(entry) = accept(
                    corner,
                    &candidates[neighbor_index],
                    neighbor_index,
                    params,
                    scale,
                ) {
                    node_neighbors.push(entry);
                }
            }
            neighbors.push(select_neighbors(node_neighbors));
        }

        let selected: Vec<Vec<usize>> = neighbors
            .iter()
            .map(|ns| ns.iter().map(|n| n.index).collect())
            .collect();
        for (i, ns) in neighbors.iter_mut().enumerate() {
            ns.retain(|n| selected[n.index].contains(&i));
        }

        Self { neighbors }
    }
}

pub fn connected_components(graph: &GridGraph) -> Vec<Vec<usize>> {
    let mut visited = vec![false; graph.neighbors.len()];
    let mut components = Vec::new();

    for start in 0..graph.neighbors.len() {
        if visited[start] {
            continue;
        }

        let mut component = Vec::new();
        let mut stack = vec![start];

        while let Some(node) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            component.push(node);

            for neighbor in &graph.neighbors[node] {
                if !visited[neighbor.index] {
                    stack.push(neighbor.index);
                }
            }
        }

        components.push(component);
    }

    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use std::collections::HashMap;

    fn make_corner(x: f64, y: f64, orientation: f32) -> Candidate {
        Candidate {
            position: Point2::new(x, y),
            orientation,
            strength: 1000.0,
            level: 0,
        }
    }

    fn grid(cols: usize, rows: usize, spacing: f64) -> Vec<Candidate> {
        let mut corners = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                };
                corners.push(make_corner(i as f64 * spacing, j as f64 * spacing, orientation));
            }
        }
        corners
    }

    fn params(min: f32, max: f32, k: usize) -> GridGraphParams {
        GridGraphParams {
            min_spacing_pix: min,
            max_spacing_pix: max,
            k_neighbors: k,
            ..Default::default()
        }
    }

    fn slot_map(neighbors: &[NodeNeighbor]) -> HashMap<NeighborSlot, &NodeNeighbor> {
        neighbors.iter().map(|n| (n.slot, n)).collect()
    }

    #[test]
    fn finds_axis_neighbors_in_regular_grid() {
        let spacing = 10.0;
        let corners = grid(3, 3, spacing);
        let graph = GridGraph::new(&corners, &params(5.0, 15.0, 8), 0);
        let idx = |i: usize, j: usize| j * 3 + i;

        let center = slot_map(&graph.neighbors[idx(1, 1)]);
        assert_eq!(4, center.len());
        let mut found: Vec<usize> = center.values().map(|n| n.index).collect();
        found.sort_unstable();
        assert_eq!(found, vec![idx(1, 0), idx(0, 1), idx(2, 1), idx(1, 2)]);
        for n in center.values() {
            assert!((n.distance - spacing as f32).abs() < 1e-4);
        }

        assert_eq!(2, graph.neighbors[idx(0, 0)].len());
        assert_eq!(3, graph.neighbors[idx(1, 0)].len());
    }

    #[test]
    fn rejects_neighbors_when_orientation_relation_invalid() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, FRAC_PI_4),
        ];
        let graph = GridGraph::new(&corners, &params(5.0, 15.0, 2), 0);
        assert!(graph.neighbors.iter().all(|n| n.is_empty()));
    }

    #[test]
    fn spacing_window_scales_with_level() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(30.0, 0.0, 3.0 * FRAC_PI_4),
        ];
        let p = params(5.0, 15.0, 2);
        let at0 = GridGraph::new(&corners, &p, 0);
        assert!(at0.neighbors[0].is_empty());
        let at1 = GridGraph::new(&corners, &p, 1);
        assert_eq!(at1.neighbors[0].len(), 1);
        assert_eq!(at1.neighbors[1][0].index, 0);
    }

    #[test]
    fn keeps_best_candidate_per_slot() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, 3.0 * FRAC_PI_4),
            make_corner(12.0, 0.0, 3.0 * FRAC_PI_4 + 0.1),
            make_corner(-10.0, 0.0, 3.0 * FRAC_PI_4),
        ];
        let graph = GridGraph::new(&corners, &params(5.0, 15.0, 4), 0);

        let mut found: Vec<usize> = graph.neighbors[0].iter().map(|n| n.index).collect();
        found.sort_unstable();
        assert_eq!(found, vec![1, 3]);
        assert!(graph.neighbors[2].is_empty());
    }

    #[test]
    fn spacing_only_graph_links_axis_neighbours() {
        // Dots on a grid turned by 10°; all share the diagonal orientation.
        let axis = 10f32.to_radians();
        let (c, s) = (axis.cos() as f64, axis.sin() as f64);
        let mut dots = Vec::new();
        for j in 0..3 {
            for i in 0..3 {
                let (u, v) = (i as f64 * 20.0, j as f64 * 20.0);
                dots.push(make_corner(c * u - s * v, s * u + c * v, axis + FRAC_PI_4));
            }
        }
        let graph = GridGraph::spacing_only(&dots, &params(5.0, 30.0, 8), 0);

        let center = slot_map(&graph.neighbors[4]);
        assert_eq!(center.len(), 4);
        assert_eq!(center[&NeighborSlot::PlusU].index, 5);
        assert_eq!(center[&NeighborSlot::MinusU].index, 3);
        assert_eq!(center[&NeighborSlot::PlusV].index, 7);
        assert_eq!(center[&NeighborSlot::MinusV].index, 1);
        // Diagonals are never linked.
        assert!(graph.neighbors[0].iter().all(|n| n.index != 4));

        // Corner orientations would reject the same layout.
        let strict = GridGraph::new(&dots, &params(5.0, 30.0, 8), 0);
        assert!(strict.neighbors.iter().all(|n| n.is_empty()));
    }

    #[test]
    fn components_split_disjoint_boards() {
        let mut corners = grid(3, 3, 10.0);
        corners.extend(grid(2, 2, 10.0).into_iter().map(|mut c| {
            c.position.x += 200.0;
            c
        }));
        let graph = GridGraph::new(&corners, &params(5.0, 15.0, 8), 0);
        let mut sizes: Vec<usize> = connected_components(&graph).iter().map(|c| c.len()).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![4, 9]);
    }
}
