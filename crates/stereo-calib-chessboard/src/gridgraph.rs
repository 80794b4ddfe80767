use crate::geom::{axis_vec_diff, is_orthogonal};
use crate::params::GridGraphParams;
use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Vector2;
use stereo_calib_core::Corner;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NeighborDirection {
    Right,
    Left,
    Up,
    Down,
}

#[derive(Clone, Copy, Debug)]
pub struct NodeNeighbor {
    pub direction: NeighborDirection,
    pub index: usize,
    pub distance: f32,
    pub score: f32,
}

/// Classify a neighbor displacement in the grid-axis frame.
///
/// The displacement is rotated by `-axis_angle` first, so a board that is
/// rotated in the image still produces a consistent 4-connected labeling.
fn direction_in_axis_frame(vec_to_neighbor: &Vector2<f32>, axis_angle: f32) -> NeighborDirection {
    let (sin, cos) = axis_angle.sin_cos();
    let u = cos * vec_to_neighbor.x + sin * vec_to_neighbor.y;
    let v = -sin * vec_to_neighbor.x + cos * vec_to_neighbor.y;

    if u.abs() > v.abs() {
        if u >= 0.0 {
            NeighborDirection::Right
        } else {
            NeighborDirection::Left
        }
    } else if v >= 0.0 {
        NeighborDirection::Down
    } else {
        NeighborDirection::Up
    }
}

fn is_good_neighbor(
    corner: &Corner,
    neighbor: &Corner,
    neighbor_index: usize,
    axis_angle: f32,
    min_spacing: f32,
    max_spacing: f32,
    params: &GridGraphParams,
) -> Option<NodeNeighbor> {
    let tol = params.orientation_tolerance_deg.to_radians();

    // Diagonal orientations of adjacent chessboard corners are
    // approximately orthogonal.
    if !is_orthogonal(corner.orientation, neighbor.orientation, tol) {
        return None;
    }

    let vec_to_neighbor = neighbor.position - corner.position;
    let distance = vec_to_neighbor.norm();
    if distance < min_spacing || distance > max_spacing {
        return None;
    }

    // Corner orientation is the diagonal through the white squares, i.e.
    // rotated 45 degrees from the grid directions, so a valid edge sits at
    // ~45 degrees to *both* corner orientations.
    let edge_angle = vec_to_neighbor.y.atan2(vec_to_neighbor.x);
    let expected = std::f32::consts::FRAC_PI_4;
    let score_corner = (axis_vec_diff(corner.orientation, edge_angle) - expected).abs();
    let score_neighbor = (axis_vec_diff(neighbor.orientation, edge_angle) - expected).abs();
    if score_corner > tol || score_neighbor > tol {
        return None;
    }

    Some(NodeNeighbor {
        direction: direction_in_axis_frame(&vec_to_neighbor, axis_angle),
        index: neighbor_index,
        distance,
        score: score_corner + score_neighbor,
    })
}

/// Keep at most one neighbor per direction, lowest score first, shorter
/// distance as the tie break.
fn select_neighbors(candidates: Vec<NodeNeighbor>) -> Vec<NodeNeighbor> {
    let mut best: [Option<NodeNeighbor>; 4] = [None, None, None, None];

    for candidate in candidates {
        let slot = match candidate.direction {
            NeighborDirection::Right => &mut best[0],
            NeighborDirection::Left => &mut best[1],
            NeighborDirection::Up => &mut best[2],
            NeighborDirection::Down => &mut best[3],
        };
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

/// 4-connected neighbor graph over a corner cloud.
pub struct GridGraph {
    pub neighbors: Vec<Vec<NodeNeighbor>>,
}

impl GridGraph {
    /// Build the graph. `axis_angle` is the dominant grid axis estimated
    /// from corner orientations; spacing bounds of `params` are used as
    /// given when positive, otherwise derived from the median
    /// nearest-neighbor distance of the cloud.
    pub fn new(corners: &[Corner], axis_angle: f32, params: &GridGraphParams) -> Self {
        let coords = corners
            .iter()
            .map(|c| [c.position.x, c.position.y])
            .collect::<Vec<_>>();
        let tree: KdTree<f32, 2> = (&coords).into();

        let (min_spacing, max_spacing) =
            if params.min_spacing_pix > 0.0 && params.max_spacing_pix > 0.0 {
                (params.min_spacing_pix, params.max_spacing_pix)
            } else {
                spacing_bounds_from_cloud(&tree, &coords)
            };

        let mut neighbors = Vec::with_capacity(corners.len());
        for (i, corner) in corners.iter().enumerate() {
            let query_point = [corner.position.x, corner.position.y];
            let results = tree.nearest_n::<SquaredEuclidean>(&query_point, params.k_neighbors);

            let mut node_neighbors = Vec::new();
            for nn in results {
                let neighbor_index = nn.item as usize;
                if neighbor_index == i {
                    continue;
                }
                if let Some(entry) = is_good_neighbor(
                    corner,
                    &corners[neighbor_index],
                    neighbor_index,
                    axis_angle,
                    min_spacing,
                    max_spacing,
                    params,
                ) {
                    node_neighbors.push(entry);
                }
            }
            neighbors.push(select_neighbors(node_neighbors));
        }

        Self { neighbors }
    }
}

/// Spacing window derived from the median nearest-neighbor distance.
fn spacing_bounds_from_cloud(tree: &KdTree<f32, 2>, coords: &[[f32; 2]]) -> (f32, f32) {
    let mut dists: Vec<f32> = coords
        .iter()
        .filter_map(|q| {
            tree.nearest_n::<SquaredEuclidean>(q, 2)
                .into_iter()
                .find(|nn| nn.distance > 0.0)
                .map(|nn| nn.distance.sqrt())
        })
        .collect();
    if dists.is_empty() {
        return (f32::INFINITY, 0.0); // rejects every candidate
    }
    dists.sort_by(|a, b| a.total_cmp(b));
    let median = dists[dists.len() / 2];
    (0.6 * median, 1.7 * median)
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

/// BFS a component, assigning integer grid cells from neighbor directions.
pub fn assign_grid_coordinates(graph: &GridGraph, component: &[usize]) -> Vec<(usize, i32, i32)> {
    let mut coords = Vec::new();
    let mut visited = vec![false; graph.neighbors.len()];
    let mut queue = std::collections::VecDeque::new();

    queue.push_back((component[0], 0, 0));
    while let Some((node_idx, i, j)) = queue.pop_front() {
        if visited[node_idx] {
            continue;
        }
        visited[node_idx] = true;
        coords.push((node_idx, i, j));

        for neighbor in &graph.neighbors[node_idx] {
            let (di, dj) = match neighbor.direction {
                NeighborDirection::Right => (1, 0),
                NeighborDirection::Left => (-1, 0),
                NeighborDirection::Up => (0, -1),
                NeighborDirection::Down => (0, 1),
            };
            queue.push_back((neighbor.index, i + di, j + dj));
        }
    }

    coords
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point2;
    use std::collections::HashMap;
    use std::f32::consts::FRAC_PI_4;

    fn make_corner(x: f32, y: f32, orientation: f32) -> Corner {
        Corner {
            position: Point2::new(x, y),
            orientation,
            strength: 1.0,
        }
    }

    fn regular_grid(cols: usize, rows: usize, spacing: f32) -> Vec<Corner> {
        let mut corners = Vec::new();
        for j in 0..rows {
            for i in 0..cols {
                let orientation = if (i + j) % 2 == 0 {
                    FRAC_PI_4
                } else {
                    3.0 * FRAC_PI_4
                };
                corners.push(make_corner(
                    i as f32 * spacing,
                    j as f32 * spacing,
                    orientation,
                ));
            }
        }
        corners
    }

    fn neighbor_map(neighbors: &[NodeNeighbor]) -> HashMap<NeighborDirection, &NodeNeighbor> {
        neighbors.iter().map(|n| (n.direction, n)).collect()
    }

    #[test]
    fn finds_axis_neighbors_in_regular_grid() {
        let spacing = 10.0;
        let cols = 3;
        let corners = regular_grid(cols, 3, spacing);
        let graph = GridGraph::new(&corners, 0.0, &GridGraphParams::default());

        let idx = |i: usize, j: usize| j * cols + i;
        let center = neighbor_map(&graph.neighbors[idx(1, 1)]);
        assert_eq!(4, center.len());
        assert_eq!(idx(0, 1), center[&NeighborDirection::Left].index);
        assert_eq!(idx(2, 1), center[&NeighborDirection::Right].index);
        assert_eq!(idx(1, 0), center[&NeighborDirection::Up].index);
        assert_eq!(idx(1, 2), center[&NeighborDirection::Down].index);

        let top_left = neighbor_map(&graph.neighbors[idx(0, 0)]);
        assert_eq!(2, top_left.len());
        assert!(top_left.contains_key(&NeighborDirection::Right));
        assert!(top_left.contains_key(&NeighborDirection::Down));
    }

    #[test]
    fn derived_spacing_window_rejects_far_pairs() {
        // Two lone corners 30 px apart with orthogonal diagonals: the
        // derived window centers on 30, so they do link; adding a third
        // corner close to the first shrinks the median below the far gap.
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, 3.0 * FRAC_PI_4),
            make_corner(60.0, 0.0, 3.0 * FRAC_PI_4),
        ];
        let graph = GridGraph::new(&corners, 0.0, &GridGraphParams::default());
        assert_eq!(1, graph.neighbors[0].len());
        assert!(graph.neighbors[2].is_empty());
    }

    #[test]
    fn rejects_parallel_orientations() {
        let corners = vec![
            make_corner(0.0, 0.0, FRAC_PI_4),
            make_corner(10.0, 0.0, FRAC_PI_4),
        ];
        let params = GridGraphParams {
            min_spacing_pix: 5.0,
            max_spacing_pix: 15.0,
            ..Default::default()
        };
        let graph = GridGraph::new(&corners, 0.0, &params);
        assert!(graph.neighbors[0].is_empty());
        assert!(graph.neighbors[1].is_empty());
    }

    #[test]
    fn bfs_assigns_consistent_cells() {
        let cols = 4;
        let rows = 3;
        let corners = regular_grid(cols, rows, 12.0);
        let graph = GridGraph::new(&corners, 0.0, &GridGraphParams::default());

        let components = connected_components(&graph);
        assert_eq!(1, components.len());

        let coords = assign_grid_coordinates(&graph, &components[0]);
        assert_eq!(cols * rows, coords.len());

        let mut min_i = i32::MAX;
        let mut min_j = i32::MAX;
        for &(_, i, j) in &coords {
            min_i = min_i.min(i);
            min_j = min_j.min(j);
        }
        for &(node, i, j) in &coords {
            let expected = (j - min_j) as usize * cols + (i - min_i) as usize;
            assert_eq!(node, expected);
        }
    }

    #[test]
    fn rotated_grid_keeps_four_connectivity() {
        let spacing = 10.0;
        let angle = 0.5f32;
        let (sin, cos) = angle.sin_cos();
        let mut corners = regular_grid(3, 3, spacing);
        for c in &mut corners {
            let (x, y) = (c.position.x, c.position.y);
            c.position = Point2::new(cos * x - sin * y, sin * x + cos * y);
            c.orientation += angle;
        }
        let graph = GridGraph::new(&corners, angle, &GridGraphParams::default());
        let center = neighbor_map(&graph.neighbors[4]);
        assert_eq!(4, center.len());
        assert_eq!(3, center[&NeighborDirection::Left].index);
        assert_eq!(5, center[&NeighborDirection::Right].index);
    }
}
