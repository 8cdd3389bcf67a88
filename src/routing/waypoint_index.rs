// src/routing/waypoint_index.rs
//
// Static 2-D k-d tree over route waypoints. Built once per route,
// read-only afterwards.

use crate::error::{DetectorError, DetectorResult};
use crate::types::Waypoint;
use std::cmp::Ordering;

#[derive(Debug, Clone)]
struct KdNode {
    ordinal: usize,
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct WaypointIndex {
    /// Coordinates by ordinal (position in the route)
    points: Vec<[f64; 2]>,
    nodes: Vec<KdNode>,
    root: usize,
}

impl WaypointIndex {
    /// Build the index. Ordinals are the waypoints' positions in `waypoints`.
    pub fn build(waypoints: &[Waypoint]) -> DetectorResult<Self> {
        if waypoints.is_empty() {
            return Err(DetectorError::EmptyRoute);
        }

        let points: Vec<[f64; 2]> = waypoints.iter().map(|w| [w.x, w.y]).collect();
        let mut ordinals: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());

        let root = build_subtree(&points, &mut ordinals, 0, &mut nodes)
            .ok_or(DetectorError::EmptyRoute)?;

        Ok(Self {
            points,
            nodes,
            root,
        })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Ordinal of the waypoint closest to (x, y). Equal distances resolve
    /// to the lowest ordinal.
    pub fn nearest(&self, x: f64, y: f64) -> usize {
        let query = [x, y];
        let mut best = Candidate {
            ordinal: self.nodes[self.root].ordinal,
            dist_sq: f64::INFINITY,
        };
        self.search(self.root, &query, &mut best);
        best.ordinal
    }

    fn search(&self, node_id: usize, query: &[f64; 2], best: &mut Candidate) {
        let node = &self.nodes[node_id];
        let p = self.points[node.ordinal];

        let dx = p[0] - query[0];
        let dy = p[1] - query[1];
        best.offer(node.ordinal, dx * dx + dy * dy);

        let diff = query[node.axis] - p[node.axis];
        let (near, far) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(near) = near {
            self.search(near, query, best);
        }
        // `<=` keeps equidistant points on the far side reachable for tie-breaking
        if let Some(far) = far {
            if diff * diff <= best.dist_sq {
                self.search(far, query, best);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    ordinal: usize,
    dist_sq: f64,
}

impl Candidate {
    fn offer(&mut self, ordinal: usize, dist_sq: f64) {
        let closer = dist_sq < self.dist_sq;
        let tie_lower = dist_sq == self.dist_sq && ordinal < self.ordinal;
        if closer || tie_lower {
            self.ordinal = ordinal;
            self.dist_sq = dist_sq;
        }
    }
}

/// Median split on alternating axes. Returns the id of the subtree root.
fn build_subtree(
    points: &[[f64; 2]],
    ordinals: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> Option<usize> {
    if ordinals.is_empty() {
        return None;
    }

    let axis = depth % 2;
    let mid = ordinals.len() / 2;
    ordinals.select_nth_unstable_by(mid, |a, b| compare_on_axis(points, *a, *b, axis));

    let node_id = nodes.len();
    nodes.push(KdNode {
        ordinal: ordinals[mid],
        axis,
        left: None,
        right: None,
    });

    let (lower, rest) = ordinals.split_at_mut(mid);
    let upper = &mut rest[1..];

    let left = build_subtree(points, lower, depth + 1, nodes);
    let right = build_subtree(points, upper, depth + 1, nodes);
    nodes[node_id].left = left;
    nodes[node_id].right = right;

    Some(node_id)
}

fn compare_on_axis(points: &[[f64; 2]], a: usize, b: usize, axis: usize) -> Ordering {
    points[a][axis]
        .total_cmp(&points[b][axis])
        .then_with(|| a.cmp(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(route: &[Waypoint], x: f64, y: f64) -> usize {
        let mut best = (f64::INFINITY, 0usize);
        for (i, w) in route.iter().enumerate() {
            let d = (w.x - x).powi(2) + (w.y - y).powi(2);
            if d < best.0 {
                best = (d, i);
            }
        }
        best.1
    }

    /// Deterministic scattered points (linear congruential generator).
    fn scattered_route(n: usize) -> Vec<Waypoint> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) % 10_000) as f64 / 10.0
        };
        (0..n)
            .map(|index| Waypoint {
                index,
                x: next(),
                y: next(),
            })
            .collect()
    }

    #[test]
    fn test_empty_route_is_rejected() {
        assert_eq!(
            WaypointIndex::build(&[]).unwrap_err(),
            DetectorError::EmptyRoute
        );
    }

    #[test]
    fn test_each_waypoint_maps_to_itself() {
        let route = scattered_route(257);
        let index = WaypointIndex::build(&route).unwrap();
        assert_eq!(index.len(), 257);

        // Scattered points may collide; a collision must resolve to the lower ordinal
        for w in &route {
            let expected = brute_force(&route, w.x, w.y);
            assert_eq!(index.nearest(w.x, w.y), expected);
            if expected != w.index {
                assert!(expected < w.index);
            }
        }
    }

    #[test]
    fn test_matches_brute_force_on_arbitrary_queries() {
        let route = scattered_route(500);
        let index = WaypointIndex::build(&route).unwrap();

        for i in 0..200 {
            let x = (i as f64 * 37.3) % 1000.0;
            let y = (i as f64 * 91.7) % 1000.0;
            let got = index.nearest(x, y);
            let expected = brute_force(&route, x, y);
            let d_got = (route[got].x - x).powi(2) + (route[got].y - y).powi(2);
            let d_exp = (route[expected].x - x).powi(2) + (route[expected].y - y).powi(2);
            assert_eq!(d_got, d_exp, "query ({}, {})", x, y);
            assert_eq!(got, expected);
        }
    }

    #[test]
    fn test_ties_resolve_to_lowest_ordinal() {
        // Query point (5, 0) is equidistant from ordinals 0 and 1
        let route = Waypoint::route_from_points(&[[0.0, 0.0], [10.0, 0.0], [20.0, 0.0]]);
        let index = WaypointIndex::build(&route).unwrap();
        assert_eq!(index.nearest(5.0, 0.0), 0);
        assert_eq!(index.nearest(15.0, 0.0), 1);

        // Duplicate coordinates
        let route = Waypoint::route_from_points(&[[1.0, 1.0], [3.0, 3.0], [1.0, 1.0], [3.0, 3.0]]);
        let index = WaypointIndex::build(&route).unwrap();
        assert_eq!(index.nearest(1.0, 1.0), 0);
        assert_eq!(index.nearest(3.1, 3.0), 1);
    }

    #[test]
    fn test_single_waypoint() {
        let route = Waypoint::route_from_points(&[[4.0, -2.0]]);
        let index = WaypointIndex::build(&route).unwrap();
        assert_eq!(index.nearest(1000.0, 1000.0), 0);
    }
}
