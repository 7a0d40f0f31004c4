use std::cmp::Ordering;
use std::collections::BinaryHeap;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::graph::ProximityGraph;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouteError {
    #[error("origin {origin} is not a node of the graph ({len} nodes)")]
    OriginNotFound { origin: usize, len: usize },
    #[error("link {from} -> {to} points outside the graph ({len} nodes)")]
    DanglingLink { from: usize, to: usize, len: usize },
}

/// Best known route from the origin to one node.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PathResult {
    /// Nodes from the origin up to, but excluding, the target itself.
    pub path: Vec<usize>,
    /// Cumulative link distance in km; infinite when unreachable.
    pub total_distance: f64,
}

impl PathResult {
    fn unreachable() -> Self {
        PathResult {
            path: Vec::new(),
            total_distance: f64::INFINITY,
        }
    }

    pub fn is_reachable(&self) -> bool {
        self.total_distance.is_finite()
    }
}

/// Single-source shortest-path results, indexed by node id.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ShortestPathTree {
    pub origin: usize,
    pub results: Vec<PathResult>,
}

impl ShortestPathTree {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, id: usize) -> Option<&PathResult> {
        self.results.get(id)
    }

    pub fn is_reachable(&self, id: usize) -> bool {
        self.get(id).map_or(false, PathResult::is_reachable)
    }

    /// Full route `origin ..= id`, or `None` when `id` is unreachable.
    pub fn route(&self, id: usize) -> Option<Vec<usize>> {
        let result = self.get(id).filter(|r| r.is_reachable())?;
        if id == self.origin {
            return Some(vec![id]);
        }
        let mut route = result.path.clone();
        route.push(id);
        Some(route)
    }

    /// Links traversed on the way to `id`; zero for the origin.
    pub fn hop_count(&self, id: usize) -> Option<usize> {
        self.route(id).map(|route| route.len() - 1)
    }

    pub fn reachable_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_reachable()).count()
    }
}

#[derive(Copy, Clone, Debug)]
struct Candidate {
    idx: usize,
    distance: f64,
}

impl Eq for Candidate {}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

// BinaryHeap is a max-heap: smallest distance first, then smallest id.
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.idx.cmp(&self.idx))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dijkstra from `origin` over the proximity graph.
///
/// Every node of the graph gets a result; isolated nodes come back as
/// `(empty path, +inf)`. Equal-distance ties settle towards the lower id, so
/// output is reproducible for a given graph.
pub fn shortest_paths(graph: &ProximityGraph, origin: usize) -> Result<ShortestPathTree, RouteError> {
    if graph.is_empty() {
        return Ok(ShortestPathTree {
            origin,
            results: Vec::new(),
        });
    }
    if !graph.contains(origin) {
        return Err(RouteError::OriginNotFound {
            origin,
            len: graph.len(),
        });
    }

    if let Some((from, to)) = graph.dangling_link() {
        return Err(RouteError::DanglingLink {
            from,
            to,
            len: graph.len(),
        });
    }

    let mut best = vec![f64::INFINITY; graph.len()];
    let mut came_from: Vec<Option<usize>> = vec![None; graph.len()];
    best[origin] = 0.0;

    let mut open = BinaryHeap::new();
    open.push(Candidate {
        idx: origin,
        distance: 0.0,
    });

    let mut settled = 0usize;
    while let Some(Candidate { idx: current, distance }) = open.pop() {
        if distance > best[current] {
            continue; // stale entry
        }
        settled += 1;

        for link in graph.neighbours(current) {
            let tentative = distance + link.distance_km;
            if tentative < best[link.to] {
                best[link.to] = tentative;
                came_from[link.to] = Some(current);
                open.push(Candidate {
                    idx: link.to,
                    distance: tentative,
                });
            }
        }
    }

    let results = best
        .iter()
        .enumerate()
        .map(|(idx, &total_distance)| {
            if total_distance.is_finite() {
                PathResult {
                    path: reconstruct_path(&came_from, idx),
                    total_distance,
                }
            } else {
                PathResult::unreachable()
            }
        })
        .collect();

    debug!(
        "Dijkstra from {} settled {} of {} nodes",
        origin,
        settled,
        graph.len()
    );

    Ok(ShortestPathTree { origin, results })
}

/// Predecessor chain of `target`, origin first, `target` excluded.
fn reconstruct_path(came_from: &[Option<usize>], target: usize) -> Vec<usize> {
    let mut path = Vec::new();
    let mut current = target;
    while let Some(prev) = came_from[current] {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}
