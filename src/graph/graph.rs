use log::debug;
use serde::{Deserialize, Serialize};

use crate::spatial::kd_tree::KDTree;
use crate::spatial::projection::{euclidean, is_finite_point};
use crate::Node;

/// Directed, weighted link to a neighbouring node.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Link {
    pub to: usize,
    pub distance_km: f64,
}

/// Adjacency-list graph of feasible communication links.
///
/// `adjacency[i]` lists the links leaving node `i`; neighbour lists are
/// sorted by target id and never contain `i` itself.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ProximityGraph {
    pub adjacency: Vec<Vec<Link>>,
}

impl ProximityGraph {
    /// Wraps a hand-built adjacency list. Every `Link::to` must be a valid
    /// index; [`shortest_paths`](crate::graph::pathfinder::shortest_paths)
    /// rejects graphs that break this.
    pub fn new(adjacency: Vec<Vec<Link>>) -> Self {
        ProximityGraph { adjacency }
    }

    /// Connects every ordered pair of nodes whose chord distance is finite and
    /// strictly below `max_distance_km`.
    ///
    /// Performs the full n² scan so both directions of a link are inserted
    /// independently. `nodes[i]` becomes vertex `i`.
    pub fn build(nodes: &[Node], max_distance_km: f64) -> Self {
        let points = project_all(nodes);
        let mut adjacency = vec![Vec::new(); points.len()];

        for (i, &from) in points.iter().enumerate() {
            for (j, &to) in points.iter().enumerate() {
                if i == j {
                    continue;
                }
                let distance_km = euclidean(from, to);
                if within_range(distance_km, max_distance_km) {
                    adjacency[i].push(Link { to: j, distance_km });
                }
            }
        }

        let graph = ProximityGraph { adjacency };
        debug!(
            "Exhaustive scan over {} nodes produced {} links (max {} km)",
            graph.len(),
            graph.edge_count(),
            max_distance_km
        );
        graph
    }

    /// Same contract as [`ProximityGraph::build`], but only evaluates pairs a
    /// k-d tree reports as candidates. Produces identical adjacency.
    pub fn build_indexed(nodes: &[Node], max_distance_km: f64) -> Self {
        let points = project_all(nodes);
        let mut adjacency = vec![Vec::new(); points.len()];

        if !(max_distance_km > 0.0) {
            return ProximityGraph { adjacency };
        }

        let finite: Vec<(usize, [f64; 3])> = points
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, p)| is_finite_point(*p))
            .collect();
        let tree = KDTree::build(&finite);

        for &(i, from) in &finite {
            for (j, _) in tree.within_radius(from, max_distance_km) {
                if i == j {
                    continue;
                }
                let distance_km = euclidean(from, points[j]);
                if within_range(distance_km, max_distance_km) {
                    adjacency[i].push(Link { to: j, distance_km });
                }
            }
        }

        let graph = ProximityGraph { adjacency };
        debug!(
            "Indexed scan over {} nodes ({} with valid positions) produced {} links (max {} km)",
            graph.len(),
            finite.len(),
            graph.edge_count(),
            max_distance_km
        );
        graph
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn contains(&self, id: usize) -> bool {
        id < self.adjacency.len()
    }

    pub fn neighbours(&self, id: usize) -> &[Link] {
        self.adjacency.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of directed links.
    pub fn edge_count(&self) -> usize {
        self.adjacency.iter().map(Vec::len).sum()
    }

    /// First link whose target is not a node of this graph.
    pub fn dangling_link(&self) -> Option<(usize, usize)> {
        self.adjacency.iter().enumerate().find_map(|(from, links)| {
            links
                .iter()
                .find(|link| link.to >= self.adjacency.len())
                .map(|link| (from, link.to))
        })
    }

    /// Weight of the direct link `from -> to`, if any.
    pub fn link_distance(&self, from: usize, to: usize) -> Option<f64> {
        self.neighbours(from)
            .iter()
            .find(|link| link.to == to)
            .map(|link| link.distance_km)
    }
}

fn project_all(nodes: &[Node]) -> Vec<[f64; 3]> {
    nodes.iter().map(|n| n.position.to_cartesian()).collect()
}

/// NaN never compares below the threshold, so malformed nodes drop out here.
fn within_range(distance_km: f64, max_distance_km: f64) -> bool {
    distance_km.is_finite() && distance_km < max_distance_km
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GeoPoint, NodeKind};

    fn node(id: usize, lat: f64, lon: f64, altitude_km: f64) -> Node {
        Node {
            id,
            kind: if id == 0 { NodeKind::Origin } else { NodeKind::Mobile },
            position: GeoPoint::new(lat, lon, altitude_km),
        }
    }

    #[test]
    fn links_are_symmetric_and_loop_free() {
        let nodes = vec![
            node(0, 0.0, 0.0, 0.0),
            node(1, 0.0, 1.0, 0.0),
            node(2, 0.0, 2.0, 0.0),
        ];
        let graph = ProximityGraph::build(&nodes, 150.0);
        assert_eq!(graph.edge_count(), 4);
        for (i, links) in graph.adjacency.iter().enumerate() {
            for link in links {
                assert_ne!(link.to, i);
                assert_eq!(graph.link_distance(link.to, i), Some(link.distance_km));
            }
        }
        assert_eq!(graph.link_distance(0, 2), None);
    }

    #[test]
    fn threshold_is_exclusive() {
        let nodes = vec![node(0, 0.0, 0.0, 0.0), node(1, 0.0, 1.0, 0.0)];
        let exact = nodes[0].distance(&nodes[1]);
        assert_eq!(ProximityGraph::build(&nodes, exact).edge_count(), 0);
        assert_eq!(ProximityGraph::build_indexed(&nodes, exact).edge_count(), 0);
        assert_eq!(ProximityGraph::build(&nodes, exact + 1e-6).edge_count(), 2);
    }

    #[test]
    fn nan_node_is_isolated() {
        let nodes = vec![
            node(0, 0.0, 0.0, 0.0),
            node(1, f64::NAN, 0.0, 0.0),
            node(2, 0.0, 0.01, 0.0),
        ];
        for graph in [
            ProximityGraph::build(&nodes, 1.0e9),
            ProximityGraph::build_indexed(&nodes, 1.0e9),
        ] {
            assert!(graph.neighbours(1).is_empty());
            assert!(graph.adjacency.iter().flatten().all(|l| l.to != 1));
            assert_eq!(graph.edge_count(), 2);
        }
    }

    #[test]
    fn non_positive_threshold_yields_no_links() {
        let nodes = vec![node(0, 0.0, 0.0, 0.0), node(1, 0.0, 0.0, 0.0)];
        assert_eq!(ProximityGraph::build(&nodes, 0.0).edge_count(), 0);
        assert_eq!(ProximityGraph::build(&nodes, -5.0).edge_count(), 0);
        assert_eq!(ProximityGraph::build_indexed(&nodes, -5.0).edge_count(), 0);
        assert_eq!(ProximityGraph::build(&nodes, -5.0).len(), 2);
    }

    #[test]
    fn built_graphs_have_no_dangling_links() {
        let nodes = vec![node(0, 0.0, 0.0, 0.0), node(1, 0.0, 0.5, 0.0)];
        assert_eq!(ProximityGraph::build(&nodes, 100.0).dangling_link(), None);
        let manual = ProximityGraph::new(vec![vec![], vec![Link { to: 2, distance_km: 3.0 }]]);
        assert_eq!(manual.dangling_link(), Some((1, 2)));
    }

    #[test]
    fn neighbours_of_unknown_id_is_empty() {
        let graph = ProximityGraph::default();
        assert!(graph.is_empty());
        assert!(!graph.contains(0));
        assert!(graph.neighbours(3).is_empty());
    }
}
