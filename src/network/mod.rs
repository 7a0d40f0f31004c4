use log::info;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::LinkStrategy;
use crate::graph::graph::ProximityGraph;
use crate::graph::pathfinder::{shortest_paths, RouteError, ShortestPathTree};
use crate::{GeoPoint, Node, NodeKind, ORIGIN_ID};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("relay_start {relay_start} must lie within 1..={len}")]
    RelayStartOutOfRange { relay_start: usize, len: usize },
}

/// One snapshot of the network: origin, mobile nodes, then fixed relays.
///
/// Ids are dense and equal to the node's position in `nodes`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Network {
    nodes: Vec<Node>,
    relay_start: Option<usize>,
}

impl Network {
    /// Assigns ids in order: `origin` as 0, then `mobile`, then `relays`.
    ///
    /// An empty `mobile` sequence means the feed had nothing for this
    /// snapshot, and the whole network is empty.
    pub fn with_origin<M, R>(origin: GeoPoint, mobile: M, relays: R) -> Self
    where
        M: IntoIterator<Item = GeoPoint>,
        R: IntoIterator<Item = GeoPoint>,
    {
        let mut points = vec![origin];
        points.extend(mobile);
        if points.len() == 1 {
            return Network::default();
        }

        let mobile_end = points.len();
        points.extend(relays);
        let relay_start = (points.len() > mobile_end).then_some(mobile_end);

        Network {
            nodes: tag_nodes(points, relay_start),
            relay_start,
        }
    }

    /// Caller-designated layout: `points[0]` is the origin and ids from
    /// `relay_start` onwards are relays.
    pub fn from_points(points: Vec<GeoPoint>, relay_start: Option<usize>) -> Result<Self, NetworkError> {
        if let Some(start) = relay_start {
            if start == 0 || start > points.len() {
                return Err(NetworkError::RelayStartOutOfRange {
                    relay_start: start,
                    len: points.len(),
                });
            }
        }
        Ok(Network {
            nodes: tag_nodes(points, relay_start),
            relay_start,
        })
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// First relay id, `None` when no relays were appended.
    pub fn relay_start(&self) -> Option<usize> {
        self.relay_start
    }

    pub fn is_origin(&self, id: usize) -> bool {
        id == ORIGIN_ID && !self.nodes.is_empty()
    }

    pub fn is_relay(&self, id: usize) -> bool {
        self.relay_start.map_or(false, |start| id >= start && id < self.nodes.len())
    }

    pub fn kind(&self, id: usize) -> Option<NodeKind> {
        self.node(id).map(|n| n.kind)
    }

    pub fn mobile_count(&self) -> usize {
        self.count_kind(NodeKind::Mobile)
    }

    pub fn relay_count(&self) -> usize {
        self.count_kind(NodeKind::Relay)
    }

    fn count_kind(&self, kind: NodeKind) -> usize {
        self.nodes.iter().filter(|n| n.kind == kind).count()
    }

    /// Builds the proximity graph and solves shortest paths from the origin.
    pub fn route(&self, max_distance_km: f64, strategy: LinkStrategy) -> Result<RoutingTable, RouteError> {
        let graph = match strategy {
            LinkStrategy::Exhaustive => ProximityGraph::build(&self.nodes, max_distance_km),
            LinkStrategy::KdTree => ProximityGraph::build_indexed(&self.nodes, max_distance_km),
        };
        let paths = shortest_paths(&graph, ORIGIN_ID)?;

        info!(
            "Routed {} nodes ({} links, max {} km): {} reachable",
            self.len(),
            graph.edge_count(),
            max_distance_km,
            paths.reachable_count()
        );

        Ok(RoutingTable {
            max_distance_km,
            graph,
            paths,
        })
    }
}

fn tag_nodes(points: Vec<GeoPoint>, relay_start: Option<usize>) -> Vec<Node> {
    points
        .into_iter()
        .enumerate()
        .map(|(id, position)| {
            let kind = if id == ORIGIN_ID {
                NodeKind::Origin
            } else if relay_start.map_or(false, |start| id >= start) {
                NodeKind::Relay
            } else {
                NodeKind::Mobile
            };
            Node { id, kind, position }
        })
        .collect()
}

/// Result of one routing run, owned by the caller.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoutingTable {
    pub max_distance_km: f64,
    pub graph: ProximityGraph,
    pub paths: ShortestPathTree,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(lat: f64, lon: f64) -> GeoPoint {
        GeoPoint::new(lat, lon, 0.0)
    }

    #[test]
    fn ids_follow_insertion_order() {
        let net = Network::with_origin(p(0.0, 0.0), vec![p(1.0, 0.0), p(2.0, 0.0)], vec![p(3.0, 0.0)]);
        let ids: Vec<usize> = net.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(net.kind(0), Some(NodeKind::Origin));
        assert_eq!(net.kind(2), Some(NodeKind::Mobile));
        assert_eq!(net.kind(3), Some(NodeKind::Relay));
        assert_eq!(net.relay_start(), Some(3));
        assert_eq!(net.mobile_count(), 2);
        assert_eq!(net.relay_count(), 1);
    }

    #[test]
    fn no_relays_means_no_relay_start() {
        let net = Network::with_origin(p(0.0, 0.0), vec![p(1.0, 0.0)], Vec::new());
        assert_eq!(net.relay_start(), None);
        assert!(!net.is_relay(1));
    }

    #[test]
    fn empty_feed_gives_empty_network() {
        let net = Network::with_origin(p(0.0, 0.0), Vec::new(), vec![p(3.0, 0.0)]);
        assert!(net.is_empty());
        assert!(!net.is_origin(0));
        let table = net.route(500.0, LinkStrategy::Exhaustive).expect("table");
        assert!(table.paths.is_empty());
    }

    #[test]
    fn relay_start_must_be_in_range() {
        let points = vec![p(0.0, 0.0), p(1.0, 0.0)];
        assert_eq!(
            Network::from_points(points.clone(), Some(0)),
            Err(NetworkError::RelayStartOutOfRange { relay_start: 0, len: 2 })
        );
        assert!(Network::from_points(points.clone(), Some(3)).is_err());
        let net = Network::from_points(points, Some(2)).expect("network");
        assert_eq!(net.relay_count(), 0);
    }

    #[test]
    fn strategies_agree() {
        let net = Network::with_origin(
            p(0.0, 0.0),
            (1..20).map(|i| GeoPoint::new(i as f64 * 0.7, (i % 5) as f64 * 1.3, 15.0)),
            vec![p(4.0, 4.0)],
        );
        let exhaustive = net.route(300.0, LinkStrategy::Exhaustive).expect("exhaustive");
        let indexed = net.route(300.0, LinkStrategy::KdTree).expect("indexed");
        assert_eq!(exhaustive, indexed);
    }
}
