use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::network::{Network, RoutingTable};
use crate::NodeKind;

const ORIGIN_LABEL: &str = "HQ";

/// Per-node data handed to the map renderer.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NodeMarker {
    pub id: usize,
    pub lat: f64,
    pub lon: f64,
    pub altitude_km: f64,
    pub reachable: bool,
    pub is_origin: bool,
    pub is_relay: bool,
    /// `None` when the node cannot be reached.
    pub total_distance: Option<f64>,
}

/// Route from the origin to one reachable node, ready for drawing.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RouteView {
    /// `[lat, lon]` of every node on the route, origin first, target last.
    pub coordinates: Vec<[f64; 2]>,
    pub total_distance: f64,
    pub hops: usize,
    /// Human-readable route, e.g. `"HQ > Satellite 4 > Satellite 9"`.
    pub description: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkMetrics {
    pub total_mobile: usize,
    pub total_relays: usize,
    pub reachable_mobile: usize,
    pub coverage_percent: f64,
    pub avg_hops: f64,
    pub min_hops: usize,
    pub max_hops: usize,
    pub avg_distance_km: f64,
    pub min_distance_km: f64,
    pub max_distance_km: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct NetworkReport {
    pub max_distance_km: f64,
    pub relay_start: Option<usize>,
    pub markers: Vec<NodeMarker>,
    pub routes: BTreeMap<usize, RouteView>,
    pub metrics: NetworkMetrics,
}

impl NetworkReport {
    /// Route to `id`; the origin gets its trivial zero-hop route.
    pub fn route(&self, id: usize) -> Option<RouteView> {
        if let Some(route) = self.routes.get(&id) {
            return Some(route.clone());
        }
        self.markers
            .get(id)
            .filter(|marker| marker.is_origin)
            .map(|origin| RouteView {
                coordinates: vec![[origin.lat, origin.lon]],
                total_distance: 0.0,
                hops: 0,
                description: ORIGIN_LABEL.to_string(),
            })
    }
}

/// Packages a routing run for the rendering layer.
///
/// `relay_labels` names relay ids in route descriptions; relays without an
/// entry fall back to `"Relay <id>"`.
pub fn assemble(network: &Network, table: &RoutingTable, relay_labels: &HashMap<usize, String>) -> NetworkReport {
    let markers = network
        .nodes()
        .iter()
        .map(|node| {
            let total_distance = table
                .paths
                .get(node.id)
                .filter(|r| r.is_reachable())
                .map(|r| r.total_distance);
            NodeMarker {
                id: node.id,
                lat: node.position.lat,
                lon: node.position.lon,
                altitude_km: node.position.altitude_km,
                reachable: total_distance.is_some(),
                is_origin: node.kind == NodeKind::Origin,
                is_relay: node.kind == NodeKind::Relay,
                total_distance,
            }
        })
        .collect();

    let routes: BTreeMap<usize, RouteView> = network
        .nodes()
        .iter()
        .filter(|node| node.kind != NodeKind::Origin)
        .filter_map(|node| {
            let route = table.paths.route(node.id)?;
            let coordinates = route
                .iter()
                .filter_map(|&id| network.node(id))
                .map(|n| [n.position.lat, n.position.lon])
                .collect();
            let description = route
                .iter()
                .map(|&id| node_label(network, id, relay_labels))
                .collect::<Vec<_>>()
                .join(" > ");
            Some((
                node.id,
                RouteView {
                    coordinates,
                    total_distance: table.paths.results[node.id].total_distance,
                    hops: route.len() - 1,
                    description,
                },
            ))
        })
        .collect();

    let metrics = summarize(network, &routes);

    NetworkReport {
        max_distance_km: table.max_distance_km,
        relay_start: network.relay_start(),
        markers,
        routes,
        metrics,
    }
}

fn node_label(network: &Network, id: usize, relay_labels: &HashMap<usize, String>) -> String {
    match network.kind(id) {
        Some(NodeKind::Origin) => ORIGIN_LABEL.to_string(),
        Some(NodeKind::Relay) => relay_labels
            .get(&id)
            .cloned()
            .unwrap_or_else(|| format!("Relay {id}")),
        _ => format!("Satellite {id}"),
    }
}

fn summarize(network: &Network, routes: &BTreeMap<usize, RouteView>) -> NetworkMetrics {
    let total_mobile = network.mobile_count();
    let reachable_mobile = routes
        .keys()
        .filter(|&&id| network.kind(id) == Some(NodeKind::Mobile))
        .count();
    let coverage_percent = if total_mobile > 0 {
        reachable_mobile as f64 / total_mobile as f64 * 100.0
    } else {
        0.0
    };

    let mut metrics = NetworkMetrics {
        total_mobile,
        total_relays: network.relay_count(),
        reachable_mobile,
        coverage_percent,
        ..NetworkMetrics::default()
    };
    if routes.is_empty() {
        return metrics;
    }

    let count = routes.len() as f64;
    let hops = routes.values().map(|r| r.hops);
    metrics.avg_hops = hops.clone().sum::<usize>() as f64 / count;
    metrics.min_hops = hops.clone().min().unwrap_or(0);
    metrics.max_hops = hops.max().unwrap_or(0);

    let distances = routes.values().map(|r| r.total_distance);
    metrics.avg_distance_km = distances.clone().sum::<f64>() / count;
    metrics.min_distance_km = distances.clone().fold(f64::INFINITY, f64::min);
    metrics.max_distance_km = distances.fold(0.0, f64::max);
    metrics
}
