pub mod config;
pub mod data;
pub mod graph;
pub mod network;
pub mod report;
pub mod spatial;

use serde::{Deserialize, Serialize};

use crate::spatial::projection;

/// Id reserved for the fixed ground station every route starts from.
pub const ORIGIN_ID: usize = 0;

/// Geodetic position: degrees plus kilometres above the reference sphere.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub altitude_km: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64, altitude_km: f64) -> Self {
        GeoPoint {
            lat,
            lon,
            altitude_km,
        }
    }

    /// Earth-centred Cartesian position in kilometres.
    pub fn to_cartesian(&self) -> [f64; 3] {
        projection::project(self.lat, self.lon, self.altitude_km)
    }

    /// False when any component would poison the projection.
    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite() && self.altitude_km.is_finite()
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Origin,
    /// Balloon or satellite reported by the position feed.
    Mobile,
    /// Fixed ground facility appended after the mobile nodes.
    Relay,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Node {
    pub id: usize,
    pub kind: NodeKind,
    pub position: GeoPoint,
}

impl Node {
    pub fn distance(&self, other: &Node) -> f64 {
        projection::distance(&self.position, &other.position)
    }
}
