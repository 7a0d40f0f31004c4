use crate::GeoPoint;

/// Mean Earth radius in kilometres; the reference sphere for all projections.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Projects geodetic coordinates onto an Earth-centred Cartesian frame (km).
///
/// Fixed-radius spherical model: `R = EARTH_RADIUS_KM + altitude_km`, no
/// ellipsoidal correction. Non-finite inputs propagate to non-finite output.
pub fn project(lat_deg: f64, lon_deg: f64, altitude_km: f64) -> [f64; 3] {
    let r = EARTH_RADIUS_KM + altitude_km;
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();
    [
        r * lat.cos() * lon.cos(),
        r * lat.cos() * lon.sin(),
        r * lat.sin(),
    ]
}

/// Straight-line distance between two projected points.
pub fn euclidean(a: [f64; 3], b: [f64; 3]) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    let dz = a[2] - b[2];
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// 3D chord distance between two geodetic positions, in kilometres.
pub fn distance(a: &GeoPoint, b: &GeoPoint) -> f64 {
    euclidean(a.to_cartesian(), b.to_cartesian())
}

/// True when every projected component is finite.
pub fn is_finite_point(p: [f64; 3]) -> bool {
    p.iter().all(|c| c.is_finite())
}
