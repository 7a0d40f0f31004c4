use std::collections::HashMap;
use std::fs;
use std::path::Path;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GeoPoint;

/// Structure heights in the facility list are given in feet.
const KM_PER_FOOT: f64 = 0.0003048;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One `[lat, lon, altitude_km]` entry of the position feed.
///
/// `null` or missing components decode to NaN so the entry keeps its slot in
/// the id space without ever gaining links.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(from = "Vec<Option<f64>>")]
pub struct FeedPoint(pub GeoPoint);

impl From<Vec<Option<f64>>> for FeedPoint {
    fn from(raw: Vec<Option<f64>>) -> Self {
        let component = |i: usize| raw.get(i).copied().flatten().unwrap_or(f64::NAN);
        FeedPoint(GeoPoint::new(component(0), component(1), component(2)))
    }
}

/// Decodes a position feed payload.
///
/// The upstream feed occasionally emits bare `NaN`/`Infinity` tokens or
/// trailing junk; when strict JSON fails, the array lines are salvaged and
/// the non-JSON tokens replaced by `null`.
pub fn parse_feed(text: &str) -> Result<Vec<GeoPoint>, DataError> {
    let points: Vec<FeedPoint> = match serde_json::from_str(text) {
        Ok(points) => points,
        Err(err) => {
            warn!("Feed is not valid JSON ({err}), sanitizing");
            let replaced = replace_non_finite_tokens(text);
            match serde_json::from_str(&replaced) {
                Ok(points) => points,
                Err(_) => serde_json::from_str(&salvage_array_lines(&replaced))?,
            }
        }
    };

    let malformed = points.iter().filter(|p| !p.0.is_finite()).count();
    if malformed > 0 {
        warn!("{malformed} of {} feed entries have non-finite coordinates", points.len());
    }
    Ok(points.into_iter().map(|p| p.0).collect())
}

fn replace_non_finite_tokens(text: &str) -> String {
    text.replace("-Infinity", "null")
        .replace("Infinity", "null")
        .replace("NaN", "null")
}

/// Keeps only lines that look like a single `[...]` entry.
fn salvage_array_lines(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .map(|line| line.trim_end_matches(','))
        .filter(|line| line.starts_with('[') && line.ends_with(']'))
        .collect();
    format!("[\n{}\n]", lines.join(",\n"))
}

/// Fixed ground facility usable as a relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelayFacility {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Structure height in feet.
    #[serde(rename = "height", default)]
    pub height_ft: f64,
    #[serde(rename = "type", default)]
    pub facility_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callsign: Option<String>,
}

impl RelayFacility {
    pub fn position(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lon, self.height_ft * KM_PER_FOOT)
    }

    /// Short description, e.g. `"Earth Station (New York, NY)"`.
    pub fn label(&self) -> String {
        let short_name = self.name.split(" - ").next().unwrap_or(&self.name);
        if self.facility_type.is_empty() {
            short_name.to_string()
        } else {
            format!("{} ({})", self.facility_type, short_name)
        }
    }
}

pub fn parse_relays(text: &str) -> Result<Vec<RelayFacility>, DataError> {
    Ok(serde_json::from_str(text)?)
}

pub fn load_relays<P: AsRef<Path>>(path: P) -> Result<Vec<RelayFacility>, DataError> {
    let text = fs::read_to_string(path)?;
    parse_relays(&text)
}

/// Maps relay ids (starting at `relay_start`) to their descriptions.
pub fn relay_labels(facilities: &[RelayFacility], relay_start: Option<usize>) -> HashMap<usize, String> {
    let Some(start) = relay_start else {
        return HashMap::new();
    };
    facilities
        .iter()
        .enumerate()
        .map(|(i, facility)| (start + i, facility.label()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::io::Write;

    #[test]
    fn parses_clean_feed() {
        let points = parse_feed("[[1.5, -2.0, 12.3], [0, 0, 0]]").expect("feed");
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], GeoPoint::new(1.5, -2.0, 12.3));
    }

    #[test]
    fn null_components_become_nan() {
        let points = parse_feed("[[null, 4.0, 1.0], [2.0]]").expect("feed");
        assert!(points[0].lat.is_nan());
        assert_eq!(points[0].lon, 4.0);
        assert!(points[1].lon.is_nan() && points[1].altitude_km.is_nan());
    }

    #[test]
    fn sanitizes_non_json_tokens() {
        let text = "[\n  [1.0, 2.0, 3.0],\n  [NaN, -Infinity, Infinity],\n  [4.0, 5.0, 6.0]\n]\n";
        let points = parse_feed(text).expect("feed");
        assert_eq!(points.len(), 3);
        assert!(!points[1].is_finite());
        assert_eq!(points[2], GeoPoint::new(4.0, 5.0, 6.0));
    }

    #[test]
    fn salvages_entries_around_junk() {
        let text = "[\n[1.0, 2.0, 3.0],\n[NaN, 1.0, 2.0],\ngarbage here\n";
        let points = parse_feed(text).expect("feed");
        assert_eq!(points.len(), 2);
        assert!(points[1].lat.is_nan());
        assert!(parse_feed("[[NaN, 1.0, 2.0]]").expect("feed")[0].lat.is_nan());
    }

    #[test]
    fn unsalvageable_feed() {
        assert!(matches!(parse_feed("<html>oops</html>"), Ok(p) if p.is_empty()));
        assert!(matches!(parse_feed("[[1.0, \"x\", 2.0]]"), Err(DataError::Json(_))));
    }

    #[test]
    fn relay_facility_format() {
        let text = r#"[{"lat": 40.7589, "lon": -73.9851, "name": "New York, NY - Satellite Uplink Facility",
                        "callsign": "KA2XYZ", "type": "Earth Station", "height": 150}]"#;
        let relays = parse_relays(text).expect("relays");
        assert_eq!(relays[0].label(), "Earth Station (New York, NY)");
        assert_approx_eq!(relays[0].position().altitude_km, 0.04572, 1e-9);
        assert_eq!(relays[0].callsign.as_deref(), Some("KA2XYZ"));

        let labels = relay_labels(&relays, Some(5));
        assert_eq!(labels.get(&5).map(String::as_str), Some("Earth Station (New York, NY)"));
        assert!(relay_labels(&relays, None).is_empty());
    }

    #[test]
    fn loads_relays_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"[{{"lat": 1.0, "lon": 2.0, "name": "Site"}}]"#).expect("write");
        let relays = load_relays(file.path()).expect("relays");
        assert_eq!(relays.len(), 1);
        assert_eq!(relays[0].height_ft, 0.0);
        assert_eq!(relays[0].label(), "Site");
        assert!(matches!(load_relays("/nonexistent/relays.json"), Err(DataError::Io(_))));
    }
}
