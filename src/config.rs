use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::GeoPoint;

/// Ground station every route is measured from.
pub const DEFAULT_ORIGIN: GeoPoint = GeoPoint::new(37.419, -122.106, 0.0);

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 500.0;

pub const DEFAULT_FEED_BASE_URL: &str = "https://a.windbornesystems.com/treasure";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("feed hour {0} is outside 0..=23")]
    HourOutOfRange(u8),
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

/// Hour of the day selecting which feed snapshot to request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct FeedHour(u8);

impl FeedHour {
    pub fn new(hour: u8) -> Result<Self, ConfigError> {
        if hour > 23 {
            return Err(ConfigError::HourOutOfRange(hour));
        }
        Ok(FeedHour(hour))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for FeedHour {
    type Error = ConfigError;

    fn try_from(hour: u8) -> Result<Self, Self::Error> {
        FeedHour::new(hour)
    }
}

impl From<FeedHour> for u8 {
    fn from(hour: FeedHour) -> Self {
        hour.0
    }
}

/// Two-digit form used in feed URLs and file names.
impl fmt::Display for FeedHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

/// How candidate link pairs are enumerated when building the graph.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStrategy {
    #[default]
    Exhaustive,
    KdTree,
}

impl FromStr for LinkStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exhaustive" => Ok(LinkStrategy::Exhaustive),
            "kd_tree" | "kdtree" => Ok(LinkStrategy::KdTree),
            _ => Err(ConfigError::InvalidValue {
                key: "SKYRELAY_LINK_STRATEGY",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub origin: GeoPoint,
    pub max_distance_km: f64,
    pub hour: FeedHour,
    pub relay_enabled: bool,
    pub strategy: LinkStrategy,
    pub relay_file: Option<PathBuf>,
    pub feed_base_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            origin: DEFAULT_ORIGIN,
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            hour: FeedHour::default(),
            relay_enabled: false,
            strategy: LinkStrategy::default(),
            relay_file: None,
            feed_base_url: DEFAULT_FEED_BASE_URL.to_string(),
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `SKYRELAY_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = EngineConfig::default();

        if let Some(raw) = lookup("SKYRELAY_MAX_DISTANCE_KM") {
            config.max_distance_km = parse_value("SKYRELAY_MAX_DISTANCE_KM", &raw)?;
        }
        if let Some(raw) = lookup("SKYRELAY_HOUR") {
            config.hour = FeedHour::new(parse_value("SKYRELAY_HOUR", &raw)?)?;
        }
        if let Some(raw) = lookup("SKYRELAY_RELAYS") {
            config.relay_enabled = parse_flag("SKYRELAY_RELAYS", &raw)?;
        }
        if let Some(raw) = lookup("SKYRELAY_RELAY_FILE") {
            config.relay_file = Some(PathBuf::from(raw));
        }
        if let Some(raw) = lookup("SKYRELAY_LINK_STRATEGY") {
            config.strategy = raw.parse()?;
        }
        if let Some(raw) = lookup("SKYRELAY_FEED_URL") {
            config.feed_base_url = raw.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// URL of the hourly position snapshot.
    pub fn feed_url(&self) -> String {
        format!("{}/{}.json", self.feed_base_url, self.hour)
    }
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: raw.to_string(),
    })
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = EngineConfig::from_lookup(lookup(&[])).expect("config");
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_distance_km, 500.0);
        assert_eq!(
            config.feed_url(),
            "https://a.windbornesystems.com/treasure/00.json"
        );
    }

    #[test]
    fn environment_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SKYRELAY_MAX_DISTANCE_KM", "750.5"),
            ("SKYRELAY_HOUR", "7"),
            ("SKYRELAY_RELAYS", "1"),
            ("SKYRELAY_LINK_STRATEGY", "kd_tree"),
            ("SKYRELAY_FEED_URL", "http://localhost:9000/feed/"),
        ]))
        .expect("config");
        assert_eq!(config.max_distance_km, 750.5);
        assert_eq!(config.hour.get(), 7);
        assert!(config.relay_enabled);
        assert_eq!(config.strategy, LinkStrategy::KdTree);
        assert_eq!(config.feed_url(), "http://localhost:9000/feed/07.json");
    }

    #[test]
    fn rejects_bad_values() {
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[("SKYRELAY_HOUR", "24")])),
            Err(ConfigError::HourOutOfRange(24))
        );
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("SKYRELAY_MAX_DISTANCE_KM", "far")])),
            Err(ConfigError::InvalidValue { key: "SKYRELAY_MAX_DISTANCE_KM", .. })
        ));
        assert!("bogus".parse::<LinkStrategy>().is_err());
    }

    #[test]
    fn feed_hour_deserialization_is_checked() {
        let hour: FeedHour = serde_json::from_str("23").expect("hour");
        assert_eq!(hour.to_string(), "23");
        assert!(serde_json::from_str::<FeedHour>("42").is_err());
    }
}
