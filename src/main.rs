use std::collections::HashMap;

use lambda_runtime::{service_fn, Error, LambdaEvent};
use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use skyrelay_engine::config::{EngineConfig, FeedHour};
use skyrelay_engine::data::{load_relays, relay_labels, FeedPoint, RelayFacility};
use skyrelay_engine::network::Network;
use skyrelay_engine::report::{assemble, NetworkMetrics, NetworkReport, RouteView};

static CONFIG: Lazy<EngineConfig> = Lazy::new(|| {
    EngineConfig::from_env().unwrap_or_else(|err| {
        warn!("Ignoring invalid environment configuration: {err}");
        EngineConfig::default()
    })
});

/// Node snapshot plus invocation parameters; unset fields use [`CONFIG`].
#[derive(Debug, Deserialize)]
struct Snapshot {
    points: Vec<FeedPoint>,
    #[serde(default)]
    relays: Vec<RelayFacility>,
    max_distance_km: Option<f64>,
    hour: Option<FeedHour>,
    relay_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineRequest {
    Network {
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    Route {
        target: usize,
        #[serde(flatten)]
        snapshot: Snapshot,
    },
    Metrics {
        #[serde(flatten)]
        snapshot: Snapshot,
    },
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum EngineResponse {
    Network {
        hour: FeedHour,
        report: NetworkReport,
    },
    Route {
        target: usize,
        route: RouteView,
    },
    Metrics {
        hour: FeedHour,
        metrics: NetworkMetrics,
    },
    Error {
        message: String,
    },
}

fn evaluate(snapshot: Snapshot, config: &EngineConfig) -> Result<(FeedHour, NetworkReport), String> {
    let max_distance_km = snapshot.max_distance_km.unwrap_or(config.max_distance_km);
    let hour = snapshot.hour.unwrap_or(config.hour);
    let relays = if snapshot.relay_enabled.unwrap_or(config.relay_enabled) {
        resolve_relays(snapshot.relays, config)?
    } else {
        Vec::new()
    };

    let network = Network::with_origin(
        config.origin,
        snapshot.points.into_iter().map(|p| p.0),
        relays.iter().map(RelayFacility::position),
    );
    let table = network
        .route(max_distance_km, config.strategy)
        .map_err(|e| e.to_string())?;
    let labels: HashMap<usize, String> = relay_labels(&relays, network.relay_start());
    Ok((hour, assemble(&network, &table, &labels)))
}

/// Inline relays win; otherwise fall back to the configured facility file.
fn resolve_relays(inline: Vec<RelayFacility>, config: &EngineConfig) -> Result<Vec<RelayFacility>, String> {
    match (&config.relay_file, inline.is_empty()) {
        (Some(path), true) => load_relays(path)
            .map_err(|e| format!("failed to load relays from {}: {e}", path.display())),
        _ => Ok(inline),
    }
}

fn respond(req: EngineRequest, config: &EngineConfig) -> EngineResponse {
    let outcome = match req {
        EngineRequest::Network { snapshot } => {
            evaluate(snapshot, config).map(|(hour, report)| EngineResponse::Network { hour, report })
        }
        EngineRequest::Route { target, snapshot } => {
            evaluate(snapshot, config).and_then(|(_, report)| {
                report
                    .route(target)
                    .map(|route| EngineResponse::Route { target, route })
                    .ok_or_else(|| format!("Node {target} is not reachable"))
            })
        }
        EngineRequest::Metrics { snapshot } => evaluate(snapshot, config).map(|(hour, report)| {
            EngineResponse::Metrics {
                hour,
                metrics: report.metrics,
            }
        }),
    };
    outcome.unwrap_or_else(|message| EngineResponse::Error { message })
}

async fn handler(event: LambdaEvent<EngineRequest>) -> Result<EngineResponse, Error> {
    Ok(respond(event.payload, &CONFIG))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    let func = service_fn(handler);
    lambda_runtime::run(func).await
}
