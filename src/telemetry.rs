use crate::constants::METRICS_PORT_ENV_VAR;
use std::net::SocketAddr;
use tracing::{info, warn};

/// Install the Prometheus exporter when `LICENCE_ETL_METRICS_PORT` is set.
/// Without it the pipeline counters are no-ops.
pub fn init_metrics() {
    let Some(raw) = std::env::var(METRICS_PORT_ENV_VAR).ok() else {
        return;
    };
    let port: u16 = match raw.trim().parse() {
        Ok(port) => port,
        Err(_) => {
            warn!("Ignoring {}={:?}: not a port number", METRICS_PORT_ENV_VAR, raw);
            return;
        }
    };

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new().with_http_listener(addr);
    match builder.install() {
        Ok(()) => info!("Prometheus exporter listening on http://{}/metrics", addr),
        Err(e) => warn!("Prometheus exporter install failed: {}", e),
    }
}
