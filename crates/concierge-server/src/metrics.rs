//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the global Prometheus metrics recorder.
///
/// Returns the `PrometheusHandle` used to render the `/metrics` endpoint.
/// Call once at startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric name constants to avoid typos across modules.

/// RPC requests total (counter, labels: method).
pub const RPC_REQUESTS_TOTAL: &str = "rpc_requests_total";
/// RPC errors total (counter, labels: method, error_type).
pub const RPC_ERRORS_TOTAL: &str = "rpc_errors_total";
/// RPC request duration seconds (histogram, labels: method).
pub const RPC_REQUEST_DURATION_SECONDS: &str = "rpc_request_duration_seconds";
/// WebSocket connections opened total (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket disconnections total (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Active WebSocket connections (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connection lifetime seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Outbound messages dropped on full channels (counter).
pub const WS_SEND_DROPS_TOTAL: &str = "ws_send_drops_total";
