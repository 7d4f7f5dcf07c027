//! `ConciergeServer` — Axum HTTP + WebSocket server.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use concierge_core::ConnectionId;

use crate::health::{self, HealthResponse};
use crate::http;
use crate::metrics;
use crate::rpc::context::RpcContext;
use crate::rpc::registry::MethodRegistry;
use crate::settings::Settings;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::{SessionLimits, run_ws_session};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Engine, connection registry, assistant, and credentials.
    pub ctx: Arc<RpcContext>,
    /// RPC method registry.
    pub registry: Arc<MethodRegistry>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus render handle, when the recorder is installed.
    pub metrics: Option<PrometheusHandle>,
    /// Per-connection transport tuning.
    pub limits: SessionLimits,
    /// Max inbound WebSocket frame size in bytes.
    pub max_message_size: usize,
}

/// The reception kiosk server.
pub struct ConciergeServer {
    settings: Settings,
    ctx: Arc<RpcContext>,
    registry: Arc<MethodRegistry>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl ConciergeServer {
    /// Create a new server over a fully wired context and registry.
    #[must_use]
    pub fn new(settings: Settings, ctx: Arc<RpcContext>, registry: MethodRegistry) -> Self {
        Self {
            settings,
            ctx,
            registry: Arc::new(registry),
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Attach an installed Prometheus recorder handle, enabling `/metrics`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let server = &self.settings.server;
        let state = AppState {
            ctx: Arc::clone(&self.ctx),
            registry: Arc::clone(&self.registry),
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
            limits: SessionLimits {
                ping_interval: Duration::from_secs(server.heartbeat_interval_secs),
                pong_timeout: Duration::from_secs(server.heartbeat_timeout_secs),
                outbox_capacity: server.outbox_capacity,
            },
            max_message_size: server.max_message_size,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/ws", get(ws_handler))
            .route("/api/call-requests", post(http::submit_call_request))
            .route("/api/staff", get(http::list_staff))
            .route("/api/staff/{id}/reachability", get(http::staff_reachability))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind and serve until the shutdown token fires.
    pub async fn run(&self) -> std::io::Result<()> {
        let addr = format!(
            "{}:{}",
            self.settings.server.host, self.settings.server.port
        );
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(addr = %listener.local_addr()?, "listening");

        let token = self.shutdown.token();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Get the method registry.
    pub fn registry(&self) -> &Arc<MethodRegistry> {
        &self.registry
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let coordinator = &state.ctx.coordinator;
    Json(health::health_check(
        state.start_time,
        state.ctx.registry.connection_count(),
        coordinator.active_session_count(),
        coordinator.waiting_request_count(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => metrics::render(&handle).into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}

/// GET /ws — upgrade and hand the socket to the session loop.
async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                ConnectionId::new(),
                state.registry,
                state.ctx,
                state.limits,
            )
        })
}
