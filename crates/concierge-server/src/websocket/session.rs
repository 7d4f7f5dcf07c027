//! WebSocket session lifecycle — handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use concierge_core::ConnectionId;

use crate::rpc::context::RpcContext;
use crate::rpc::registry::MethodRegistry;
use crate::rpc::types::RpcEvent;

use super::connection::ClientConnection;
use super::handler::handle_message;

/// Per-connection tuning, derived from server settings.
#[derive(Clone, Copy, Debug)]
pub struct SessionLimits {
    /// Interval between Ping frames.
    pub ping_interval: Duration,
    /// Disconnect after this long without a pong.
    pub pong_timeout: Duration,
    /// Outbound channel depth.
    pub outbox_capacity: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            ping_interval: Duration::from_secs(30),
            pong_timeout: Duration::from_secs(60),
            outbox_capacity: 256,
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Sends a `connection.established` event with the connection ID
/// 2. Dispatches incoming text frames as RPC requests
/// 3. Forwards outbound events/responses via the send channel
/// 4. Sends periodic Ping frames and disconnects unresponsive clients
/// 5. On disconnect, unwinds all engine state exactly once
#[instrument(skip_all, fields(conn_id = %conn_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    conn_id: ConnectionId,
    registry: Arc<MethodRegistry>,
    ctx: Arc<RpcContext>,
    limits: SessionLimits,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<String>>(limits.outbox_capacity);
    let connection = Arc::new(ClientConnection::new(conn_id.clone(), send_tx));

    let connection_start = std::time::Instant::now();
    info!("client connected");
    counter!("ws_connections_total").increment(1);
    gauge!("ws_connections_active").increment(1.0);

    ctx.registry.add(Arc::clone(&connection));

    let greeting = RpcEvent::new(
        "connection.established",
        None,
        Some(json!({ "connectionId": conn_id })),
    );
    if let Ok(json) = serde_json::to_string(&greeting) {
        let _ = ws_tx.send(Message::Text(json.into())).await;
    }

    // Outbound forwarder with periodic Ping frames.
    let outbound_conn = Arc::clone(&connection);
    let outbound = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(limits.ping_interval);
        // Skip the immediate first tick
        let _ = ticker.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    match msg {
                        Some(text) => {
                            if ws_tx.send(Message::Text(text.as_str().into())).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if !outbound_conn.check_alive()
                        && outbound_conn.last_pong_elapsed() > limits.pong_timeout
                    {
                        warn!(
                            "client unresponsive for {:?}, disconnecting",
                            limits.pong_timeout
                        );
                        break;
                    }
                    if ws_tx.send(Message::Ping(vec![].into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    // Inbound loop.
    while let Some(Ok(msg)) = ws_rx.next().await {
        let text = match msg {
            Message::Text(ref t) => Some(t.to_string()),
            Message::Binary(ref data) => match std::str::from_utf8(data) {
                Ok(s) => Some(s.to_owned()),
                Err(_) => {
                    info!(len = data.len(), "received non-UTF8 binary frame");
                    None
                }
            },
            Message::Close(_) => {
                info!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {
                connection.mark_alive();
                None
            }
        };

        let Some(text) = text else { continue };
        connection.mark_alive();

        let handled = handle_message(&text, &conn_id, &registry, &ctx).await;
        if !connection.send_json(&handled.response) {
            info!(
                method = handled.method,
                "failed to enqueue response (channel full or closed)"
            );
        }
    }

    // Unwind: presence, pending requests, and sessions tied to this handle.
    info!("client disconnected");
    counter!("ws_disconnections_total").increment(1);
    gauge!("ws_connections_active").decrement(1.0);
    histogram!("ws_connection_duration_seconds").record(connection_start.elapsed().as_secs_f64());
    outbound.abort();
    ctx.registry.remove(&conn_id);
    ctx.forget_conversation(&conn_id);
    ctx.coordinator.handle_disconnect(&conn_id);
}
