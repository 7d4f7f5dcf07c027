//! Live connection registry and event fan-out.
//!
//! Holds every connected client and implements the engine's [`Outbox`], so
//! coordinator effects flow straight to sockets. Uses a synchronous lock:
//! the engine delivers while holding no async context, and sends are
//! non-blocking `try_send` handoffs to each connection's write task.

use std::collections::HashMap;
use std::sync::Arc;

use metrics::counter;
use parking_lot::RwLock;
use tracing::{debug, warn};

use concierge_core::{ConnectionId, Outbound};
use concierge_engine::Outbox;

use crate::rpc::types::RpcEvent;

use super::connection::ClientConnection;

/// Connected clients indexed by connection ID.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, Arc<ClientConnection>>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection.
    pub fn add(&self, connection: Arc<ClientConnection>) {
        let _ = self
            .connections
            .write()
            .insert(connection.id.clone(), connection);
    }

    /// Remove a connection by ID.
    pub fn remove(&self, connection_id: &ConnectionId) {
        let _ = self.connections.write().remove(connection_id);
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.read().len()
    }

    /// Send a pre-built wire event to one connection.
    pub fn send_event(&self, target: &ConnectionId, event: &RpcEvent) {
        let Ok(json) = serde_json::to_string(event) else {
            warn!(event_type = %event.event_type, "failed to serialize event");
            return;
        };
        let conns = self.connections.read();
        let Some(conn) = conns.get(target) else {
            debug!(target = %target, event_type = %event.event_type, "event for unknown connection dropped");
            return;
        };
        if !conn.send(Arc::new(json)) {
            counter!("ws_send_drops_total").increment(1);
            warn!(conn_id = %conn.id, event_type = %event.event_type, "failed to send event to client");
        }
    }

    /// Send a pre-built wire event to every connection.
    pub fn send_event_all(&self, event: &RpcEvent) {
        let Ok(json) = serde_json::to_string(event) else {
            warn!(event_type = %event.event_type, "failed to serialize event");
            return;
        };
        let json = Arc::new(json);
        let conns = self.connections.read();
        debug!(
            event_type = %event.event_type,
            recipients = conns.len(),
            "broadcast event"
        );
        for conn in conns.values() {
            if !conn.send(Arc::clone(&json)) {
                counter!("ws_send_drops_total").increment(1);
                warn!(conn_id = %conn.id, "failed to send broadcast to client");
            }
        }
    }
}

impl Outbox for ConnectionRegistry {
    fn deliver(&self, target: &ConnectionId, event: Outbound) {
        self.send_event(target, &RpcEvent::from_outbound(&event));
    }

    fn broadcast(&self, event: Outbound) {
        self.send_event_all(&RpcEvent::from_outbound(&event));
    }
}
