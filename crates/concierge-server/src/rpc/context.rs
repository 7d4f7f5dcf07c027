//! Shared context handed to every RPC method handler.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use concierge_core::{ConnectionId, StaffId};
use concierge_engine::{ConversationContext, Coordinator, ReplyGenerator};

use crate::websocket::registry::ConnectionRegistry;

/// Everything a method handler can reach.
pub struct RpcContext {
    /// The coordination engine.
    pub coordinator: Arc<Coordinator>,
    /// Live connection registry (also the engine's outbox).
    pub registry: Arc<ConnectionRegistry>,
    /// Reply generator for the chat surface.
    pub assistant: Arc<dyn ReplyGenerator>,
    /// Staff credential table from settings (staff id → shared secret).
    credentials: HashMap<StaffId, String>,
    /// Per-connection conversation state for the chat surface.
    conversations: Mutex<HashMap<ConnectionId, ConversationContext>>,
}

impl RpcContext {
    /// Assemble a context.
    pub fn new(
        coordinator: Arc<Coordinator>,
        registry: Arc<ConnectionRegistry>,
        assistant: Arc<dyn ReplyGenerator>,
        credentials: HashMap<StaffId, String>,
    ) -> Self {
        Self {
            coordinator,
            registry,
            assistant,
            credentials,
            conversations: Mutex::new(HashMap::new()),
        }
    }

    /// Check a staff member's shared secret.
    pub fn verify_secret(&self, staff: &StaffId, secret: &str) -> bool {
        self.credentials
            .get(staff)
            .is_some_and(|expected| expected == secret)
    }

    /// Run `f` against the caller's conversation state, creating it on
    /// first use.
    pub fn with_conversation<R>(
        &self,
        conn: &ConnectionId,
        f: impl FnOnce(&mut ConversationContext) -> R,
    ) -> R {
        let mut conversations = self.conversations.lock();
        f(conversations.entry(conn.clone()).or_default())
    }

    /// Drop the conversation state for a departed connection.
    pub fn forget_conversation(&self, conn: &ConnectionId) {
        let _ = self.conversations.lock().remove(conn);
    }
}
