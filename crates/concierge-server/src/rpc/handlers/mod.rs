//! RPC method handlers, one module per surface.

pub mod auth;
pub mod call;
pub mod chat;
pub mod signal;

use serde_json::Value;

use crate::rpc::errors::RpcError;
use crate::rpc::registry::MethodRegistry;

/// Build a registry with every method the kiosk protocol exposes.
#[must_use]
pub fn build_registry() -> MethodRegistry {
    let mut registry = MethodRegistry::new();
    registry.register("auth.staff", auth::StaffLoginHandler);
    registry.register("call.request", call::CallRequestHandler);
    registry.register("call.respond", call::CallRespondHandler);
    registry.register("session.end", call::SessionEndHandler);
    registry.register("signal.send", signal::SignalSendHandler);
    registry.register("chat.message", chat::ChatMessageHandler);
    registry
}

/// Reject requests that arrived without a params object.
pub(crate) fn require_params(params: Option<Value>) -> Result<Value, RpcError> {
    params.ok_or_else(|| RpcError::InvalidParams {
        message: "params object required".into(),
    })
}
