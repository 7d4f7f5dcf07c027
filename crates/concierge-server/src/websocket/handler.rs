//! Inbound frame parsing and RPC dispatch.

use tracing::debug;

use concierge_core::ConnectionId;

use crate::rpc::context::RpcContext;
use crate::rpc::errors;
use crate::rpc::registry::MethodRegistry;
use crate::rpc::types::{RpcRequest, RpcResponse};

/// Outcome of processing one inbound frame.
pub struct HandledMessage {
    /// Method name, or `"<parse-error>"` when the frame was not a valid
    /// request.
    pub method: String,
    /// The response to send back.
    pub response: RpcResponse,
}

/// Parse one text frame as an RPC request and dispatch it.
pub async fn handle_message(
    text: &str,
    caller: &ConnectionId,
    registry: &MethodRegistry,
    ctx: &RpcContext,
) -> HandledMessage {
    let request: RpcRequest = match serde_json::from_str(text) {
        Ok(req) => req,
        Err(err) => {
            debug!(caller = %caller, error = %err, "malformed RPC frame");
            return HandledMessage {
                method: "<parse-error>".to_owned(),
                response: RpcResponse::error(
                    "",
                    errors::INVALID_PARAMS,
                    format!("malformed request: {err}"),
                ),
            };
        }
    };

    let method = request.method.clone();
    let response = registry.dispatch(caller, request, ctx).await;
    HandledMessage { method, response }
}
