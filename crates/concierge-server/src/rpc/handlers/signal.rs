//! WebRTC signaling relay method.

use async_trait::async_trait;
use serde_json::{Value, json};

use concierge_core::{CallSessionId, ConnectionId, SignalKind};

use crate::rpc::context::RpcContext;
use crate::rpc::errors::{RpcError, require_str};
use crate::rpc::registry::MethodHandler;

use super::require_params;

/// `signal.send` — forward an offer/answer/candidate to the other party.
///
/// The payload is relayed untouched; the server never inspects SDP or
/// candidate contents.
pub struct SignalSendHandler;

#[async_trait]
impl MethodHandler for SignalSendHandler {
    async fn handle(
        &self,
        caller: &ConnectionId,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let params = require_params(params)?;
        let session_id = CallSessionId::from(require_str(&params, "sessionId")?);
        let kind: SignalKind = params
            .get("kind")
            .cloned()
            .ok_or_else(|| RpcError::InvalidParams {
                message: "missing field 'kind'".into(),
            })
            .and_then(|v| {
                serde_json::from_value(v).map_err(|_| RpcError::InvalidParams {
                    message: "field 'kind' must be offer, answer, or ice-candidate".into(),
                })
            })?;
        let payload = params.get("payload").cloned().unwrap_or(Value::Null);

        ctx.coordinator
            .relay_signal(&session_id, caller, kind, payload)?;

        Ok(json!({ "relayed": true }))
    }
}
