//! Call request lifecycle methods.

use async_trait::async_trait;
use serde_json::{Value, json};

use concierge_core::{CallSessionId, ConnectionId, RequestId};

use crate::rpc::context::RpcContext;
use crate::rpc::errors::{RpcError, optional_str, require_str};
use crate::rpc::registry::MethodHandler;

use super::require_params;

/// `call.request` — place a call request at a staff member.
///
/// The caller is registered as a visitor under the supplied name before the
/// request is placed, so later teardown events reach the right party with
/// the right label.
pub struct CallRequestHandler;

#[async_trait]
impl MethodHandler for CallRequestHandler {
    async fn handle(
        &self,
        caller: &ConnectionId,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let params = require_params(params)?;
        let target = require_str(&params, "target")?;
        let requester_name = optional_str(&params, "requesterName");
        let purpose = optional_str(&params, "purpose");

        ctx.coordinator
            .register_visitor(caller.clone(), requester_name);
        let receipt = ctx
            .coordinator
            .request_call(target, requester_name, purpose, Some(caller.clone()))?;

        Ok(json!({
            "requestId": receipt.request_id,
            "queued": receipt.queued,
            "staffName": receipt.staff_name,
        }))
    }
}

/// `call.respond` — accept or decline a pending request.
pub struct CallRespondHandler;

#[async_trait]
impl MethodHandler for CallRespondHandler {
    async fn handle(
        &self,
        caller: &ConnectionId,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let params = require_params(params)?;
        let request_id = RequestId::from(require_str(&params, "requestId")?);
        let accept = params
            .get("accept")
            .and_then(Value::as_bool)
            .ok_or_else(|| RpcError::InvalidParams {
                message: "missing or non-boolean field 'accept'".into(),
            })?;

        let session_id = ctx
            .coordinator
            .respond_to_request(&request_id, accept, caller)?;

        Ok(json!({
            "requestId": request_id,
            "accepted": accept,
            "sessionId": session_id,
        }))
    }
}

/// `session.end` — hang up an active session.
pub struct SessionEndHandler;

#[async_trait]
impl MethodHandler for SessionEndHandler {
    async fn handle(
        &self,
        caller: &ConnectionId,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let params = require_params(params)?;
        let session_id = CallSessionId::from(require_str(&params, "sessionId")?);
        let reason = params.get("reason").and_then(Value::as_str);

        ctx.coordinator.end_session(&session_id, caller, reason)?;

        Ok(json!({ "ended": true }))
    }
}
