//! Visitor chat surface.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use concierge_core::ConnectionId;
use concierge_engine::{reply_or_fallback, trigger};

use crate::rpc::context::RpcContext;
use crate::rpc::errors::{RpcError, optional_str, require_str};
use crate::rpc::registry::MethodHandler;

use super::require_params;

/// `chat.message` — one visitor message in, one assistant reply out.
///
/// The reply is scanned for the call-trigger phrase; when it names a
/// resolvable staff member, a call request is placed on the visitor's
/// behalf in the same turn and reported alongside the reply. A reply that
/// names nobody resolvable is returned as-is. While the caller is in a
/// live call the assistant still answers, but trigger phrases are ignored
/// so chat cannot start a second call mid-session.
pub struct ChatMessageHandler;

#[async_trait]
impl MethodHandler for ChatMessageHandler {
    async fn handle(
        &self,
        caller: &ConnectionId,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let params = require_params(params)?;
        let text = require_str(&params, "text")?;
        let visitor_name = optional_str(&params, "visitorName");

        if !visitor_name.trim().is_empty() {
            ctx.coordinator.register_visitor(caller.clone(), visitor_name);
            ctx.with_conversation(caller, |c| {
                c.visitor_name = Some(visitor_name.trim().to_owned());
            });
        }

        let in_call = ctx.coordinator.is_in_session(caller);
        let context = ctx.with_conversation(caller, |c| {
            c.in_call = in_call;
            c.clone()
        });
        let reply = reply_or_fallback(ctx.assistant.as_ref(), text, &context).await;
        ctx.with_conversation(caller, |c| c.push_turn(text, reply.clone()));

        // No second call is started while the visitor is already in one.
        let call_request = if in_call {
            Value::Null
        } else {
            Self::call_from_reply(caller, &reply, &context, visitor_name, ctx)
        };

        Ok(json!({
            "reply": reply,
            "callRequest": call_request,
        }))
    }
}

impl ChatMessageHandler {
    fn call_from_reply(
        caller: &ConnectionId,
        reply: &str,
        context: &concierge_engine::ConversationContext,
        visitor_name: &str,
        ctx: &RpcContext,
    ) -> Value {
        match trigger::detect_call_target(reply) {
            Some(target) => {
                let label = context
                    .visitor_name
                    .as_deref()
                    .unwrap_or(visitor_name)
                    .to_owned();
                match ctx.coordinator.request_call(
                    target,
                    &label,
                    "video call via assistant",
                    Some(caller.clone()),
                ) {
                    Ok(receipt) => {
                        info!(target, request = %receipt.request_id, "assistant reply triggered a call");
                        json!({
                            "requestId": receipt.request_id,
                            "queued": receipt.queued,
                            "staffName": receipt.staff_name,
                        })
                    }
                    Err(err) => {
                        warn!(target, error = %err, "assistant named an unresolvable call target");
                        Value::Null
                    }
                }
            }
            None => Value::Null,
        }
    }
}
