//! Staff authentication.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::info;

use concierge_core::{ConnectionId, EngineError};

use crate::rpc::context::RpcContext;
use crate::rpc::errors::{RpcError, require_str};
use crate::rpc::registry::MethodHandler;

use super::require_params;

/// `auth.staff` — bind the calling connection as a staff member's console.
///
/// Resolves the claimed identity against the directory, checks the shared
/// secret from the roster, then brings the staff member online (which also
/// replays any queued requests and broadcasts the reachable list).
pub struct StaffLoginHandler;

#[async_trait]
impl MethodHandler for StaffLoginHandler {
    async fn handle(
        &self,
        caller: &ConnectionId,
        params: Option<Value>,
        ctx: &RpcContext,
    ) -> Result<Value, RpcError> {
        let params = require_params(params)?;
        let identity = require_str(&params, "identity")?;
        let secret = require_str(&params, "secret")?;

        let resolved = ctx
            .coordinator
            .directory()
            .resolve(identity)
            .map_err(EngineError::from)?
            .clone();

        if !ctx.verify_secret(&resolved.id, secret) {
            info!(staff = %resolved.id, "staff login rejected: bad secret");
            return Err(RpcError::Unauthorized {
                message: "invalid credentials".into(),
            });
        }

        let identity = ctx
            .coordinator
            .staff_online(resolved.id.as_str(), caller.clone())?;

        Ok(json!({
            "staffId": identity.id,
            "displayName": identity.display_name,
            "department": identity.department,
        }))
    }
}
