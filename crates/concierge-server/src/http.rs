//! REST surface for the kiosk's unauthenticated side.
//!
//! The contact form posts here when a visitor would rather not chat; the
//! kiosk front-end also polls staff reachability to grey out call buttons.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Deserialize;
use serde_json::json;

use concierge_core::StaffId;

use crate::server::AppState;

/// Body of `POST /api/call-requests`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequestForm {
    /// Staff member to reach, by ID, name fragment, or contact address.
    pub target: String,
    /// Visitor's name, if they gave one.
    #[serde(default)]
    pub requester_name: String,
    /// Reason for the call.
    #[serde(default)]
    pub purpose: String,
}

/// `POST /api/call-requests` — place a call request without a live
/// WebSocket. The request carries no requester connection, so an accepted
/// call cannot be paired and will be reported unreachable; the queue entry
/// still tells staff someone asked for them.
pub async fn submit_call_request(
    State(state): State<AppState>,
    Json(form): Json<CallRequestForm>,
) -> Response {
    match state
        .ctx
        .coordinator
        .request_call(&form.target, &form.requester_name, &form.purpose, None)
    {
        Ok(receipt) => Json(json!({
            "requestId": receipt.request_id,
            "queued": receipt.queued,
            "staffName": receipt.staff_name,
        }))
        .into_response(),
        Err(err) => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": { "code": err.code(), "message": err.to_string() }
            })),
        )
            .into_response(),
    }
}

/// `GET /api/staff` — the full roster with live reachability.
pub async fn list_staff(State(state): State<AppState>) -> Response {
    let coordinator = &state.ctx.coordinator;
    let staff: Vec<_> = coordinator
        .directory()
        .entries()
        .iter()
        .map(|identity| {
            json!({
                "staffId": identity.id,
                "displayName": identity.display_name,
                "department": identity.department,
                "reachable": coordinator.is_reachable(&identity.id),
            })
        })
        .collect();
    Json(json!({ "staff": staff })).into_response()
}

/// `GET /api/staff/{id}/reachability` — whether one staff member has a
/// live console right now.
pub async fn staff_reachability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let staff_id = StaffId::from(id.as_str());
    let coordinator = &state.ctx.coordinator;
    match coordinator.directory().get(&staff_id) {
        Some(identity) => Json(json!({
            "staffId": identity.id,
            "reachable": coordinator.is_reachable(&staff_id),
        }))
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": {
                    "code": "STAFF_NOT_FOUND",
                    "message": format!("no staff member with id {id}"),
                }
            })),
        )
            .into_response(),
    }
}
