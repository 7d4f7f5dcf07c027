//! RPC wire-format types for the kiosk WebSocket protocol.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use concierge_core::Outbound;

/// Incoming RPC request from a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRequest {
    /// Unique request identifier, echoed in the response.
    pub id: String,
    /// Method name (e.g. `call.request`).
    pub method: String,
    /// Optional parameters object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Outgoing RPC response to a client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcResponse {
    /// Echoed request identifier.
    pub id: String,
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload (present when `success == true`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error payload (present when `success == false`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

/// Structured error body inside an `RpcResponse`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RpcErrorBody {
    /// Machine-readable error code (e.g. `STAFF_NOT_FOUND`).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional structured details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Server-pushed event.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcEvent {
    /// Event type (e.g. `call.incoming`).
    #[serde(rename = "type")]
    pub event_type: String,
    /// Associated call session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// ISO-8601 timestamp.
    pub timestamp: String,
    /// Event payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcResponse {
    /// Build a success response.
    pub fn success(id: impl Into<String>, result: Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(id: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            result: None,
            error: Some(RpcErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            }),
        }
    }
}

impl RpcEvent {
    /// Create a new event with the current UTC timestamp.
    pub fn new(event_type: impl Into<String>, session_id: Option<String>, data: Option<Value>) -> Self {
        Self {
            event_type: event_type.into(),
            session_id,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            data,
        }
    }

    /// Convert an engine event into its wire envelope.
    #[must_use]
    pub fn from_outbound(event: &Outbound) -> Self {
        let session_id = event.session_id().map(|id| id.as_str().to_owned());
        let data = match event {
            Outbound::IncomingCallRequest {
                request_id,
                requester_label,
                purpose,
                ringing,
            } => json!({
                "requestId": request_id,
                "requesterLabel": requester_label,
                "purpose": purpose,
                "ringing": ringing,
            }),
            Outbound::CallRequestQueued {
                request_id,
                staff_name,
            } => json!({
                "requestId": request_id,
                "staffName": staff_name,
            }),
            Outbound::CallAccepted {
                request_id,
                other_party,
                ..
            } => json!({
                "requestId": request_id,
                "otherParty": other_party,
            }),
            Outbound::CallRejected { request_id, reason } => json!({
                "requestId": request_id,
                "reason": reason,
            }),
            Outbound::Signal { kind, payload, .. } => json!({
                "kind": kind,
                "payload": payload,
            }),
            Outbound::SessionEnded {
                reason, ended_by, ..
            } => json!({
                "reason": reason,
                "endedBy": ended_by,
            }),
            Outbound::CallCompleted { duration_secs, .. } => json!({
                "durationSecs": duration_secs,
            }),
            Outbound::StaffReachable { entries } => json!({
                "staff": entries,
            }),
            Outbound::AssistantResumed { message } => json!({
                "message": message,
            }),
        };
        Self::new(event.event_type(), session_id, Some(data))
    }
}
