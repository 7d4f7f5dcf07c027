//! Outbound event vocabulary.
//!
//! [`Outbound`] is the complete set of server-pushed notifications the
//! engine can produce. The engine emits these as plain data; the transport
//! layer owns the conversion to its wire envelope. Keeping the vocabulary
//! here lets engine tests assert on typed events instead of JSON strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::call::SignalKind;
use crate::ids::{CallSessionId, ConnectionId, RequestId, StaffId};

/// Minimal description of the counterpart in an accepted call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyInfo {
    /// Display label (visitor name or staff display name).
    pub label: String,
    /// Department, when the party is a staff member.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

/// One entry of the reachable-staff broadcast.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReachableStaff {
    /// Staff identifier.
    pub id: StaffId,
    /// Display name.
    pub name: String,
    /// Department.
    pub department: String,
}

/// A server-pushed notification addressed to one connection (or broadcast).
#[derive(Clone, Debug, PartialEq)]
pub enum Outbound {
    /// A call request is ringing at (or queued for) this staff connection.
    IncomingCallRequest {
        /// The request awaiting a decision.
        request_id: RequestId,
        /// Who is asking.
        requester_label: String,
        /// Why.
        purpose: String,
        /// `true` for live delivery (play a ring/alert), `false` when the
        /// request is being replayed from the pending queue at login.
        ringing: bool,
    },
    /// The requester's target is unreachable; the request was queued.
    CallRequestQueued {
        /// The queued request.
        request_id: RequestId,
        /// Display name of the offline target.
        staff_name: String,
    },
    /// A request was accepted and promoted into a session.
    CallAccepted {
        /// The fresh session (distinct from the request ID).
        session_id: CallSessionId,
        /// The request that was accepted.
        request_id: RequestId,
        /// The other party, as seen by the recipient.
        other_party: PartyInfo,
    },
    /// A request was declined.
    CallRejected {
        /// The declined request.
        request_id: RequestId,
        /// Human-readable reason.
        reason: String,
    },
    /// A signaling message relayed verbatim from the other party.
    Signal {
        /// The session this signal belongs to.
        session_id: CallSessionId,
        /// offer / answer / ice-candidate.
        kind: SignalKind,
        /// Untouched payload.
        payload: Value,
    },
    /// The session was terminated.
    SessionEnded {
        /// The ended session.
        session_id: CallSessionId,
        /// Why it ended.
        reason: String,
        /// Label of whoever ended it (`"system"` for disconnects).
        ended_by: String,
    },
    /// Terminal bookkeeping notice for the visitor side: the call completed.
    CallCompleted {
        /// The completed session.
        session_id: CallSessionId,
        /// Call duration in seconds.
        duration_secs: i64,
    },
    /// Updated list of staff with live connections.
    StaffReachable {
        /// Currently reachable staff.
        entries: Vec<ReachableStaff>,
    },
    /// The assistant returned to unrestricted mode (sent to the visitor
    /// after a rejection or a completed call).
    AssistantResumed {
        /// Friendly notice to display.
        message: String,
    },
}

impl Outbound {
    /// Stable wire event-type string for this notification.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::IncomingCallRequest { .. } => "call.incoming",
            Self::CallRequestQueued { .. } => "call.queued",
            Self::CallAccepted { .. } => "call.accepted",
            Self::CallRejected { .. } => "call.rejected",
            Self::Signal { .. } => "signal.relay",
            Self::SessionEnded { .. } => "session.ended",
            Self::CallCompleted { .. } => "call.completed",
            Self::StaffReachable { .. } => "staff.reachable",
            Self::AssistantResumed { .. } => "assistant.resumed",
        }
    }

    /// The session this event concerns, if any.
    #[must_use]
    pub fn session_id(&self) -> Option<&CallSessionId> {
        match self {
            Self::CallAccepted { session_id, .. }
            | Self::Signal { session_id, .. }
            | Self::SessionEnded { session_id, .. }
            | Self::CallCompleted { session_id, .. } => Some(session_id),
            _ => None,
        }
    }
}

/// An [`Outbound`] event addressed to a specific connection.
#[derive(Clone, Debug, PartialEq)]
pub struct Delivery {
    /// Recipient connection.
    pub target: ConnectionId,
    /// The event to deliver.
    pub event: Outbound,
}

impl Delivery {
    /// Address an event to a connection.
    #[must_use]
    pub fn to(target: ConnectionId, event: Outbound) -> Self {
        Self { target, event }
    }
}
