//! Call request and call session records and their state machines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{CallSessionId, ConnectionId, RequestId, StaffId};

/// Lifecycle of a call request. Transitions are one-way:
/// `Pending → Accepted`, `Pending → Rejected`, or `Pending → Abandoned`
/// (requester disconnected before a decision). The three non-pending states
/// are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestStatus {
    /// Awaiting a staff decision.
    Pending,
    /// Staff accepted; a session was created.
    Accepted,
    /// Staff declined.
    Rejected,
    /// Requester disconnected before a decision.
    Abandoned,
}

impl RequestStatus {
    /// Whether this status permits no further transitions.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A pending ask to connect a requester to a specific staff identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    /// Unique request identifier.
    pub id: RequestId,
    /// Target staff member.
    pub staff_id: StaffId,
    /// Human-readable requester name (e.g. the visitor's name).
    pub requester_label: String,
    /// Stated purpose of the call.
    pub purpose: String,
    /// Originating connection, when the requester has a live socket.
    /// `None` for requests submitted over the HTTP surface.
    pub requester: Option<ConnectionId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: RequestStatus,
}

impl CallRequest {
    /// Create a new pending request.
    #[must_use]
    pub fn new(
        staff_id: StaffId,
        requester_label: impl Into<String>,
        purpose: impl Into<String>,
        requester: Option<ConnectionId>,
    ) -> Self {
        Self {
            id: RequestId::new(),
            staff_id,
            requester_label: requester_label.into(),
            purpose: purpose.into(),
            requester,
            created_at: Utc::now(),
            status: RequestStatus::Pending,
        }
    }
}

/// Lifecycle of a paired session. `Connecting` covers the gap between
/// acceptance and the first relayed offer; `Ended` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    /// Created, no offer relayed yet.
    Connecting,
    /// Media negotiation under way or complete.
    InProgress,
    /// Terminated.
    Ended,
}

/// An active paired connection between exactly two parties, used for
/// signaling relay. Created the instant a request is accepted; destroyed on
/// explicit end or either party's disconnect.
#[derive(Clone, Debug)]
pub struct CallSession {
    /// Unique session identifier (always distinct from the request ID).
    pub id: CallSessionId,
    /// The request this session was promoted from.
    pub request_id: RequestId,
    /// The staff party.
    pub staff_id: StaffId,
    /// The staff party's connection.
    pub staff_conn: ConnectionId,
    /// The requester party's connection.
    pub requester_conn: ConnectionId,
    /// When the session was created.
    pub started_at: DateTime<Utc>,
    /// Current lifecycle status.
    pub status: SessionStatus,
}

impl CallSession {
    /// Pair the two parties of an accepted request into a new session.
    #[must_use]
    pub fn new(request_id: RequestId, staff_id: StaffId, staff_conn: ConnectionId, requester_conn: ConnectionId) -> Self {
        Self {
            id: CallSessionId::new(),
            request_id,
            staff_id,
            staff_conn,
            requester_conn,
            started_at: Utc::now(),
            status: SessionStatus::Connecting,
        }
    }

    /// Whether the given connection is one of the two parties.
    #[must_use]
    pub fn is_party(&self, conn: &ConnectionId) -> bool {
        &self.staff_conn == conn || &self.requester_conn == conn
    }

    /// The counterpart of the given party, if the party belongs to this
    /// session.
    #[must_use]
    pub fn other_party(&self, conn: &ConnectionId) -> Option<&ConnectionId> {
        if conn == &self.staff_conn {
            Some(&self.requester_conn)
        } else if conn == &self.requester_conn {
            Some(&self.staff_conn)
        } else {
            None
        }
    }

    /// Elapsed seconds since the session started.
    #[must_use]
    pub fn duration_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}

/// The three WebRTC signaling message kinds. The relay treats all three
/// identically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    /// SDP offer.
    Offer,
    /// SDP answer.
    Answer,
    /// ICE candidate.
    IceCandidate,
}
