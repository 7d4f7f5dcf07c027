//! The coordination core.
//!
//! A single [`Coordinator`] owns the presence table, the pending queues,
//! and the request/session registry behind one mutex. Every operation
//! follows the same discipline: take the lock once, mutate, collect the
//! resulting [`Delivery`] set, release the lock, then hand the deliveries
//! to the [`Outbox`]. No awaiting and no collaborator calls ever happen
//! under the lock; persistence and analytics are spawned after it drops.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use concierge_core::{
    CallRequest, CallSession, CallSessionId, ConnectionId, Delivery, Directory, EngineError,
    Outbound, PartyInfo, ReachableStaff, RequestId, RequestStatus, SessionStatus, SignalKind,
    StaffId, StaffIdentity,
};

use crate::analytics::{AnalyticsEvent, AnalyticsSink};
use crate::outbox::Outbox;
use crate::presence::PresenceTable;
use crate::queue::PendingQueue;
use crate::store::RecordStore;

/// Requester label used when none was supplied.
const DEFAULT_REQUESTER_LABEL: &str = "Visitor";

/// Purpose recorded when the requester left it blank.
const DEFAULT_PURPOSE: &str = "General inquiry";

/// Notice shown to the visitor when the assistant takes over again.
const RESUME_NOTICE: &str = "I'm here again if you need anything else.";

/// How long rejected and abandoned requests linger so a late
/// `call.respond` gets `ALREADY_RESOLVED` instead of `REQUEST_NOT_FOUND`.
const RESOLVED_RETENTION_SECS: i64 = 300;

/// What a connection is, once it has identified itself.
#[derive(Clone, Debug)]
enum Party {
    /// A kiosk visitor (or other requester-side connection).
    Visitor { label: String },
    /// A staff member's console.
    Staff { id: StaffId },
}

#[derive(Default)]
struct State {
    presence: PresenceTable,
    pending: PendingQueue,
    requests: HashMap<RequestId, CallRequest>,
    sessions: HashMap<CallSessionId, CallSession>,
    parties: HashMap<ConnectionId, Party>,
}

/// Outcome of placing a call request.
#[derive(Clone, Debug)]
pub struct CallReceipt {
    /// The request that was created.
    pub request_id: RequestId,
    /// `true` when the target was offline and the request is waiting.
    pub queued: bool,
    /// Resolved display name of the target.
    pub staff_name: String,
}

/// Owns all shared call state and drives every state transition.
pub struct Coordinator {
    directory: Directory,
    outbox: Arc<dyn Outbox>,
    store: Arc<dyn RecordStore>,
    analytics: Arc<dyn AnalyticsSink>,
    state: Mutex<State>,
}

impl Coordinator {
    /// Assemble a coordinator from its collaborators.
    #[must_use]
    pub fn new(
        directory: Directory,
        outbox: Arc<dyn Outbox>,
        store: Arc<dyn RecordStore>,
        analytics: Arc<dyn AnalyticsSink>,
    ) -> Self {
        Self {
            directory,
            outbox,
            store,
            analytics,
            state: Mutex::new(State::default()),
        }
    }

    /// The staff directory this coordinator resolves against.
    #[must_use]
    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Record a connection as a visitor with the given display label.
    ///
    /// A connection already bound as a staff console keeps its staff
    /// identity; the visitor label is ignored.
    pub fn register_visitor(&self, conn: ConnectionId, label: impl Into<String>) {
        let label = label.into();
        let label = if label.trim().is_empty() {
            DEFAULT_REQUESTER_LABEL.to_owned()
        } else {
            label.trim().to_owned()
        };
        let mut state = self.state.lock();
        if matches!(state.parties.get(&conn), Some(Party::Staff { .. })) {
            return;
        }
        state.parties.insert(conn, Party::Visitor { label });
    }

    /// Bring a staff member online on `conn`.
    ///
    /// Resolves `query` against the directory, binds the connection as the
    /// identity's live handle (displacing any earlier one), replays every
    /// still-pending queued request to the fresh connection in arrival
    /// order, and broadcasts the updated reachable-staff roster.
    pub fn staff_online(
        &self,
        query: &str,
        conn: ConnectionId,
    ) -> Result<StaffIdentity, EngineError> {
        let identity = self.directory.resolve(query)?.clone();

        let mut deliveries = Vec::new();
        let roster;
        {
            let mut state = self.state.lock();
            state.parties.insert(
                conn.clone(),
                Party::Staff {
                    id: identity.id.clone(),
                },
            );
            if let Some(displaced) = state.presence.mark_online(identity.id.clone(), conn.clone())
            {
                info!(staff = %identity.id, old = %displaced, new = %conn, "staff reconnected, displacing earlier connection");
            }
            // Everything still undecided for this identity replays to the
            // fresh console: queued requests and any that rang on a
            // displaced handle and were never answered.
            let _ = state.pending.drain(&identity.id);
            let mut undecided: Vec<&CallRequest> = state
                .requests
                .values()
                .filter(|r| r.status == RequestStatus::Pending && r.staff_id == identity.id)
                .collect();
            undecided.sort_by(|a, b| {
                (a.created_at, a.id.as_str()).cmp(&(b.created_at, b.id.as_str()))
            });
            for request in undecided {
                deliveries.push(Delivery::to(
                    conn.clone(),
                    Outbound::IncomingCallRequest {
                        request_id: request.id.clone(),
                        requester_label: request.requester_label.clone(),
                        purpose: request.purpose.clone(),
                        ringing: false,
                    },
                ));
            }
            roster = self.reachable_locked(&state);
        }

        info!(staff = %identity.id, conn = %conn, replayed = deliveries.len(), "staff online");
        self.dispatch(deliveries);
        self.outbox
            .broadcast(Outbound::StaffReachable { entries: roster });
        Ok(identity)
    }

    /// Place a call request aimed at `target`.
    ///
    /// The presence check and the queue insert happen under one lock
    /// acquisition, so a target connecting concurrently either sees the
    /// request ring live or finds it in the queue it drains — never
    /// neither.
    pub fn request_call(
        &self,
        target: &str,
        requester_label: &str,
        purpose: &str,
        requester: Option<ConnectionId>,
    ) -> Result<CallReceipt, EngineError> {
        let identity = self.directory.resolve(target)?.clone();

        let label = if requester_label.trim().is_empty() {
            DEFAULT_REQUESTER_LABEL
        } else {
            requester_label.trim()
        };
        let purpose = if purpose.trim().is_empty() {
            DEFAULT_PURPOSE
        } else {
            purpose.trim()
        };

        let request = CallRequest::new(identity.id.clone(), label, purpose, requester);
        let request_id = request.id.clone();

        let mut deliveries = Vec::new();
        let queued;
        {
            let mut state = self.state.lock();
            if let Some(staff_conn) = state.presence.lookup(&identity.id).cloned() {
                queued = false;
                deliveries.push(Delivery::to(
                    staff_conn,
                    Outbound::IncomingCallRequest {
                        request_id: request_id.clone(),
                        requester_label: request.requester_label.clone(),
                        purpose: request.purpose.clone(),
                        ringing: true,
                    },
                ));
            } else {
                queued = true;
                state
                    .pending
                    .enqueue(identity.id.clone(), request_id.clone());
                if let Some(requester_conn) = &request.requester {
                    deliveries.push(Delivery::to(
                        requester_conn.clone(),
                        Outbound::CallRequestQueued {
                            request_id: request_id.clone(),
                            staff_name: identity.display_name.clone(),
                        },
                    ));
                }
            }
            state.requests.insert(request_id.clone(), request);
            prune_resolved(&mut state);
        }

        info!(request = %request_id, staff = %identity.id, queued, "call request placed");
        self.dispatch(deliveries);
        self.analytics.deliver(AnalyticsEvent::now(
            "call.requested",
            json!({
                "requestId": &request_id,
                "staffId": &identity.id,
                "queued": queued,
            }),
        ));
        Ok(CallReceipt {
            request_id,
            queued,
            staff_name: identity.display_name,
        })
    }

    /// Accept or decline a pending request.
    ///
    /// Only the connection currently bound as the target staff member's
    /// live handle may respond. Acceptance promotes the request into a
    /// fresh session; any session either party was already in is ended
    /// first, so neither connection is ever in two sessions at once.
    pub fn respond_to_request(
        &self,
        request_id: &RequestId,
        accept: bool,
        responder: &ConnectionId,
    ) -> Result<Option<CallSessionId>, EngineError> {
        let mut deliveries = Vec::new();
        let outcome;
        {
            let mut state = self.state.lock();
            let request = state
                .requests
                .get(request_id)
                .ok_or_else(|| EngineError::RequestNotFound {
                    id: request_id.clone(),
                })?;
            if request.status != RequestStatus::Pending {
                return Err(EngineError::AlreadyResolved {
                    id: request_id.clone(),
                });
            }
            let staff_id = request.staff_id.clone();
            if state.presence.lookup(&staff_id) != Some(responder) {
                return Err(EngineError::Unauthorized {
                    message: format!(
                        "connection is not the live handle for staff '{staff_id}'"
                    ),
                });
            }
            let requester = request.requester.clone();
            let requester_label = request.requester_label.clone();
            state.pending.remove(&staff_id, request_id);

            if accept {
                let Some(requester_conn) = requester else {
                    set_status(&mut state, request_id, RequestStatus::Abandoned);
                    return Err(EngineError::RequesterUnreachable {
                        id: request_id.clone(),
                    });
                };

                // One session per connection: end whatever either party is
                // still in before pairing them.
                for old in take_sessions_of(&mut state, &[responder, &requester_conn]) {
                    push_teardown(
                        &mut deliveries,
                        &state,
                        &old,
                        "superseded by a new call",
                        "system",
                    );
                    let _ = state.requests.remove(&old.request_id);
                }

                set_status(&mut state, request_id, RequestStatus::Accepted);
                let session = CallSession::new(
                    request_id.clone(),
                    staff_id.clone(),
                    responder.clone(),
                    requester_conn.clone(),
                );
                let session_id = session.id.clone();

                let staff_info = self.directory.get(&staff_id).map_or_else(
                    || PartyInfo {
                        label: staff_id.to_string(),
                        department: None,
                    },
                    |identity| PartyInfo {
                        label: identity.display_name.clone(),
                        department: Some(identity.department.clone()),
                    },
                );
                deliveries.push(Delivery::to(
                    responder.clone(),
                    Outbound::CallAccepted {
                        session_id: session_id.clone(),
                        request_id: request_id.clone(),
                        other_party: PartyInfo {
                            label: requester_label,
                            department: None,
                        },
                    },
                ));
                deliveries.push(Delivery::to(
                    requester_conn,
                    Outbound::CallAccepted {
                        session_id: session_id.clone(),
                        request_id: request_id.clone(),
                        other_party: staff_info,
                    },
                ));
                state.sessions.insert(session_id.clone(), session);
                outcome = Some(session_id);
            } else {
                set_status(&mut state, request_id, RequestStatus::Rejected);
                if let Some(requester_conn) = requester {
                    deliveries.push(Delivery::to(
                        requester_conn.clone(),
                        Outbound::CallRejected {
                            request_id: request_id.clone(),
                            reason: "The staff member is unable to take your call right now."
                                .to_owned(),
                        },
                    ));
                    deliveries.push(Delivery::to(
                        requester_conn,
                        Outbound::AssistantResumed {
                            message: RESUME_NOTICE.to_owned(),
                        },
                    ));
                }
                outcome = None;
            }
        }

        info!(request = %request_id, accepted = accept, "request resolved");
        self.dispatch(deliveries);
        let name = if accept { "call.accepted" } else { "call.rejected" };
        self.analytics
            .deliver(AnalyticsEvent::now(name, json!({ "requestId": request_id })));
        Ok(outcome)
    }

    /// Relay one signaling message to the sender's counterpart.
    ///
    /// The payload passes through untouched. The first offer moves the
    /// session out of `Connecting`.
    pub fn relay_signal(
        &self,
        session_id: &CallSessionId,
        sender: &ConnectionId,
        kind: SignalKind,
        payload: Value,
    ) -> Result<(), EngineError> {
        let delivery;
        {
            let mut state = self.state.lock();
            let session = state.sessions.get_mut(session_id).ok_or_else(|| {
                EngineError::SessionNotFound {
                    id: session_id.clone(),
                }
            })?;
            let Some(other) = session.other_party(sender).cloned() else {
                warn!(session = %session_id, sender = %sender, "unauthorized signaling attempt");
                return Err(EngineError::Unauthorized {
                    message: "connection is not a party to this session".to_owned(),
                });
            };
            if kind == SignalKind::Offer && session.status == SessionStatus::Connecting {
                session.status = SessionStatus::InProgress;
            }
            delivery = Delivery::to(
                other,
                Outbound::Signal {
                    session_id: session_id.clone(),
                    kind,
                    payload,
                },
            );
        }
        self.dispatch(vec![delivery]);
        Ok(())
    }

    /// End a session at the request of one of its parties.
    pub fn end_session(
        &self,
        session_id: &CallSessionId,
        ender: &ConnectionId,
        reason: Option<&str>,
    ) -> Result<(), EngineError> {
        let mut deliveries = Vec::new();
        let completion;
        {
            let mut state = self.state.lock();
            let is_party = state
                .sessions
                .get(session_id)
                .ok_or_else(|| EngineError::SessionNotFound {
                    id: session_id.clone(),
                })?
                .is_party(ender);
            if !is_party {
                return Err(EngineError::Unauthorized {
                    message: "connection is not a party to this session".to_owned(),
                });
            }
            // Presence of the key was just checked.
            let Some(session) = state.sessions.remove(session_id) else {
                return Err(EngineError::SessionNotFound {
                    id: session_id.clone(),
                });
            };

            let ended_by = party_label(&state, ender);
            let reason = reason.unwrap_or("call ended").to_owned();
            let duration_secs = session.duration_secs();

            for conn in [&session.staff_conn, &session.requester_conn] {
                deliveries.push(Delivery::to(
                    conn.clone(),
                    Outbound::SessionEnded {
                        session_id: session_id.clone(),
                        reason: reason.clone(),
                        ended_by: ended_by.clone(),
                    },
                ));
            }
            deliveries.push(Delivery::to(
                session.requester_conn.clone(),
                Outbound::CallCompleted {
                    session_id: session_id.clone(),
                    duration_secs,
                },
            ));
            if matches!(
                state.parties.get(&session.requester_conn),
                Some(Party::Visitor { .. })
            ) {
                deliveries.push(Delivery::to(
                    session.requester_conn.clone(),
                    Outbound::AssistantResumed {
                        message: RESUME_NOTICE.to_owned(),
                    },
                ));
            }

            completion = json!({
                "id": session_id,
                "requestId": session.request_id,
                "staffId": session.staff_id,
                "durationSecs": duration_secs,
                "reason": reason,
                "endedBy": ended_by,
            });
            // The request's lifecycle is over with the session; the
            // completion record above is its archive.
            let _ = state.requests.remove(&session.request_id);
        }

        info!(session = %session_id, "session ended");
        self.dispatch(deliveries);
        self.persist_async("completions", completion.clone());
        self.analytics
            .deliver(AnalyticsEvent::now("call.completed", completion));
        Ok(())
    }

    /// Tear down everything attached to a departed connection.
    ///
    /// Safe to call any number of times for the same connection, and for
    /// connections that never identified themselves.
    pub fn handle_disconnect(&self, conn: &ConnectionId) {
        let mut deliveries = Vec::new();
        let mut roster = None;
        {
            let mut state = self.state.lock();
            let party = state.parties.remove(conn);

            if let Some(Party::Staff { id }) = &party {
                if state.presence.mark_offline(id, conn) {
                    // Requests delivered but never decided go back to the
                    // queue so a replacement console sees them.
                    let mut undecided: Vec<(RequestId, chrono::DateTime<chrono::Utc>)> = state
                        .requests
                        .values()
                        .filter(|r| r.status == RequestStatus::Pending && &r.staff_id == id)
                        .map(|r| (r.id.clone(), r.created_at))
                        .collect();
                    undecided.sort_by_key(|(_, created_at)| *created_at);
                    for (request_id, _) in undecided {
                        state.pending.enqueue(id.clone(), request_id);
                    }
                    roster = Some(self.reachable_locked(&state));
                }
            }

            // Pending requests this connection originated are abandoned and
            // pulled out of their target's queue.
            let abandoned: Vec<(RequestId, StaffId)> = state
                .requests
                .values()
                .filter(|r| {
                    r.status == RequestStatus::Pending && r.requester.as_ref() == Some(conn)
                })
                .map(|r| (r.id.clone(), r.staff_id.clone()))
                .collect();
            for (request_id, staff_id) in abandoned {
                set_status(&mut state, &request_id, RequestStatus::Abandoned);
                state.pending.remove(&staff_id, &request_id);
                debug!(request = %request_id, "request abandoned by disconnect");
            }

            for session in take_sessions_of(&mut state, &[conn]) {
                push_teardown(
                    &mut deliveries,
                    &state,
                    &session,
                    "participant disconnected",
                    "system",
                );
                self.persist_async(
                    "completions",
                    json!({
                        "id": &session.id,
                        "requestId": &session.request_id,
                        "staffId": &session.staff_id,
                        "durationSecs": session.duration_secs(),
                        "reason": "participant disconnected",
                        "endedBy": "system",
                    }),
                );
                let _ = state.requests.remove(&session.request_id);
            }

            prune_resolved(&mut state);
        }

        // The departed connection can no longer receive; skip its deliveries.
        deliveries.retain(|d| &d.target != conn);
        self.dispatch(deliveries);
        if let Some(entries) = roster {
            self.outbox.broadcast(Outbound::StaffReachable { entries });
        }
    }

    /// Staff members with a live connection right now.
    #[must_use]
    pub fn reachable_staff(&self) -> Vec<ReachableStaff> {
        self.reachable_locked(&self.state.lock())
    }

    /// Whether the given staff member has a live connection.
    #[must_use]
    pub fn is_reachable(&self, staff: &StaffId) -> bool {
        self.state.lock().presence.lookup(staff).is_some()
    }

    /// Current status of a request, if known.
    #[must_use]
    pub fn request_status(&self, request_id: &RequestId) -> Option<RequestStatus> {
        self.state
            .lock()
            .requests
            .get(request_id)
            .map(|r| r.status)
    }

    /// Number of live sessions.
    #[must_use]
    pub fn active_session_count(&self) -> usize {
        self.state.lock().sessions.len()
    }

    /// Whether the connection is currently a party to a live session.
    #[must_use]
    pub fn is_in_session(&self, conn: &ConnectionId) -> bool {
        self.state
            .lock()
            .sessions
            .values()
            .any(|s| s.is_party(conn))
    }

    /// Number of requests waiting for an offline staff member.
    #[must_use]
    pub fn queued_for(&self, staff: &StaffId) -> usize {
        self.state.lock().pending.len(staff)
    }

    /// Total number of requests waiting across all staff.
    #[must_use]
    pub fn waiting_request_count(&self) -> usize {
        self.state.lock().pending.total()
    }

    fn reachable_locked(&self, state: &State) -> Vec<ReachableStaff> {
        let mut entries: Vec<ReachableStaff> = state
            .presence
            .online()
            .iter()
            .filter_map(|id| self.directory.get(id))
            .map(|identity| ReachableStaff {
                id: identity.id.clone(),
                name: identity.display_name.clone(),
                department: identity.department.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    fn dispatch(&self, deliveries: Vec<Delivery>) {
        for delivery in deliveries {
            self.outbox.deliver(&delivery.target, delivery.event);
        }
    }

    /// Spawn a store write off the hot path. Failures are logged, never
    /// surfaced.
    fn persist_async(&self, kind: &'static str, record: Value) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(err) = store.persist(kind, record).await {
                debug!(kind, error = %err, "record persistence failed");
            }
        });
    }
}

/// Drop rejected and abandoned requests past their retention window.
/// Requests that became sessions are removed when the session ends.
fn prune_resolved(state: &mut State) {
    let cutoff = chrono::Utc::now() - chrono::Duration::seconds(RESOLVED_RETENTION_SECS);
    state.requests.retain(|_, r| {
        matches!(r.status, RequestStatus::Pending | RequestStatus::Accepted)
            || r.created_at > cutoff
    });
}

fn set_status(state: &mut State, request_id: &RequestId, status: RequestStatus) {
    if let Some(request) = state.requests.get_mut(request_id) {
        request.status = status;
    }
}

/// Remove and return every live session any of `conns` is a party to.
fn take_sessions_of(state: &mut State, conns: &[&ConnectionId]) -> Vec<CallSession> {
    let ids: Vec<CallSessionId> = state
        .sessions
        .values()
        .filter(|s| conns.iter().any(|c| s.is_party(c)))
        .map(|s| s.id.clone())
        .collect();
    ids.iter()
        .filter_map(|id| state.sessions.remove(id))
        .collect()
}

/// Queue the teardown notifications for a session removed from the registry.
fn push_teardown(
    deliveries: &mut Vec<Delivery>,
    state: &State,
    session: &CallSession,
    reason: &str,
    ended_by: &str,
) {
    for conn in [&session.staff_conn, &session.requester_conn] {
        deliveries.push(Delivery::to(
            conn.clone(),
            Outbound::SessionEnded {
                session_id: session.id.clone(),
                reason: reason.to_owned(),
                ended_by: ended_by.to_owned(),
            },
        ));
    }
    if matches!(
        state.parties.get(&session.requester_conn),
        Some(Party::Visitor { .. })
    ) {
        deliveries.push(Delivery::to(
            session.requester_conn.clone(),
            Outbound::AssistantResumed {
                message: RESUME_NOTICE.to_owned(),
            },
        ));
    }
}

fn party_label(state: &State, conn: &ConnectionId) -> String {
    match state.parties.get(conn) {
        Some(Party::Visitor { label }) => label.clone(),
        Some(Party::Staff { id }) => id.to_string(),
        None => "participant".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::MemorySink;
    use crate::outbox::MemoryOutbox;
    use crate::store::MemoryStore;
    use assert_matches::assert_matches;

    fn identity(id: &str, name: &str, dept: &str, contact: &str) -> StaffIdentity {
        StaffIdentity {
            id: StaffId::from(id),
            display_name: name.to_owned(),
            department: dept.to_owned(),
            contact_address: contact.to_owned(),
        }
    }

    fn directory() -> Directory {
        Directory::new(vec![
            identity("ACS", "Dr. Alice Chen", "Admissions", "alice@campus.edu"),
            identity("BOB", "Bob Ortiz", "Facilities", "bob@campus.edu"),
        ])
    }

    struct Harness {
        coordinator: Coordinator,
        outbox: Arc<MemoryOutbox>,
        analytics: Arc<MemorySink>,
    }

    fn harness() -> Harness {
        let outbox = MemoryOutbox::new();
        let analytics = MemorySink::new();
        let coordinator = Coordinator::new(
            directory(),
            Arc::clone(&outbox) as Arc<dyn Outbox>,
            Arc::new(MemoryStore::new()),
            Arc::clone(&analytics) as Arc<dyn AnalyticsSink>,
        );
        Harness {
            coordinator,
            outbox,
            analytics,
        }
    }

    fn conn(s: &str) -> ConnectionId {
        ConnectionId::from(s)
    }

    // ── staff presence ──

    #[tokio::test]
    async fn staff_online_broadcasts_roster() {
        let h = harness();
        let identity = h.coordinator.staff_online("alice chen", conn("s1")).unwrap();
        assert_eq!(identity.id.as_str(), "ACS");
        assert!(h.coordinator.is_reachable(&StaffId::from("ACS")));

        let broadcasts = h.outbox.broadcasts();
        assert_eq!(broadcasts.len(), 1);
        assert_matches!(
            &broadcasts[0],
            Outbound::StaffReachable { entries } if entries.len() == 1 && entries[0].name == "Dr. Alice Chen"
        );
    }

    #[tokio::test]
    async fn staff_online_unknown_query_fails() {
        let h = harness();
        assert_matches!(
            h.coordinator.staff_online("zelda", conn("s1")),
            Err(EngineError::StaffNotFound { .. })
        );
    }

    #[tokio::test]
    async fn stale_disconnect_keeps_replacement_online() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("old")).unwrap();
        h.coordinator.staff_online("ACS", conn("new")).unwrap();
        h.coordinator.handle_disconnect(&conn("old"));
        assert!(h.coordinator.is_reachable(&StaffId::from("ACS")));
    }

    #[tokio::test]
    async fn displaced_console_inherits_undecided_request() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("console-a")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        // Rings live at console A, which never answers.
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        assert!(!receipt.queued);

        h.coordinator.staff_online("ACS", conn("console-b")).unwrap();
        h.coordinator.handle_disconnect(&conn("console-a"));

        let to_b = h.outbox.delivered_to(&conn("console-b"));
        assert_matches!(
            &to_b[0],
            Outbound::IncomingCallRequest { request_id, ringing: false, .. }
                if request_id == &receipt.request_id
        );
        // Console B can still answer it.
        let session = h
            .coordinator
            .respond_to_request(&receipt.request_id, true, &conn("console-b"))
            .unwrap();
        assert!(session.is_some());
    }

    #[tokio::test]
    async fn visitor_registration_cannot_demote_a_staff_console() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("s1"), "Mallory");
        h.coordinator.register_visitor(conn("v1"), "Priya");

        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        let session_id = h
            .coordinator
            .respond_to_request(&receipt.request_id, true, &conn("s1"))
            .unwrap()
            .unwrap();
        h.coordinator
            .end_session(&session_id, &conn("s1"), None)
            .unwrap();

        // Still ended by the staff identity, not the bogus visitor label.
        let to_visitor = h.outbox.delivered_to(&conn("v1"));
        assert!(to_visitor.iter().any(|e| matches!(
            e,
            Outbound::SessionEnded { ended_by, .. } if ended_by == "ACS"
        )));
    }

    // ── live requests ──

    #[tokio::test]
    async fn request_to_online_staff_rings_live() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");

        let receipt = h
            .coordinator
            .request_call("alice", "Priya", "admissions question", Some(conn("v1")))
            .unwrap();
        assert!(!receipt.queued);
        assert_eq!(receipt.staff_name, "Dr. Alice Chen");

        let to_staff = h.outbox.delivered_to(&conn("s1"));
        assert_matches!(
            &to_staff[0],
            Outbound::IncomingCallRequest { requester_label, ringing: true, .. }
                if requester_label == "Priya"
        );
        assert_eq!(h.analytics.names(), vec!["call.requested"]);
    }

    #[tokio::test]
    async fn blank_purpose_gets_a_default() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator
            .request_call("ACS", "Priya", "   ", Some(conn("v1")))
            .unwrap();
        let to_staff = h.outbox.delivered_to(&conn("s1"));
        assert_matches!(
            &to_staff[0],
            Outbound::IncomingCallRequest { purpose, .. } if purpose == DEFAULT_PURPOSE
        );
    }

    #[tokio::test]
    async fn request_to_unknown_staff_fails() {
        let h = harness();
        assert_matches!(
            h.coordinator.request_call("zelda", "Priya", "", None),
            Err(EngineError::StaffNotFound { .. })
        );
    }

    // ── queuing and drain ──

    #[tokio::test]
    async fn request_to_offline_staff_queues() {
        let h = harness();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("BOB", "Priya", "keys", Some(conn("v1")))
            .unwrap();
        assert!(receipt.queued);
        assert_eq!(h.coordinator.queued_for(&StaffId::from("BOB")), 1);

        let to_visitor = h.outbox.delivered_to(&conn("v1"));
        assert_matches!(
            &to_visitor[0],
            Outbound::CallRequestQueued { staff_name, .. } if staff_name == "Bob Ortiz"
        );
    }

    #[tokio::test]
    async fn queued_requests_replay_fifo_on_connect() {
        let h = harness();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        h.coordinator.register_visitor(conn("v2"), "Marcus");
        let first = h
            .coordinator
            .request_call("BOB", "Priya", "keys", Some(conn("v1")))
            .unwrap();
        let second = h
            .coordinator
            .request_call("BOB", "Marcus", "parking", Some(conn("v2")))
            .unwrap();

        h.coordinator.staff_online("BOB", conn("s1")).unwrap();

        let to_staff = h.outbox.delivered_to(&conn("s1"));
        assert_eq!(to_staff.len(), 2);
        assert_matches!(
            &to_staff[0],
            Outbound::IncomingCallRequest { request_id, ringing: false, .. }
                if request_id == &first.request_id
        );
        assert_matches!(
            &to_staff[1],
            Outbound::IncomingCallRequest { request_id, ringing: false, .. }
                if request_id == &second.request_id
        );
        assert_eq!(h.coordinator.queued_for(&StaffId::from("BOB")), 0);
    }

    #[tokio::test]
    async fn abandoned_queued_requests_are_not_replayed() {
        let h = harness();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        h.coordinator
            .request_call("BOB", "Priya", "keys", Some(conn("v1")))
            .unwrap();
        h.coordinator.handle_disconnect(&conn("v1"));

        h.coordinator.staff_online("BOB", conn("s1")).unwrap();
        assert!(h.outbox.delivered_to(&conn("s1")).is_empty());
    }

    // ── respond: reject ──

    #[tokio::test]
    async fn reject_notifies_requester_and_resumes_assistant() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();

        let outcome = h
            .coordinator
            .respond_to_request(&receipt.request_id, false, &conn("s1"))
            .unwrap();
        assert!(outcome.is_none());
        assert_eq!(
            h.coordinator.request_status(&receipt.request_id),
            Some(RequestStatus::Rejected)
        );

        let to_visitor = h.outbox.delivered_to(&conn("v1"));
        assert_matches!(&to_visitor[0], Outbound::CallRejected { .. });
        assert_matches!(&to_visitor[1], Outbound::AssistantResumed { .. });
    }

    // ── respond: accept ──

    #[tokio::test]
    async fn accept_creates_session_and_notifies_both() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();

        let session_id = h
            .coordinator
            .respond_to_request(&receipt.request_id, true, &conn("s1"))
            .unwrap()
            .unwrap();
        assert_ne!(session_id.as_str(), receipt.request_id.as_str());
        assert_eq!(h.coordinator.active_session_count(), 1);

        let to_staff = h.outbox.delivered_to(&conn("s1"));
        assert_matches!(
            to_staff.last().unwrap(),
            Outbound::CallAccepted { other_party, .. } if other_party.label == "Priya"
        );
        let to_visitor = h.outbox.delivered_to(&conn("v1"));
        assert_matches!(
            to_visitor.last().unwrap(),
            Outbound::CallAccepted { other_party, .. }
                if other_party.label == "Dr. Alice Chen"
                    && other_party.department.as_deref() == Some("Admissions")
        );
    }

    #[tokio::test]
    async fn respond_twice_fails_already_resolved() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        h.coordinator
            .respond_to_request(&receipt.request_id, true, &conn("s1"))
            .unwrap();
        assert_matches!(
            h.coordinator
                .respond_to_request(&receipt.request_id, false, &conn("s1")),
            Err(EngineError::AlreadyResolved { .. })
        );
    }

    #[tokio::test]
    async fn only_the_target_staff_connection_may_respond() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.staff_online("BOB", conn("s2")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        assert_matches!(
            h.coordinator
                .respond_to_request(&receipt.request_id, true, &conn("s2")),
            Err(EngineError::Unauthorized { .. })
        );
        assert_eq!(
            h.coordinator.request_status(&receipt.request_id),
            Some(RequestStatus::Pending)
        );
    }

    #[tokio::test]
    async fn accepting_a_socketless_request_abandons_it() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        // Submitted over HTTP; no requester connection to pair with.
        let receipt = h
            .coordinator
            .request_call("ACS", "Walk-in", "lobby", None)
            .unwrap();
        assert_matches!(
            h.coordinator
                .respond_to_request(&receipt.request_id, true, &conn("s1")),
            Err(EngineError::RequesterUnreachable { .. })
        );
        assert_eq!(
            h.coordinator.request_status(&receipt.request_id),
            Some(RequestStatus::Abandoned)
        );
    }

    #[tokio::test]
    async fn accepting_supersedes_existing_session() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        h.coordinator.register_visitor(conn("v2"), "Marcus");

        let first = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        h.coordinator
            .respond_to_request(&first.request_id, true, &conn("s1"))
            .unwrap();

        let second = h
            .coordinator
            .request_call("ACS", "Marcus", "q", Some(conn("v2")))
            .unwrap();
        h.coordinator
            .respond_to_request(&second.request_id, true, &conn("s1"))
            .unwrap();

        assert_eq!(h.coordinator.active_session_count(), 1);
        let to_first_visitor = h.outbox.delivered_to(&conn("v1"));
        assert!(to_first_visitor.iter().any(|e| matches!(
            e,
            Outbound::SessionEnded { reason, .. } if reason == "superseded by a new call"
        )));
        assert!(
            to_first_visitor
                .iter()
                .any(|e| matches!(e, Outbound::AssistantResumed { .. }))
        );
    }

    // ── signaling ──

    fn paired(h: &Harness) -> CallSessionId {
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        h.coordinator
            .respond_to_request(&receipt.request_id, true, &conn("s1"))
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn signals_relay_verbatim_to_the_other_party() {
        let h = harness();
        let session_id = paired(&h);
        h.outbox.clear();

        let payload = json!({"sdp": "v=0", "type": "offer"});
        h.coordinator
            .relay_signal(&session_id, &conn("v1"), SignalKind::Offer, payload.clone())
            .unwrap();

        let to_staff = h.outbox.delivered_to(&conn("s1"));
        assert_matches!(
            &to_staff[0],
            Outbound::Signal { kind: SignalKind::Offer, payload: p, .. } if p == &payload
        );
        assert!(h.outbox.delivered_to(&conn("v1")).is_empty());
    }

    #[tokio::test]
    async fn signaling_from_outsiders_is_rejected() {
        let h = harness();
        let session_id = paired(&h);
        assert_matches!(
            h.coordinator
                .relay_signal(&session_id, &conn("intruder"), SignalKind::Offer, json!({})),
            Err(EngineError::Unauthorized { .. })
        );
    }

    #[tokio::test]
    async fn signaling_unknown_session_fails() {
        let h = harness();
        assert_matches!(
            h.coordinator.relay_signal(
                &CallSessionId::from("ghost"),
                &conn("v1"),
                SignalKind::Answer,
                json!({})
            ),
            Err(EngineError::SessionNotFound { .. })
        );
    }

    // ── ending ──

    #[tokio::test]
    async fn end_session_notifies_both_and_completes() {
        let h = harness();
        let session_id = paired(&h);
        h.outbox.clear();

        h.coordinator
            .end_session(&session_id, &conn("s1"), Some("wrapped up"))
            .unwrap();
        assert_eq!(h.coordinator.active_session_count(), 0);

        let to_staff = h.outbox.delivered_to(&conn("s1"));
        assert_matches!(
            &to_staff[0],
            Outbound::SessionEnded { reason, ended_by, .. }
                if reason == "wrapped up" && ended_by == "ACS"
        );
        let to_visitor = h.outbox.delivered_to(&conn("v1"));
        assert_matches!(&to_visitor[0], Outbound::SessionEnded { .. });
        assert_matches!(&to_visitor[1], Outbound::CallCompleted { .. });
        assert_matches!(&to_visitor[2], Outbound::AssistantResumed { .. });
        assert!(h.analytics.names().contains(&"call.completed".to_owned()));
    }

    #[tokio::test]
    async fn ended_call_destroys_its_request() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        let session_id = h
            .coordinator
            .respond_to_request(&receipt.request_id, true, &conn("s1"))
            .unwrap()
            .unwrap();

        h.coordinator
            .end_session(&session_id, &conn("v1"), None)
            .unwrap();
        assert_eq!(h.coordinator.request_status(&receipt.request_id), None);
        assert_matches!(
            h.coordinator
                .respond_to_request(&receipt.request_id, true, &conn("s1")),
            Err(EngineError::RequestNotFound { .. })
        );
    }

    #[tokio::test]
    async fn superseded_call_destroys_the_old_request() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        h.coordinator.register_visitor(conn("v2"), "Marcus");

        let first = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();
        h.coordinator
            .respond_to_request(&first.request_id, true, &conn("s1"))
            .unwrap();
        let second = h
            .coordinator
            .request_call("ACS", "Marcus", "q", Some(conn("v2")))
            .unwrap();
        h.coordinator
            .respond_to_request(&second.request_id, true, &conn("s1"))
            .unwrap();

        assert_eq!(h.coordinator.request_status(&first.request_id), None);
        assert_eq!(
            h.coordinator.request_status(&second.request_id),
            Some(RequestStatus::Accepted)
        );
    }

    #[tokio::test]
    async fn ending_twice_fails_session_not_found() {
        let h = harness();
        let session_id = paired(&h);
        h.coordinator
            .end_session(&session_id, &conn("v1"), None)
            .unwrap();
        assert_matches!(
            h.coordinator.end_session(&session_id, &conn("v1"), None),
            Err(EngineError::SessionNotFound { .. })
        );
    }

    #[tokio::test]
    async fn outsiders_cannot_end_a_session() {
        let h = harness();
        let session_id = paired(&h);
        assert_matches!(
            h.coordinator
                .end_session(&session_id, &conn("intruder"), None),
            Err(EngineError::Unauthorized { .. })
        );
        assert_eq!(h.coordinator.active_session_count(), 1);
    }

    // ── disconnect ──

    #[tokio::test]
    async fn disconnect_mid_session_notifies_the_survivor() {
        let h = harness();
        let session_id = paired(&h);
        h.outbox.clear();

        h.coordinator.handle_disconnect(&conn("s1"));
        assert_eq!(h.coordinator.active_session_count(), 0);
        assert!(!h.coordinator.is_reachable(&StaffId::from("ACS")));

        let to_visitor = h.outbox.delivered_to(&conn("v1"));
        assert_matches!(
            &to_visitor[0],
            Outbound::SessionEnded { session_id: sid, reason, ended_by }
                if sid == &session_id && reason == "participant disconnected" && ended_by == "system"
        );
        assert_matches!(&to_visitor[1], Outbound::AssistantResumed { .. });
        // Nothing is addressed to the departed connection.
        assert!(h.outbox.delivered_to(&conn("s1")).is_empty());
        // Roster broadcast reflects the staff member going offline.
        assert_matches!(
            h.outbox.broadcasts().last().unwrap(),
            Outbound::StaffReachable { entries } if entries.is_empty()
        );
    }

    #[tokio::test]
    async fn disconnect_is_idempotent() {
        let h = harness();
        paired(&h);
        h.coordinator.handle_disconnect(&conn("v1"));
        h.outbox.clear();
        h.coordinator.handle_disconnect(&conn("v1"));
        assert!(h.outbox.deliveries().is_empty());
        assert!(h.outbox.broadcasts().is_empty());
    }

    #[tokio::test]
    async fn disconnect_of_unknown_connection_is_a_noop() {
        let h = harness();
        h.coordinator.handle_disconnect(&conn("never-seen"));
        assert!(h.outbox.deliveries().is_empty());
    }

    #[tokio::test]
    async fn visitor_disconnect_abandons_pending_request() {
        let h = harness();
        h.coordinator.staff_online("ACS", conn("s1")).unwrap();
        h.coordinator.register_visitor(conn("v1"), "Priya");
        let receipt = h
            .coordinator
            .request_call("ACS", "Priya", "q", Some(conn("v1")))
            .unwrap();

        h.coordinator.handle_disconnect(&conn("v1"));
        assert_eq!(
            h.coordinator.request_status(&receipt.request_id),
            Some(RequestStatus::Abandoned)
        );
        assert_matches!(
            h.coordinator
                .respond_to_request(&receipt.request_id, true, &conn("s1")),
            Err(EngineError::AlreadyResolved { .. })
        );
    }
}
