//! End-to-end engine flows: a request travels from any of its three entry
//! paths (explicit, form-submitted, assistant-triggered) through acceptance,
//! signaling, and teardown.

use std::sync::Arc;

use assert_matches::assert_matches;
use serde_json::json;

use concierge_core::{
    ConnectionId, Directory, EngineError, Outbound, SignalKind, StaffId, StaffIdentity,
};
use concierge_engine::{
    AnalyticsSink, CannedReplies, Coordinator, MemoryOutbox, MemorySink, MemoryStore, Outbox,
    ReplyGenerator, trigger,
};

fn directory() -> Directory {
    Directory::new(vec![
        StaffIdentity {
            id: StaffId::from("ACS"),
            display_name: "Dr. Alice Chen".to_owned(),
            department: "Admissions".to_owned(),
            contact_address: "alice@campus.edu".to_owned(),
        },
        StaffIdentity {
            id: StaffId::from("BOB"),
            display_name: "Bob Ortiz".to_owned(),
            department: "Facilities".to_owned(),
            contact_address: "bob@campus.edu".to_owned(),
        },
    ])
}

fn setup() -> (Coordinator, Arc<MemoryOutbox>, Arc<MemorySink>) {
    let outbox = MemoryOutbox::new();
    let analytics = MemorySink::new();
    let coordinator = Coordinator::new(
        directory(),
        Arc::clone(&outbox) as Arc<dyn Outbox>,
        Arc::new(MemoryStore::new()),
        Arc::clone(&analytics) as Arc<dyn AnalyticsSink>,
    );
    (coordinator, outbox, analytics)
}

fn conn(s: &str) -> ConnectionId {
    ConnectionId::from(s)
}

#[tokio::test]
async fn explicit_request_full_call_lifecycle() {
    let (coordinator, outbox, analytics) = setup();

    coordinator.staff_online("ACS", conn("staff")).unwrap();
    coordinator.register_visitor(conn("visitor"), "Priya");

    // Visitor asks for the staff member by partial name.
    let receipt = coordinator
        .request_call("alice", "Priya", "admissions question", Some(conn("visitor")))
        .unwrap();
    assert!(!receipt.queued);

    // Staff accepts; both sides learn about the session.
    let session_id = coordinator
        .respond_to_request(&receipt.request_id, true, &conn("staff"))
        .unwrap()
        .expect("acceptance yields a session");

    // Offer, answer, and a candidate flow through the relay.
    coordinator
        .relay_signal(&session_id, &conn("visitor"), SignalKind::Offer, json!({"sdp": "v=0 offer"}))
        .unwrap();
    coordinator
        .relay_signal(&session_id, &conn("staff"), SignalKind::Answer, json!({"sdp": "v=0 answer"}))
        .unwrap();
    coordinator
        .relay_signal(
            &session_id,
            &conn("staff"),
            SignalKind::IceCandidate,
            json!({"candidate": "host 10.0.0.1"}),
        )
        .unwrap();

    let to_visitor = outbox.delivered_to(&conn("visitor"));
    let signals: Vec<_> = to_visitor
        .iter()
        .filter(|e| matches!(e, Outbound::Signal { .. }))
        .collect();
    assert_eq!(signals.len(), 2);
    assert_matches!(signals[0], Outbound::Signal { kind: SignalKind::Answer, .. });

    // Visitor hangs up; everything unwinds.
    coordinator
        .end_session(&session_id, &conn("visitor"), None)
        .unwrap();
    assert_eq!(coordinator.active_session_count(), 0);

    // Relaying after teardown is rejected.
    assert_matches!(
        coordinator.relay_signal(&session_id, &conn("staff"), SignalKind::Answer, json!({})),
        Err(EngineError::SessionNotFound { .. })
    );

    let names = analytics.names();
    assert!(names.contains(&"call.requested".to_owned()));
    assert!(names.contains(&"call.accepted".to_owned()));
    assert!(names.contains(&"call.completed".to_owned()));
}

#[tokio::test]
async fn form_submitted_request_waits_for_staff_login() {
    let (coordinator, outbox, _) = setup();

    // A lobby form posts a request while Bob is offline; there is no
    // requester socket.
    let receipt = coordinator
        .request_call("Bob Ortiz", "Walk-in guest", "deliveries", None)
        .unwrap();
    assert!(receipt.queued);
    assert_eq!(coordinator.queued_for(&StaffId::from("BOB")), 1);

    // Bob logs in and sees the queued request without a ring.
    coordinator.staff_online("BOB", conn("bob")).unwrap();
    let to_bob = outbox.delivered_to(&conn("bob"));
    assert_matches!(
        &to_bob[0],
        Outbound::IncomingCallRequest { requester_label, ringing: false, .. }
            if requester_label == "Walk-in guest"
    );

    // Accepting cannot pair anyone: the form requester has no connection.
    assert_matches!(
        coordinator.respond_to_request(&receipt.request_id, true, &conn("bob")),
        Err(EngineError::RequesterUnreachable { .. })
    );
}

#[tokio::test]
async fn assistant_reply_triggers_a_call() {
    let (coordinator, outbox, _) = setup();

    coordinator.staff_online("ACS", conn("staff")).unwrap();
    coordinator.register_visitor(conn("visitor"), "Priya");

    // The assistant announces the call in its reply; the transport layer
    // scans every reply for the trigger phrase.
    let generator = CannedReplies::new(vec![
        "Of course! I am going to start a video call with Dr Alice Chen. Connecting you now."
            .to_owned(),
    ]);
    let reply = generator
        .generate("can I talk to someone in admissions?", &Default::default())
        .await
        .unwrap();

    let target = trigger::detect_call_target(&reply).expect("reply contains the trigger phrase");
    assert_eq!(target, "Dr Alice Chen");

    let receipt = coordinator
        .request_call(target, "Priya", "video call via assistant", Some(conn("visitor")))
        .unwrap();
    assert_eq!(receipt.staff_name, "Dr. Alice Chen");
    assert!(!receipt.queued);

    let to_staff = outbox.delivered_to(&conn("staff"));
    assert_matches!(&to_staff[0], Outbound::IncomingCallRequest { ringing: true, .. });
}

#[tokio::test]
async fn staff_reconnect_keeps_serving_the_same_queue() {
    let (coordinator, outbox, _) = setup();

    coordinator.register_visitor(conn("v1"), "Priya");
    let receipt = coordinator
        .request_call("ACS", "Priya", "q", Some(conn("v1")))
        .unwrap();
    assert!(receipt.queued);

    // First console connects, sees the request, then dies before deciding.
    coordinator.staff_online("ACS", conn("console-1")).unwrap();
    assert_eq!(outbox.delivered_to(&conn("console-1")).len(), 1);
    coordinator.handle_disconnect(&conn("console-1"));

    // The undecided request went back to the queue; the replacement console
    // sees it again and can accept it.
    coordinator.staff_online("ACS", conn("console-2")).unwrap();
    let to_console_2 = outbox.delivered_to(&conn("console-2"));
    assert_matches!(
        &to_console_2[0],
        Outbound::IncomingCallRequest { request_id, ringing: false, .. }
            if request_id == &receipt.request_id
    );
    let session_id = coordinator
        .respond_to_request(&receipt.request_id, true, &conn("console-2"))
        .unwrap();
    assert!(session_id.is_some());
}

#[tokio::test]
async fn rejection_returns_the_visitor_to_the_assistant() {
    let (coordinator, outbox, _) = setup();

    coordinator.staff_online("ACS", conn("staff")).unwrap();
    coordinator.register_visitor(conn("visitor"), "Priya");
    let receipt = coordinator
        .request_call("ACS", "Priya", "q", Some(conn("visitor")))
        .unwrap();

    coordinator
        .respond_to_request(&receipt.request_id, false, &conn("staff"))
        .unwrap();

    let to_visitor = outbox.delivered_to(&conn("visitor"));
    assert_matches!(&to_visitor[0], Outbound::CallRejected { .. });
    assert_matches!(&to_visitor[1], Outbound::AssistantResumed { .. });
}
