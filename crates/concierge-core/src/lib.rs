//! Core domain types for the reception kiosk.
//!
//! This crate is the leaf of the workspace: branded ID newtypes, the static
//! staff directory with fuzzy resolution, call-request and call-session
//! records with their state machines, the engine error taxonomy, and the
//! outbound event vocabulary that the transport layer turns into wire
//! messages. It has no knowledge of sockets, HTTP, or the AI assistant.

pub mod call;
pub mod directory;
pub mod errors;
pub mod events;
pub mod ids;

pub use call::{CallRequest, CallSession, RequestStatus, SessionStatus, SignalKind};
pub use directory::{Directory, DirectoryError, StaffIdentity};
pub use errors::EngineError;
pub use events::{Delivery, Outbound, PartyInfo, ReachableStaff};
pub use ids::{CallSessionId, ConnectionId, RequestId, StaffId};
