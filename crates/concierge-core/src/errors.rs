//! Engine error taxonomy.
//!
//! Every coordinator operation fails with one of these variants; the
//! transport layer converts them into structured error notifications sent
//! back to the originating connection only. External-collaborator failures
//! (assistant, store, analytics) are absorbed before they reach this type.

use crate::directory::DirectoryError;
use crate::ids::{CallSessionId, RequestId};

/// Failure of a coordinator operation.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The call target could not be resolved in the directory.
    #[error("no staff member matches '{query}'")]
    StaffNotFound {
        /// The unresolvable query.
        query: String,
    },

    /// The request ID is unknown.
    #[error("call request '{id}' not found")]
    RequestNotFound {
        /// The unknown request ID.
        id: RequestId,
    },

    /// The request has already been accepted, rejected, or abandoned.
    #[error("call request '{id}' is already resolved")]
    AlreadyResolved {
        /// The resolved request ID.
        id: RequestId,
    },

    /// The session ID is unknown.
    #[error("session '{id}' not found")]
    SessionNotFound {
        /// The unknown session ID.
        id: CallSessionId,
    },

    /// The acting connection is not a party to the session, or is not the
    /// staff member the request targets.
    #[error("{message}")]
    Unauthorized {
        /// What was attempted by whom.
        message: String,
    },

    /// A request was accepted but its requester no longer has a live
    /// connection to pair with.
    #[error("requester for request '{id}' is no longer reachable")]
    RequesterUnreachable {
        /// The orphaned request ID.
        id: RequestId,
    },
}

impl EngineError {
    /// Machine-readable wire code for this variant.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::StaffNotFound { .. } => "STAFF_NOT_FOUND",
            Self::RequestNotFound { .. } => "REQUEST_NOT_FOUND",
            Self::AlreadyResolved { .. } => "ALREADY_RESOLVED",
            Self::SessionNotFound { .. } => "SESSION_NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::RequesterUnreachable { .. } => "REQUESTER_UNREACHABLE",
        }
    }
}

impl From<DirectoryError> for EngineError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound { query } => Self::StaffNotFound { query },
        }
    }
}
