//! RPC error codes and the handler error type.

use concierge_core::EngineError;

use super::types::RpcErrorBody;

// ── Error code constants ────────────────────────────────────────────

/// Invalid or missing parameters.
pub const INVALID_PARAMS: &str = "INVALID_PARAMS";
/// Unexpected internal error.
pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
/// Method not found in the registry.
pub const METHOD_NOT_FOUND: &str = "METHOD_NOT_FOUND";
/// Caller is not allowed to act on this resource.
pub const UNAUTHORIZED: &str = "UNAUTHORIZED";

/// Error type returned by RPC method handlers.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// Required parameter missing or wrong type.
    #[error("{message}")]
    InvalidParams {
        /// Description of what is wrong.
        message: String,
    },

    /// Internal server error.
    #[error("{message}")]
    Internal {
        /// Description.
        message: String,
    },

    /// Caller is not allowed to perform this action.
    #[error("{message}")]
    Unauthorized {
        /// Description.
        message: String,
    },

    /// Engine-level failure with its own code.
    #[error("{message}")]
    Engine {
        /// Machine-readable code from the engine taxonomy.
        code: &'static str,
        /// Human-readable message.
        message: String,
    },
}

impl RpcError {
    /// Machine-readable error code for this variant.
    pub fn code(&self) -> &str {
        match self {
            Self::InvalidParams { .. } => INVALID_PARAMS,
            Self::Internal { .. } => INTERNAL_ERROR,
            Self::Unauthorized { .. } => UNAUTHORIZED,
            Self::Engine { code, .. } => code,
        }
    }

    /// Convert to the wire-format error body.
    pub fn to_error_body(&self) -> RpcErrorBody {
        RpcErrorBody {
            code: self.code().to_owned(),
            message: self.to_string(),
            details: None,
        }
    }
}

impl From<EngineError> for RpcError {
    fn from(err: EngineError) -> Self {
        Self::Engine {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Extract a required string parameter from a params object.
pub fn require_str<'a>(
    params: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, RpcError> {
    params
        .get(field)
        .and_then(|v| v.as_str())
        .ok_or_else(|| RpcError::InvalidParams {
            message: format!("missing or non-string field '{field}'"),
        })
}

/// Extract an optional string parameter, defaulting to empty.
pub fn optional_str<'a>(params: &'a serde_json::Value, field: &str) -> &'a str {
    params.get(field).and_then(|v| v.as_str()).unwrap_or("")
}
