//! Branded ID newtypes for type safety.
//!
//! Every entity has a distinct ID type implemented as a newtype wrapper
//! around `String`, so a request ID cannot be passed where a session ID is
//! expected. Generated IDs are UUID v7 (time-ordered); staff IDs come from
//! configuration and are short human-assigned codes.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Generate a new UUID v7 string (time-ordered).
fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier for a staff member, assigned in configuration
    /// (e.g. a short code like `"ACS"`).
    StaffId
}

branded_id! {
    /// Identifier for a live transport connection (one per open socket).
    ConnectionId
}

branded_id! {
    /// Identifier for a call request.
    RequestId
}

branded_id! {
    /// Identifier for an active paired call session. Always distinct from
    /// the request ID that produced it.
    CallSessionId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_ids_are_unique() {
        let a = RequestId::new();
        let b = RequestId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn from_str_preserves_value() {
        let id = StaffId::from("ACS");
        assert_eq!(id.as_str(), "ACS");
        assert_eq!(id.to_string(), "ACS");
    }

    #[test]
    fn serde_is_transparent() {
        let id = CallSessionId::from("sess_1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sess_1\"");
        let back: CallSessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn generated_ids_parse_as_uuid() {
        let id = ConnectionId::new();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }

    #[test]
    fn deref_to_str() {
        let id = RequestId::from("r1");
        assert_eq!(&*id, "r1");
    }
}
