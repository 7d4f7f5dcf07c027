//! Static staff directory with fuzzy identifier resolution.
//!
//! The directory is built once at startup from configuration and is
//! read-only afterwards. Call targets arrive from three differently shaped
//! sources (an explicit short code, a free-text name extracted from
//! assistant output, or a structured form field), so [`Directory::resolve`]
//! applies an ordered list of matching rules instead of requiring callers to
//! know which shape they hold.

use serde::{Deserialize, Serialize};

use crate::ids::StaffId;

/// A person who can receive calls. Immutable for the process lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaffIdentity {
    /// Short identifier assigned in configuration.
    pub id: StaffId,
    /// Full display name (e.g. `"Dr. Alice Chen"`).
    pub display_name: String,
    /// Department or team.
    pub department: String,
    /// Contact address (email-shaped, used only for matching).
    pub contact_address: String,
}

/// Directory resolution failure.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// No rule matched the query.
    #[error("no staff member matches '{query}'")]
    NotFound {
        /// The query that failed to resolve.
        query: String,
    },
}

/// Read-only registry of known staff identities.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    entries: Vec<StaffIdentity>,
}

impl Directory {
    /// Build a directory from configured identities.
    #[must_use]
    pub fn new(entries: Vec<StaffIdentity>) -> Self {
        Self { entries }
    }

    /// All known identities, in configuration order.
    #[must_use]
    pub fn entries(&self) -> &[StaffIdentity] {
        &self.entries
    }

    /// Look up an identity by exact staff ID.
    #[must_use]
    pub fn get(&self, id: &StaffId) -> Option<&StaffIdentity> {
        self.entries.iter().find(|s| &s.id == id)
    }

    /// Resolve a free-form query to a staff identity.
    ///
    /// Rules are tried in priority order; the first match wins and ambiguity
    /// is not disambiguated further:
    ///
    /// 1. exact ID match (case-insensitive)
    /// 2. exact display-name match (case-insensitive)
    /// 3. substring containment of display name, either direction
    /// 4. exact contact-address match (case-insensitive)
    pub fn resolve(&self, query: &str) -> Result<&StaffIdentity, DirectoryError> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return Err(DirectoryError::NotFound {
                query: query.to_owned(),
            });
        }

        let by_id = self
            .entries
            .iter()
            .find(|s| s.id.as_str().to_lowercase() == q);
        let by_name = || {
            self.entries
                .iter()
                .find(|s| s.display_name.to_lowercase() == q)
        };
        let by_name_substring = || {
            self.entries.iter().find(|s| {
                let name = s.display_name.to_lowercase();
                name.contains(&q) || q.contains(&name)
            })
        };
        let by_contact = || {
            self.entries
                .iter()
                .find(|s| s.contact_address.to_lowercase() == q)
        };

        by_id
            .or_else(by_name)
            .or_else(by_name_substring)
            .or_else(by_contact)
            .ok_or_else(|| DirectoryError::NotFound {
                query: query.to_owned(),
            })
    }
}
