//! Staff presence table.
//!
//! Maps each staff identity to at most one live connection. A fresh connect
//! for an identity that is already online replaces the stored handle
//! (last-connect-wins); going offline only succeeds when the departing
//! handle still matches, so a stale disconnect from a superseded connection
//! cannot knock the replacement offline.

use std::collections::HashMap;

use concierge_core::{ConnectionId, StaffId};

/// In-memory staff-identity → live-connection map.
#[derive(Debug, Default)]
pub struct PresenceTable {
    entries: HashMap<StaffId, ConnectionId>,
}

impl PresenceTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `conn` as the live connection for `staff`.
    ///
    /// Returns the connection that was displaced, if the identity was
    /// already online elsewhere.
    pub fn mark_online(&mut self, staff: StaffId, conn: ConnectionId) -> Option<ConnectionId> {
        self.entries.insert(staff, conn)
    }

    /// Remove the presence entry for `staff`, but only if `conn` is still
    /// the stored handle. Returns whether an entry was removed.
    pub fn mark_offline(&mut self, staff: &StaffId, conn: &ConnectionId) -> bool {
        match self.entries.get(staff) {
            Some(current) if current == conn => {
                self.entries.remove(staff);
                true
            }
            _ => false,
        }
    }

    /// The live connection for `staff`, if any.
    #[must_use]
    pub fn lookup(&self, staff: &StaffId) -> Option<&ConnectionId> {
        self.entries.get(staff)
    }

    /// The staff identity bound to `conn`, if any.
    #[must_use]
    pub fn identity_of(&self, conn: &ConnectionId) -> Option<&StaffId> {
        self.entries
            .iter()
            .find_map(|(staff, current)| (current == conn).then_some(staff))
    }

    /// All currently online staff identities.
    #[must_use]
    pub fn online(&self) -> Vec<StaffId> {
        self.entries.keys().cloned().collect()
    }

    /// Number of online staff.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is online.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
