//! Per-request consistency levels.
//!
//! Galera exposes read-your-writes style guarantees through the
//! `wsrep_sync_wait` session variable: a bitmask of statement classes
//! that must wait for the node to apply all write-sets replicated
//! before the statement started.

use serde::{Deserialize, Serialize};

/// Consistency directive applied to a connection before it is handed
/// to the application.
///
/// Each level maps to a `wsrep_sync_wait` bitmask value. Higher levels
/// trade latency for stronger per-statement causality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsistencyLevel {
    /// No causality wait (`wsrep_sync_wait = 0`).
    Disabled,
    /// Wait before READ statements, including SELECT and BEGIN (`1`).
    Read,
    /// Wait before UPDATE and DELETE (`2`).
    UpdateDelete,
    /// Wait before READ, UPDATE and DELETE (`3`).
    ReadUpdateDelete,
    /// Wait before INSERT and REPLACE (`4`).
    InsertReplace,
    /// Wait before every statement class (`7`).
    All,
}

impl ConsistencyLevel {
    /// The `wsrep_sync_wait` bitmask for this level.
    pub fn sync_wait_mask(self) -> u8 {
        match self {
            ConsistencyLevel::Disabled => 0,
            ConsistencyLevel::Read => 1,
            ConsistencyLevel::UpdateDelete => 2,
            ConsistencyLevel::ReadUpdateDelete => 3,
            ConsistencyLevel::InsertReplace => 4,
            ConsistencyLevel::All => 7,
        }
    }

    /// The session statement establishing this level.
    pub fn session_directive(self) -> String {
        format!("SET SESSION wsrep_sync_wait = {}", self.sync_wait_mask())
    }
}

impl std::fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sync_wait={}", self.sync_wait_mask())
    }
}
