//! The wsrep local state machine.

use serde::{Deserialize, Serialize};

use crate::StatusError;

/// Replication state of a single Galera node, as reported by the
/// `wsrep_local_state` status variable.
///
/// The numeric codes are fixed by the wsrep API; anything outside the
/// documented range maps to [`WsrepState::Undefined`] rather than failing,
/// since newer providers occasionally grow extra states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WsrepState {
    /// Node is requesting or receiving a state transfer (code 1).
    Joining,
    /// Node is streaming a state snapshot to a joiner, or was manually
    /// desynced (code 2). Usually unfit for client traffic.
    Donor,
    /// State transfer finished but the node is still catching up on the
    /// write-set queue (code 3).
    Joined,
    /// Node is fully caught up and serving (code 4).
    Synced,
    /// Any other code, including 0 (initialized, not yet connected).
    Undefined,
}

impl WsrepState {
    /// Parses the raw `wsrep_local_state` value.
    pub fn from_code(raw: &str) -> Result<Self, StatusError> {
        let code: u8 = raw
            .trim()
            .parse()
            .map_err(|_| StatusError::InvalidLocalState(raw.to_string()))?;
        Ok(Self::from_u8(code))
    }

    /// Maps a numeric state code to the enum.
    pub fn from_u8(code: u8) -> Self {
        match code {
            1 => WsrepState::Joining,
            2 => WsrepState::Donor,
            3 => WsrepState::Joined,
            4 => WsrepState::Synced,
            _ => WsrepState::Undefined,
        }
    }

    /// Returns true if the node is caught up and serving.
    pub fn is_synced(self) -> bool {
        self == WsrepState::Synced
    }

    /// Returns true if the node is acting as a state-transfer donor.
    pub fn is_donor(self) -> bool {
        self == WsrepState::Donor
    }
}

impl std::fmt::Display for WsrepState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WsrepState::Joining => write!(f, "joining"),
            WsrepState::Donor => write!(f, "donor/desynced"),
            WsrepState::Joined => write!(f, "joined"),
            WsrepState::Synced => write!(f, "synced"),
            WsrepState::Undefined => write!(f, "undefined"),
        }
    }
}
