//! Parsed snapshot of a node's wsrep status.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{StatusError, WsrepState};

/// Status variable holding the node's replication state code.
pub const WSREP_LOCAL_STATE: &str = "wsrep_local_state";
/// Status variable holding the human-readable state name.
pub const WSREP_LOCAL_STATE_COMMENT: &str = "wsrep_local_state_comment";
/// Status variable telling whether the node is in the primary component.
pub const WSREP_CLUSTER_STATUS: &str = "wsrep_cluster_status";
/// Status variable listing the client addresses of all cluster members.
pub const WSREP_INCOMING_ADDRESSES: &str = "wsrep_incoming_addresses";

/// Identifier of a cluster node, typically `host:port`.
///
/// Opaque to the client core: it is whatever the operator seeds and
/// whatever peers report in `wsrep_incoming_addresses`. Unique within
/// one client instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    /// Returns the raw `host:port` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NodeId {
    fn from(raw: String) -> Self {
        NodeId(raw)
    }
}

impl From<&str> for NodeId {
    fn from(raw: &str) -> Self {
        NodeId(raw.to_string())
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable snapshot of one node's view of the cluster.
///
/// Built from the key/value pairs returned by
/// `SHOW GLOBAL STATUS LIKE 'wsrep%'`. A snapshot answers the three
/// questions the discovery loop asks: is the node in the primary
/// component, is its replication state usable, and which members does
/// it currently see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterStatus {
    state: WsrepState,
    cluster_status: String,
    state_comment: Option<String>,
    cluster_nodes: Vec<NodeId>,
}

impl ClusterStatus {
    /// Builds a snapshot from the raw status variable map.
    ///
    /// `wsrep_cluster_status` and `wsrep_local_state` are required;
    /// a server without them is not running the Galera provider.
    /// `wsrep_incoming_addresses` may be absent or empty on a node that
    /// has lost its cluster connection, which parses as an empty
    /// membership list.
    pub fn from_variables(vars: &HashMap<String, String>) -> Result<Self, StatusError> {
        let cluster_status = vars
            .get(WSREP_CLUSTER_STATUS)
            .ok_or(StatusError::MissingVariable(WSREP_CLUSTER_STATUS))?
            .clone();

        let state = vars
            .get(WSREP_LOCAL_STATE)
            .ok_or(StatusError::MissingVariable(WSREP_LOCAL_STATE))
            .and_then(|raw| WsrepState::from_code(raw))?;

        let cluster_nodes = vars
            .get(WSREP_INCOMING_ADDRESSES)
            .map(|raw| parse_incoming_addresses(raw))
            .unwrap_or_default();

        Ok(Self {
            state,
            cluster_status,
            state_comment: vars.get(WSREP_LOCAL_STATE_COMMENT).cloned(),
            cluster_nodes,
        })
    }

    /// Synthesizes a healthy single-node status for `node`.
    ///
    /// Used by scripted probers: primary, synced, and a membership list
    /// containing only the probed node itself.
    pub fn synthetic_ok(node: &NodeId) -> Self {
        Self {
            state: WsrepState::Synced,
            cluster_status: "Primary".to_string(),
            state_comment: Some("Synced".to_string()),
            cluster_nodes: vec![node.clone()],
        }
    }

    /// The node's replication state.
    pub fn state(&self) -> WsrepState {
        self.state
    }

    /// The human-readable state name as the server reported it in
    /// `wsrep_local_state_comment`, when present.
    pub fn state_comment(&self) -> Option<&str> {
        self.state_comment.as_deref()
    }

    /// True when the node belongs to the primary component (the quorum
    /// side of any partition). Galera reports `Primary`, `non-Primary`
    /// or `Disconnected`.
    pub fn is_primary(&self) -> bool {
        self.cluster_status.eq_ignore_ascii_case("primary")
    }

    /// True when the node is streaming a state snapshot to a joiner.
    pub fn is_donor(&self) -> bool {
        self.state.is_donor()
    }

    /// True when replication is caught up and the node is serving.
    pub fn is_synced(&self) -> bool {
        self.state.is_synced()
    }

    /// Members of the cluster as this node reports them.
    pub fn cluster_nodes(&self) -> &[NodeId] {
        &self.cluster_nodes
    }

    /// True when `node` appears in this snapshot's membership list.
    pub fn knows(&self, node: &NodeId) -> bool {
        self.cluster_nodes.contains(node)
    }
}

/// Splits the comma-separated `wsrep_incoming_addresses` value.
///
/// Galera joins member addresses with commas and may leave trailing
/// separators or blanks while membership is settling.
fn parse_incoming_addresses(raw: &str) -> Vec<NodeId> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(NodeId::from)
        .collect()
}
