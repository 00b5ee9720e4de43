//! Test helpers for driving a `ClusterClient` against scripted probers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rally_client::{ClusterClient, ClusterClientBuilder, ClusterListener, ScriptedProber};
use rally_status::{ClusterStatus, NodeId};

/// Listener capturing lifecycle transitions as readable strings.
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<String>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

impl ClusterListener for RecordingListener {
    fn on_activating_node(&self, node: &NodeId) {
        self.events.lock().unwrap().push(format!("activate {node}"));
    }

    fn on_marking_node_as_down(&self, node: &NodeId, cause: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("down {node}: {cause}"));
    }

    fn on_removing_node(&self, node: &NodeId) {
        self.events.lock().unwrap().push(format!("remove {node}"));
    }
}

/// Builds a status from raw wsrep variable values.
pub fn status(cluster_status: &str, state_code: u8, members: &[&str]) -> ClusterStatus {
    let mut vars = HashMap::new();
    vars.insert(
        "wsrep_cluster_status".to_string(),
        cluster_status.to_string(),
    );
    vars.insert("wsrep_local_state".to_string(), state_code.to_string());
    vars.insert("wsrep_incoming_addresses".to_string(), members.join(","));
    ClusterStatus::from_variables(&vars).unwrap()
}

/// A healthy primary-and-synced status reporting `members`.
pub fn synced(members: &[&str]) -> ClusterStatus {
    status("Primary", 4, members)
}

pub fn ids(raw: &[&str]) -> Vec<NodeId> {
    raw.iter().copied().map(NodeId::from).collect()
}

pub fn sorted(mut list: Vec<NodeId>) -> Vec<NodeId> {
    list.sort();
    list
}

/// A builder preconfigured with the scripted prober, a recording
/// listener, and a fast discovery cadence.
pub fn test_client(
    seeds: &str,
    prober: &Arc<ScriptedProber>,
    listener: &Arc<RecordingListener>,
) -> ClusterClientBuilder {
    ClusterClient::builder()
        .seeds(seeds)
        .user("app")
        .database("test")
        .discover_period(Duration::from_millis(100))
        .status_prober(Arc::clone(prober) as _)
        .listener(Arc::clone(listener) as _)
}

/// Lets the background scheduler run `ticks` discovery iterations
/// under the paused test clock.
pub async fn run_ticks(ticks: u32) {
    tokio::time::sleep(Duration::from_millis(100 * u64::from(ticks) + 50)).await;
}
