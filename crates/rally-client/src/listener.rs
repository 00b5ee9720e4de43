//! Lifecycle event listener.

use rally_status::NodeId;
use tracing::{info, warn};

/// Observer for node lifecycle transitions.
///
/// Callbacks run synchronously on the discovery task, in the order the
/// transitions are committed. Implementations must not block; anything
/// slow belongs on a channel.
pub trait ClusterListener: Send + Sync {
    /// A node entered the active set and may now serve connections.
    fn on_activating_node(&self, node: &NodeId) {
        let _ = node;
    }

    /// A node left the active set. `cause` is a short human-readable
    /// reason: a classification verdict or the probe error message.
    fn on_marking_node_as_down(&self, node: &NodeId, cause: &str) {
        let _ = (node, cause);
    }

    /// A node vanished from the cluster and its handle was destroyed.
    fn on_removing_node(&self, node: &NodeId) {
        let _ = node;
    }
}

/// Default listener: reports transitions through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl ClusterListener for LoggingListener {
    fn on_activating_node(&self, node: &NodeId) {
        info!("activated cluster node {node}");
    }

    fn on_marking_node_as_down(&self, node: &NodeId, cause: &str) {
        warn!("marked cluster node {node} as down: {cause}");
    }

    fn on_removing_node(&self, node: &NodeId) {
        info!("removed cluster node {node}");
    }
}
