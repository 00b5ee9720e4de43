//! Status probing.
//!
//! The prober is the seam between the membership state machine and the
//! wire: the real implementation runs the wsrep status query over a
//! node's internal pool, while scripted probers drive the state machine
//! in tests without a server.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rally_status::{ClusterStatus, NodeId};
use sqlx::mysql::MySqlPool;
use sqlx::Row;
use tracing::trace;

use crate::error::ClientError;

/// The status query issued against each node.
pub const STATUS_QUERY: &str = "SHOW GLOBAL STATUS LIKE 'wsrep%'";

/// Fetches one node's replication status.
///
/// `pool` is the node's internal probe pool; implementations that do
/// not talk to a server ignore it.
#[async_trait]
pub trait StatusProber: Send + Sync {
    async fn probe(&self, node: &NodeId, pool: &MySqlPool) -> Result<ClusterStatus, ClientError>;
}

/// Real prober: runs [`STATUS_QUERY`] and parses the variable rows.
///
/// The whole probe is bounded by `budget` (connect plus query), so one
/// hung node cannot stall a discovery tick indefinitely.
pub struct SqlProber {
    budget: Duration,
}

impl SqlProber {
    pub fn new(budget: Duration) -> Self {
        Self { budget }
    }
}

#[async_trait]
impl StatusProber for SqlProber {
    async fn probe(&self, node: &NodeId, pool: &MySqlPool) -> Result<ClusterStatus, ClientError> {
        trace!("probing {node}");
        let rows = tokio::time::timeout(self.budget, sqlx::query(STATUS_QUERY).fetch_all(pool))
            .await
            .map_err(|_| ClientError::ProbeTimeout(self.budget))??;

        let mut vars = HashMap::with_capacity(rows.len());
        for row in &rows {
            let name: String = row.try_get(0)?;
            let value: String = row.try_get(1)?;
            vars.insert(name.to_ascii_lowercase(), value);
        }

        let status = ClusterStatus::from_variables(&vars)?;
        trace!(
            "probed {node}: primary={} state={}",
            status.is_primary(),
            status.state()
        );
        Ok(status)
    }
}

/// Prober that reports every node as primary and synced, with a
/// membership list of just the probed node. Backs `test_mode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticProber;

#[async_trait]
impl StatusProber for StaticProber {
    async fn probe(&self, node: &NodeId, _pool: &MySqlPool) -> Result<ClusterStatus, ClientError> {
        Ok(ClusterStatus::synthetic_ok(node))
    }
}

/// Prober driven by a mutable script: each node either has a current
/// status or is unreachable. Test scaffolding for exercising the
/// membership state machine without a server.
#[derive(Debug, Default)]
pub struct ScriptedProber {
    statuses: std::sync::Mutex<HashMap<NodeId, ClusterStatus>>,
    unreachable: std::sync::Mutex<std::collections::HashSet<NodeId>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts `node` to report `status` on its next probes.
    pub fn set(&self, node: impl Into<NodeId>, status: ClusterStatus) {
        let node = node.into();
        self.unreachable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(&node);
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(node, status);
    }

    /// Scripts `node` to fail its next probes with a transport error.
    pub fn fail(&self, node: impl Into<NodeId>) {
        self.unreachable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(node.into());
    }
}

#[async_trait]
impl StatusProber for ScriptedProber {
    async fn probe(&self, node: &NodeId, _pool: &MySqlPool) -> Result<ClusterStatus, ClientError> {
        let unreachable = self
            .unreachable
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains(node);
        if unreachable {
            return Err(ClientError::Sql(sqlx::Error::PoolClosed));
        }
        self.statuses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(node)
            .cloned()
            .ok_or(ClientError::Sql(sqlx::Error::PoolClosed))
    }
}
