//! Error types for the connection router.

use std::time::Duration;

use rally_status::{NodeId, StatusError};
use thiserror::Error;

/// Errors surfaced by the client facade and its collaborators.
///
/// Discovery-time failures are absorbed by the membership manager (a
/// failing probe demotes the node, it never reaches the caller); only
/// election exhaustion and per-node pool failures propagate out of
/// `get_connection`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The election retry budget ran out without landing on a live node.
    #[error("no host available after {attempts} election attempts")]
    NoHostAvailable { attempts: u32 },

    /// The election policy was handed an empty active set.
    /// Recovered inside the retry loop, surfaced only by policies
    /// invoked directly.
    #[error("no active nodes to choose from")]
    EmptyActiveSet,

    /// The node's pool is quiesced because the node is marked down.
    #[error("node {0} is not serving connections")]
    NodeSuspended(NodeId),

    /// A status probe exceeded its time budget.
    #[error("status probe timed out after {0:?}")]
    ProbeTimeout(Duration),

    /// The probed server returned an unusable wsrep status.
    #[error("cluster status: {0}")]
    Status(#[from] StatusError),

    /// Driver or pool failure, passed through from sqlx.
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),

    /// The client was built with unusable settings.
    #[error("invalid client configuration: {0}")]
    Configuration(String),
}
