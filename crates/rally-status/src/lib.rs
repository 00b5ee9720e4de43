//! rally-status: Galera wsrep status model.
//!
//! Provides the data types a cluster-aware client needs to reason about
//! a Galera node's replication health: the wsrep local state machine,
//! a parsed snapshot of the `SHOW GLOBAL STATUS LIKE 'wsrep%'` output,
//! and the `wsrep_sync_wait` consistency levels.
//!
//! # quick start
//!
//! ```
//! use std::collections::HashMap;
//! use rally_status::{ClusterStatus, WsrepState};
//!
//! let mut vars = HashMap::new();
//! vars.insert("wsrep_cluster_status".to_string(), "Primary".to_string());
//! vars.insert("wsrep_local_state".to_string(), "4".to_string());
//! vars.insert(
//!     "wsrep_incoming_addresses".to_string(),
//!     "10.0.0.1:3306,10.0.0.2:3306".to_string(),
//! );
//!
//! let status = ClusterStatus::from_variables(&vars).unwrap();
//! assert!(status.is_primary());
//! assert!(status.is_synced());
//! assert_eq!(status.state(), WsrepState::Synced);
//! assert_eq!(status.cluster_nodes().len(), 2);
//! ```

pub mod consistency;
pub mod error;
mod state;
mod status;

pub use consistency::ConsistencyLevel;
pub use error::StatusError;
pub use state::WsrepState;
pub use status::{ClusterStatus, NodeId};
