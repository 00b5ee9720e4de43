//! rally-client: cluster-aware connection router for Galera clusters.
//!
//! Sits between application code that wants a MySQL connection and a
//! fleet of Galera nodes whose membership and health change
//! continuously. The client discovers the live topology from a seed
//! list, keeps a connection pool per node, filters nodes by
//! replication health on a periodic discovery tick, and hands out
//! connections drawn from healthy nodes through a pluggable election
//! policy.
//!
//! # Architecture
//!
//! - **Status probe** ([`probe`]): runs the wsrep status query against
//!   one node and parses it into a [`ClusterStatus`].
//! - **Node handle** ([`node`]): per-node application pool plus a small
//!   read-only probe pool, and the last status snapshot.
//! - **Membership manager** ([`membership`]): the authoritative
//!   active/downed view, mutated only by the discovery task; the
//!   request path reads lock-free copy-on-write snapshots.
//! - **Election policy** ([`policy`]): maps an active snapshot to one
//!   chosen node; round-robin by default.
//! - **Client facade** ([`client`]): the `get_connection` surface and
//!   the discovery scheduler.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use rally_client::{ClusterClient, ConsistencyLevel};
//!
//! let client = ClusterClient::builder()
//!     .seeds("db1:3306,db2:3306,db3:3306")
//!     .database("orders")
//!     .user("app")
//!     .password("secret")
//!     .build()
//!     .await?;
//!
//! // round-robins across healthy nodes
//! let mut conn = client.get_connection().await?;
//!
//! // read-your-writes for this request only
//! let mut conn = client
//!     .get_connection_with(Some(ConsistencyLevel::Read), None)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod listener;
pub mod membership;
mod metrics;
pub mod node;
pub mod policy;
pub mod probe;

pub use client::{ClusterClient, Connection};
pub use config::{ClusterClientBuilder, IsolationLevel};
pub use error::ClientError;
pub use listener::{ClusterListener, LoggingListener};
pub use membership::Membership;
pub use node::NodeHandle;
pub use policy::{ElectionPolicy, RandomPolicy, RoundRobin};
pub use probe::{ScriptedProber, SqlProber, StaticProber, StatusProber};

pub use rally_status::{ClusterStatus, ConsistencyLevel, NodeId, StatusError, WsrepState};
