//! Per-node connection handle.
//!
//! Each known cluster node owns two sqlx pools: the primary pool that
//! serves application traffic, and a small read-only internal pool used
//! exclusively for status probes so discovery can never starve the
//! application of connections. Pools are created lazily, so allocating
//! a handle never blocks on the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use rally_status::{ClusterStatus, ConsistencyLevel, NodeId};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::pool::PoolConnection;
use sqlx::{Executor, MySql};
use tracing::debug;

use crate::config::{DbSettings, PoolSettings};
use crate::error::ClientError;
use crate::probe::StatusProber;

/// A member of the cluster as the client tracks it: its pools and the
/// last status snapshot a probe returned.
///
/// Lifecycle: created on registration, destroyed on removal. `on_down`
/// quiesces the primary pool, `on_activate` re-enables it, `shutdown`
/// terminates both pools.
pub struct NodeHandle {
    id: NodeId,
    pool: MySqlPool,
    internal_pool: MySqlPool,
    status: RwLock<Option<ClusterStatus>>,
    serving: AtomicBool,
}

impl NodeHandle {
    /// Allocates the handle and both lazy pools for `id`.
    pub fn connect(
        id: NodeId,
        db: &DbSettings,
        settings: &PoolSettings,
    ) -> Result<Self, ClientError> {
        let options = db.connect_options(&id)?;
        let pool = build_pool(options.clone(), settings);
        let internal_pool = build_pool(options, &settings.internal());

        Ok(Self {
            id,
            pool,
            internal_pool,
            status: RwLock::new(None),
            serving: AtomicBool::new(true),
        })
    }

    /// The node's identifier.
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Issues a status probe through the internal pool and caches the
    /// result. Blocking up to the prober's budget; fails on transport
    /// errors or an unusable status payload.
    pub async fn refresh_status(
        &self,
        prober: &dyn StatusProber,
    ) -> Result<ClusterStatus, ClientError> {
        let status = prober.probe(&self.id, &self.internal_pool).await?;
        *self
            .status
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(status.clone());
        Ok(status)
    }

    /// Last cached status, if any probe has completed yet.
    pub fn status(&self) -> Option<ClusterStatus> {
        self.status
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Whether the primary pool is dispensing connections.
    pub fn is_serving(&self) -> bool {
        self.serving.load(Ordering::Acquire)
    }

    /// Re-enables the primary pool. Idempotent.
    pub fn on_activate(&self) {
        self.serving.store(true, Ordering::Release);
    }

    /// Quiesces the primary pool: no new connections are dispensed
    /// until the node is activated again. Connections already handed
    /// out are unaffected. Idempotent.
    pub fn on_down(&self) {
        self.serving.store(false, Ordering::Release);
    }

    /// Terminates both pools. Idempotent.
    pub async fn shutdown(&self) {
        debug!("shutting down pools for node {}", self.id);
        self.serving.store(false, Ordering::Release);
        self.pool.close().await;
        self.internal_pool.close().await;
    }

    /// Borrows a connection from the primary pool, applying the
    /// consistency directive before handing it out.
    ///
    /// Fails with [`ClientError::NodeSuspended`] while the node is
    /// down, or with the pool's own error when the borrow budget runs
    /// out.
    pub async fn get_connection(
        &self,
        consistency: Option<ConsistencyLevel>,
    ) -> Result<PoolConnection<MySql>, ClientError> {
        if !self.is_serving() {
            return Err(ClientError::NodeSuspended(self.id.clone()));
        }

        let mut conn = self.pool.acquire().await?;
        if let Some(level) = consistency {
            conn.execute(level.session_directive().as_str()).await?;
        }
        Ok(conn)
    }
}

impl std::fmt::Debug for NodeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeHandle")
            .field("id", &self.id)
            .field("serving", &self.is_serving())
            .finish_non_exhaustive()
    }
}

/// Builds one lazy pool with the session defaults applied to every
/// fresh connection.
fn build_pool(options: MySqlConnectOptions, settings: &PoolSettings) -> MySqlPool {
    let session_sql = settings.session_setup_sql();
    MySqlPoolOptions::new()
        .max_connections(settings.max_connections_per_host)
        .min_connections(settings.min_connections_idle_per_host)
        .acquire_timeout(settings.connection_timeout)
        .idle_timeout(settings.idle_timeout)
        .after_connect(move |conn, _meta| {
            let session_sql = session_sql.clone();
            Box::pin(async move {
                for statement in &session_sql {
                    conn.execute(statement.as_str()).await?;
                }
                Ok(())
            })
        })
        .connect_lazy_with(options)
}
