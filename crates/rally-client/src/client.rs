//! Client facade: the data-source entry point.
//!
//! Ties the pieces together: builds the membership manager from the
//! operator's settings, registers the seeds, spawns the periodic
//! discovery task, and routes `get_connection` calls through the
//! election policy to a node handle.

use std::sync::Arc;
use std::time::Duration;

use log::LevelFilter;
use rally_status::{ConsistencyLevel, NodeId};
use sqlx::pool::PoolConnection;
use sqlx::MySql;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::ClusterClientBuilder;
use crate::error::ClientError;
use crate::membership::Membership;
use crate::metrics;
use crate::node::NodeHandle;
use crate::policy::ElectionPolicy;
use crate::probe::{SqlProber, StaticProber, StatusProber};

/// A pooled connection to one cluster node.
pub type Connection = PoolConnection<MySql>;

/// Cluster-aware connection router.
///
/// Discovers the live topology from the configured seeds, keeps a pool
/// per node, and hands out connections drawn from healthy nodes. Clone
/// freely: all clones share the same cluster view.
///
/// ```rust,ignore
/// let client = ClusterClient::builder()
///     .seeds("db1:3306,db2:3306")
///     .database("orders")
///     .user("app")
///     .password("secret")
///     .build()
///     .await?;
///
/// let mut conn = client.get_connection().await?;
/// ```
#[derive(Clone)]
pub struct ClusterClient {
    membership: Arc<Membership>,
    default_policy: Arc<dyn ElectionPolicy>,
    default_consistency: Option<ConsistencyLevel>,
    retries: u32,
    log_statements: Option<LevelFilter>,
    log_slow_statements: Option<(LevelFilter, Duration)>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ClusterClient {
    /// Starts configuring a new client.
    pub fn builder() -> ClusterClientBuilder {
        ClusterClientBuilder::new()
    }

    pub(crate) async fn start(builder: ClusterClientBuilder) -> Result<Self, ClientError> {
        let (client, discover, db, pool) = builder.into_settings()?;
        let log_statements = db.log_statements;
        let log_slow_statements = db.log_slow_statements;

        let prober: Arc<dyn StatusProber> = match (&client.prober, client.test_mode) {
            (Some(prober), _) => Arc::clone(prober),
            (None, true) => Arc::new(StaticProber),
            (None, false) => Arc::new(SqlProber::new(pool.connect_timeout + pool.read_timeout)),
        };

        let membership = Arc::new(Membership::new(
            db,
            pool,
            discover,
            prober,
            Arc::clone(&client.listener),
        ));
        membership.register_seeds(&client.seeds).await;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        if !client.test_mode {
            spawn_discovery(
                Arc::clone(&membership),
                discover.discover_period,
                shutdown_rx,
            );
        }

        info!(
            "cluster client started: {} seed(s), {} active node(s)",
            client.seeds.len(),
            membership.active_snapshot().len()
        );

        Ok(Self {
            membership,
            default_policy: client.default_policy,
            default_consistency: client.default_consistency,
            retries: client.retries_to_get_connection,
            log_statements,
            log_slow_statements,
            shutdown: Arc::new(shutdown_tx),
        })
    }

    /// Borrows a connection from a healthy node using the default
    /// policy and the default consistency level.
    pub async fn get_connection(&self) -> Result<Connection, ClientError> {
        self.get_connection_with(self.default_consistency, None)
            .await
    }

    /// Borrows a connection with an explicit consistency directive and
    /// an optional one-off election policy.
    ///
    /// Pool-level failures on the elected node are surfaced directly;
    /// the client does not re-elect across that boundary.
    pub async fn get_connection_with(
        &self,
        consistency: Option<ConsistencyLevel>,
        policy: Option<&dyn ElectionPolicy>,
    ) -> Result<Connection, ClientError> {
        let handle = self.select_node(policy)?;
        debug!(
            "drawing connection from node {} [{}]",
            handle.id(),
            policy.unwrap_or(self.default_policy.as_ref()).name()
        );
        handle.get_connection(consistency).await
    }

    /// Elects a node from the active snapshot, retrying up to the
    /// configured budget.
    ///
    /// Each attempt invokes the policy exactly once against a fresh
    /// snapshot; policy errors and ids that vanished between the policy
    /// call and the handle lookup both count as failed attempts.
    pub(crate) fn select_node(
        &self,
        policy: Option<&dyn ElectionPolicy>,
    ) -> Result<Arc<NodeHandle>, ClientError> {
        let policy = policy.unwrap_or(self.default_policy.as_ref());

        for attempt in 1..=self.retries {
            let active = self.membership.active_snapshot();
            match policy.choose_node(&active) {
                Ok(node) => match self.membership.handle(&node) {
                    Some(handle) => return Ok(handle),
                    None => {
                        warn!(
                            "elected node {node} vanished, attempt {attempt}/{}",
                            self.retries
                        );
                    }
                },
                Err(e) => {
                    warn!("election attempt {attempt}/{} failed: {e}", self.retries);
                }
            }
        }

        metrics::record_no_host_available();
        Err(ClientError::NoHostAvailable {
            attempts: self.retries,
        })
    }

    /// The statement log level configured for every node pool, if any.
    ///
    /// Pool logging is fixed when the client is built (see
    /// [`ClusterClientBuilder::log_statements`]); this exposes the
    /// delegated setting for inspection.
    ///
    /// [`ClusterClientBuilder::log_statements`]: crate::config::ClusterClientBuilder::log_statements
    pub fn statement_log_level(&self) -> Option<LevelFilter> {
        self.log_statements
    }

    /// The slow-statement logging configuration for every node pool,
    /// if any: the level and the latency threshold.
    pub fn slow_statement_log(&self) -> Option<(LevelFilter, Duration)> {
        self.log_slow_statements
    }

    /// Ids of the nodes currently serving traffic.
    pub fn active_nodes(&self) -> Vec<NodeId> {
        self.membership.active_snapshot().as_ref().clone()
    }

    /// Ids of known nodes currently held out of rotation.
    pub fn downed_nodes(&self) -> Vec<NodeId> {
        self.membership.downed_snapshot().as_ref().clone()
    }

    /// Stops the discovery scheduler. An in-flight tick finishes;
    /// later `get_connection` calls keep operating on the last
    /// committed snapshot, best-effort.
    pub fn shutdown(&self) {
        info!("shutting down cluster client");
        let _ = self.shutdown.send(true);
    }
}

impl std::fmt::Debug for ClusterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterClient")
            .field("membership", &self.membership)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}

impl ClusterClientBuilder {
    /// Validates the configuration, registers the seeds, and starts
    /// the discovery scheduler (unless `test_mode` is set).
    pub async fn build(self) -> Result<ClusterClient, ClientError> {
        ClusterClient::start(self).await
    }
}

/// Spawns the periodic discovery task.
///
/// Fixed-rate but non-overlapping: the tick body runs to completion
/// before the next interval fire is observed, and a missed deadline
/// delays the following tick instead of bunching.
fn spawn_discovery(
    membership: Arc<Membership>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    debug!("discovery task stopping");
                    break;
                }
                _ = ticker.tick() => {
                    membership.tick().await;
                }
            }
        }
    });
}
